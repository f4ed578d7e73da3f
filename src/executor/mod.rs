//! Serialized background execution for diagnosis runs
//!
//! A `BoundedWorker` owns one dedicated OS thread and a small pending queue:
//! - at most one job runs at a time, jobs run in submission order
//! - at most `PENDING_CAPACITY` jobs wait behind it; further submissions are
//!   rejected immediately with `WorkerUnavailable`
//! - the thread runs at the lowest scheduling priority the platform allows
//! - after `shutdown` no new work is accepted, already queued jobs still run,
//!   and the thread exits once the queue drains

use crate::{
    error::{AppError, Result},
    logging::Logger,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

/// Jobs allowed to wait behind the running one
pub const PENDING_CAPACITY: usize = 2;

static THREAD_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Unit of work executed on the worker thread
pub type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct WorkerCounters {
    submitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    panicked: AtomicU64,
}

/// Snapshot of worker activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatistics {
    /// Jobs accepted into the queue
    pub submitted: u64,
    /// Submissions refused because the queue was full or shut down
    pub rejected: u64,
    /// Jobs that ran to completion
    pub completed: u64,
    /// Jobs that panicked; the worker keeps serving the queue
    pub panicked: u64,
}

/// Single-thread, capacity-bounded executor
pub struct BoundedWorker {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<WorkerCounters>,
}

impl BoundedWorker {
    /// Spawn a new worker thread named `Trace #N`
    pub fn spawn(logger: Logger) -> Result<Self> {
        let name = format!("Trace #{}", THREAD_COUNTER.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded::<Job>(PENDING_CAPACITY);
        let counters = Arc::new(WorkerCounters::default());

        let thread_counters = Arc::clone(&counters);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_queue(receiver, thread_counters, logger))
            .map_err(|e| AppError::worker_unavailable(format!("Failed to spawn worker thread: {}", e)))?;

        Ok(Self {
            name,
            sender: Mutex::new(Some(sender)),
            handle: Mutex::new(Some(handle)),
            counters,
        })
    }

    /// Name of the worker thread
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a job without blocking
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.sender.lock()
            .map_err(|_| AppError::internal("Worker sender lock poisoned"))?;

        let sender = match guard.as_ref() {
            Some(sender) => sender,
            None => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(AppError::worker_unavailable(format!("{} has been shut down", self.name)));
            }
        };

        match sender.try_send(Box::new(job)) {
            Ok(()) => {
                self.counters.submitted.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                Err(AppError::worker_unavailable(format!(
                    "{} is busy ({} jobs already pending)", self.name, PENDING_CAPACITY
                )))
            }
            Err(TrySendError::Disconnected(_)) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                Err(AppError::worker_unavailable(format!("{} has exited", self.name)))
            }
        }
    }

    /// Stop accepting work; queued jobs still drain
    pub fn shutdown(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.sender.lock().map(|guard| guard.is_none()).unwrap_or(true)
    }

    /// Wait for the worker thread to exit.
    ///
    /// Returns immediately when called from the worker thread itself or when
    /// another caller already joined it.
    pub fn join(&self) {
        let handle = match self.handle.lock() {
            Ok(mut guard) => {
                let on_worker = guard
                    .as_ref()
                    .map(|h| h.thread().id() == thread::current().id())
                    .unwrap_or(false);
                if on_worker {
                    return;
                }
                guard.take()
            }
            Err(_) => None,
        };

        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    pub fn statistics(&self) -> WorkerStatistics {
        WorkerStatistics {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            panicked: self.counters.panicked.load(Ordering::Relaxed),
        }
    }
}

impl Drop for BoundedWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_queue(receiver: Receiver<Job>, counters: Arc<WorkerCounters>, logger: Logger) {
    lower_thread_priority();

    // recv fails once every sender is gone and the queue is empty
    while let Ok(job) = receiver.recv() {
        match panic::catch_unwind(AssertUnwindSafe(job)) {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                counters.panicked.fetch_add(1, Ordering::Relaxed);
                logger.error("Worker job panicked")
                    .field("thread", thread::current().name().unwrap_or("worker"))
                    .log();
            }
        }
    }

    crate::log_debug!(logger, "{} queue drained, thread exiting", thread::current().name().unwrap_or("worker"));
}

/// Drop the calling thread to the lowest scheduling priority
#[cfg(target_os = "linux")]
fn lower_thread_priority() {
    // On Linux the nice value is per-thread and `who == 0` means the caller.
    unsafe {
        libc::setpriority(libc::PRIO_PROCESS, 0, 19);
    }
}

#[cfg(not(target_os = "linux"))]
fn lower_thread_priority() {}
