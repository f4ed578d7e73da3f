//! Transcript accumulation and ordered progress delivery
//!
//! Every piece of text appended to a [`LogAccumulator`] is mirrored, verbatim
//! and in append order, to the session's [`DiagnosisListener`] through a
//! [`ProgressChannel`]. Concatenating every delivered fragment of a completed
//! session therefore reproduces the final transcript exactly.

use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};
use tokio_util::sync::CancellationToken;

/// Receiver of a session's progress and final report
pub trait DiagnosisListener: Send + Sync {
    /// Called once per appended fragment, in order, on the worker thread
    fn on_progress(&self, line: &str);

    /// Called at most once, only when the domain loop runs to completion
    fn on_finished(&self, full_log: &str);
}

/// One delivered fragment and its position in the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub sequence: u64,
    pub text: String,
}

/// Single-consumer, ordered delivery to a listener.
///
/// The internal lock is held for the duration of each callback, so at most
/// one delivery is ever in flight. Nothing is buffered: a fragment produced
/// after cancellation is dropped.
pub struct ProgressChannel {
    listener: Arc<dyn DiagnosisListener>,
    cancel: CancellationToken,
    next_sequence: Mutex<u64>,
    finished: AtomicBool,
}

impl ProgressChannel {
    pub fn new(listener: Arc<dyn DiagnosisListener>, cancel: CancellationToken) -> Self {
        Self {
            listener,
            cancel,
            next_sequence: Mutex::new(0),
            finished: AtomicBool::new(false),
        }
    }

    /// Deliver one fragment; returns the event when it reached the listener
    pub fn deliver(&self, text: &str) -> Option<ProgressEvent> {
        let mut sequence = lock(&self.next_sequence);
        if self.cancel.is_cancelled() || self.finished.load(Ordering::SeqCst) {
            return None;
        }

        let event = ProgressEvent {
            sequence: *sequence,
            text: text.to_string(),
        };
        *sequence += 1;
        self.listener.on_progress(&event.text);
        Some(event)
    }

    /// Hand the final report over. Fires once; never after cancellation.
    pub fn finish(&self, full_log: &str) -> bool {
        let _in_flight = lock(&self.next_sequence);
        if self.cancel.is_cancelled() {
            return false;
        }
        if self.finished.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.listener.on_finished(full_log);
        true
    }

    /// Number of fragments delivered so far
    pub fn delivered(&self) -> u64 {
        *lock(&self.next_sequence)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

/// Append-only session transcript
pub struct LogAccumulator {
    text: Mutex<String>,
    // serializes append+deliver so delivery order always matches append order
    writer: Mutex<()>,
    channel: Option<ProgressChannel>,
}

impl LogAccumulator {
    /// Accumulator whose appends are mirrored to `channel`
    pub fn new(channel: ProgressChannel) -> Self {
        Self {
            text: Mutex::new(String::new()),
            writer: Mutex::new(()),
            channel: Some(channel),
        }
    }

    /// Accumulator without a listener
    pub fn detached() -> Self {
        Self {
            text: Mutex::new(String::new()),
            writer: Mutex::new(()),
            channel: None,
        }
    }

    /// Append raw text (no terminator added)
    pub fn append(&self, fragment: &str) {
        let _writer = lock(&self.writer);
        lock(&self.text).push_str(fragment);
        if let Some(channel) = &self.channel {
            channel.deliver(fragment);
        }
    }

    /// Append one full line
    pub fn record_step(&self, step: &str) {
        let mut line = String::with_capacity(step.len() + 1);
        line.push_str(step);
        line.push('\n');
        self.append(&line);
    }

    /// Copy of everything appended so far
    pub fn snapshot(&self) -> String {
        lock(&self.text).clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.text).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.text).is_empty()
    }

    /// Deliver the final report through the channel
    pub fn finish(&self) -> Option<String> {
        let _writer = lock(&self.writer);
        let full_log = self.snapshot();
        match &self.channel {
            Some(channel) if channel.finish(&full_log) => Some(full_log),
            _ => None,
        }
    }

    pub fn channel(&self) -> Option<&ProgressChannel> {
        self.channel.as_ref()
    }
}

// A poisoned transcript lock only means a listener panicked mid-callback;
// the text itself is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Listener that records everything it receives
#[derive(Default)]
pub struct CollectingListener {
    progress: Mutex<Vec<String>>,
    finished: Mutex<Vec<String>>,
}

impl CollectingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> Vec<String> {
        lock(&self.progress).clone()
    }

    /// All progress fragments joined together
    pub fn progress_text(&self) -> String {
        lock(&self.progress).concat()
    }

    pub fn finished(&self) -> Vec<String> {
        lock(&self.finished).clone()
    }
}

impl DiagnosisListener for CollectingListener {
    fn on_progress(&self, line: &str) {
        lock(&self.progress).push(line.to_string());
    }

    fn on_finished(&self, full_log: &str) {
        lock(&self.finished).push(full_log.to_string());
    }
}
