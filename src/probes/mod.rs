//! Probe collaborators and the event sink they report through
//!
//! A probe performs one kind of network test against one domain and reports
//! `Started`, zero or more `Line`, then one `Finished` through a [`ProbeSink`].
//! The core treats every payload as opaque text.

mod command;
pub mod ping;
pub mod socket;
pub mod trace;

pub use ping::SystemPinger;
pub use socket::SystemSocketProbe;
pub use trace::SystemTraceRouter;

use crate::{
    models::Config,
    types::{ProbeKind, TraceEngine},
};
use std::borrow::Cow;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;

/// Tagged probe callback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    Started { kind: ProbeKind, domain: String },
    Line(String),
    Finished(String),
}

/// Destination of probe events for a live session
pub trait ProbeRecorder: Send + Sync {
    fn record(&self, kind: ProbeKind, event: ProbeEvent);
}

/// Ordered event sink handed to a probe for the duration of one run.
///
/// The sink only holds a weak reference to its session; once the session is
/// gone, emitted events are discarded.
#[derive(Clone)]
pub struct ProbeSink {
    kind: ProbeKind,
    target: Weak<dyn ProbeRecorder>,
    cancel: CancellationToken,
}

impl ProbeSink {
    pub fn new(kind: ProbeKind, target: Weak<dyn ProbeRecorder>, cancel: CancellationToken) -> Self {
        Self { kind, target, cancel }
    }

    /// Sink bound to nothing; every event is dropped
    pub fn disconnected(kind: ProbeKind) -> Self {
        let target: Weak<dyn ProbeRecorder> = Weak::<NullRecorder>::new();
        Self {
            kind,
            target,
            cancel: CancellationToken::new(),
        }
    }

    pub fn kind(&self) -> ProbeKind {
        self.kind
    }

    /// Forward an event; returns false when no live session received it
    pub fn emit(&self, event: ProbeEvent) -> bool {
        match self.target.upgrade() {
            Some(recorder) => {
                recorder.record(self.kind, event);
                true
            }
            None => false,
        }
    }

    pub fn started(&self, domain: &str) -> bool {
        self.emit(ProbeEvent::Started {
            kind: self.kind,
            domain: domain.to_string(),
        })
    }

    pub fn line<S: Into<String>>(&self, line: S) -> bool {
        self.emit(ProbeEvent::Line(line.into()))
    }

    pub fn finished<S: Into<String>>(&self, text: S) -> bool {
        self.emit(ProbeEvent::Finished(text.into()))
    }

    /// Long-running probes poll this to abandon work after `stop`
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.target.strong_count() == 0
    }
}

struct NullRecorder;

impl ProbeRecorder for NullRecorder {
    fn record(&self, _kind: ProbeKind, _event: ProbeEvent) {}
}

/// One kind of network test
pub trait Probe: Send + Sync {
    fn kind(&self) -> ProbeKind;

    /// Run against `domain`, blocking until done
    fn run(&self, domain: &str, sink: &ProbeSink);
}

/// The probes a diagnosis drives, in the order it drives them
#[derive(Clone)]
pub struct ProbeCollaborators {
    pub pinger: Arc<dyn Probe>,
    pub trace_router: Arc<dyn Probe>,
    pub socket_probe: Option<Arc<dyn Probe>>,
}

impl ProbeCollaborators {
    pub fn new(pinger: Arc<dyn Probe>, trace_router: Arc<dyn Probe>) -> Self {
        Self {
            pinger,
            trace_router,
            socket_probe: None,
        }
    }

    pub fn with_socket_probe(mut self, socket_probe: Arc<dyn Probe>) -> Self {
        self.socket_probe = Some(socket_probe);
        self
    }

    /// Platform-command backed probes configured from `config`
    pub fn system(config: &Config) -> Self {
        let timeout = config.probe_timeout();
        let collaborators = Self::new(
            Arc::new(SystemPinger::new(config.ping_count, timeout)),
            Arc::new(SystemTraceRouter::new(config.trace_engine, config.max_hops, timeout)),
        );

        if config.enable_socket_probe {
            collaborators.with_socket_probe(Arc::new(SystemSocketProbe::new(timeout)))
        } else {
            collaborators
        }
    }
}

/// Terminate a native traceroute fragment when it completes a hop.
///
/// Native hop lines carry a round-trip time (`ms`) or a timeout marker
/// (`***`); everything else is passed through untouched.
pub fn normalize_trace_line(engine: TraceEngine, line: &str) -> Cow<'_, str> {
    match engine {
        TraceEngine::Native if line.contains("ms") || line.contains("***") => {
            Cow::Owned(format!("{}\n", line))
        }
        TraceEngine::Native => Cow::Borrowed(line),
        TraceEngine::Ping => Cow::Owned(format!("{}\n", line)),
    }
}
