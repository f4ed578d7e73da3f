//! Network Diagnosis
//!
//! Runs ping and traceroute against a list of domains on a serialized,
//! cancellable background worker, collects a snapshot of the local network
//! environment, and streams the resulting transcript to a listener.

pub mod app;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod environment;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod operator;
pub mod output;
pub mod probes;
pub mod transcript;
pub mod types;

// Re-export commonly used types
pub use diagnostics::{DiagnosisOptions, DiagnosisOrchestrator, DiagnosisRequest};
pub use environment::{EnvironmentInspector, EnvironmentSnapshot, SystemEnvironment};
pub use error::{AppError, Result};
pub use executor::BoundedWorker;
pub use models::Config;
pub use probes::{Probe, ProbeCollaborators, ProbeEvent, ProbeSink};
pub use transcript::{CollectingListener, DiagnosisListener, LogAccumulator, ProgressChannel};
pub use types::{LinkType, ProbeKind, SessionPhase, TraceEngine};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_APP_NAME: &str = "netdiag";
    pub const DEFAULT_PING_COUNT: u32 = 4;
    pub const DEFAULT_MAX_HOPS: u32 = 30;
    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const MAX_PING_COUNT: u32 = 100;
    pub const MAX_HOPS_LIMIT: u32 = 64;
}
