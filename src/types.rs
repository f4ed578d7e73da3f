//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Link technology the host is currently using
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Wifi,
    Cellular,
    Unknown,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::Wifi => "wifi",
            LinkType::Cellular => "cellular",
            LinkType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which traceroute engine produces hop output.
///
/// The two engines emit differently shaped text: `Native` streams raw line
/// fragments that the orchestrator terminates itself, `Ping` emits one complete
/// line per hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TraceEngine {
    /// System traceroute binary, raw fragments
    Native,
    /// TTL-limited pings, one line per hop
    Ping,
}

impl Default for TraceEngine {
    fn default() -> Self {
        Self::Native
    }
}

impl TraceEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceEngine::Native => "native",
            TraceEngine::Ping => "ping",
        }
    }
}

impl FromStr for TraceEngine {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "native" | "traceroute" => Ok(TraceEngine::Native),
            "ping" => Ok(TraceEngine::Ping),
            other => Err(AppError::parse(format!("Invalid trace engine: {}", other))),
        }
    }
}

impl fmt::Display for TraceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle phase of a diagnosis session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No session has been started yet
    Idle,
    /// Between `start` and the terminal transition
    Running,
    /// The per-domain loop ran to its natural end
    Completed,
    /// `stop` was called while running
    Cancelled,
}

impl SessionPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionPhase::Completed | SessionPhase::Cancelled)
    }
}

/// Kind of network test a probe performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeKind {
    Ping,
    TraceRoute,
    Socket,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Ping => "ping",
            ProbeKind::TraceRoute => "traceroute",
            ProbeKind::Socket => "socket",
        }
    }
}
