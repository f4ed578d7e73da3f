//! Console rendering of a diagnosis transcript
//!
//! Fragments are written to stdout exactly as the session produces them;
//! section headers are highlighted when colors are enabled. Nothing is
//! reordered or buffered beyond the stdout lock.

use crate::transcript::DiagnosisListener;
use colored::*;
use std::io::{self, Write};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Section headers recorded by the orchestrator and the TCP probe
const HEADERS: &[&str] = &[
    "Diagnostic Domain Name",
    "Start Ping...",
    "Start Traceroute...",
    "Start TCP connect...",
    "End of network diagnosis",
];

const OFFLINE_MARKER: &str = "not connected to the Internet";

/// Listener that streams progress to the terminal and signals completion
pub struct ConsoleListener {
    use_color: bool,
    done: Mutex<Option<oneshot::Sender<String>>>,
}

impl ConsoleListener {
    /// Listener plus a receiver resolved with the full transcript on completion
    pub fn new(use_color: bool) -> (Self, oneshot::Receiver<String>) {
        let (tx, rx) = oneshot::channel();
        let listener = Self {
            use_color,
            done: Mutex::new(Some(tx)),
        };
        (listener, rx)
    }
}

impl DiagnosisListener for ConsoleListener {
    fn on_progress(&self, line: &str) {
        let mut stdout = io::stdout().lock();
        // a closed stdout must not take the worker down
        let _ = stdout.write_all(highlight(line, self.use_color).as_bytes());
        let _ = stdout.flush();
    }

    fn on_finished(&self, full_log: &str) {
        let sender = self
            .done
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(full_log.to_string());
        }
    }
}

/// Colorize a fragment when it is a section header or a status line
pub fn highlight(fragment: &str, use_color: bool) -> String {
    if !use_color {
        return fragment.to_string();
    }

    let body = fragment.trim();
    if body.is_empty() {
        return fragment.to_string();
    }

    let styled = if HEADERS.iter().any(|h| body.starts_with(h)) {
        body.bold().cyan().to_string()
    } else if body.contains(OFFLINE_MARKER) || body.contains(" failed") {
        body.red().to_string()
    } else if let Some((label, value)) = body.split_once(":\t") {
        format!("{}:\t{}", label.bold(), value)
    } else {
        return fragment.to_string();
    };

    // keep the surrounding line breaks exactly as recorded
    let start = fragment.len() - fragment.trim_start().len();
    let end = fragment.trim_end().len();
    format!("{}{}{}", &fragment[..start], styled, &fragment[end..])
}

/// Closing line printed after a session, to stderr
pub fn format_session_summary(transcript_len: usize, completed: bool, use_color: bool) -> String {
    let text = if completed {
        format!("Diagnosis finished, transcript {} bytes", transcript_len)
    } else {
        format!("Diagnosis stopped, partial transcript {} bytes", transcript_len)
    };

    match (use_color, completed) {
        (true, true) => text.green().to_string(),
        (true, false) => text.yellow().to_string(),
        (false, _) => text,
    }
}

/// Operator description line printed before the session starts
pub fn format_operator(operator: &str, use_color: bool) -> String {
    let label = if use_color {
        "Operator:".bold().to_string()
    } else {
        "Operator:".to_string()
    };
    format!("{}\t{}", label, operator.trim())
}
