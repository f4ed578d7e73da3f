//! Latency probe backed by the platform `ping` command

use crate::{
    probes::{command, Probe, ProbeSink},
    types::ProbeKind,
};
use std::process::Command;
use std::time::Duration;

/// Runs the system `ping` and streams its output line by line
pub struct SystemPinger {
    count: u32,
    timeout: Duration,
}

impl SystemPinger {
    pub fn new(count: u32, timeout: Duration) -> Self {
        Self { count, timeout }
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Probe for SystemPinger {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Ping
    }

    fn run(&self, domain: &str, sink: &ProbeSink) {
        sink.started(domain);

        let mut cmd = Command::new("ping");
        cmd.args(ping_args(domain, self.count, self.timeout, None));

        let outcome = command::stream_lines(cmd, sink, |line| {
            if !line.trim().is_empty() {
                sink.line(line);
            }
            true
        });

        match outcome {
            Ok(outcome) if outcome.abandoned => {}
            Ok(outcome) if outcome.succeeded() => {
                sink.finished("");
            }
            Ok(outcome) => {
                let reason = if outcome.stderr.is_empty() {
                    match outcome.status.code() {
                        Some(code) => format!("exit status {}", code),
                        None => "terminated".to_string(),
                    }
                } else {
                    outcome.stderr
                };
                sink.finished(format!("Ping {} failed: {}", domain, reason));
            }
            Err(e) => {
                sink.finished(format!("Ping {} failed: {}", domain, e));
            }
        }
    }
}

/// Platform `ping` arguments; `ttl` limits the hop count for route emulation
pub(crate) fn ping_args(domain: &str, count: u32, timeout: Duration, ttl: Option<u32>) -> Vec<String> {
    let mut args = Vec::new();

    if cfg!(target_os = "windows") {
        args.push("-n".to_string());
        args.push(count.to_string());
        args.push("-w".to_string());
        args.push(timeout.as_millis().to_string());
        if let Some(ttl) = ttl {
            args.push("-i".to_string());
            args.push(ttl.to_string());
        }
    } else if cfg!(target_os = "macos") {
        args.push("-n".to_string());
        args.push("-c".to_string());
        args.push(count.to_string());
        args.push("-W".to_string());
        args.push(timeout.as_millis().to_string());
        if let Some(ttl) = ttl {
            args.push("-m".to_string());
            args.push(ttl.to_string());
        }
    } else {
        args.push("-n".to_string());
        args.push("-c".to_string());
        args.push(count.to_string());
        args.push("-W".to_string());
        args.push(timeout.as_secs().max(1).to_string());
        if let Some(ttl) = ttl {
            args.push("-t".to_string());
            args.push(ttl.to_string());
        }
    }

    args.push(domain.to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_args_end_with_domain() {
        let args = ping_args("a.example.com", 4, Duration::from_secs(2), None);
        assert_eq!(args.last().map(String::as_str), Some("a.example.com"));
        assert!(args.contains(&"4".to_string()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_linux_ping_args() {
        let args = ping_args("a.example.com", 3, Duration::from_secs(2), Some(7));
        assert_eq!(args, vec!["-n", "-c", "3", "-W", "2", "-t", "7", "a.example.com"]);
    }

    #[test]
    fn test_pinger_kind_and_count() {
        let pinger = SystemPinger::new(1, Duration::from_secs(1));
        assert_eq!(pinger.kind(), ProbeKind::Ping);
        assert_eq!(pinger.count(), 1);
    }
}
