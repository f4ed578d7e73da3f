//! Route probe: platform traceroute or TTL-limited ping emulation

use crate::{
    probes::{command, ping::ping_args, Probe, ProbeSink},
    types::{ProbeKind, TraceEngine},
};
use regex::Regex;
use std::net::{IpAddr, ToSocketAddrs};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;

/// Hop-by-hop route probe
pub struct SystemTraceRouter {
    engine: TraceEngine,
    max_hops: u32,
    timeout: Duration,
}

impl SystemTraceRouter {
    pub fn new(engine: TraceEngine, max_hops: u32, timeout: Duration) -> Self {
        Self { engine, max_hops, timeout }
    }

    pub fn engine(&self) -> TraceEngine {
        self.engine
    }

    fn run_native(&self, domain: &str, sink: &ProbeSink) -> Option<String> {
        let mut cmd = if cfg!(target_os = "windows") {
            let mut cmd = Command::new("tracert");
            cmd.arg("-d")
                .arg("-h").arg(self.max_hops.to_string())
                .arg("-w").arg(self.timeout.as_millis().to_string());
            cmd
        } else {
            let mut cmd = Command::new("traceroute");
            cmd.arg("-n")
                .arg("-m").arg(self.max_hops.to_string())
                .arg("-w").arg(self.timeout.as_secs().max(1).to_string())
                .arg("-q").arg("3");
            cmd
        };
        cmd.arg(domain);

        let outcome = command::stream_lines(cmd, sink, |line| {
            if line.trim().is_empty() {
                return true;
            }
            let hop = collapse_timeouts(line);
            // hop lines are completed downstream; anything else arrives terminated
            if hop.contains("ms") || hop.contains("***") {
                sink.line(hop);
            } else {
                sink.line(format!("{}\n", hop));
            }
            true
        });

        match outcome {
            Ok(outcome) if outcome.abandoned || outcome.succeeded() => None,
            Ok(outcome) if !outcome.stderr.is_empty() => {
                Some(format!("Traceroute {} failed: {}", domain, outcome.stderr))
            }
            Ok(_) => Some(format!("Traceroute {} failed", domain)),
            Err(e) => Some(format!("Traceroute {} failed: {}", domain, e)),
        }
    }

    fn run_ping_emulation(&self, domain: &str, sink: &ProbeSink) -> Option<String> {
        let destination = resolve_first(domain);

        for ttl in 1..=self.max_hops {
            if sink.is_cancelled() {
                return None;
            }

            let mut cmd = Command::new("ping");
            cmd.args(ping_args(domain, 1, self.timeout, Some(ttl)));

            let lines = match command::capture(cmd, sink) {
                Ok((outcome, _)) if outcome.abandoned => return None,
                Ok((_, lines)) => lines,
                Err(e) => return Some(format!("Traceroute {} failed: {}", domain, e)),
            };

            let hop = parse_hop(&lines);
            sink.line(format_hop(ttl, &hop));

            let reached = hop.echo_reply
                || matches!((hop.address, destination), (Some(hop_ip), Some(dest)) if hop_ip == dest);
            if reached {
                return None;
            }
        }

        None
    }
}

impl Probe for SystemTraceRouter {
    fn kind(&self) -> ProbeKind {
        ProbeKind::TraceRoute
    }

    fn run(&self, domain: &str, sink: &ProbeSink) {
        sink.started(domain);

        let failure = match self.engine {
            TraceEngine::Native => self.run_native(domain, sink),
            TraceEngine::Ping => self.run_ping_emulation(domain, sink),
        };

        if !sink.is_cancelled() {
            sink.finished(failure.unwrap_or_default());
        }
    }
}

/// What one TTL-limited ping revealed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HopReply {
    pub address: Option<IpAddr>,
    pub rtt_ms: Option<f64>,
    /// The destination itself answered
    pub echo_reply: bool,
}

fn hop_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)from\s+([0-9a-f]{1,4}(?:[:.][0-9a-f]{0,4}){1,7})").ok())
        .as_ref()
}

fn rtt_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)time[=<]\s*([0-9]+(?:\.[0-9]+)?)\s*ms").ok())
        .as_ref()
}

fn ttl_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bttl=\d+").ok()).as_ref()
}

/// Extract the replying hop from the output of a single TTL-limited ping
pub fn parse_hop(lines: &[String]) -> HopReply {
    let mut reply = HopReply::default();
    let (Some(hop_re), Some(rtt_re), Some(ttl_re)) = (hop_regex(), rtt_regex(), ttl_regex()) else {
        return reply;
    };

    for line in lines {
        let Some(caps) = hop_re.captures(line) else {
            continue;
        };
        let candidate = caps[1].trim_end_matches(|c| c == ':' || c == '.');
        if let Ok(ip) = candidate.parse::<IpAddr>() {
            reply.address = Some(ip);
            reply.echo_reply = ttl_re.is_match(line);
            reply.rtt_ms = rtt_re
                .captures(line)
                .and_then(|c| c[1].parse::<f64>().ok());
            break;
        }
    }

    reply
}

/// One full line per hop: `ttl\taddress\trtt ms`, or `ttl\t***` on silence
pub fn format_hop(ttl: u32, hop: &HopReply) -> String {
    match (hop.address, hop.rtt_ms) {
        (Some(ip), Some(rtt)) => format!("{}\t{}\t{:.3} ms", ttl, ip, rtt),
        (Some(ip), None) => format!("{}\t{}", ttl, ip),
        (None, _) => format!("{}\t***", ttl),
    }
}

/// Rewrite runs of `*` probe timeouts as the `***` marker
pub fn collapse_timeouts(line: &str) -> String {
    let trimmed = line.trim_end();
    let stars = trimmed.split_whitespace().filter(|t| *t == "*").count();
    if stars == 0 {
        return trimmed.to_string();
    }

    let kept: Vec<&str> = trimmed.split_whitespace().filter(|t| *t != "*").collect();
    if kept.len() <= 1 {
        // nothing but the hop number: the whole hop timed out
        format!("{}  ***", kept.first().copied().unwrap_or(""))
            .trim_start()
            .to_string()
    } else {
        trimmed.to_string()
    }
}

fn resolve_first(domain: &str) -> Option<IpAddr> {
    if let Ok(ip) = domain.parse::<IpAddr>() {
        return Some(ip);
    }
    (domain, 0)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_linux_time_exceeded() {
        let hop = parse_hop(&lines(&[
            "PING a.example.com (93.184.216.34) 56(84) bytes of data.",
            "From 10.0.0.1 icmp_seq=1 Time to live exceeded",
        ]));
        assert_eq!(hop.address, Some("10.0.0.1".parse().unwrap()));
        assert!(!hop.echo_reply);
        assert_eq!(hop.rtt_ms, None);
    }

    #[test]
    fn test_parse_echo_reply() {
        let hop = parse_hop(&lines(&[
            "64 bytes from 93.184.216.34: icmp_seq=1 ttl=56 time=10.4 ms",
        ]));
        assert_eq!(hop.address, Some("93.184.216.34".parse().unwrap()));
        assert!(hop.echo_reply);
        assert_eq!(hop.rtt_ms, Some(10.4));
    }

    #[test]
    fn test_parse_windows_reply() {
        let hop = parse_hop(&lines(&["Reply from 192.168.1.1: TTL expired in transit."]));
        assert_eq!(hop.address, Some("192.168.1.1".parse().unwrap()));
        assert!(!hop.echo_reply);
    }

    #[test]
    fn test_parse_silence() {
        let hop = parse_hop(&lines(&["PING a.example.com (93.184.216.34)", "--- statistics ---"]));
        assert_eq!(hop, HopReply::default());
    }

    #[test]
    fn test_format_hop() {
        let hop = HopReply {
            address: Some("10.0.0.1".parse().unwrap()),
            rtt_ms: Some(1.5),
            echo_reply: false,
        };
        assert_eq!(format_hop(1, &hop), "1\t10.0.0.1\t1.500 ms");
        assert_eq!(format_hop(2, &HopReply::default()), "2\t***");
    }

    #[test]
    fn test_collapse_timeouts() {
        assert_eq!(collapse_timeouts(" 5  * * *"), "5  ***");
        assert_eq!(collapse_timeouts(" 1  10.0.0.1  0.512 ms"), " 1  10.0.0.1  0.512 ms");
        assert_eq!(collapse_timeouts(" 3  10.0.0.3  1.0 ms *  2.0 ms"), " 3  10.0.0.3  1.0 ms *  2.0 ms");
    }

    #[test]
    fn test_resolve_ip_literal() {
        assert_eq!(resolve_first("127.0.0.1"), Some("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_router_reports_engine() {
        let router = SystemTraceRouter::new(TraceEngine::Ping, 30, Duration::from_secs(2));
        assert_eq!(router.engine(), TraceEngine::Ping);
        assert_eq!(router.kind(), ProbeKind::TraceRoute);
    }
}
