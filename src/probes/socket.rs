//! TCP connect probe against port 80 of each resolved address

use crate::{
    probes::{Probe, ProbeSink},
    types::ProbeKind,
};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

const PORT: u16 = 80;
const ATTEMPTS_PER_ADDRESS: usize = 4;
const MAX_ADDRESSES: usize = 4;

/// Timed TCP connects; every emitted fragment carries its own line break
pub struct SystemSocketProbe {
    timeout: Duration,
}

impl SystemSocketProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn probe_address(&self, addr: &SocketAddr, sink: &ProbeSink) -> Vec<Duration> {
        let mut samples = Vec::with_capacity(ATTEMPTS_PER_ADDRESS);
        sink.line(format!("Connect to host {}...\n", addr));

        for attempt in 1..=ATTEMPTS_PER_ADDRESS {
            if sink.is_cancelled() {
                break;
            }
            let started = Instant::now();
            match TcpStream::connect_timeout(addr, self.timeout) {
                Ok(stream) => {
                    let elapsed = started.elapsed();
                    drop(stream);
                    samples.push(elapsed);
                    sink.line(format!("{}'s time={}ms\n", attempt, elapsed.as_millis()));
                }
                Err(e) => {
                    sink.line(format!("{}'s connect failed: {}\n", attempt, e));
                }
            }
        }

        samples
    }
}

impl Probe for SystemSocketProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Socket
    }

    fn run(&self, domain: &str, sink: &ProbeSink) {
        sink.started(domain);
        sink.line("\nStart TCP connect...\n");

        let addrs: Vec<SocketAddr> = match (domain, PORT).to_socket_addrs() {
            Ok(addrs) => addrs.take(MAX_ADDRESSES).collect(),
            Err(e) => {
                sink.finished(format!("DNS resolution of {} failed: {}\n", domain, e));
                return;
            }
        };

        if addrs.is_empty() {
            sink.finished(format!("DNS resolution of {} returned no addresses\n", domain));
            return;
        }

        let mut all = Vec::new();
        for addr in &addrs {
            if sink.is_cancelled() {
                return;
            }
            all.extend(self.probe_address(addr, sink));
        }

        if !sink.is_cancelled() {
            sink.finished(summarize(&all, addrs.len() * ATTEMPTS_PER_ADDRESS));
        }
    }
}

/// Closing line: average over successful connects
pub fn summarize(samples: &[Duration], attempts: usize) -> String {
    if samples.is_empty() {
        return format!("TCP connect failed on all {} attempts\n", attempts);
    }
    let total: u128 = samples.iter().map(|d| d.as_millis()).sum();
    let average = total / samples.len() as u128;
    format!(
        "TCP connect {}/{} succeeded, average={}ms\n",
        samples.len(),
        attempts,
        average
    )
}
