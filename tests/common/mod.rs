//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use net_diagnosis::{
    environment::EnvironmentInspector,
    probes::{Probe, ProbeSink},
    types::{LinkType, ProbeKind},
};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Mutex,
};
use std::thread;
use std::time::{Duration, Instant};

/// Probe that replays fixed output and counts its invocations
pub struct ScriptedProbe {
    kind: ProbeKind,
    lines: Vec<String>,
    finished: String,
    calls: AtomicUsize,
    domains: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new(kind: ProbeKind, lines: &[&str], finished: &str) -> Self {
        Self {
            kind,
            lines: lines.iter().map(|l| l.to_string()).collect(),
            finished: finished.to_string(),
            calls: AtomicUsize::new(0),
            domains: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn domains(&self) -> Vec<String> {
        self.domains.lock().unwrap().clone()
    }
}

impl Probe for ScriptedProbe {
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    fn run(&self, domain: &str, sink: &ProbeSink) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.domains.lock().unwrap().push(domain.to_string());
        sink.started(domain);
        for line in &self.lines {
            sink.line(line.clone());
        }
        sink.finished(self.finished.clone());
    }
}

/// Probe that blocks after its first line until the session is cancelled
pub struct GatedProbe {
    entered: Mutex<Option<mpsc::Sender<()>>>,
}

impl GatedProbe {
    pub fn new() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel();
        (Self { entered: Mutex::new(Some(tx)) }, rx)
    }
}

impl Probe for GatedProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Ping
    }

    fn run(&self, domain: &str, sink: &ProbeSink) {
        sink.started(domain);
        sink.line("first reply");
        if let Some(tx) = self.entered.lock().unwrap().take() {
            let _ = tx.send(());
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        while !sink.is_cancelled() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        sink.line("late reply");
        sink.finished("");
    }
}

/// Probe that reports a first line and then panics
pub struct PanickingProbe {
    kind: ProbeKind,
    calls: AtomicUsize,
}

impl PanickingProbe {
    pub fn new(kind: ProbeKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Probe for PanickingProbe {
    fn kind(&self) -> ProbeKind {
        self.kind
    }

    fn run(&self, domain: &str, sink: &ProbeSink) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sink.started(domain);
        sink.line("partial reply");
        panic!("{} exploded on {}", self.kind.as_str(), domain);
    }
}

/// Inspector returning fixed answers
pub struct FakeInspector {
    pub connected: bool,
    pub link_type: LinkType,
    pub local_address: String,
    pub gateway: Option<String>,
    pub dns: (String, String),
    pub device_info: String,
}

impl FakeInspector {
    pub fn connected_wifi() -> Self {
        Self {
            connected: true,
            link_type: LinkType::Wifi,
            local_address: "10.0.0.5".to_string(),
            gateway: Some("10.0.0.1".to_string()),
            dns: ("8.8.8.8".to_string(), "8.8.4.4".to_string()),
            device_info: "linux:x86_64:test-host".to_string(),
        }
    }

    pub fn offline() -> Self {
        Self {
            connected: false,
            link_type: LinkType::Unknown,
            local_address: String::new(),
            gateway: None,
            dns: (String::new(), String::new()),
            device_info: "linux:x86_64:test-host".to_string(),
        }
    }
}

impl EnvironmentInspector for FakeInspector {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn link_type(&self) -> LinkType {
        self.link_type
    }

    fn local_address(&self, _link_type: LinkType) -> String {
        self.local_address.clone()
    }

    fn gateway(&self) -> Option<String> {
        self.gateway.clone()
    }

    fn dns_resolvers(&self) -> (String, String) {
        self.dns.clone()
    }

    fn device_info(&self) -> String {
        self.device_info.clone()
    }
}

/// Inspector whose device query panics
pub struct PanickingInspector;

impl EnvironmentInspector for PanickingInspector {
    fn is_connected(&self) -> bool {
        true
    }

    fn link_type(&self) -> LinkType {
        LinkType::Wifi
    }

    fn local_address(&self, _link_type: LinkType) -> String {
        String::new()
    }

    fn gateway(&self) -> Option<String> {
        None
    }

    fn dns_resolvers(&self) -> (String, String) {
        (String::new(), String::new())
    }

    fn device_info(&self) -> String {
        panic!("device query failed")
    }
}
