//! Diagnosis orchestration: session state machine and the per-domain loop
//!
//! `DiagnosisOrchestrator::start` validates the request and hands the whole
//! run to a freshly spawned [`BoundedWorker`]. On that worker the session
//! records its preamble and one environment block, then walks the domain
//! list, driving ping, traceroute and (optionally) the TCP probe in order.
//! Every recorded fragment is mirrored to the request's listener as it is
//! produced.
//!
//! `stop` cancels cooperatively: the loop checks the cancellation token at the
//! top of every domain and between probe stages. A cancelled session never
//! calls `on_finished`; progress already delivered stays delivered.

use crate::{
    environment::{EnvironmentInspector, EnvironmentSnapshot, SystemEnvironment},
    error::{AppError, Result},
    executor::{BoundedWorker, WorkerStatistics},
    logging::DiagnosisLogger,
    models::Config,
    probes::{normalize_trace_line, Probe, ProbeCollaborators, ProbeEvent, ProbeRecorder, ProbeSink},
    transcript::{DiagnosisListener, LogAccumulator, ProgressChannel},
    types::{ProbeKind, SessionPhase, TraceEngine},
};
use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Marker appended when the domain loop runs to its natural end
pub const END_MARKER: &str = "\nEnd of network diagnosis\n";
/// Recorded once per domain when the host is offline
pub const NOT_CONNECTED_LINE: &str =
    "\n\nThe current host is not connected to the Internet, please check the network!";

/// Everything one diagnosis attempt needs from its caller
#[derive(Clone)]
pub struct DiagnosisRequest {
    pub app_name: String,
    pub app_version: String,
    pub user_id: String,
    pub domains: Vec<String>,
    pub listener: Arc<dyn DiagnosisListener>,
}

impl DiagnosisRequest {
    pub fn new(
        app_name: impl Into<String>,
        app_version: impl Into<String>,
        user_id: impl Into<String>,
        domains: Vec<String>,
        listener: Arc<dyn DiagnosisListener>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            app_version: app_version.into(),
            user_id: user_id.into(),
            domains,
            listener,
        }
    }

    pub fn from_config(config: &Config, listener: Arc<dyn DiagnosisListener>) -> Self {
        Self::new(
            config.app_name.clone(),
            config.app_version.clone(),
            config.user_id.clone(),
            config.domains.clone(),
            listener,
        )
    }
}

impl fmt::Debug for DiagnosisRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosisRequest")
            .field("app_name", &self.app_name)
            .field("app_version", &self.app_version)
            .field("user_id", &self.user_id)
            .field("domains", &self.domains)
            .finish_non_exhaustive()
    }
}

/// Construction-time switches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosisOptions {
    /// Selects how traceroute output is normalized
    pub trace_engine: TraceEngine,
    /// Run the TCP connect probe after traceroute
    pub enable_socket_probe: bool,
}

impl DiagnosisOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            trace_engine: config.trace_engine,
            enable_socket_probe: config.enable_socket_probe,
        }
    }
}

/// Mutable state of the current (or last) session
struct SessionState {
    session_id: String,
    phase: SessionPhase,
    log: Arc<LogAccumulator>,
    cancel: CancellationToken,
    worker: Option<Arc<BoundedWorker>>,
    run: Option<Arc<RunContext>>,
    network_connected: bool,
    gateway: Option<String>,
}

impl SessionState {
    fn idle() -> Self {
        Self {
            session_id: String::new(),
            phase: SessionPhase::Idle,
            log: Arc::new(LogAccumulator::detached()),
            cancel: CancellationToken::new(),
            worker: None,
            run: None,
            network_connected: false,
            gateway: None,
        }
    }

    /// Release probe handles and stop accepting work
    fn cleanup(&mut self) {
        if let Some(run) = self.run.take() {
            run.release_probes();
        }
        if let Some(worker) = &self.worker {
            worker.shutdown();
        }
    }
}

/// Drives serialized, cancellable diagnosis sessions
pub struct DiagnosisOrchestrator {
    probes: ProbeCollaborators,
    inspector: Arc<dyn EnvironmentInspector>,
    options: DiagnosisOptions,
    session: Arc<Mutex<SessionState>>,
    logger: DiagnosisLogger,
}

impl DiagnosisOrchestrator {
    pub fn new(
        probes: ProbeCollaborators,
        inspector: Arc<dyn EnvironmentInspector>,
        options: DiagnosisOptions,
    ) -> Self {
        Self {
            probes,
            inspector,
            options,
            session: Arc::new(Mutex::new(SessionState::idle())),
            logger: DiagnosisLogger::new(&Config::default()),
        }
    }

    /// System probes and environment, configured from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            ProbeCollaborators::system(config),
            Arc::new(SystemEnvironment::new()),
            DiagnosisOptions::from_config(config),
        )
        .with_logger(DiagnosisLogger::new(config))
    }

    pub fn with_logger(mut self, logger: DiagnosisLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn options(&self) -> &DiagnosisOptions {
        &self.options
    }

    /// Begin a diagnosis in the background.
    ///
    /// Fails with `InvalidRequest` for an empty domain list and with
    /// `WorkerUnavailable` while another session is running on this
    /// orchestrator. Nothing is reported to the listener on failure.
    pub fn start(&self, request: DiagnosisRequest) -> Result<()> {
        if request.domains.is_empty() {
            let err = AppError::invalid_request("Domain list is empty");
            self.logger.log_start_rejected(&err);
            return Err(err);
        }

        let mut state = lock(&self.session);
        if state.phase == SessionPhase::Running {
            let err = AppError::worker_unavailable("A diagnosis is already running");
            self.logger.log_start_rejected(&err);
            return Err(err);
        }

        let worker = Arc::new(BoundedWorker::spawn(self.logger.logger().clone())?);
        let session_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let log = Arc::new(LogAccumulator::new(ProgressChannel::new(
            Arc::clone(&request.listener),
            cancel.clone(),
        )));

        let run = Arc::new(RunContext {
            session_id: session_id.clone(),
            request,
            log: Arc::clone(&log),
            cancel: cancel.clone(),
            probes: Mutex::new(Some(self.probes.clone())),
            options: self.options.clone(),
            logger: self.logger.clone(),
        });

        let job_run = Arc::clone(&run);
        let job_inspector = Arc::clone(&self.inspector);
        let job_session = Arc::clone(&self.session);
        if let Err(err) = worker.submit(move || execute(job_run, job_inspector, job_session)) {
            worker.shutdown();
            self.logger.log_start_rejected(&err);
            return Err(err);
        }

        *state = SessionState {
            session_id: session_id.clone(),
            phase: SessionPhase::Running,
            log,
            cancel,
            worker: Some(worker),
            run: Some(run),
            network_connected: false,
            gateway: None,
        };
        self.logger.log_phase(&session_id, SessionPhase::Running);

        Ok(())
    }

    /// Cancel the running session and return the transcript so far.
    ///
    /// Outside a running session this only returns the last transcript. A
    /// cancelled session never calls `on_finished`.
    pub fn stop(&self) -> String {
        let mut state = lock(&self.session);
        if state.phase != SessionPhase::Running {
            return state.log.snapshot();
        }

        state.phase = SessionPhase::Cancelled;
        state.cancel.cancel();
        state.cleanup();
        self.logger.log_phase(&state.session_id, SessionPhase::Cancelled);

        state.log.snapshot()
    }

    /// Block until the current session's worker thread has exited
    pub fn join(&self) {
        let worker = lock(&self.session).worker.clone();
        if let Some(worker) = worker {
            worker.join();
        }
    }

    /// Activity of the current session's worker
    pub fn worker_statistics(&self) -> Option<WorkerStatistics> {
        lock(&self.session).worker.as_ref().map(|worker| worker.statistics())
    }

    pub fn phase(&self) -> SessionPhase {
        lock(&self.session).phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == SessionPhase::Running
    }

    /// Transcript of the current or last session
    pub fn log(&self) -> String {
        lock(&self.session).log.snapshot()
    }

    pub fn session_id(&self) -> Option<String> {
        let state = lock(&self.session);
        if state.session_id.is_empty() {
            None
        } else {
            Some(state.session_id.clone())
        }
    }

    pub fn is_network_connected(&self) -> bool {
        lock(&self.session).network_connected
    }

    pub fn gateway(&self) -> Option<String> {
        lock(&self.session).gateway.clone()
    }
}

impl Drop for DiagnosisOrchestrator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Per-session run state shared with the worker and probe sinks
struct RunContext {
    session_id: String,
    request: DiagnosisRequest,
    log: Arc<LogAccumulator>,
    cancel: CancellationToken,
    probes: Mutex<Option<ProbeCollaborators>>,
    options: DiagnosisOptions,
    logger: DiagnosisLogger,
}

impl RunContext {
    fn record_preamble(&self, device_info: &str) {
        self.log.record_step(&format!("App Name:\t{}", self.request.app_name));
        self.log.record_step(&format!("App Version:\t{}", self.request.app_version));
        self.log.record_step(&format!("UserId:\t{}", self.request.user_id));
        self.log.record_step(&format!("DeviceInfo:\t{}", device_info));
    }

    fn release_probes(&self) {
        lock(&self.probes).take();
    }

    fn probe_handle(&self, kind: ProbeKind) -> Option<Arc<dyn Probe>> {
        let probes = lock(&self.probes);
        let probes = probes.as_ref()?;
        match kind {
            ProbeKind::Ping => Some(Arc::clone(&probes.pinger)),
            ProbeKind::TraceRoute => Some(Arc::clone(&probes.trace_router)),
            ProbeKind::Socket => probes.socket_probe.clone(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run one probe to completion; false when the session went away meanwhile
    fn run_probe(self: &Arc<Self>, kind: ProbeKind, domain: &str) -> bool {
        let probe = match self.probe_handle(kind) {
            Some(probe) => probe,
            None => return false,
        };

        let recorder: Arc<dyn ProbeRecorder> = self.clone();
        let sink = ProbeSink::new(kind, Arc::downgrade(&recorder), self.cancel.clone());
        drop(recorder);

        let started = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| probe.run(domain, &sink)));
        if outcome.is_err() {
            self.logger.log_probe_panicked(&self.session_id, kind, domain);
            self.record(kind, ProbeEvent::Finished(failure_text(kind, domain, "panicked")));
        }
        self.logger.log_probe_finished(&self.session_id, kind, domain, started.elapsed().as_millis());

        !self.is_cancelled()
    }

    fn socket_probe_enabled(&self) -> bool {
        self.options.enable_socket_probe && self.probe_handle(ProbeKind::Socket).is_some()
    }
}

impl ProbeRecorder for RunContext {
    fn record(&self, kind: ProbeKind, event: ProbeEvent) {
        if self.is_cancelled() {
            self.logger.log_late_event(kind);
            return;
        }

        match (kind, event) {
            (_, ProbeEvent::Started { domain, .. }) => {
                self.logger.log_probe_started(&self.session_id, kind, &domain);
            }
            (ProbeKind::Ping, ProbeEvent::Line(line)) => self.log.record_step(&line),
            (ProbeKind::Ping, ProbeEvent::Finished(text)) => {
                if !text.is_empty() {
                    self.log.record_step(&text);
                }
            }
            (ProbeKind::TraceRoute, ProbeEvent::Line(line)) => {
                self.log.append(&normalize_trace_line(self.options.trace_engine, &line));
            }
            (ProbeKind::TraceRoute, ProbeEvent::Finished(text)) => {
                if !text.is_empty() {
                    self.log.append(&normalize_trace_line(self.options.trace_engine, &text));
                }
            }
            (ProbeKind::Socket, ProbeEvent::Line(text))
            | (ProbeKind::Socket, ProbeEvent::Finished(text)) => self.log.append(&text),
        }
    }
}

/// Worker-side body of one session
fn execute(run: Arc<RunContext>, inspector: Arc<dyn EnvironmentInspector>, session: Arc<Mutex<SessionState>>) {
    match panic::catch_unwind(AssertUnwindSafe(|| drive(&run, inspector.as_ref(), &session))) {
        Ok(true) => complete(&run, &session),
        Ok(false) => {}
        Err(_) => abort(&run, &session),
    }
}

/// Preamble, environment block and the domain loop; true when the loop ran to its end
fn drive(run: &Arc<RunContext>, inspector: &dyn EnvironmentInspector, session: &Mutex<SessionState>) -> bool {
    if run.is_cancelled() {
        return false;
    }

    run.record_preamble(&inspector.device_info());

    let environment = EnvironmentSnapshot::collect(inspector);
    for line in environment.lines() {
        run.log.record_step(&line);
    }
    run.logger.log_environment(&run.session_id, environment.connected, environment.link_type.as_str());
    {
        let mut state = lock(session);
        if state.session_id == run.session_id {
            state.network_connected = environment.connected;
            state.gateway = environment.gateway.clone();
        }
    }

    for domain in &run.request.domains {
        if run.is_cancelled() {
            return false;
        }

        let domain = domain.trim();
        if domain.is_empty() {
            continue;
        }

        if !environment.connected {
            run.log.record_step(NOT_CONNECTED_LINE);
            continue;
        }

        run.log.record_step(&format!("\nDiagnostic Domain Name {}...", domain));
        run.log.record_step("\nStart Ping...");
        if !run.run_probe(ProbeKind::Ping, domain) {
            return false;
        }

        run.log.record_step("\nStart Traceroute...");
        if !run.run_probe(ProbeKind::TraceRoute, domain) {
            return false;
        }

        if run.socket_probe_enabled() && !run.run_probe(ProbeKind::Socket, domain) {
            return false;
        }
    }

    true
}

/// Natural end of the loop; loses silently to a concurrent `stop`
fn complete(run: &Arc<RunContext>, session: &Arc<Mutex<SessionState>>) {
    {
        let mut state = lock(session);
        if state.session_id != run.session_id || state.phase != SessionPhase::Running {
            return;
        }
        state.phase = SessionPhase::Completed;
        state.cleanup();
    }

    // listener callbacks run outside the session lock so they may call back in
    run.log.record_step(END_MARKER);
    run.log.finish();
    run.logger.log_phase(&run.session_id, SessionPhase::Completed);
}

/// The session body panicked outside any probe; end it as cancelled
fn abort(run: &Arc<RunContext>, session: &Arc<Mutex<SessionState>>) {
    {
        let mut state = lock(session);
        if state.session_id != run.session_id || state.phase != SessionPhase::Running {
            return;
        }
        state.phase = SessionPhase::Cancelled;
        state.cancel.cancel();
        state.cleanup();
    }

    run.logger.log_session_aborted(&run.session_id);
    run.logger.log_phase(&run.session_id, SessionPhase::Cancelled);
}

/// Transcript text for a probe that could not produce a result
fn failure_text(kind: ProbeKind, domain: &str, reason: &str) -> String {
    match kind {
        ProbeKind::Ping => format!("Ping {} failed: {}", domain, reason),
        ProbeKind::TraceRoute => format!("Traceroute {} failed: {}", domain, reason),
        ProbeKind::Socket => format!("TCP connect to {} failed: {}\n", domain, reason),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::CollectingListener;
    use crate::types::LinkType;

    struct SilentProbe(ProbeKind);

    impl Probe for SilentProbe {
        fn kind(&self) -> ProbeKind {
            self.0
        }
        fn run(&self, domain: &str, sink: &ProbeSink) {
            sink.started(domain);
            sink.finished("");
        }
    }

    struct Offline;

    impl EnvironmentInspector for Offline {
        fn is_connected(&self) -> bool {
            false
        }
        fn link_type(&self) -> LinkType {
            LinkType::Unknown
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
            "test:device:host".to_string()
        }
    }

    fn orchestrator() -> DiagnosisOrchestrator {
        DiagnosisOrchestrator::new(
            ProbeCollaborators::new(
                Arc::new(SilentProbe(ProbeKind::Ping)),
                Arc::new(SilentProbe(ProbeKind::TraceRoute)),
            ),
            Arc::new(Offline),
            DiagnosisOptions::default(),
        )
    }

    fn request(domains: &[&str], listener: Arc<CollectingListener>) -> DiagnosisRequest {
        DiagnosisRequest::new("app", "1.0", "uid", domains.iter().map(|d| d.to_string()).collect(), listener)
    }

    #[test]
    fn test_empty_domains_rejected() {
        let orchestrator = orchestrator();
        let listener = Arc::new(CollectingListener::new());

        let err = orchestrator.start(request(&[], listener.clone())).unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert_eq!(orchestrator.phase(), SessionPhase::Idle);
        assert!(orchestrator.session_id().is_none());
        assert!(listener.progress().is_empty());
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let orchestrator = orchestrator();
        assert_eq!(orchestrator.stop(), "");
        assert_eq!(orchestrator.phase(), SessionPhase::Idle);
    }

    #[test]
    fn test_completed_session_reports_state() {
        let orchestrator = orchestrator();
        let listener = Arc::new(CollectingListener::new());

        orchestrator.start(request(&["a.example.com", " "], listener.clone())).unwrap();
        orchestrator.join();

        assert_eq!(orchestrator.phase(), SessionPhase::Completed);
        let stats = orchestrator.worker_statistics().unwrap();
        assert_eq!((stats.submitted, stats.completed), (1, 1));
        assert!(!orchestrator.is_network_connected());
        assert_eq!(orchestrator.gateway(), None);
        assert_eq!(listener.finished().len(), 1);
        // the blank entry is skipped
        assert_eq!(orchestrator.log().matches("not connected to the Internet").count(), 1);
        assert!(orchestrator.log().ends_with(&format!("{}\n", END_MARKER)));
    }

    #[test]
    fn test_orchestrator_is_reusable_after_completion() {
        let orchestrator = orchestrator();
        let first = Arc::new(CollectingListener::new());
        orchestrator.start(request(&["a.example.com"], first.clone())).unwrap();
        orchestrator.join();
        let first_id = orchestrator.session_id();

        let second = Arc::new(CollectingListener::new());
        orchestrator.start(request(&["b.example.com"], second.clone())).unwrap();
        orchestrator.join();

        assert_ne!(orchestrator.session_id(), first_id);
        assert_eq!(first.finished().len(), 1);
        assert_eq!(second.finished().len(), 1);
        assert!(!second.finished()[0].contains("a.example.com"));
    }
}
