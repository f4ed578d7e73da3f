//! Main application orchestration and execution

use crate::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config},
    diagnostics::{DiagnosisOrchestrator, DiagnosisRequest},
    error::{AppError, Result},
    logging::LoggerFactory,
    operator::{HttpOperatorLookup, OperatorLookup},
    output::{format_operator, format_session_summary, ConsoleListener},
    PKG_NAME, VERSION,
};
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::validation)?;
        Ok(Self { cli })
    }

    /// Run one diagnosis session to completion or until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let config = load_config(self.cli.clone())?;
        let use_color = config.enable_color;
        colored::control::set_override(use_color);

        let factory = LoggerFactory::new(config.clone());
        let error_logger = factory.create_error_logger();

        if config.debug {
            eprintln!("{} v{} ({})", PKG_NAME, VERSION, option_env!("GIT_COMMIT").unwrap_or("unknown"));
            eprintln!("{}", display_config_summary(&config));
        }

        let warnings = validate_config(&config)?;
        if !warnings.is_empty() {
            eprintln!("Configuration Warnings:");
            for warning in &warnings {
                eprintln!("  {}", warning.format(use_color));
            }
        }

        if let Some(url) = &config.operator_url {
            let lookup = HttpOperatorLookup::new(url.clone(), factory.create_logger("operator"));
            if let Some(operator) = lookup.lookup().await {
                println!("{}", format_operator(&operator, use_color));
            }
        }

        let orchestrator = Arc::new(
            DiagnosisOrchestrator::from_config(&config).with_logger(factory.create_diagnosis_logger()),
        );
        let (listener, done) = ConsoleListener::new(use_color);
        let request = DiagnosisRequest::from_config(&config, Arc::new(listener));

        if let Err(e) = orchestrator.start(request) {
            error_logger.log_error(&e, Some("start"), Some(factory.session_id()));
            return Err(e);
        }

        tokio::select! {
            report = done => {
                let full_log = report
                    .map_err(|_| AppError::internal("Diagnosis ended without a final report"))?;
                eprintln!("{}", format_session_summary(full_log.len(), true, use_color));

                let worker_owner = Arc::clone(&orchestrator);
                tokio::task::spawn_blocking(move || worker_owner.join())
                    .await
                    .map_err(|e| AppError::internal(format!("Worker join failed: {}", e)))?;
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                // probes still winding down are abandoned with the process
                let partial = orchestrator.stop();
                eprintln!();
                eprintln!("{}", format_session_summary(partial.len(), false, use_color));
            }
        }

        Ok(())
    }
}
