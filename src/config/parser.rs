//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        self.load_env_file()?;

        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config);

        config.validate()?;

        Ok(config)
    }

    /// Load .env file if it exists
    fn load_env_file(&self) -> Result<()> {
        EnvManager::load_env_file(self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        if !self.cli.domains.is_empty() {
            config.domains = self.cli.domains.clone();
        }

        if let Some(app_name) = &self.cli.app_name {
            config.app_name = app_name.clone();
        }

        if let Some(app_version) = &self.cli.app_version {
            config.app_version = app_version.clone();
        }

        if let Some(user_id) = &self.cli.user_id {
            config.user_id = user_id.clone();
        }

        if let Some(engine) = self.cli.engine {
            config.trace_engine = engine;
        }

        if let Some(count) = self.cli.count {
            config.ping_count = count;
        }

        if let Some(max_hops) = self.cli.max_hops {
            config.max_hops = max_hops;
        }

        if let Some(timeout) = self.cli.timeout {
            config.probe_timeout_seconds = timeout;
        }

        if self.cli.socket_probe {
            config.enable_socket_probe = true;
        }

        if let Some(operator_url) = &self.cli.operator_url {
            config.operator_url = Some(operator_url.clone());
        }

        if self.cli.no_color {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!("Final config: engine={}, ping_count={}, max_hops={}, timeout={}s",
                    config.trace_engine, config.ping_count, config.max_hops, config.probe_timeout_seconds);
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    let parser = ConfigParser::new(cli);
    parser.parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Domains: {}", config.domains.join(", ")));
    summary.push(format!("App: {} {}", config.app_name, config.app_version));
    summary.push(format!("User ID: {}", config.user_id));
    summary.push(format!("Trace Engine: {}", config.trace_engine));
    summary.push(format!("Ping Count: {}", config.ping_count));
    summary.push(format!("Max Hops: {}", config.max_hops));
    summary.push(format!("Timeout: {}s", config.probe_timeout_seconds));
    summary.push(format!("Socket Probe: {}", config.enable_socket_probe));
    summary.push(format!("Operator URL: {}", config.operator_url.as_deref().unwrap_or("(none)")));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
