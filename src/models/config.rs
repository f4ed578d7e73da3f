//! Configuration data model and validation

use crate::types::{AppError, Result, TraceEngine};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target domains to diagnose, in order
    #[serde(default)]
    pub domains: Vec<String>,

    /// Application name shown in the transcript preamble
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Application version shown in the transcript preamble
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Opaque user identifier shown in the transcript preamble
    #[serde(default)]
    pub user_id: String,

    /// Traceroute engine selection
    #[serde(default)]
    pub trace_engine: TraceEngine,

    /// Echo requests sent per domain
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Maximum TTL probed by the traceroute engines
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,

    /// Per-reply probe timeout
    #[serde(default = "default_timeout_secs")]
    pub probe_timeout_seconds: u64,

    /// Run the TCP connect probe after traceroute
    #[serde(default)]
    pub enable_socket_probe: bool,

    /// Optional carrier lookup endpoint
    #[serde(default)]
    pub operator_url: Option<String>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            app_name: default_app_name(),
            app_version: default_app_version(),
            user_id: String::new(),
            trace_engine: TraceEngine::default(),
            ping_count: default_ping_count(),
            max_hops: default_max_hops(),
            probe_timeout_seconds: default_timeout_secs(),
            enable_socket_probe: false,
            operator_url: None,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the probe timeout as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        for domain in &self.domains {
            if domain.trim().is_empty() {
                continue;
            }
            validate_domain(domain)?;
        }

        if self.app_name.trim().is_empty() {
            return Err(AppError::config("App name cannot be empty"));
        }

        if self.ping_count == 0 {
            return Err(AppError::config("Ping count must be greater than 0"));
        }

        if self.ping_count > crate::defaults::MAX_PING_COUNT {
            return Err(AppError::config(format!(
                "Ping count cannot exceed {}", crate::defaults::MAX_PING_COUNT
            )));
        }

        if self.max_hops == 0 {
            return Err(AppError::config("Max hops must be greater than 0"));
        }

        if self.max_hops > crate::defaults::MAX_HOPS_LIMIT {
            return Err(AppError::config(format!(
                "Max hops cannot exceed {}", crate::defaults::MAX_HOPS_LIMIT
            )));
        }

        if self.probe_timeout_seconds == 0 {
            return Err(AppError::config("Timeout must be greater than 0"));
        }

        if self.probe_timeout_seconds > 300 {
            return Err(AppError::config("Timeout cannot exceed 300 seconds"));
        }

        if let Some(operator_url) = &self.operator_url {
            match url::Url::parse(operator_url) {
                Ok(parsed) => {
                    if parsed.scheme() != "https" && parsed.scheme() != "http" {
                        return Err(AppError::config(format!(
                            "Operator URL must use HTTP or HTTPS: {}", operator_url
                        )));
                    }
                }
                Err(e) => {
                    return Err(AppError::config(format!("Invalid operator URL '{}': {}", operator_url, e)));
                }
            }
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(domains) = std::env::var("DIAG_DOMAINS") {
            self.domains = split_list(&domains);
        }

        if let Ok(app_name) = std::env::var("DIAG_APP_NAME") {
            self.app_name = app_name;
        }

        if let Ok(app_version) = std::env::var("DIAG_APP_VERSION") {
            self.app_version = app_version;
        }

        if let Ok(user_id) = std::env::var("DIAG_USER_ID") {
            self.user_id = user_id;
        }

        if let Ok(engine) = std::env::var("DIAG_TRACE_ENGINE") {
            self.trace_engine = engine.parse()
                .map_err(|e| AppError::config(format!("Invalid DIAG_TRACE_ENGINE value '{}': {}", engine, e)))?;
        }

        if let Ok(count) = std::env::var("DIAG_PING_COUNT") {
            self.ping_count = count.parse()
                .map_err(|e| AppError::config(format!("Invalid DIAG_PING_COUNT value '{}': {}", count, e)))?;
        }

        if let Ok(hops) = std::env::var("DIAG_MAX_HOPS") {
            self.max_hops = hops.parse()
                .map_err(|e| AppError::config(format!("Invalid DIAG_MAX_HOPS value '{}': {}", hops, e)))?;
        }

        if let Ok(timeout) = std::env::var("DIAG_TIMEOUT_SECONDS") {
            self.probe_timeout_seconds = timeout.parse()
                .map_err(|e| AppError::config(format!("Invalid DIAG_TIMEOUT_SECONDS value '{}': {}", timeout, e)))?;
        }

        if let Ok(socket) = std::env::var("DIAG_SOCKET_PROBE") {
            self.enable_socket_probe = socket.parse()
                .map_err(|e| AppError::config(format!("Invalid DIAG_SOCKET_PROBE value '{}': {}", socket, e)))?;
        }

        if let Ok(operator_url) = std::env::var("DIAG_OPERATOR_URL") {
            let trimmed = operator_url.trim();
            self.operator_url = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

/// Split a comma separated list, dropping empty entries
pub(crate) fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Check that a target is a plausible hostname or IP literal
pub fn validate_domain(domain: &str) -> Result<()> {
    let domain = domain.trim();

    if domain.parse::<std::net::IpAddr>().is_ok() {
        return Ok(());
    }

    if domain.len() > 253 {
        return Err(AppError::config(format!("Domain is too long: {}", domain)));
    }

    if domain.contains("://") || domain.contains('/') {
        return Err(AppError::config(format!(
            "Domain must be a bare host name, not a URL: {}", domain
        )));
    }

    for label in domain.trim_end_matches('.').split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(AppError::config(format!("Invalid domain label in '{}'", domain)));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(AppError::config(format!("Domain label cannot start or end with '-': {}", domain)));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(AppError::config(format!("Invalid characters in domain '{}'", domain)));
        }
    }

    Ok(())
}

// Default value functions for serde
fn default_app_name() -> String {
    crate::defaults::DEFAULT_APP_NAME.to_string()
}

fn default_app_version() -> String {
    crate::VERSION.to_string()
}

fn default_ping_count() -> u32 {
    crate::defaults::DEFAULT_PING_COUNT
}

fn default_max_hops() -> u32 {
    crate::defaults::DEFAULT_MAX_HOPS
}

fn default_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_PROBE_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ping_count, 4);
        assert_eq!(config.max_hops, 30);
        assert_eq!(config.probe_timeout(), Duration::from_secs(2));
        assert_eq!(config.trace_engine, TraceEngine::Native);
        assert!(!config.enable_socket_probe);
    }

    #[test]
    fn test_blank_domains_are_tolerated() {
        let mut config = Config::default();
        config.domains = vec!["".to_string(), "example.com".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_url_as_domain_invalid() {
        let mut config = Config::default();
        config.domains = vec!["https://example.com".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_domain_labels() {
        assert!(validate_domain("exa mple.com").is_err());
        assert!(validate_domain("-bad.example.com").is_err());
        assert!(validate_domain("a..b").is_err());
        assert!(validate_domain("www.example.com.").is_ok());
        assert!(validate_domain("10.0.0.1").is_ok());
        assert!(validate_domain("::1").is_ok());
    }

    #[test]
    fn test_zero_ping_count_invalid() {
        let mut config = Config::default();
        config.ping_count = 0;
        assert!(config.validate().is_err());
        config.ping_count = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_hops_range() {
        let mut config = Config::default();
        config.max_hops = 0;
        assert!(config.validate().is_err());
        config.max_hops = 65;
        assert!(config.validate().is_err());
        config.max_hops = 64;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_operator_url_scheme() {
        let mut config = Config::default();
        config.operator_url = Some("ftp://example.com/carrier".to_string());
        assert!(config.validate().is_err());
        config.operator_url = Some("not a url".to_string());
        assert!(config.validate().is_err());
        config.operator_url = Some("https://example.com/carrier".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str(r#"{"domains":["a.example.com"],"trace_engine":"ping"}"#).unwrap();
        assert_eq!(config.domains, vec!["a.example.com"]);
        assert_eq!(config.trace_engine, TraceEngine::Ping);
        assert_eq!(config.ping_count, 4);
        assert_eq!(config.app_name, crate::defaults::DEFAULT_APP_NAME);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a.com, ,b.com ,"), vec!["a.com", "b.com"]);
        assert!(split_list("").is_empty());
    }
}
