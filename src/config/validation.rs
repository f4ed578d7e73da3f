//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::Config,
};
use colored::Colorize;
use std::collections::HashSet;
use std::net::IpAddr;

/// Configuration validator with advanced validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration and collect non-fatal warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        warnings.extend(Self::validate_domains(&config.domains));
        warnings.extend(Self::validate_probe_settings(config));
        warnings.extend(Self::validate_operator_url(config.operator_url.as_deref()));

        Ok(warnings)
    }

    /// Flag duplicate and IP-literal targets
    fn validate_domains(domains: &[String]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for domain in domains {
            let normalized = domain.trim().trim_end_matches('.').to_lowercase();
            if normalized.is_empty() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    "Blank domain entry will be skipped".to_string(),
                ));
                continue;
            }

            if !seen.insert(normalized.clone()) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Domain '{}' is listed more than once and will be diagnosed repeatedly", domain.trim()),
                ));
            }

            if let Ok(ip) = normalized.parse::<IpAddr>() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Target '{}' is an IP literal; no name resolution will be exercised", ip),
                ));

                let is_local = match ip {
                    IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
                    IpAddr::V6(v6) => v6.is_loopback(),
                };
                if is_local {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!("Target {} is a private or loopback address", ip),
                    ));
                }
            }
        }

        warnings
    }

    /// Flag probe settings that make a run very slow or unreliable
    fn validate_probe_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.max_hops > 40 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Max hops of {} is unusually large; unreachable targets will take a long time", config.max_hops),
            ));
        }

        if config.ping_count > 20 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Ping count of {} will increase execution time", config.ping_count),
            ));
        }

        if config.probe_timeout_seconds > 30 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long probe timeout of {}s will slow down failure detection", config.probe_timeout_seconds),
            ));
        }

        let active_domains = config.domains.iter().filter(|d| !d.trim().is_empty()).count() as u64;
        let worst_case_secs = active_domains
            * config.max_hops as u64
            * config.probe_timeout_seconds;
        if worst_case_secs > 600 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Traceroute alone may take up to {}s when targets are unreachable", worst_case_secs),
            ));
        }

        warnings
    }

    /// Flag an operator endpoint reached over plain HTTP
    fn validate_operator_url(operator_url: Option<&str>) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if let Some(raw) = operator_url {
            if let Ok(parsed) = url::Url::parse(raw) {
                if parsed.scheme() == "http" {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Warning,
                        format!("Operator URL '{}' uses HTTP instead of HTTPS", raw),
                    ));
                }
            }
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        let tag = if use_color {
            match self.level {
                ValidationLevel::Info => tag.blue().to_string(),
                ValidationLevel::Warning => tag.yellow().to_string(),
                ValidationLevel::Error => tag.red().to_string(),
            }
        } else {
            tag
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
