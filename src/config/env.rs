//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::models::config::validate_domain;
use crate::types::TraceEngine;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        Self::load_env_file_from(Path::new(".env"), debug)
    }

    /// Load a specific env file if it exists
    pub fn load_env_file_from(path: &Path, debug: bool) -> Result<()> {
        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                eprintln!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Network Diagnosis Configuration
#
# Values specified here are used as defaults and can be overridden
# by command-line arguments.

# Domains to diagnose, in order (comma-separated)
# DIAG_DOMAINS=www.example.com,api.example.com

# Preamble fields
# DIAG_APP_NAME=netdiag
# DIAG_APP_VERSION=1.0.0
# DIAG_USER_ID=

# Traceroute engine: native or ping
# DIAG_TRACE_ENGINE=native

# Echo requests per domain (1-100)
# DIAG_PING_COUNT=4

# Maximum traceroute hops (1-64)
# DIAG_MAX_HOPS=30

# Per-reply probe timeout in seconds (1-300)
# DIAG_TIMEOUT_SECONDS=2

# Run the TCP connect probe after traceroute (true/false)
# DIAG_SOCKET_PROBE=false

# Carrier lookup endpoint, queried once before the diagnosis
# DIAG_OPERATOR_URL=https://example.com/carrier

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#.to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "DIAG_DOMAINS" => {
                for domain in value.split(',') {
                    let domain = domain.trim();
                    if !domain.is_empty() {
                        validate_domain(domain)
                            .map_err(|e| AppError::config(format!("Invalid DIAG_DOMAINS entry '{}': {}", domain, e)))?;
                    }
                }
            }
            "DIAG_TRACE_ENGINE" => {
                value.parse::<TraceEngine>()
                    .map_err(|e| AppError::config(format!("Invalid DIAG_TRACE_ENGINE value '{}': {}", value, e)))?;
            }
            "DIAG_PING_COUNT" => {
                Self::validate_range(key, value, 1, crate::defaults::MAX_PING_COUNT as u64)?;
            }
            "DIAG_MAX_HOPS" => {
                Self::validate_range(key, value, 1, crate::defaults::MAX_HOPS_LIMIT as u64)?;
            }
            "DIAG_TIMEOUT_SECONDS" => {
                Self::validate_range(key, value, 1, 300)?;
            }
            "DIAG_OPERATOR_URL" => {
                if !value.trim().is_empty() {
                    url::Url::parse(value.trim())
                        .map_err(|e| AppError::config(format!("Invalid DIAG_OPERATOR_URL value '{}': {}", value, e)))?;
                }
            }
            "DIAG_SOCKET_PROBE" | "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            _ => {}
        }

        Ok(())
    }

    fn validate_range(key: &str, value: &str, min: u64, max: u64) -> Result<()> {
        let parsed: u64 = value.parse()
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
        if parsed < min || parsed > max {
            return Err(AppError::config(format!("{} must be between {} and {}, got: {}", key, min, max, parsed)));
        }
        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("DIAG_DOMAINS", "Comma-separated list of domains to diagnose", "www.example.com,api.example.com"),
            ("DIAG_APP_NAME", "Application name for the preamble", "netdiag"),
            ("DIAG_APP_VERSION", "Application version for the preamble", "1.0.0"),
            ("DIAG_USER_ID", "User identifier for the preamble", "user-42"),
            ("DIAG_TRACE_ENGINE", "Traceroute engine (native or ping)", "native"),
            ("DIAG_PING_COUNT", "Echo requests per domain (1-100)", "4"),
            ("DIAG_MAX_HOPS", "Maximum traceroute hops (1-64)", "30"),
            ("DIAG_TIMEOUT_SECONDS", "Per-reply probe timeout in seconds (1-300)", "2"),
            ("DIAG_SOCKET_PROBE", "Run the TCP connect probe", "false"),
            ("DIAG_OPERATOR_URL", "Carrier lookup endpoint", "https://example.com/carrier"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<22} {}\n", var, description));
            help.push_str(&format!("  {:<22} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        warnings
    }

    /// Validate the key=value lines of an env file without loading it
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value.trim()) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_env_manager_create_example_content() {
        let content = EnvManager::create_example_env_content();

        for (var_name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", var_name)), "missing {}", var_name);
        }
    }

    #[test]
    fn test_env_manager_save_example_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Network Diagnosis Configuration"));
    }

    #[test]
    fn test_env_manager_validate_env_var() {
        assert!(EnvManager::validate_env_var("DIAG_DOMAINS", "a.example.com, b.example.com").is_ok());
        assert!(EnvManager::validate_env_var("DIAG_TRACE_ENGINE", "ping").is_ok());
        assert!(EnvManager::validate_env_var("DIAG_PING_COUNT", "5").is_ok());
        assert!(EnvManager::validate_env_var("DIAG_MAX_HOPS", "64").is_ok());
        assert!(EnvManager::validate_env_var("DIAG_TIMEOUT_SECONDS", "10").is_ok());
        assert!(EnvManager::validate_env_var("DIAG_SOCKET_PROBE", "true").is_ok());
        assert!(EnvManager::validate_env_var("DIAG_OPERATOR_URL", "").is_ok());
        assert!(EnvManager::validate_env_var("UNRELATED", "whatever").is_ok());

        assert!(EnvManager::validate_env_var("DIAG_DOMAINS", "http://a.example.com").is_err());
        assert!(EnvManager::validate_env_var("DIAG_TRACE_ENGINE", "icmp").is_err());
        assert!(EnvManager::validate_env_var("DIAG_PING_COUNT", "0").is_err());
        assert!(EnvManager::validate_env_var("DIAG_PING_COUNT", "101").is_err());
        assert!(EnvManager::validate_env_var("DIAG_MAX_HOPS", "65").is_err());
        assert!(EnvManager::validate_env_var("DIAG_TIMEOUT_SECONDS", "301").is_err());
        assert!(EnvManager::validate_env_var("DIAG_OPERATOR_URL", "not a url").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();

        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("DIAG_DOMAINS"));
        assert!(help.contains("Configuration Priority"));
    }

    #[test]
    fn test_check_env_file_reports_bad_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "DIAG_PING_COUNT=4").unwrap();
        writeln!(file, "DIAG_MAX_HOPS=999").unwrap();

        let warnings = EnvManager::check_env_file(file.path()).unwrap().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("DIAG_MAX_HOPS"));
    }

    #[test]
    fn test_check_env_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join(".env");
        assert!(EnvManager::check_env_file(&missing).unwrap().is_none());
    }
}
