//! Command-line interface module

use crate::types::TraceEngine;
use clap::{ArgAction, Parser};

/// Network Diagnosis - ping and traceroute every domain, streaming a transcript
#[derive(Parser, Debug, Clone)]
#[command(name = "netdiag")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Domain to diagnose (can be used multiple times)
    #[arg(short, long = "domain", action = ArgAction::Append)]
    pub domains: Vec<String>,

    /// Application name recorded in the transcript preamble
    #[arg(long)]
    pub app_name: Option<String>,

    /// Application version recorded in the transcript preamble
    #[arg(long)]
    pub app_version: Option<String>,

    /// User identifier recorded in the transcript preamble
    #[arg(long)]
    pub user_id: Option<String>,

    /// Traceroute engine
    #[arg(short, long, value_enum)]
    pub engine: Option<TraceEngine>,

    /// Echo requests sent per domain
    #[arg(short, long, value_parser = parse_count)]
    pub count: Option<u32>,

    /// Maximum hops probed by traceroute
    #[arg(long, value_parser = parse_hops)]
    pub max_hops: Option<u32>,

    /// Per-reply probe timeout in seconds
    #[arg(short, long, value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Run the TCP connect probe after traceroute
    #[arg(long)]
    pub socket_probe: bool,

    /// Carrier lookup endpoint queried before the diagnosis starts
    #[arg(long)]
    pub operator_url: Option<String>,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(blank) = self.domains.iter().position(|d| d.trim().is_empty()) {
            return Err(format!("--domain #{} is blank", blank + 1));
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Configuration Summary:\n");
        if !self.domains.is_empty() {
            summary.push_str(&format!("  Domains: {}\n", self.domains.join(", ")));
        }
        if let Some(engine) = self.engine {
            summary.push_str(&format!("  Trace engine: {}\n", engine));
        }
        if let Some(count) = self.count {
            summary.push_str(&format!("  Ping count: {}\n", count));
        }
        if let Some(timeout) = self.timeout {
            summary.push_str(&format!("  Timeout: {}s\n", timeout));
        }
        summary.push_str(&format!("  Socket probe: {}\n", self.socket_probe));
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

fn parse_bounded(s: &str, what: &str, max: u64) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid {}: {}", what, s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid {}: {}", what, s))
        .and_then(|value| {
            if value == 0 {
                Err(format!("{} must be greater than 0", capitalize(what)))
            } else if value > max {
                Err(format!("{} cannot exceed {}", capitalize(what), max))
            } else {
                Ok(value)
            }
        })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Parse duration from seconds string
fn parse_duration(s: &str) -> Result<u64, String> {
    parse_bounded(s, "duration", 300)
}

fn parse_count(s: &str) -> Result<u32, String> {
    parse_bounded(s, "count", crate::defaults::MAX_PING_COUNT as u64).map(|v| v as u32)
}

fn parse_hops(s: &str) -> Result<u32, String> {
    parse_bounded(s, "hop count", crate::defaults::MAX_HOPS_LIMIT as u64).map(|v| v as u32)
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_basic() {
        let cli = Cli::parse_from(["test", "--domain", "a.example.com", "--count", "5"]);
        assert_eq!(cli.domains, vec!["a.example.com"]);
        assert_eq!(cli.count, Some(5));
        assert_eq!(cli.timeout, None);
        assert!(!cli.verbose);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_parsing_all_options() {
        let cli = Cli::parse_from([
            "test",
            "--domain", "a.example.com",
            "-d", "b.example.com",
            "--app-name", "Demo",
            "--app-version", "2.0",
            "--user-id", "u-1",
            "--engine", "ping",
            "--count", "10",
            "--max-hops", "20",
            "--timeout", "30",
            "--socket-probe",
            "--operator-url", "https://example.com/carrier",
            "--no-color",
            "--verbose",
            "--debug",
        ]);

        assert_eq!(cli.domains, vec!["a.example.com", "b.example.com"]);
        assert_eq!(cli.app_name.as_deref(), Some("Demo"));
        assert_eq!(cli.app_version.as_deref(), Some("2.0"));
        assert_eq!(cli.user_id.as_deref(), Some("u-1"));
        assert_eq!(cli.engine, Some(TraceEngine::Ping));
        assert_eq!(cli.count, Some(10));
        assert_eq!(cli.max_hops, Some(20));
        assert_eq!(cli.timeout, Some(30));
        assert!(cli.socket_probe);
        assert_eq!(cli.operator_url.as_deref(), Some("https://example.com/carrier"));
        assert!(cli.no_color);
        assert!(cli.verbose);
        assert!(cli.debug);
    }

    #[test]
    fn test_invalid_engine_rejected() {
        assert!(Cli::try_parse_from(["test", "--engine", "icmp"]).is_err());
    }

    #[test]
    fn test_color_support_detection() {
        std::env::set_var("NO_COLOR", "1");
        assert!(!supports_color());
        std::env::remove_var("NO_COLOR");
    }

    #[test]
    fn test_duration_parsing() {
        assert_eq!(parse_duration("10").unwrap(), 10);
        assert_eq!(parse_duration("300").unwrap(), 300);
        assert_eq!(parse_duration("1").unwrap(), 1);

        assert!(parse_duration("0").is_err());
        assert!(parse_duration("301").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-5").is_err());
        assert!(parse_duration("+10").is_err());
        assert!(parse_duration("0x10").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_count_and_hop_bounds() {
        assert_eq!(parse_count("100").unwrap(), 100);
        assert!(parse_count("101").is_err());
        assert_eq!(parse_hops("64").unwrap(), 64);
        assert!(parse_hops("65").is_err());
        assert_eq!(parse_hops("0").unwrap_err(), "Hop count must be greater than 0");
    }

    #[test]
    fn test_cli_validation() {
        let ok = Cli::parse_from(["test", "--domain", "a.example.com"]);
        assert!(ok.validate().is_ok());

        let conflicting = Cli::parse_from(["test", "--color", "--no-color"]);
        assert!(conflicting.validate().is_err());

        let blank = Cli::parse_from(["test", "--domain", "a.example.com", "--domain", " "]);
        assert_eq!(blank.validate().unwrap_err(), "--domain #2 is blank");
    }

    #[test]
    fn test_use_colors_method() {
        let cli_no_color = Cli::parse_from(["test", "--no-color"]);
        assert!(!cli_no_color.use_colors());

        let cli_color = Cli::parse_from(["test", "--color"]);
        assert!(cli_color.use_colors());
    }

    #[test]
    fn test_config_summary() {
        let cli = Cli::parse_from([
            "test",
            "--domain", "a.example.com",
            "--engine", "native",
            "--timeout", "20",
            "--verbose",
        ]);

        let summary = cli.get_config_summary();
        assert!(summary.contains("Domains: a.example.com"));
        assert!(summary.contains("Trace engine: native"));
        assert!(summary.contains("Timeout: 20s"));
        assert!(summary.contains("Verbose mode: true"));
    }
}
