//! Command-line interface

use crate::config::EnvManager;
use crate::defaults;
use crate::types::OutputFormat;
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Internet Speed Tester - measures latency, jitter, download and upload throughput
#[derive(Parser, Debug, Clone)]
#[command(name = "ist")]
#[command(version, about, long_about = None)]
#[command(after_help = "Every option can also be set through SPEEDTEST_* environment variables or a .env file; see --env-help.")]
pub struct Cli {
    /// Speed-test endpoint used for latency probes and downloads
    #[arg(short, long, value_name = "URL")]
    pub url: Option<String>,

    /// Endpoint receiving uploads [default: same as --url]
    #[arg(long, value_name = "URL")]
    pub upload_url: Option<String>,

    /// Download size in MB (1 MB = 1048576 bytes)
    #[arg(short = 'd', long, value_name = "MB", value_parser = parse_size)]
    pub download_size: Option<u32>,

    /// Upload size in MB
    #[arg(short = 'U', long, value_name = "MB", value_parser = parse_size)]
    pub upload_size: Option<u32>,

    /// Number of latency probes
    #[arg(short = 'p', long, value_name = "N", value_parser = parse_count)]
    pub ping_count: Option<u32>,

    /// Number of latency samples used for jitter
    #[arg(short = 'j', long, value_name = "N", value_parser = parse_count)]
    pub jitter_samples: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Per-operation timeout in seconds
    #[arg(short, long, value_name = "SECS", value_parser = parse_duration)]
    pub timeout: Option<u64>,

    /// Wall-clock budget for the whole session in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_session_timeout)]
    pub session_timeout: Option<u64>,

    /// Pause between latency probes in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_interval)]
    pub ping_interval: Option<u64>,

    /// Force colored output
    #[arg(long, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// List supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,

    /// Write an example .env file to PATH and exit
    #[arg(long, value_name = "PATH")]
    pub write_env_example: Option<PathBuf>,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if let Some(url) = &self.url {
            if url.trim().is_empty() {
                return Err("--url cannot be empty".to_string());
            }
        }

        Ok(())
    }

    /// Environment variable reference for `--env-help`
    pub fn display_env_help(&self) -> String {
        EnvManager::display_env_help()
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
}

fn parse_bounded(s: &str, what: &str, min: u64, max: u64) -> Result<u64, String> {
    // Reject strings with leading + sign or other invalid formats
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid {}: {}", what, s));
    }

    let value = s.parse::<u64>().map_err(|_| format!("Invalid {}: {}", what, s))?;
    if value < min || value > max {
        return Err(format!("{} must be between {} and {}", what, min, max));
    }
    Ok(value)
}

/// Parse a per-operation timeout in seconds
fn parse_duration(s: &str) -> Result<u64, String> {
    parse_bounded(s, "duration", 1, defaults::MAX_TIMEOUT_SECS)
}

fn parse_session_timeout(s: &str) -> Result<u64, String> {
    parse_bounded(s, "session timeout", 1, defaults::MAX_SESSION_TIMEOUT_SECS)
}

fn parse_interval(s: &str) -> Result<u64, String> {
    parse_bounded(s, "interval", 0, defaults::MAX_PING_INTERVAL_MS)
}

fn parse_size(s: &str) -> Result<u32, String> {
    parse_bounded(s, "size", 1, u64::from(defaults::MAX_TRANSFER_SIZE_MB)).map(|v| v as u32)
}

fn parse_count(s: &str) -> Result<u32, String> {
    parse_bounded(s, "count", 1, u64::from(defaults::MAX_SAMPLE_COUNT)).map(|v| v as u32)
}

/// Check if the terminal supports color output
pub fn supports_color() -> bool {
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

    std::io::stdout().is_terminal()
}
