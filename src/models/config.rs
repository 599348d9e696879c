//! Configuration data model and validation

use crate::defaults;
use crate::types::{AppError, OutputFormat, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of one measurement session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Speed-test endpoint used for probes and downloads
    #[serde(default = "default_url")]
    pub url: String,

    /// Endpoint receiving uploads; falls back to `url`
    #[serde(default)]
    pub upload_url: Option<String>,

    /// Download size in MB (1 MB = 2^20 bytes)
    #[serde(default = "default_download_size_mb")]
    pub download_size_mb: u32,

    /// Upload size in MB
    #[serde(default = "default_upload_size_mb")]
    pub upload_size_mb: u32,

    /// Number of latency probes
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Number of latency samples used for jitter
    #[serde(default = "default_jitter_samples")]
    pub jitter_samples: u32,

    /// Per-operation timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_seconds: u64,

    /// Wall-clock budget for the whole session
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_seconds: u64,

    /// Pause between consecutive latency probes
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    #[serde(default)]
    pub output_format: OutputFormat,

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
            url: default_url(),
            upload_url: None,
            download_size_mb: default_download_size_mb(),
            upload_size_mb: default_upload_size_mb(),
            ping_count: default_ping_count(),
            jitter_samples: default_jitter_samples(),
            timeout_seconds: default_timeout_secs(),
            session_timeout_seconds: default_session_timeout_secs(),
            ping_interval_ms: default_ping_interval_ms(),
            output_format: OutputFormat::default(),
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

    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Get the session budget as Duration
    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_seconds)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Requested download size in bytes
    pub fn download_bytes(&self) -> u64 {
        u64::from(self.download_size_mb) * defaults::BYTES_PER_MB
    }

    /// Requested upload size in bytes
    pub fn upload_bytes(&self) -> u64 {
        u64::from(self.upload_size_mb) * defaults::BYTES_PER_MB
    }

    /// URL that receives the upload payload
    pub fn effective_upload_url(&self) -> &str {
        self.upload_url.as_deref().unwrap_or(&self.url)
    }

    /// Length of the shared latency probe sequence
    pub fn probe_count(&self) -> u32 {
        self.ping_count.max(self.jitter_samples)
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        validate_endpoint("URL", &self.url)?;
        if let Some(upload_url) = &self.upload_url {
            validate_endpoint("upload URL", upload_url)?;
        }

        check_range("Download size", self.download_size_mb, 1, defaults::MAX_TRANSFER_SIZE_MB, "MB")?;
        check_range("Upload size", self.upload_size_mb, 1, defaults::MAX_TRANSFER_SIZE_MB, "MB")?;
        check_range("Ping count", self.ping_count, 1, defaults::MAX_SAMPLE_COUNT, "")?;
        check_range("Jitter samples", self.jitter_samples, 1, defaults::MAX_SAMPLE_COUNT, "")?;
        check_range("Timeout", self.timeout_seconds, 1, defaults::MAX_TIMEOUT_SECS, "seconds")?;
        check_range(
            "Session timeout",
            self.session_timeout_seconds,
            1,
            defaults::MAX_SESSION_TIMEOUT_SECS,
            "seconds",
        )?;
        check_range("Ping interval", self.ping_interval_ms, 0, defaults::MAX_PING_INTERVAL_MS, "ms")?;

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("SPEEDTEST_URL") {
            self.url = url.trim().to_string();
        }

        if let Ok(upload_url) = std::env::var("SPEEDTEST_UPLOAD_URL") {
            let upload_url = upload_url.trim();
            self.upload_url = (!upload_url.is_empty()).then(|| upload_url.to_string());
        }

        if let Some(value) = parse_env("SPEEDTEST_DOWNLOAD_SIZE")? {
            self.download_size_mb = value;
        }
        if let Some(value) = parse_env("SPEEDTEST_UPLOAD_SIZE")? {
            self.upload_size_mb = value;
        }
        if let Some(value) = parse_env("SPEEDTEST_PING_COUNT")? {
            self.ping_count = value;
        }
        if let Some(value) = parse_env("SPEEDTEST_JITTER_SAMPLES")? {
            self.jitter_samples = value;
        }
        if let Some(value) = parse_env("SPEEDTEST_TIMEOUT")? {
            self.timeout_seconds = value;
        }
        if let Some(value) = parse_env("SPEEDTEST_SESSION_TIMEOUT")? {
            self.session_timeout_seconds = value;
        }
        if let Some(value) = parse_env("SPEEDTEST_PING_INTERVAL")? {
            self.ping_interval_ms = value;
        }

        if let Ok(output) = std::env::var("SPEEDTEST_OUTPUT") {
            self.output_format = output
                .parse()
                .map_err(|e| AppError::config(format!("Invalid SPEEDTEST_OUTPUT value '{}': {}", output, e)))?;
        }

        if let Some(value) = parse_env("SPEEDTEST_ENABLE_COLOR")? {
            self.enable_color = value;
        }

        Ok(())
    }
}

fn validate_endpoint(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::config(format!("{} cannot be empty", label)));
    }

    let parsed = url::Url::parse(value)
        .map_err(|e| AppError::config(format!("Invalid {} '{}': {}", label, value, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AppError::config(format!(
            "{} must use http or https, got '{}'",
            label,
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none() {
        return Err(AppError::config(format!("{} '{}' has no host", label, value)));
    }

    Ok(())
}

fn check_range<T>(label: &str, value: T, min: T, max: T, unit: &str) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        let unit = if unit.is_empty() { String::new() } else { format!(" {}", unit) };
        return Err(AppError::config(format!(
            "{} must be between {} and {}{}, got: {}",
            label, min, max, unit, value
        )));
    }
    Ok(())
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, raw, e))),
        Err(_) => Ok(None),
    }
}

// Default value functions for serde
fn default_url() -> String {
    defaults::DEFAULT_URL.to_string()
}

fn default_download_size_mb() -> u32 {
    defaults::DEFAULT_DOWNLOAD_SIZE_MB
}

fn default_upload_size_mb() -> u32 {
    defaults::DEFAULT_UPLOAD_SIZE_MB
}

fn default_ping_count() -> u32 {
    defaults::DEFAULT_PING_COUNT
}

fn default_jitter_samples() -> u32 {
    defaults::DEFAULT_JITTER_SAMPLES
}

fn default_timeout_secs() -> u64 {
    defaults::DEFAULT_TIMEOUT.as_secs()
}

fn default_session_timeout_secs() -> u64 {
    defaults::DEFAULT_SESSION_TIMEOUT.as_secs()
}

fn default_ping_interval_ms() -> u64 {
    defaults::DEFAULT_PING_INTERVAL.as_millis() as u64
}

fn default_enable_color() -> bool {
    defaults::DEFAULT_ENABLE_COLOR
}

// Environment variables are process-global; every test touching them takes this lock
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
