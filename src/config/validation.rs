//! Configuration validation utilities and rules

use crate::{error::Result, models::Config};
use std::net::IpAddr;
use std::time::Duration;

/// Configuration validator with advisory rules on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_endpoint("URL", &config.url));
        if let Some(upload_url) = &config.upload_url {
            warnings.extend(Self::validate_endpoint("Upload URL", upload_url));
        }
        warnings.extend(Self::validate_transfer_sizes(config));
        warnings.extend(Self::validate_timing(config));

        Ok(warnings)
    }

    fn validate_endpoint(label: &str, value: &str) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let Ok(parsed) = url::Url::parse(value) else {
            return warnings;
        };

        if parsed.scheme() == "http" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("{} '{}' uses HTTP instead of HTTPS; proxies may alter throughput", label, value),
            ));
        }

        let local = match parsed.host() {
            Some(url::Host::Ipv4(ip)) => is_local(&IpAddr::V4(ip)),
            Some(url::Host::Ipv6(ip)) => is_local(&IpAddr::V6(ip)),
            Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
            None => false,
        };
        if local {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("{} '{}' points at a local network address", label, value),
            ));
        }

        warnings
    }

    fn validate_transfer_sizes(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.download_size_mb > 100 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Download size of {} MB will consume significant bandwidth", config.download_size_mb),
            ));
        }
        if config.upload_size_mb > 50 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Upload size of {} MB will consume significant bandwidth", config.upload_size_mb),
            ));
        }

        warnings
    }

    fn validate_timing(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.timeout_seconds < 5 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Timeout of {}s may be too short to finish a {} MB download",
                    config.timeout_seconds, config.download_size_mb
                ),
            ));
        }

        let worst_case = Self::worst_case_duration(config);
        if worst_case > config.session_timeout() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Session timeout of {}s is shorter than the worst case of {}s; later sub-tests may be skipped",
                    config.session_timeout_seconds,
                    worst_case.as_secs()
                ),
            ));
        }

        warnings
    }

    /// Upper bound of a session where every operation runs into its timeout
    pub fn worst_case_duration(config: &Config) -> Duration {
        let probes = config.probe_count();
        let per_probe = config.timeout() + config.ping_interval();
        per_probe * probes + config.timeout() * 2
    }
}

fn is_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
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

    pub fn format(&self) -> String {
        format!("[{}] {}", self.level.as_str(), self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
