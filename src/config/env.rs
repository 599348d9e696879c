//! Environment variable handling and .env file management

use crate::defaults;
use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env from the working directory if it exists.
    ///
    /// Returns whether a file was loaded. Variables already present in the
    /// process environment are left untouched.
    pub fn load_env_file() -> Result<bool> {
        if !Path::new(".env").exists() {
            return Ok(false);
        }

        dotenv::from_filename(".env")?;
        Ok(true)
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        format!(
            r#"# Internet Speed Tester Configuration
#
# Values here act as defaults and are overridden by command-line arguments.

# Speed-test endpoint for latency probes and downloads
# SPEEDTEST_URL={url}

# Endpoint receiving uploads (defaults to SPEEDTEST_URL)
# SPEEDTEST_UPLOAD_URL=https://speed.cloudflare.com/__up

# Transfer sizes in MB (1 MB = 1048576 bytes)
# SPEEDTEST_DOWNLOAD_SIZE={download}
# SPEEDTEST_UPLOAD_SIZE={upload}

# Latency probes and jitter samples
# SPEEDTEST_PING_COUNT={pings}
# SPEEDTEST_JITTER_SAMPLES={jitter}

# Per-operation timeout and whole-session budget in seconds
# SPEEDTEST_TIMEOUT={timeout}
# SPEEDTEST_SESSION_TIMEOUT={session}

# Pause between latency probes in milliseconds
# SPEEDTEST_PING_INTERVAL={interval}

# Output format (text, json, csv)
# SPEEDTEST_OUTPUT=text

# Enable colored output (true/false)
# SPEEDTEST_ENABLE_COLOR=true

# Quick check on a slow link:
# SPEEDTEST_DOWNLOAD_SIZE=1
# SPEEDTEST_UPLOAD_SIZE=1
# SPEEDTEST_PING_COUNT=5
"#,
            url = defaults::DEFAULT_URL,
            download = defaults::DEFAULT_DOWNLOAD_SIZE_MB,
            upload = defaults::DEFAULT_UPLOAD_SIZE_MB,
            pings = defaults::DEFAULT_PING_COUNT,
            jitter = defaults::DEFAULT_JITTER_SAMPLES,
            timeout = defaults::DEFAULT_TIMEOUT.as_secs(),
            session = defaults::DEFAULT_SESSION_TIMEOUT.as_secs(),
            interval = defaults::DEFAULT_PING_INTERVAL.as_millis(),
        )
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SPEEDTEST_URL", "Speed-test endpoint for probes and downloads", defaults::DEFAULT_URL),
            ("SPEEDTEST_UPLOAD_URL", "Endpoint receiving uploads", "https://speed.cloudflare.com/__up"),
            ("SPEEDTEST_DOWNLOAD_SIZE", "Download size in MB (1-999)", "10"),
            ("SPEEDTEST_UPLOAD_SIZE", "Upload size in MB (1-999)", "5"),
            ("SPEEDTEST_PING_COUNT", "Latency probes (1-99)", "10"),
            ("SPEEDTEST_JITTER_SAMPLES", "Samples used for jitter (1-99)", "20"),
            ("SPEEDTEST_TIMEOUT", "Per-operation timeout in seconds (1-299)", "30"),
            ("SPEEDTEST_SESSION_TIMEOUT", "Whole-session budget in seconds (1-3600)", "300"),
            ("SPEEDTEST_PING_INTERVAL", "Pause between probes in ms (0-10000)", "200"),
            ("SPEEDTEST_OUTPUT", "Output format (text, json, csv)", "json"),
            ("SPEEDTEST_ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<26} {}\n", var, description));
            help.push_str(&format!("  {:<26} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_example_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();
        assert!(content.contains("Internet Speed Tester Configuration"));
        for (var, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", var)), "missing {}", var);
        }
    }

    #[test]
    fn test_save_example_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("SPEEDTEST_DOWNLOAD_SIZE=10"));
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();
        assert!(help.contains("SPEEDTEST_SESSION_TIMEOUT"));
        assert!(help.contains("Configuration Priority"));
    }
}
