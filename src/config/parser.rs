//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::{supports_color, Cli},
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
    env_file_loaded: bool,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self {
            cli,
            env_file_loaded: false,
        }
    }

    /// Defaults, then `.env`, then `SPEEDTEST_*` variables, then CLI flags
    pub fn parse(&mut self) -> Result<Config> {
        let mut config = Config::default();

        self.env_file_loaded = EnvManager::load_env_file()?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Whether the last `parse` picked up a `.env` file
    pub fn env_file_loaded(&self) -> bool {
        self.env_file_loaded
    }

    fn apply_cli_overrides(&self, config: &mut Config) {
        let cli = &self.cli;

        if let Some(url) = &cli.url {
            config.url = url.trim().to_string();
        }
        if let Some(url) = &cli.upload_url {
            config.upload_url = Some(url.trim().to_string());
        }
        if let Some(size) = cli.download_size {
            config.download_size_mb = size;
        }
        if let Some(size) = cli.upload_size {
            config.upload_size_mb = size;
        }
        if let Some(count) = cli.ping_count {
            config.ping_count = count;
        }
        if let Some(count) = cli.jitter_samples {
            config.jitter_samples = count;
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(timeout) = cli.session_timeout {
            config.session_timeout_seconds = timeout;
        }
        if let Some(interval) = cli.ping_interval {
            config.ping_interval_ms = interval;
        }
        if let Some(output) = cli.output {
            config.output_format = output;
        }

        if cli.color {
            config.enable_color = true;
        } else if cli.no_color || !supports_color() {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = cli.verbose;
        config.debug = cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let summary = [
        format!("URL: {}", config.url),
        format!("Upload URL: {}", config.effective_upload_url()),
        format!("Download size: {} MB", config.download_size_mb),
        format!("Upload size: {} MB", config.upload_size_mb),
        format!("Ping count: {}", config.ping_count),
        format!("Jitter samples: {}", config.jitter_samples),
        format!("Timeout: {}s", config.timeout_seconds),
        format!("Session timeout: {}s", config.session_timeout_seconds),
        format!("Ping interval: {}ms", config.ping_interval_ms),
        format!("Output: {}", config.output_format),
        format!("Color Output: {}", config.enable_color),
        format!("Verbose: {}", config.verbose),
        format!("Debug: {}", config.debug),
    ];

    summary.join("\n")
}
