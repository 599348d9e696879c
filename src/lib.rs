//! Internet Speed Tester
//!
//! Measures latency, jitter, download throughput and upload throughput
//! against a single HTTP speed-test endpoint and reports the results as
//! text, JSON or CSV.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod sampler;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use models::{Config, Report, ReportBuilder, StatSummary, SubTestOutcome, ThroughputResult};
pub use client::{HttpClient, NetworkClient};
pub use executor::SessionExecutor;
pub use output::{OutputFormatter, ColoredFormatter, PlainFormatter, JsonFormatter, CsvFormatter, OutputFormatterFactory};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata recorded by build.rs
pub fn build_info() -> String {
    format!(
        "{} {} (commit {}, built {}, target {})",
        PKG_NAME,
        VERSION,
        option_env!("GIT_COMMIT").unwrap_or("unknown"),
        option_env!("BUILD_TIME").unwrap_or("unknown"),
        option_env!("TARGET_TRIPLE").unwrap_or("unknown"),
    )
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_URL: &str = "https://speed.cloudflare.com/__down";
    pub const DEFAULT_DOWNLOAD_SIZE_MB: u32 = 10;
    pub const DEFAULT_UPLOAD_SIZE_MB: u32 = 5;
    pub const DEFAULT_PING_COUNT: u32 = 10;
    pub const DEFAULT_JITTER_SAMPLES: u32 = 20;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);
    pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(200);
    pub const DEFAULT_ENABLE_COLOR: bool = true;

    /// Bytes per MB, as used for transfer sizes
    pub const BYTES_PER_MB: u64 = 1024 * 1024;

    /// Shortest elapsed time from which a bitrate is computed
    pub const MIN_MEASURABLE_DURATION: Duration = Duration::from_millis(1);

    // Accepted ranges
    pub const MAX_TRANSFER_SIZE_MB: u32 = 999;
    pub const MAX_SAMPLE_COUNT: u32 = 99;
    pub const MAX_TIMEOUT_SECS: u64 = 299;
    pub const MAX_SESSION_TIMEOUT_SECS: u64 = 3600;
    pub const MAX_PING_INTERVAL_MS: u64 = 10_000;
}
