//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Output format for the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text sections
    #[default]
    Text,
    /// One JSON document
    Json,
    /// One CSV row per sub-test
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(AppError::parse(format!(
                "Unknown output format '{}'. Expected one of: text, json, csv",
                other
            ))),
        }
    }
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    RunningLatency,
    RunningThroughput,
    Complete,
}

impl SessionState {
    /// Whether `next` is the single legal successor of this state
    pub fn can_advance_to(&self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::RunningLatency)
                | (Self::RunningLatency, Self::RunningThroughput)
                | (Self::RunningThroughput, Self::Complete)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::RunningLatency => "running_latency",
            Self::RunningThroughput => "running_throughput",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// The four measurements of a session, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubTest {
    Ping,
    Jitter,
    Download,
    Upload,
}

impl SubTest {
    pub const ALL: [SubTest; 4] = [Self::Ping, Self::Jitter, Self::Download, Self::Upload];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::Jitter => "jitter",
            Self::Download => "download",
            Self::Upload => "upload",
        }
    }

    /// Section heading used by text output
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Ping => "PING (LATENCY)",
            Self::Jitter => "JITTER (STABILITY)",
            Self::Download => "DOWNLOAD",
            Self::Upload => "UPLOAD",
        }
    }
}

impl fmt::Display for SubTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
