//! Data models and structures for the internet speed tester

pub mod config;
pub mod report;

// Re-export main model types
pub use config::Config;
pub use report::{
    bytes_to_mb,
    Failure, FailureKind, JitterResult, PingResult, Report, ReportBuilder, SkipReason, SubTestOutcome,
    ThroughputResult,
};
pub use crate::stats::{JitterStats, StatSummary};
