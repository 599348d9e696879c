//! Measurement results and the sealed session report

use crate::stats::{JitterStats, StatSummary};
use crate::types::{AppError, Result, SubTest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Latency statistics plus probe bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingResult {
    pub summary: StatSummary,
    /// Successful probes
    pub samples: u32,
    /// Failed probes
    pub failed: u32,
    pub success_rate_percent: f64,
}

impl PingResult {
    pub fn new(summary: StatSummary, failed: u32) -> Self {
        let samples = summary.count as u32;
        Self {
            summary,
            samples,
            failed,
            success_rate_percent: success_rate(samples, failed),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.samples + self.failed
    }
}

/// Variation between consecutive latency samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JitterResult {
    pub stats: JitterStats,
    pub samples: u32,
    pub failed: u32,
    pub success_rate_percent: f64,
}

impl JitterResult {
    pub fn new(stats: JitterStats, samples: u32, failed: u32) -> Self {
        Self {
            stats,
            samples,
            failed,
            success_rate_percent: success_rate(samples, failed),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.samples + self.failed
    }
}

/// Outcome of one bounded transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputResult {
    pub requested_bytes: u64,
    pub bytes_transferred: u64,
    pub elapsed_seconds: f64,
    /// Bits per second
    pub bitrate_bps: f64,
}

impl ThroughputResult {
    /// Bitrate in megabits per second (10^6 bits)
    pub fn mbps(&self) -> f64 {
        self.bitrate_bps / 1_000_000.0
    }

    /// Transferred volume in MB (2^20 bytes)
    pub fn transferred_mb(&self) -> f64 {
        bytes_to_mb(self.bytes_transferred)
    }
}

/// Bytes expressed in MB (2^20 bytes)
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / crate::defaults::BYTES_PER_MB as f64
}

/// Failure taxonomy for a sub-test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NetworkError,
    Timeout,
    InsufficientData,
    DurationTooShortToMeasure,
    InvalidResponse,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::Timeout => "timeout",
            Self::InsufficientData => "insufficient_data",
            Self::DurationTooShortToMeasure => "duration_too_short_to_measure",
            Self::InvalidResponse => "invalid_response",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a sub-test did not produce a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_transferred: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl Failure {
    pub fn new<S: Into<String>>(kind: FailureKind, detail: S) -> Self {
        Self {
            kind,
            detail: detail.into(),
            bytes_transferred: None,
            attempts: None,
        }
    }

    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes_transferred = Some(bytes);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)?;
        if let Some(bytes) = self.bytes_transferred {
            write!(f, " ({} bytes transferred)", bytes)?;
        }
        Ok(())
    }
}

/// Why a sub-test was never attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    SessionBudgetExhausted,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionBudgetExhausted => f.write_str("session budget exhausted"),
        }
    }
}

/// Result slot of one sub-test. Absent values always carry a reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubTestOutcome<T> {
    Completed(T),
    Failed(Failure),
    Skipped { reason: SkipReason },
}

impl<T> SubTestOutcome<T> {
    pub fn failed<S: Into<String>>(kind: FailureKind, detail: S) -> Self {
        Self::Failed(Failure::new(kind, detail))
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
            Self::Skipped { .. } => "skipped",
        }
    }

    /// Explanation for a missing value, `None` when completed
    pub fn annotation(&self) -> Option<String> {
        match self {
            Self::Completed(_) => None,
            Self::Failed(failure) => Some(failure.to_string()),
            Self::Skipped { reason } => Some(format!("skipped: {}", reason)),
        }
    }
}

/// Sealed result of one measurement session.
///
/// Only [`ReportBuilder::finalize`] creates one; afterwards it is read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    session_id: Uuid,
    url: String,
    upload_url: String,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    ping: SubTestOutcome<PingResult>,
    jitter: SubTestOutcome<JitterResult>,
    download: SubTestOutcome<ThroughputResult>,
    upload: SubTestOutcome<ThroughputResult>,
}

impl Report {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    pub fn ping(&self) -> &SubTestOutcome<PingResult> {
        &self.ping
    }

    pub fn jitter(&self) -> &SubTestOutcome<JitterResult> {
        &self.jitter
    }

    pub fn download(&self) -> &SubTestOutcome<ThroughputResult> {
        &self.download
    }

    pub fn upload(&self) -> &SubTestOutcome<ThroughputResult> {
        &self.upload
    }

    /// At least one sub-test produced a value
    pub fn has_success(&self) -> bool {
        self.ping.is_completed()
            || self.jitter.is_completed()
            || self.download.is_completed()
            || self.upload.is_completed()
    }

    /// Status label of each sub-test, in execution order
    pub fn statuses(&self) -> [(SubTest, &'static str); 4] {
        [
            (SubTest::Ping, self.ping.status()),
            (SubTest::Jitter, self.jitter.status()),
            (SubTest::Download, self.download.status()),
            (SubTest::Upload, self.upload.status()),
        ]
    }

    /// One line per sub-test that did not complete
    pub fn errors(&self) -> Vec<String> {
        [
            (SubTest::Ping, self.ping.annotation()),
            (SubTest::Jitter, self.jitter.annotation()),
            (SubTest::Download, self.download.annotation()),
            (SubTest::Upload, self.upload.annotation()),
        ]
        .into_iter()
        .filter_map(|(test, note)| note.map(|note| format!("{} {}", test, note)))
        .collect()
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }

    /// Process exit code for this report
    pub fn exit_code(&self) -> i32 {
        if self.has_success() { 0 } else { 2 }
    }
}

/// Accumulates sub-test outcomes; consumed by `finalize`
#[derive(Debug)]
pub struct ReportBuilder {
    session_id: Uuid,
    url: String,
    upload_url: String,
    started_at: DateTime<Utc>,
    ping: Option<SubTestOutcome<PingResult>>,
    jitter: Option<SubTestOutcome<JitterResult>>,
    download: Option<SubTestOutcome<ThroughputResult>>,
    upload: Option<SubTestOutcome<ThroughputResult>>,
}

impl ReportBuilder {
    pub fn new(session_id: Uuid, url: impl Into<String>, upload_url: impl Into<String>) -> Self {
        Self {
            session_id,
            url: url.into(),
            upload_url: upload_url.into(),
            started_at: Utc::now(),
            ping: None,
            jitter: None,
            download: None,
            upload: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn ping(&mut self, outcome: SubTestOutcome<PingResult>) -> &mut Self {
        self.ping = Some(outcome);
        self
    }

    pub fn jitter(&mut self, outcome: SubTestOutcome<JitterResult>) -> &mut Self {
        self.jitter = Some(outcome);
        self
    }

    pub fn download(&mut self, outcome: SubTestOutcome<ThroughputResult>) -> &mut Self {
        self.download = Some(outcome);
        self
    }

    pub fn upload(&mut self, outcome: SubTestOutcome<ThroughputResult>) -> &mut Self {
        self.upload = Some(outcome);
        self
    }

    /// Seal the report. Every sub-test slot must have been recorded.
    pub fn finalize(self) -> Result<Report> {
        self.finalize_at(Utc::now())
    }

    /// Seal with fixed timestamps
    #[cfg(test)]
    pub(crate) fn finalize_between(mut self, started_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> Result<Report> {
        self.started_at = started_at;
        self.finalize_at(completed_at)
    }

    fn finalize_at(self, completed_at: DateTime<Utc>) -> Result<Report> {
        let missing = |test: SubTest| AppError::internal(format!("{} outcome was never recorded", test));

        Ok(Report {
            session_id: self.session_id,
            url: self.url,
            upload_url: self.upload_url,
            started_at: self.started_at,
            completed_at,
            ping: self.ping.ok_or_else(|| missing(SubTest::Ping))?,
            jitter: self.jitter.ok_or_else(|| missing(SubTest::Jitter))?,
            download: self.download.ok_or_else(|| missing(SubTest::Download))?,
            upload: self.upload.ok_or_else(|| missing(SubTest::Upload))?,
        })
    }
}

fn success_rate(samples: u32, failed: u32) -> f64 {
    let attempts = samples + failed;
    if attempts == 0 {
        0.0
    } else {
        samples as f64 / attempts as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats;

    fn throughput() -> ThroughputResult {
        ThroughputResult {
            requested_bytes: 1_048_576,
            bytes_transferred: 1_048_576,
            elapsed_seconds: 0.5,
            bitrate_bps: 16_777_216.0,
        }
    }

    fn builder() -> ReportBuilder {
        ReportBuilder::new(Uuid::new_v4(), "https://example.com/__down", "https://example.com/__down")
    }

    #[test]
    fn test_ping_result_success_rate() {
        let summary = stats::summarize(&[0.010, 0.020, 0.030]).unwrap();
        let ping = PingResult::new(summary, 1);
        assert_eq!(ping.samples, 3);
        assert_eq!(ping.attempts(), 4);
        assert!((ping.success_rate_percent - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_throughput_units() {
        let result = throughput();
        assert!((result.mbps() - 16.777216).abs() < 1e-9);
        assert!((result.transferred_mb() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_finalize_requires_every_slot() {
        let mut b = builder();
        b.ping(SubTestOutcome::failed(FailureKind::InsufficientData, "no samples"));
        let err = b.finalize().unwrap_err();
        assert_eq!(err.category(), "INTERNAL");
        assert!(err.to_string().contains("jitter"));
    }

    #[test]
    fn test_report_with_only_failures() {
        let mut b = builder();
        b.ping(SubTestOutcome::failed(FailureKind::NetworkError, "connection refused"))
            .jitter(SubTestOutcome::failed(FailureKind::InsufficientData, "0 samples"))
            .download(SubTestOutcome::Failed(
                Failure::new(FailureKind::Timeout, "exceeded 30s").with_bytes(0),
            ))
            .upload(SubTestOutcome::skipped(SkipReason::SessionBudgetExhausted));
        let report = b.finalize().unwrap();

        assert!(!report.has_success());
        assert_eq!(report.exit_code(), 2);

        let errors = report.errors();
        assert_eq!(errors.len(), 4);
        assert!(errors[0].starts_with("ping network_error"));
        assert!(errors[2].contains("0 bytes transferred"));
        assert!(errors[3].contains("skipped: session budget exhausted"));
    }

    #[test]
    fn test_report_partial_success() {
        let mut b = builder();
        b.ping(SubTestOutcome::failed(FailureKind::NetworkError, "refused"))
            .jitter(SubTestOutcome::failed(FailureKind::InsufficientData, "0 samples"))
            .download(SubTestOutcome::Completed(throughput()))
            .upload(SubTestOutcome::Completed(throughput()));
        let report = b.finalize().unwrap();

        assert!(report.has_success());
        assert_eq!(report.exit_code(), 0);
        assert!(report.completed_at() >= report.started_at());
        assert_eq!(report.statuses()[2], (SubTest::Download, "completed"));
    }

    #[test]
    fn test_finalized_report_is_read_through_accessors() {
        let session_id = Uuid::new_v4();
        let started = Utc::now();
        let mut b = ReportBuilder::new(session_id, "https://example.com/__down", "https://example.com/__up");
        b.ping(SubTestOutcome::failed(FailureKind::NetworkError, "refused"))
            .jitter(SubTestOutcome::failed(FailureKind::InsufficientData, "0 samples"))
            .download(SubTestOutcome::Completed(throughput()))
            .upload(SubTestOutcome::skipped(SkipReason::SessionBudgetExhausted));
        let report = b
            .finalize_between(started, started + chrono::Duration::milliseconds(2500))
            .unwrap();

        assert_eq!(report.session_id(), session_id);
        assert_eq!(report.url(), "https://example.com/__down");
        assert_eq!(report.upload_url(), "https://example.com/__up");
        assert_eq!(report.started_at(), started);
        assert!((report.duration_seconds() - 2.5).abs() < 1e-9);
        assert_eq!(report.ping().failure().unwrap().kind, FailureKind::NetworkError);
        assert!(report.jitter().failure().is_some());
        assert_eq!(report.download().completed(), Some(&throughput()));
        assert_eq!(report.upload().status(), "skipped");

        let copy = report.clone();
        assert_eq!(copy, report);
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let completed: SubTestOutcome<ThroughputResult> = SubTestOutcome::Completed(throughput());
        let value = serde_json::to_value(&completed).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["bytes_transferred"], 1_048_576);

        let skipped: SubTestOutcome<ThroughputResult> =
            SubTestOutcome::skipped(SkipReason::SessionBudgetExhausted);
        let value = serde_json::to_value(&skipped).unwrap();
        assert_eq!(value["status"], "skipped");
        assert_eq!(value["reason"], "session_budget_exhausted");

        let failed: SubTestOutcome<ThroughputResult> = SubTestOutcome::Failed(
            Failure::new(FailureKind::DurationTooShortToMeasure, "elapsed 0.2ms"),
        );
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["kind"], "duration_too_short_to_measure");
        assert!(value.get("bytes_transferred").is_none());
    }
}
