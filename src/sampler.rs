//! Timing of single network operations

use crate::client::{HttpClient, TransferProgress};
use crate::error::AppError;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One network operation to time
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Lightweight round trip
    Probe { url: String },
    /// Fetch `bytes` from `url`
    Download { url: String, bytes: u64 },
    /// Send `bytes` of synthetic payload to `url`
    Upload { url: String, bytes: u64 },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Probe { .. } => "probe",
            Self::Download { .. } => "download",
            Self::Upload { .. } => "upload",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Probe { url } | Self::Download { url, .. } | Self::Upload { url, .. } => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Success { bytes: u64 },
    TimedOut,
    NetworkError(String),
    /// The server answered, but not with what was asked for
    InvalidResponse(String),
}

/// Result of one timed operation
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub elapsed: Duration,
    /// Bytes moved, including partial transfers that failed
    pub bytes: u64,
    pub outcome: SampleOutcome,
}

impl Sample {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SampleOutcome::Success { .. })
    }

    /// Elapsed seconds when successful; failed samples carry no timing
    pub fn seconds(&self) -> Option<f64> {
        self.is_success().then(|| self.elapsed.as_secs_f64())
    }

    pub fn describe_failure(&self) -> Option<String> {
        match &self.outcome {
            SampleOutcome::Success { .. } => None,
            SampleOutcome::TimedOut => Some(format!("timed out after {:.2}s", self.elapsed.as_secs_f64())),
            SampleOutcome::NetworkError(detail) => Some(format!("network error: {}", detail)),
            SampleOutcome::InvalidResponse(detail) => Some(format!("invalid response: {}", detail)),
        }
    }
}

/// Runs exactly one network operation per call under a deadline
#[derive(Clone)]
pub struct Sampler {
    client: Arc<dyn HttpClient>,
}

impl Sampler {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    pub async fn sample(&self, operation: &Operation, timeout: Duration) -> Sample {
        let progress = TransferProgress::new();

        // Build the payload before the clock starts
        let payload = match operation {
            Operation::Upload { bytes, .. } => Some(synthetic_payload(*bytes)),
            _ => None,
        };

        let start = Instant::now();
        let result = tokio::time::timeout(timeout, async {
            match (operation, payload) {
                (Operation::Probe { url }, _) => self.client.probe(url).await.map(|status| (Some(status), 0)),
                (Operation::Download { url, .. }, _) => {
                    self.client.download(url, &progress).await.map(|bytes| (None, bytes))
                }
                (Operation::Upload { url, .. }, Some(payload)) => {
                    self.client.upload(url, payload, &progress).await.map(|bytes| (None, bytes))
                }
                (Operation::Upload { .. }, None) => Err(AppError::internal("upload payload missing")),
            }
        })
        .await;
        let elapsed = start.elapsed();

        let outcome = match result {
            Err(_) => SampleOutcome::TimedOut,
            Ok(Ok((Some(200), _))) => SampleOutcome::Success { bytes: 0 },
            Ok(Ok((Some(status), _))) => SampleOutcome::InvalidResponse(format!("HTTP {}", status)),
            Ok(Ok((None, bytes))) => SampleOutcome::Success { bytes },
            Ok(Err(error)) => classify(error),
        };

        let bytes = match outcome {
            SampleOutcome::Success { bytes } => bytes,
            _ => progress.bytes(),
        };

        Sample { elapsed, bytes, outcome }
    }
}

fn classify(error: AppError) -> SampleOutcome {
    match error {
        AppError::Timeout(_) => SampleOutcome::TimedOut,
        AppError::HttpRequest(detail) => SampleOutcome::InvalidResponse(detail),
        AppError::Network(detail) => SampleOutcome::NetworkError(detail),
        other => SampleOutcome::NetworkError(other.to_string()),
    }
}

/// Deterministic upload body: a repeating 0..=255 byte ramp
pub fn synthetic_payload(bytes: u64) -> Bytes {
    (0..bytes).map(|i| (i % 256) as u8).collect::<Vec<u8>>().into()
}
