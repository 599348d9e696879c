//! Bounded download and upload measurements

use super::SessionBudget;
use crate::client::build_url;
use crate::defaults;
use crate::logging::MeasurementLogger;
use crate::models::{Config, Failure, FailureKind, SkipReason, SubTestOutcome, ThroughputResult};
use crate::sampler::{Operation, Sample, SampleOutcome, Sampler};
use crate::stats;

pub struct ThroughputTester<'a> {
    sampler: &'a Sampler,
    logger: &'a MeasurementLogger,
}

impl<'a> ThroughputTester<'a> {
    pub fn new(sampler: &'a Sampler, logger: &'a MeasurementLogger) -> Self {
        Self { sampler, logger }
    }

    /// `GET <url>?bytes=<download size>` and time the full body
    pub async fn measure_download(&self, config: &Config, budget: &SessionBudget) -> SubTestOutcome<ThroughputResult> {
        let requested = config.download_bytes();
        let url = match build_url(&config.url, &[("bytes", requested.to_string())]) {
            Ok(url) => url,
            Err(e) => return SubTestOutcome::failed(FailureKind::NetworkError, e.to_string()),
        };

        self.measure(Operation::Download { url, bytes: requested }, requested, budget).await
    }

    /// `POST` a synthetic payload of the upload size
    pub async fn measure_upload(&self, config: &Config, budget: &SessionBudget) -> SubTestOutcome<ThroughputResult> {
        let requested = config.upload_bytes();
        let operation = Operation::Upload {
            url: config.effective_upload_url().to_string(),
            bytes: requested,
        };

        self.measure(operation, requested, budget).await
    }

    async fn measure(&self, operation: Operation, requested: u64, budget: &SessionBudget) -> SubTestOutcome<ThroughputResult> {
        if budget.is_exhausted() {
            return SubTestOutcome::skipped(SkipReason::SessionBudgetExhausted);
        }

        let timeout = budget.operation_timeout();
        let sample = self.sampler.sample(&operation, timeout).await;
        self.logger.log_sample(&operation, 1, &sample).await;

        evaluate(&sample, requested)
    }
}

/// Turn a transfer sample into a throughput outcome
pub fn evaluate(sample: &Sample, requested: u64) -> SubTestOutcome<ThroughputResult> {
    let bytes = sample.bytes;
    let failure = |kind: FailureKind, detail: String| {
        SubTestOutcome::Failed(Failure::new(kind, detail).with_bytes(bytes))
    };

    match &sample.outcome {
        SampleOutcome::TimedOut => failure(
            FailureKind::Timeout,
            format!("transfer did not finish within {:.2}s", sample.elapsed.as_secs_f64()),
        ),
        SampleOutcome::NetworkError(detail) => failure(FailureKind::NetworkError, detail.clone()),
        SampleOutcome::InvalidResponse(detail) => failure(FailureKind::InvalidResponse, detail.clone()),
        SampleOutcome::Success { bytes: transferred } if *transferred < requested => failure(
            FailureKind::InvalidResponse,
            format!("received {} of {} requested bytes", transferred, requested),
        ),
        SampleOutcome::Success { bytes: transferred } => {
            match stats::bitrate_bps(*transferred, sample.elapsed, defaults::MIN_MEASURABLE_DURATION) {
                Ok(bitrate_bps) => SubTestOutcome::Completed(ThroughputResult {
                    requested_bytes: requested,
                    bytes_transferred: *transferred,
                    elapsed_seconds: sample.elapsed.as_secs_f64(),
                    bitrate_bps,
                }),
                Err(e) => failure(FailureKind::DurationTooShortToMeasure, e.to_string()),
            }
        }
    }
}
