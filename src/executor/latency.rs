//! Latency probing: ping statistics and jitter from one probe sequence

use super::SessionBudget;
use crate::client::build_url;
use crate::logging::MeasurementLogger;
use crate::models::{Config, Failure, FailureKind, JitterResult, PingResult, SkipReason, SubTestOutcome};
use crate::sampler::{Operation, Sampler};
use crate::stats;

/// Ping and jitter outcomes of one probe sequence
#[derive(Debug, Clone)]
pub struct LatencyOutcome {
    pub ping: SubTestOutcome<PingResult>,
    pub jitter: SubTestOutcome<JitterResult>,
}

pub struct LatencyProber<'a> {
    sampler: &'a Sampler,
    logger: &'a MeasurementLogger,
}

impl<'a> LatencyProber<'a> {
    pub fn new(sampler: &'a Sampler, logger: &'a MeasurementLogger) -> Self {
        Self { sampler, logger }
    }

    /// Issue `max(ping_count, jitter_samples)` sequential probes.
    ///
    /// Ping statistics use the first `ping_count` attempts and jitter the
    /// first `jitter_samples`, so both share the same samples where they
    /// overlap.
    pub async fn probe(&self, config: &Config, budget: &SessionBudget) -> LatencyOutcome {
        let total = config.probe_count();
        // One slot per issued probe: elapsed seconds on success
        let mut slots: Vec<Option<f64>> = Vec::with_capacity(total as usize);
        let mut last_failure: Option<String> = None;

        for attempt in 1..=total {
            if attempt > 1 && !config.ping_interval().is_zero() {
                tokio::time::sleep(config.ping_interval().min(budget.remaining())).await;
            }
            if budget.is_exhausted() {
                break;
            }

            let url = match build_url(&config.url, &[("_", cache_buster())]) {
                Ok(url) => url,
                Err(e) => {
                    last_failure = Some(e.to_string());
                    slots.push(None);
                    continue;
                }
            };
            let operation = Operation::Probe { url };

            let sample = self.sampler.sample(&operation, budget.operation_timeout()).await;
            self.logger.log_sample(&operation, attempt, &sample).await;

            if let Some(reason) = sample.describe_failure() {
                last_failure = Some(reason);
            }
            slots.push(sample.seconds());
        }

        let ping_window = window(&slots, config.ping_count);
        let jitter_window = window(&slots, config.jitter_samples);

        LatencyOutcome {
            ping: ping_outcome(ping_window, last_failure.as_deref()),
            jitter: jitter_outcome(jitter_window, last_failure.as_deref()),
        }
    }
}

fn window(slots: &[Option<f64>], count: u32) -> &[Option<f64>] {
    &slots[..slots.len().min(count as usize)]
}

fn successes(window: &[Option<f64>]) -> Vec<f64> {
    window.iter().flatten().copied().collect()
}

fn ping_outcome(window: &[Option<f64>], last_failure: Option<&str>) -> SubTestOutcome<PingResult> {
    if window.is_empty() {
        return SubTestOutcome::skipped(SkipReason::SessionBudgetExhausted);
    }

    let samples = successes(window);
    let failed = (window.len() - samples.len()) as u32;

    match stats::summarize(&samples) {
        Ok(summary) => SubTestOutcome::Completed(PingResult::new(summary, failed)),
        Err(_) => SubTestOutcome::Failed(
            Failure::new(
                FailureKind::InsufficientData,
                format!(
                    "no successful probes out of {}; last failure: {}",
                    window.len(),
                    last_failure.unwrap_or("unknown")
                ),
            )
            .with_attempts(window.len() as u32),
        ),
    }
}

fn jitter_outcome(window: &[Option<f64>], last_failure: Option<&str>) -> SubTestOutcome<JitterResult> {
    if window.is_empty() {
        return SubTestOutcome::skipped(SkipReason::SessionBudgetExhausted);
    }

    let samples = successes(window);
    let failed = (window.len() - samples.len()) as u32;

    match stats::jitter_summary(&samples) {
        Ok(jitter) => SubTestOutcome::Completed(JitterResult::new(jitter, samples.len() as u32, failed)),
        Err(e) => {
            let mut detail = format!("{} ({} of {} probes succeeded)", e, samples.len(), window.len());
            if failed > 0 {
                if let Some(reason) = last_failure {
                    detail.push_str(&format!("; last failure: {}", reason));
                }
            }
            SubTestOutcome::Failed(
                Failure::new(FailureKind::InsufficientData, detail).with_attempts(window.len() as u32),
            )
        }
    }
}

/// Unique query value so intermediaries cannot answer from cache
fn cache_buster() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_prefix() {
        let slots = vec![Some(0.01), None, Some(0.03), Some(0.02)];
        assert_eq!(window(&slots, 2), &slots[..2]);
        assert_eq!(window(&slots, 10), &slots[..]);
    }

    #[test]
    fn test_ping_outcome_counts_failures() {
        let slots = vec![Some(0.010), None, Some(0.030)];
        let outcome = ping_outcome(&slots, Some("network error: refused"));
        let ping = outcome.completed().unwrap();
        assert_eq!(ping.samples, 2);
        assert_eq!(ping.failed, 1);
        assert!((ping.summary.mean - 0.020).abs() < 1e-12);
    }

    #[test]
    fn test_ping_outcome_all_failed() {
        let slots = vec![None, None];
        let outcome = ping_outcome(&slots, Some("network error: refused"));
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::InsufficientData);
        assert_eq!(failure.attempts, Some(2));
        assert!(failure.detail.contains("refused"));
    }

    #[test]
    fn test_empty_window_is_skipped() {
        assert!(matches!(ping_outcome(&[], None), SubTestOutcome::Skipped { .. }));
        assert!(matches!(jitter_outcome(&[], None), SubTestOutcome::Skipped { .. }));
    }

    #[test]
    fn test_jitter_needs_two_successes() {
        let slots = vec![Some(0.010), None];
        let failure = jitter_outcome(&slots, Some("timed out after 2.00s"))
            .failure()
            .cloned()
            .unwrap();
        assert_eq!(failure.kind, FailureKind::InsufficientData);
        assert!(failure.detail.contains("1 of 2 probes succeeded"));
        assert!(failure.detail.contains("timed out"));
    }

    #[test]
    fn test_cache_buster_is_numeric() {
        assert!(cache_buster().parse::<i64>().is_ok());
    }
}
