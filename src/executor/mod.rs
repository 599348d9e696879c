//! Measurement session orchestration
//!
//! A session runs the latency prober and then the throughput tester under
//! one configuration and one wall-clock budget, and seals the outcomes of
//! all four sub-tests into a [`Report`]. A failing sub-test never stops
//! the ones after it.

pub mod latency;
pub mod throughput;

pub use latency::{LatencyOutcome, LatencyProber};
pub use throughput::ThroughputTester;

use crate::client::HttpClient;
use crate::error::{AppError, Result};
use crate::logging::MeasurementLogger;
use crate::models::{Config, Report, ReportBuilder, SubTestOutcome};
use crate::sampler::Sampler;
use crate::types::{SessionState, SubTest};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Remaining wall-clock time of a session
#[derive(Debug, Clone, Copy)]
pub struct SessionBudget {
    deadline: Instant,
    per_operation: Duration,
}

impl SessionBudget {
    pub fn new(total: Duration, per_operation: Duration) -> Self {
        Self {
            deadline: Instant::now() + total,
            per_operation,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    /// Per-operation timeout clamped to what is left of the session
    pub fn operation_timeout(&self) -> Duration {
        self.per_operation.min(self.remaining())
    }
}

/// Runs one measurement session
pub struct SessionExecutor {
    config: Arc<Config>,
    sampler: Sampler,
    logger: MeasurementLogger,
    session_id: Uuid,
    state: SessionState,
}

impl SessionExecutor {
    pub fn new(config: Arc<Config>, client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            sampler: Sampler::new(client),
            logger: MeasurementLogger::quiet(),
            session_id: Uuid::new_v4(),
            state: SessionState::Idle,
        }
    }

    pub fn with_logger(mut self, logger: MeasurementLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_session_id(mut self, session_id: Uuid) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Run every sub-test in order and seal the report.
    ///
    /// Only configuration problems are returned as errors, and only before
    /// any network activity. A session runs once.
    pub async fn run(&mut self) -> Result<Report> {
        if self.state != SessionState::Idle {
            return Err(AppError::internal(format!(
                "session {} has already run (state: {})",
                self.session_id, self.state
            )));
        }
        if let Err(error) = self.config.validate() {
            self.logger.log_error(&error, Some("Configuration rejected")).await;
            return Err(error);
        }

        let config = Arc::clone(&self.config);
        let budget = SessionBudget::new(config.session_timeout(), config.timeout());
        let mut builder = ReportBuilder::new(self.session_id, &config.url, config.effective_upload_url());
        self.logger.log_session_start(&self.session_id, &config).await;

        self.advance(SessionState::RunningLatency).await?;
        let latency = LatencyProber::new(&self.sampler, &self.logger)
            .probe(&config, &budget)
            .await;
        self.record(SubTest::Ping, &latency.ping, |p| {
            format!("avg {:.2}ms over {}/{} probes", p.summary.mean_ms(), p.samples, p.attempts())
        })
        .await;
        self.record(SubTest::Jitter, &latency.jitter, |j| {
            format!("avg {:.2}ms over {} samples", j.stats.mean_ms(), j.samples)
        })
        .await;
        builder.ping(latency.ping).jitter(latency.jitter);

        self.advance(SessionState::RunningThroughput).await?;
        let tester = ThroughputTester::new(&self.sampler, &self.logger);
        let download = tester.measure_download(&config, &budget).await;
        self.record(SubTest::Download, &download, |t| format!("{:.2} Mbps", t.mbps())).await;
        builder.download(download);

        let upload = tester.measure_upload(&config, &budget).await;
        self.record(SubTest::Upload, &upload, |t| format!("{:.2} Mbps", t.mbps())).await;
        builder.upload(upload);

        self.advance(SessionState::Complete).await?;
        let report = builder.finalize()?;
        self.logger.log_session_end(&report).await;

        Ok(report)
    }

    async fn advance(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_advance_to(next) {
            return Err(AppError::internal(format!(
                "illegal session transition {} -> {}",
                self.state, next
            )));
        }
        self.logger.log_state_change(self.state, next).await;
        self.state = next;
        Ok(())
    }

    async fn record<T, F>(&self, test: SubTest, outcome: &SubTestOutcome<T>, describe: F)
    where
        F: FnOnce(&T) -> String,
    {
        match outcome {
            SubTestOutcome::Completed(value) => self.logger.log_subtest_completed(test, &describe(value)).await,
            SubTestOutcome::Failed(failure) => self.logger.log_subtest_failed(test, failure).await,
            SubTestOutcome::Skipped { reason } => self.logger.log_subtest_skipped(test, *reason).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::{FakeClient, FakeResponse};
    use crate::models::{FailureKind, SkipReason};
    use serde_json::Value;

    fn config() -> Config {
        Config {
            url: "http://speed.test/__down".to_string(),
            download_size_mb: 1,
            upload_size_mb: 1,
            ping_count: 3,
            jitter_samples: 4,
            ping_interval_ms: 0,
            ..Config::default()
        }
    }

    fn executor(config: Config, client: FakeClient) -> SessionExecutor {
        SessionExecutor::new(Arc::new(config), Arc::new(client))
    }

    /// Replace every leaf with null, keeping keys and array lengths
    fn shape(value: &Value) -> Value {
        match value {
            Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), shape(v))).collect()),
            Value::Array(items) => Value::Array(items.iter().map(shape).collect()),
            _ => Value::Null,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_session_completes_everything() {
        let mut session = executor(config(), FakeClient::healthy());
        assert_eq!(session.state(), SessionState::Idle);

        let report = session.run().await.unwrap();

        assert_eq!(session.state(), SessionState::Complete);
        assert_eq!(report.session_id(), session.session_id());
        assert!(report.ping().is_completed());
        assert!(report.jitter().is_completed());
        assert!(report.errors().is_empty());

        let download = report.download().completed().unwrap();
        assert_eq!(download.bytes_transferred, 1_048_576);
        assert_eq!(download.bitrate_bps, 16_777_216.0);

        let upload = report.upload().completed().unwrap();
        assert_eq!(upload.bitrate_bps, 16_777_216.0);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_run_is_rejected() {
        let mut session = executor(config(), FakeClient::healthy());
        session.run().await.unwrap();

        let err = session.run().await.unwrap_err();
        assert_eq!(err.category(), "INTERNAL");
        assert_eq!(session.state(), SessionState::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_fails_before_network() {
        let client = Arc::new(FakeClient::healthy());
        let bad = Config { url: "not a url".to_string(), ..config() };
        let mut session = SessionExecutor::new(Arc::new(bad), client.clone());

        let err = session.run().await.unwrap_err();
        assert_eq!(err.category(), "CONFIG");
        assert_eq!(session.state(), SessionState::Idle);
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_pings_do_not_stop_throughput() {
        let client = Arc::new(FakeClient::healthy().with_probe_default(FakeResponse::Refuse));
        let mut session = SessionExecutor::new(Arc::new(config()), client.clone());
        let report = session.run().await.unwrap();

        let ping_failure = report.ping().failure().unwrap();
        assert_eq!(ping_failure.kind, FailureKind::InsufficientData);
        assert!(ping_failure.detail.contains("connection refused"));
        assert_eq!(report.jitter().failure().unwrap().kind, FailureKind::InsufficientData);

        assert!(report.download().is_completed());
        assert!(report.upload().is_completed());
        assert_eq!(report.exit_code(), 0);

        let calls = client.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("probe")).count(), 4);
        assert!(calls[4].starts_with("download http://speed.test/__down?bytes=1048576"));
        assert!(calls[5].starts_with("upload http://speed.test/__down"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_timeout_before_any_bytes() {
        let cfg = Config { timeout_seconds: 2, ..config() };
        let client = FakeClient::healthy().with_download(FakeResponse::Stall { bytes: 0 });
        let report = executor(cfg, client).run().await.unwrap();

        let failure = report.download().failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.bytes_transferred, Some(0));
        assert!(report.upload().is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_upload_times_out_with_partial_bytes() {
        let cfg = Config { timeout_seconds: 4, ..config() };
        let client = FakeClient::healthy().with_upload(FakeResponse::Stall { bytes: 65_536 });
        let report = executor(cfg, client).run().await.unwrap();

        let failure = report.upload().failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.bytes_transferred, Some(65_536));
        assert!(report.download().is_completed());
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_upload_is_network_error() {
        let client = FakeClient::healthy().with_upload(FakeResponse::Refuse);
        let report = executor(config(), client).run().await.unwrap();

        let failure = report.upload().failure().unwrap();
        assert_eq!(failure.kind, FailureKind::NetworkError);
        assert_eq!(failure.bytes_transferred, Some(0));
        assert!(report.ping().is_completed());
        assert!(report.download().is_completed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_ping_has_no_jitter() {
        let cfg = Config { ping_count: 1, jitter_samples: 1, ..config() };
        let report = executor(cfg, FakeClient::healthy()).run().await.unwrap();

        let ping = report.ping().completed().unwrap();
        assert_eq!(ping.summary.count, 1);
        assert_eq!(ping.summary.min, ping.summary.mean);
        assert_eq!(ping.summary.mean, ping.summary.max);
        assert!(ping.summary.jitter.is_none());

        assert_eq!(report.jitter().failure().unwrap().kind, FailureKind::InsufficientData);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_and_jitter_windows_share_probes() {
        let probes = vec![
            FakeResponse::ok_after(Duration::from_millis(10)),
            FakeResponse::Refuse,
            FakeResponse::ok_after(Duration::from_millis(30)),
            FakeResponse::ok_after(Duration::from_millis(20)),
            FakeResponse::ok_after(Duration::from_millis(40)),
        ];
        let cfg = Config { ping_count: 3, jitter_samples: 5, ..config() };
        let client = Arc::new(FakeClient::healthy().with_probes(probes));
        let report = SessionExecutor::new(Arc::new(cfg), client.clone()).run().await.unwrap();

        let ping = report.ping().completed().unwrap();
        assert_eq!((ping.samples, ping.failed), (2, 1));
        assert!((ping.summary.mean_ms() - 20.0).abs() < 1e-6);

        let jitter = report.jitter().completed().unwrap();
        assert_eq!((jitter.samples, jitter.failed), (4, 1));
        // successes 10, 30, 20, 40 ms -> diffs 20, 10, 20
        assert!((jitter.stats.mean_ms() - 50.0 / 3.0).abs() < 1e-6);
        assert!((jitter.stats.min_ms() - 10.0).abs() < 1e-6);

        assert_eq!(client.calls().iter().filter(|c| c.starts_with("probe")).count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_carry_cache_buster() {
        let client = Arc::new(FakeClient::healthy());
        SessionExecutor::new(Arc::new(config()), client.clone()).run().await.unwrap();

        let calls = client.calls();
        assert!(calls[0].starts_with("probe http://speed.test/__down?_="));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_budget_skips_remaining_work() {
        let cfg = Config {
            session_timeout_seconds: 3,
            timeout_seconds: 30,
            ..config()
        };
        let client = FakeClient::healthy().with_download(FakeResponse::Stall { bytes: 512 });
        let report = executor(cfg, client).run().await.unwrap();

        assert!(report.ping().is_completed());
        let failure = report.download().failure().unwrap();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(failure.bytes_transferred, Some(512));
        assert_eq!(
            report.upload(),
            &SubTestOutcome::Skipped { reason: SkipReason::SessionBudgetExhausted }
        );
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_sub_test_failing() {
        let client = FakeClient::healthy()
            .with_probe_default(FakeResponse::status(503))
            .with_download(FakeResponse::Refuse)
            .with_upload(FakeResponse::status(500));
        let report = executor(config(), client).run().await.unwrap();

        assert!(!report.has_success());
        assert_eq!(report.exit_code(), 2);
        assert_eq!(report.errors().len(), 4);
        assert_eq!(report.download().failure().unwrap().kind, FailureKind::NetworkError);
        assert_eq!(report.upload().failure().unwrap().kind, FailureKind::InvalidResponse);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_download_is_invalid_response() {
        let client = FakeClient::healthy().with_download(FakeResponse::transfer(1000, Duration::from_millis(100)));
        let report = executor(config(), client).run().await.unwrap();

        let failure = report.download().failure().unwrap();
        assert_eq!(failure.kind, FailureKind::InvalidResponse);
        assert_eq!(failure.bytes_transferred, Some(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_upload_is_too_short_to_measure() {
        let client = FakeClient::healthy().with_upload(FakeResponse::ok_after(Duration::ZERO));
        let report = executor(config(), client).run().await.unwrap();

        assert_eq!(
            report.upload().failure().unwrap().kind,
            FailureKind::DurationTooShortToMeasure
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_sessions_have_identical_shape() {
        let first = executor(config(), FakeClient::healthy()).run().await.unwrap();
        let second = executor(config(), FakeClient::healthy()).run().await.unwrap();

        assert_eq!(first.statuses(), second.statuses());
        assert_eq!(
            shape(&serde_json::to_value(&first).unwrap()),
            shape(&serde_json::to_value(&second).unwrap())
        );
    }

    #[test]
    fn test_budget_clamps_operation_timeout() {
        let budget = SessionBudget::new(Duration::from_secs(5), Duration::from_secs(30));
        assert!(budget.operation_timeout() <= Duration::from_secs(5));
        assert!(!budget.is_exhausted());

        let spent = SessionBudget::new(Duration::ZERO, Duration::from_secs(30));
        assert!(spent.is_exhausted());
        assert_eq!(spent.operation_timeout(), Duration::ZERO);
    }
}
