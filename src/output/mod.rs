//! Output formatting and display system
//!
//! Text (plain or colored), JSON and CSV renderings of a session report.

mod colored;
mod formatter;
mod structured;

pub use colored::{ColorScheme, ColoredFormatter, PerformanceLevel};
pub use formatter::{FormattingOptions, OutputFormatter, PlainFormatter};
pub use structured::{round2, CsvFormatter, JsonFormatter, CSV_HEADER};

use crate::{models::Config, types::OutputFormat};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter for the requested format
    pub fn create_formatter(format: OutputFormat, enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
        };

        match format {
            OutputFormat::Json => Box::new(JsonFormatter::new(true)),
            OutputFormat::Csv => Box::new(CsvFormatter::new()),
            OutputFormat::Text if enable_color => Box::new(ColoredFormatter::new(options)),
            OutputFormat::Text => Box::new(PlainFormatter::new(options)),
        }
    }

    /// Formatter matching a configuration
    pub fn from_config(config: &Config) -> Box<dyn OutputFormatter> {
        Self::create_formatter(config.output_format, config.enable_color, config.verbose)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{
        Failure, FailureKind, JitterResult, PingResult, Report, ReportBuilder, SkipReason, SubTestOutcome,
        ThroughputResult,
    };
    use crate::stats;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn base(
        ping: SubTestOutcome<PingResult>,
        jitter: SubTestOutcome<JitterResult>,
        download: SubTestOutcome<ThroughputResult>,
        upload: SubTestOutcome<ThroughputResult>,
    ) -> Report {
        let started_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let mut builder = ReportBuilder::new(
            Uuid::new_v4(),
            "https://speed.example.net/__down",
            "https://speed.example.net/__up",
        );
        builder.ping(ping).jitter(jitter).download(download).upload(upload);
        builder
            .finalize_between(started_at, started_at + chrono::Duration::seconds(3))
            .unwrap()
    }

    fn one_mib() -> ThroughputResult {
        ThroughputResult {
            requested_bytes: 1_048_576,
            bytes_transferred: 1_048_576,
            elapsed_seconds: 0.5,
            bitrate_bps: 16_777_216.0,
        }
    }

    /// Every sub-test completed: probes of 10, 20 and 30 ms plus one failure
    pub fn complete_report() -> Report {
        let samples = [0.010, 0.020, 0.030];
        let ping = PingResult::new(stats::summarize(&samples).unwrap(), 1);
        let jitter = JitterResult::new(stats::jitter_summary(&samples).unwrap(), 3, 1);

        base(
            SubTestOutcome::Completed(ping),
            SubTestOutcome::Completed(jitter),
            SubTestOutcome::Completed(one_mib()),
            SubTestOutcome::Completed(one_mib()),
        )
    }

    /// Nothing completed: failed latency, a partial download and a skipped upload
    pub fn degraded_report() -> Report {
        base(
            SubTestOutcome::Failed(
                Failure::new(
                    FailureKind::InsufficientData,
                    "no successful probes out of 10; last failure: network error: connection refused",
                )
                .with_attempts(10),
            ),
            SubTestOutcome::Failed(
                Failure::new(FailureKind::InsufficientData, "jitter needs at least 2 samples, got 0")
                    .with_attempts(10),
            ),
            SubTestOutcome::Failed(
                Failure::new(FailureKind::Timeout, "transfer did not finish within 30.00s").with_bytes(300_000),
            ),
            SubTestOutcome::skipped(SkipReason::SessionBudgetExhausted),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_by_format() {
        let report = fixtures::complete_report();

        let json = OutputFormatterFactory::create_formatter(OutputFormat::Json, true, false)
            .format_report(&report)
            .unwrap();
        assert!(serde_json::from_str::<serde_json::Value>(&json).is_ok());

        let csv = OutputFormatterFactory::create_formatter(OutputFormat::Csv, true, false)
            .format_report(&report)
            .unwrap();
        assert!(csv.starts_with("timestamp,sub_test,status"));

        let text = OutputFormatterFactory::create_formatter(OutputFormat::Text, false, false)
            .format_report(&report)
            .unwrap();
        assert!(text.starts_with("=== INTERNET SPEED TEST RESULTS ==="));
    }

    #[test]
    fn test_factory_from_config() {
        let config = Config {
            output_format: OutputFormat::Csv,
            ..Config::default()
        };
        let out = OutputFormatterFactory::from_config(&config)
            .format_report(&fixtures::degraded_report())
            .unwrap();
        assert_eq!(out.lines().count(), 5);
    }
}
