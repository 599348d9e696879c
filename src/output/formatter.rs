//! Core formatting traits and the plain text implementation
//!
//! The text formatters share one section layout: `report_sections` turns a
//! [`Report`] into headed blocks of label/value lines, which the plain and
//! colored formatters then render.

use crate::{
    error::Result,
    models::{JitterResult, PingResult, Report, SubTestOutcome, ThroughputResult},
    types::SubTest,
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Render a complete session report
    fn format_report(&self, report: &Report) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Include session details (id, endpoints, duration)
    pub verbose_mode: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
        }
    }
}

pub(crate) const TITLE: &str = "=== INTERNET SPEED TEST RESULTS ===";
pub(crate) const UNAVAILABLE: &str = "unavailable";

/// How a section ended up
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SectionStatus {
    Completed,
    Failed(String),
    Skipped(String),
}

impl SectionStatus {
    fn from_outcome<T>(outcome: &SubTestOutcome<T>) -> Self {
        match outcome {
            SubTestOutcome::Completed(_) => Self::Completed,
            SubTestOutcome::Failed(failure) => Self::Failed(failure.to_string()),
            SubTestOutcome::Skipped { reason } => Self::Skipped(reason.to_string()),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Completed => "OK",
            Self::Failed(_) => "FAILED",
            Self::Skipped(_) => "SKIPPED",
        }
    }
}

/// Value of one line; `None` renders as the unavailable marker
pub(crate) type Line = (&'static str, Option<String>);

/// One headed block of the text report
#[derive(Debug, Clone)]
pub(crate) struct Section {
    pub heading: &'static str,
    pub status: SectionStatus,
    pub lines: Vec<Line>,
}

pub(crate) fn header_lines(report: &Report, verbose: bool) -> Vec<(&'static str, String)> {
    let mut lines = vec![("Timestamp", report.started_at().format("%Y-%m-%d %H:%M:%S UTC").to_string())];
    if verbose {
        lines.push(("Session", report.session_id().to_string()));
        lines.push(("URL", report.url().to_string()));
        lines.push(("Upload URL", report.upload_url().to_string()));
        lines.push(("Duration", format!("{:.2} seconds", report.duration_seconds())));
    }
    lines
}

pub(crate) fn report_sections(report: &Report) -> Vec<Section> {
    vec![
        ping_section(report.ping()),
        jitter_section(report.jitter()),
        throughput_section(SubTest::Download, report.download()),
        throughput_section(SubTest::Upload, report.upload()),
    ]
}

fn ms(value: f64) -> Option<String> {
    Some(format!("{:.2} ms", value))
}

fn samples(successes: u32, attempts: u32) -> Option<String> {
    Some(format!("{}/{}", successes, attempts))
}

fn percent(value: f64) -> Option<String> {
    Some(format!("{:.1}%", value))
}

fn ping_section(outcome: &SubTestOutcome<PingResult>) -> Section {
    let lines = match outcome.completed() {
        Some(ping) => vec![
            ("Min", ms(ping.summary.min_ms())),
            ("Avg", ms(ping.summary.mean_ms())),
            ("Max", ms(ping.summary.max_ms())),
            ("Samples", samples(ping.samples, ping.attempts())),
            ("Success Rate", percent(ping.success_rate_percent)),
        ],
        None => {
            let attempts = outcome.failure().and_then(|f| f.attempts);
            vec![
                ("Min", None),
                ("Avg", None),
                ("Max", None),
                ("Samples", attempts.and_then(|a| samples(0, a))),
            ]
        }
    };

    Section {
        heading: SubTest::Ping.heading(),
        status: SectionStatus::from_outcome(outcome),
        lines,
    }
}

fn jitter_section(outcome: &SubTestOutcome<JitterResult>) -> Section {
    let lines = match outcome.completed() {
        Some(jitter) => vec![
            ("Avg Jitter", ms(jitter.stats.mean_ms())),
            ("Min Jitter", ms(jitter.stats.min_ms())),
            ("Max Jitter", ms(jitter.stats.max_ms())),
            ("Std Dev", ms(jitter.stats.std_dev_ms())),
            ("Samples", samples(jitter.samples, jitter.attempts())),
            ("Success Rate", percent(jitter.success_rate_percent)),
        ],
        None => vec![
            ("Avg Jitter", None),
            ("Min Jitter", None),
            ("Max Jitter", None),
            ("Std Dev", None),
        ],
    };

    Section {
        heading: SubTest::Jitter.heading(),
        status: SectionStatus::from_outcome(outcome),
        lines,
    }
}

fn throughput_section(test: SubTest, outcome: &SubTestOutcome<ThroughputResult>) -> Section {
    let lines = match outcome.completed() {
        Some(result) => vec![
            ("Speed", Some(format!("{:.2} Mbps", result.mbps()))),
            ("Transferred", Some(format!("{:.2} MB", result.transferred_mb()))),
            ("Time", Some(format!("{:.2} seconds", result.elapsed_seconds))),
        ],
        None => {
            let partial = outcome
                .failure()
                .and_then(|f| f.bytes_transferred)
                .map(|bytes| format!("{:.2} MB (incomplete)", crate::models::bytes_to_mb(bytes)));
            vec![("Speed", None), ("Transferred", partial), ("Time", None)]
        }
    };

    Section {
        heading: test.heading(),
        status: SectionStatus::from_outcome(outcome),
        lines,
    }
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    fn render_section(&self, output: &mut String, section: &Section) -> std::fmt::Result {
        writeln!(output, "{}", section.heading)?;
        match &section.status {
            SectionStatus::Completed => {}
            SectionStatus::Failed(reason) | SectionStatus::Skipped(reason) => {
                writeln!(output, "  Status: {} ({})", section.status.label(), reason)?;
            }
        }
        for (label, value) in &section.lines {
            writeln!(output, "  {}: {}", label, value.as_deref().unwrap_or(UNAVAILABLE))?;
        }
        writeln!(output)
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_report(&self, report: &Report) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", TITLE)?;
        for (label, value) in header_lines(report, self.options.verbose_mode) {
            writeln!(output, "{}: {}", label, value)?;
        }
        writeln!(output)?;

        for section in report_sections(report) {
            self.render_section(&mut output, &section)?;
        }

        let errors = report.errors();
        if !errors.is_empty() {
            writeln!(output, "ERRORS")?;
            for error in errors {
                writeln!(output, "  - {}", error)?;
            }
        }

        Ok(output.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    fn plain(verbose: bool) -> PlainFormatter {
        PlainFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: verbose,
        })
    }

    #[test]
    fn test_complete_report_layout() {
        let text = plain(false).format_report(&fixtures::complete_report()).unwrap();

        assert!(text.starts_with(TITLE));
        assert!(text.contains("Timestamp: 2026-03-01 12:00:00 UTC"));
        assert!(text.contains("PING (LATENCY)\n  Min: 10.00 ms\n  Avg: 20.00 ms\n  Max: 30.00 ms"));
        assert!(text.contains("  Samples: 3/4\n  Success Rate: 75.0%"));
        assert!(text.contains("JITTER (STABILITY)\n  Avg Jitter: 10.00 ms"));
        assert!(text.contains("  Std Dev: 0.00 ms"));
        assert!(text.contains("DOWNLOAD\n  Speed: 16.78 Mbps\n  Transferred: 1.00 MB\n  Time: 0.50 seconds"));
        assert!(!text.contains("ERRORS"));
        assert!(!text.contains(UNAVAILABLE));
        assert!(!text.contains("Session:"));
    }

    #[test]
    fn test_failed_and_skipped_sections_are_explicit() {
        let text = plain(false).format_report(&fixtures::degraded_report()).unwrap();

        assert!(text.contains("PING (LATENCY)\n  Status: FAILED (insufficient_data: no successful probes"));
        assert!(text.contains("  Min: unavailable"));
        assert!(text.contains("  Samples: 0/10"));
        assert!(text.contains("JITTER (STABILITY)\n  Status: FAILED"));
        assert!(text.contains("  Avg Jitter: unavailable"));
        assert!(text.contains("DOWNLOAD\n  Status: FAILED (timeout:"));
        assert!(text.contains("  Transferred: 0.29 MB (incomplete)"));
        assert!(text.contains("UPLOAD\n  Status: SKIPPED (session budget exhausted)"));
        assert!(text.contains("ERRORS\n  - ping insufficient_data"));
        assert!(text.contains("  - upload skipped: session budget exhausted"));
    }

    #[test]
    fn test_verbose_adds_session_details() {
        let report = fixtures::complete_report();
        let text = plain(true).format_report(&report).unwrap();

        assert!(text.contains(&format!("Session: {}", report.session_id())));
        assert!(text.contains("URL: https://speed.example.net/__down"));
        assert!(text.contains("Duration: 3.00 seconds"));
    }
}
