//! Machine-readable formatters: JSON and CSV
//!
//! Latency values are milliseconds and speeds Mbps, rounded to two decimal
//! places. A sub-test without a value always carries its status and reason.

use super::formatter::{OutputFormatter, UNAVAILABLE};
use crate::{
    error::{AppError, Result},
    models::{bytes_to_mb, JitterResult, PingResult, Report, SubTestOutcome, ThroughputResult},
    types::SubTest,
};
use serde_json::{json, Map, Value};

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `status` plus either the metrics or the failure/skip details
fn outcome_json<T>(outcome: &SubTestOutcome<T>, metrics: impl FnOnce(&T) -> Value) -> Result<Value> {
    let mut object = Map::new();
    object.insert("status".to_string(), json!(outcome.status()));

    match outcome {
        SubTestOutcome::Completed(value) => {
            if let Value::Object(fields) = metrics(value) {
                object.extend(fields);
            }
        }
        SubTestOutcome::Failed(failure) => {
            object.insert("error".to_string(), serde_json::to_value(failure)?);
        }
        SubTestOutcome::Skipped { reason } => {
            object.insert("reason".to_string(), serde_json::to_value(reason)?);
        }
    }

    Ok(Value::Object(object))
}

fn ping_json(ping: &PingResult) -> Value {
    json!({
        "min_ms": round2(ping.summary.min_ms()),
        "avg_ms": round2(ping.summary.mean_ms()),
        "max_ms": round2(ping.summary.max_ms()),
        "jitter_ms": ping.summary.jitter_ms().map(round2),
        "samples": ping.samples,
        "failed": ping.failed,
        "success_rate_percent": round2(ping.success_rate_percent),
    })
}

fn jitter_json(jitter: &JitterResult) -> Value {
    json!({
        "avg_ms": round2(jitter.stats.mean_ms()),
        "min_ms": round2(jitter.stats.min_ms()),
        "max_ms": round2(jitter.stats.max_ms()),
        "std_dev_ms": round2(jitter.stats.std_dev_ms()),
        "samples": jitter.samples,
        "failed": jitter.failed,
        "success_rate_percent": round2(jitter.success_rate_percent),
    })
}

fn throughput_json(result: &ThroughputResult) -> Value {
    json!({
        "speed_mbps": round2(result.mbps()),
        "bytes_transferred": result.bytes_transferred,
        "transferred_mb": round2(result.transferred_mb()),
        "time_seconds": round2(result.elapsed_seconds),
    })
}

/// JSON document formatter
#[derive(Debug, Default)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Report as a JSON value
    pub fn to_value(&self, report: &Report) -> Result<Value> {
        Ok(json!({
            "session_id": report.session_id(),
            "timestamp": report.started_at().to_rfc3339(),
            "duration_seconds": round2(report.duration_seconds()),
            "url": report.url(),
            "upload_url": report.upload_url(),
            "ping": outcome_json(report.ping(), ping_json)?,
            "jitter": outcome_json(report.jitter(), jitter_json)?,
            "download": outcome_json(report.download(), throughput_json)?,
            "upload": outcome_json(report.upload(), throughput_json)?,
            "errors": report.errors(),
        }))
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &Report) -> Result<String> {
        let value = self.to_value(report)?;
        let text = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(text)
    }
}

pub const CSV_HEADER: [&str; 15] = [
    "timestamp",
    "sub_test",
    "status",
    "min_ms",
    "avg_ms",
    "max_ms",
    "jitter_ms",
    "std_dev_ms",
    "speed_mbps",
    "transferred_mb",
    "time_seconds",
    "samples",
    "failed",
    "success_rate_percent",
    "error",
];

/// Marker for a column that does not apply to the row's sub-test
const NOT_APPLICABLE: &str = "n/a";

/// Cells from `min_ms` through `success_rate_percent`
type Metrics = [String; 11];

fn fixed(value: f64) -> String {
    format!("{:.2}", value)
}

fn na() -> String {
    NOT_APPLICABLE.to_string()
}

fn ping_cells(ping: &PingResult) -> Metrics {
    [
        fixed(ping.summary.min_ms()),
        fixed(ping.summary.mean_ms()),
        fixed(ping.summary.max_ms()),
        ping.summary.jitter_ms().map(fixed).unwrap_or_else(|| UNAVAILABLE.to_string()),
        na(),
        na(),
        na(),
        na(),
        ping.samples.to_string(),
        ping.failed.to_string(),
        format!("{:.1}", ping.success_rate_percent),
    ]
}

fn jitter_cells(jitter: &JitterResult) -> Metrics {
    [
        fixed(jitter.stats.min_ms()),
        fixed(jitter.stats.mean_ms()),
        fixed(jitter.stats.max_ms()),
        na(),
        fixed(jitter.stats.std_dev_ms()),
        na(),
        na(),
        na(),
        jitter.samples.to_string(),
        jitter.failed.to_string(),
        format!("{:.1}", jitter.success_rate_percent),
    ]
}

fn throughput_cells(result: &ThroughputResult) -> Metrics {
    [
        na(),
        na(),
        na(),
        na(),
        na(),
        fixed(result.mbps()),
        fixed(result.transferred_mb()),
        fixed(result.elapsed_seconds),
        na(),
        na(),
        na(),
    ]
}

/// Applicable cells of a sub-test without a value; partial bytes are kept
fn missing_cells<T>(outcome: &SubTestOutcome<T>, test: SubTest) -> Metrics {
    let unavailable = || UNAVAILABLE.to_string();
    let mut cells = match test {
        SubTest::Ping => [
            unavailable(), unavailable(), unavailable(), unavailable(), na(), na(), na(), na(),
            unavailable(), unavailable(), unavailable(),
        ],
        SubTest::Jitter => [
            unavailable(), unavailable(), unavailable(), na(), unavailable(), na(), na(), na(),
            unavailable(), unavailable(), unavailable(),
        ],
        SubTest::Download | SubTest::Upload => [
            na(), na(), na(), na(), na(), unavailable(), unavailable(), unavailable(), na(), na(), na(),
        ],
    };

    if matches!(test, SubTest::Download | SubTest::Upload) {
        if let Some(bytes) = outcome.failure().and_then(|f| f.bytes_transferred) {
            cells[6] = fixed(bytes_to_mb(bytes));
        }
    }
    cells
}

/// One CSV row per sub-test with a status column
#[derive(Debug, Default)]
pub struct CsvFormatter;

impl CsvFormatter {
    pub fn new() -> Self {
        Self
    }

    fn row<T>(timestamp: &str, test: SubTest, outcome: &SubTestOutcome<T>, cells: impl FnOnce(&T) -> Metrics) -> Vec<String> {
        let metrics = match outcome.completed() {
            Some(value) => cells(value),
            None => missing_cells(outcome, test),
        };

        let mut row = Vec::with_capacity(CSV_HEADER.len());
        row.push(timestamp.to_string());
        row.push(test.name().to_string());
        row.push(outcome.status().to_string());
        row.extend(metrics);
        row.push(outcome.annotation().unwrap_or_default());
        row
    }
}

impl OutputFormatter for CsvFormatter {
    fn format_report(&self, report: &Report) -> Result<String> {
        let timestamp = report.started_at().to_rfc3339();
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer.write_record(CSV_HEADER)?;
        writer.write_record(Self::row(&timestamp, SubTest::Ping, report.ping(), ping_cells))?;
        writer.write_record(Self::row(&timestamp, SubTest::Jitter, report.jitter(), jitter_cells))?;
        writer.write_record(Self::row(&timestamp, SubTest::Download, report.download(), throughput_cells))?;
        writer.write_record(Self::row(&timestamp, SubTest::Upload, report.upload(), throughput_cells))?;

        let bytes = writer
            .into_inner()
            .map_err(|e| AppError::output(format!("Failed to flush CSV output: {}", e)))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| AppError::output(format!("CSV output is not UTF-8: {}", e)))?;

        Ok(text.trim_end().to_string())
    }
}
