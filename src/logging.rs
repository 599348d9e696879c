//! Structured logging for the internet speed tester
//!
//! Entries carry typed fields and the session ID shared by every logger of
//! a run. Output goes to stderr so that stdout carries only the report.

use crate::error::AppError;
use crate::models::{Config, Failure, Report, SkipReason};
use crate::sampler::{Operation, Sample};
use crate::types::{SessionState, SubTest};
use chrono::{DateTime, Utc};
use colored::{Color, Colorize};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-operation detail
    Debug = 1,
    /// Session progress
    Info = 2,
    /// Failed operations and configuration concerns
    Warn = 3,
    Error = 4,
    /// Only used as a threshold to silence a logger
    Fatal = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    fn color(&self) -> Color {
        match self {
            LogLevel::Debug => Color::Cyan,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
            LogLevel::Fatal => Color::Magenta,
        }
    }

    /// Minimum level implied by the verbosity flags
    pub fn from_flags(verbose: bool, debug: bool) -> Self {
        if debug {
            LogLevel::Debug
        } else if verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        }
    }
}

/// One log record before formatting
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    pub fields: HashMap<String, serde_json::Value>,
    /// Source file and line
    pub location: Option<(String, u32)>,
}

/// Where formatted entries end up
#[derive(Debug, Clone)]
pub enum LogSink {
    Stderr,
    /// Collected in memory, for inspection in tests
    Memory(Arc<Mutex<Vec<String>>>),
}

/// Console logger with a shared session ID
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    /// Append `@ file:line` to entries that carry a location
    include_location: bool,
    name: String,
    sink: LogSink,
    session_id: Arc<RwLock<Option<String>>>,
}

impl Logger {
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            name,
            sink: LogSink::Stderr,
            session_id: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a logger with specific configuration
    pub fn with_config(name: String, config: &Config) -> Self {
        Self {
            min_level: LogLevel::from_flags(config.verbose, config.debug),
            use_color: config.enable_color,
            include_location: config.debug,
            ..Self::new(name)
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    pub fn set_sink(&mut self, sink: LogSink) {
        self.sink = sink;
    }

    /// Attach the session ID to every subsequent entry
    pub async fn set_session_id(&self, session_id: String) {
        *self.session_id.write().await = Some(session_id);
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        if let Some(session_id) = self.session_id.read().await.as_ref() {
            entry.fields.insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }

        let output = self.format_console(&entry);
        match &self.sink {
            LogSink::Stderr => {
                let _ = writeln!(io::stderr(), "{}", output);
            }
            LogSink::Memory(lines) => {
                if let Ok(mut lines) = lines.lock() {
                    lines.push(output);
                }
            }
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level = format!("{:>5}", entry.level.as_str());
        let level = if self.use_color {
            level.color(entry.level.color()).to_string()
        } else {
            level
        };

        let mut output = format!("{} {} [{}] {}", timestamp, level, entry.logger, entry.message);

        // Sorted for stable output; the session ID is implied by the run
        let mut fields: Vec<String> = entry.fields.iter()
            .filter(|(k, _)| k.as_str() != "session_id")
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        if !fields.is_empty() {
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        if self.include_location {
            if let Some((file, line)) = &entry.location {
                output.push_str(&format!(" @ {}:{}", file, line));
            }
        }

        output
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                fields: HashMap::new(),
                location: None,
            },
        }
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32) -> Self {
        self.entry.location = Some((file.to_string(), line));
        self
    }

    /// Add timing information from a sample
    pub fn sample(self, sample: &Sample) -> Self {
        self.field("elapsed_ms", sample.elapsed.as_secs_f64() * 1000.0)
            .field("bytes", sample.bytes)
            .field("success", sample.is_success())
    }

    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_exit_code", error.exit_code())
    }

    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Logger for measurement events of one session
pub struct MeasurementLogger {
    logger: Logger,
}

impl MeasurementLogger {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Logger that discards everything below Fatal
    pub fn quiet() -> Self {
        let mut logger = Logger::new("MEASURE".to_string());
        logger.set_level(LogLevel::Fatal);
        Self { logger }
    }

    pub async fn log_session_start(&self, session_id: &Uuid, config: &Config) {
        self.logger.set_session_id(session_id.to_string()).await;
        self.logger.info(&format!("Starting speed test against {}", config.url))
            .field("url", &config.url)
            .field("upload_url", config.effective_upload_url())
            .field("download_bytes", config.download_bytes())
            .field("upload_bytes", config.upload_bytes())
            .field("ping_count", config.ping_count)
            .field("jitter_samples", config.jitter_samples)
            .field("timeout_seconds", config.timeout_seconds)
            .field("session_timeout_seconds", config.session_timeout_seconds)
            .log()
            .await;
    }

    pub async fn log_state_change(&self, from: SessionState, to: SessionState) {
        self.logger.debug(&format!("Session state {} -> {}", from, to))
            .field("from", from)
            .field("to", to)
            .log()
            .await;
    }

    /// One timed operation
    pub async fn log_sample(&self, operation: &Operation, attempt: u32, sample: &Sample) {
        match sample.describe_failure() {
            None => {
                self.logger.debug(&format!(
                    "{} #{} -> {:.2}ms",
                    operation.name(),
                    attempt,
                    sample.elapsed.as_secs_f64() * 1000.0
                ))
                .field("operation", operation.name())
                .field("attempt", attempt)
                .sample(sample)
                .log()
                .await;
            }
            Some(reason) => {
                self.logger.warn(&format!("{} #{} failed: {}", operation.name(), attempt, reason))
                    .field("operation", operation.name())
                    .field("attempt", attempt)
                    .field("url", operation.url())
                    .sample(sample)
                    .log()
                    .await;
            }
        }
    }

    pub async fn log_subtest_completed(&self, test: SubTest, summary: &str) {
        self.logger.info(&format!("{} completed: {}", test, summary))
            .field("sub_test", test)
            .field("status", "completed")
            .log()
            .await;
    }

    pub async fn log_subtest_failed(&self, test: SubTest, failure: &Failure) {
        self.logger.warn(&format!("{} failed: {}", test, failure))
            .field("sub_test", test)
            .field("status", "failed")
            .field("kind", failure.kind)
            .field("bytes_transferred", failure.bytes_transferred)
            .log()
            .await;
    }

    pub async fn log_subtest_skipped(&self, test: SubTest, reason: SkipReason) {
        self.logger.warn(&format!("{} skipped: {}", test, reason))
            .field("sub_test", test)
            .field("status", "skipped")
            .log()
            .await;
    }

    pub async fn log_session_end(&self, report: &Report) {
        let statuses: HashMap<&str, &str> = report.statuses()
            .iter()
            .map(|(test, status)| (test.name(), *status))
            .collect();

        self.logger.info(&format!(
            "Speed test finished in {:.2}s ({} error(s))",
            report.duration_seconds(),
            report.errors().len()
        ))
        .field("statuses", statuses)
        .field("has_success", report.has_success())
        .log()
        .await;
    }

    /// Log an application error with full context
    pub async fn log_error(&self, error: &AppError, context: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }
        builder.log().await;
    }
}

/// Global logger factory and management
pub struct LoggerFactory {
    config: Config,
    session_id: Uuid,
}

impl LoggerFactory {
    /// Create a new logger factory
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4(),
        }
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.to_string()).await;
        logger
    }

    /// Create a logger for measurement events
    pub async fn create_measurement_logger(&self) -> MeasurementLogger {
        MeasurementLogger::new(self.create_logger("MEASURE").await)
    }

    /// Get session ID
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!())
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
            .location(file!(), line!())
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!())
            .log()
            .await
    };
}
