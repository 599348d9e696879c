//! Colored formatter implementation with terminal color support
//!
//! Renders the same sections as the plain formatter, with ANSI colors
//! graded by latency, success rate and throughput.

use super::formatter::{
    header_lines, report_sections, FormattingOptions, OutputFormatter, Section, SectionStatus, TITLE, UNAVAILABLE,
};
use crate::{error::Result, models::Report};
use colored::*;
use std::fmt::Write as _;

/// Performance level classification for color coding
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl PerformanceLevel {
    /// Grade a round-trip latency in milliseconds
    pub fn from_latency_ms(latency_ms: f64) -> Self {
        if latency_ms < 20.0 {
            Self::Excellent
        } else if latency_ms < 50.0 {
            Self::Good
        } else if latency_ms < 100.0 {
            Self::Fair
        } else if latency_ms < 300.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    /// Grade a throughput in megabits per second
    pub fn from_speed_mbps(mbps: f64) -> Self {
        if mbps >= 100.0 {
            Self::Excellent
        } else if mbps >= 25.0 {
            Self::Good
        } else if mbps >= 10.0 {
            Self::Fair
        } else if mbps >= 1.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    /// Get color for this performance level
    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }

    /// Get descriptive text
    pub fn description(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    /// Bold and colored if colors are enabled
    fn emphasize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.bold().color(color)
        } else {
            text.normal()
        }
    }

    /// Pick a color for a rendered value from its label and text
    fn value_color(&self, label: &str, value: &str) -> Color {
        let number = value
            .split_whitespace()
            .next()
            .and_then(|n| n.trim_end_matches('%').parse::<f64>().ok());

        match (label, number) {
            ("Min" | "Avg" | "Max", Some(ms)) => PerformanceLevel::from_latency_ms(ms).color(),
            ("Speed", Some(mbps)) => PerformanceLevel::from_speed_mbps(mbps).color(),
            ("Success Rate", Some(pct)) if pct >= 95.0 => self.color_scheme.success,
            ("Success Rate", Some(pct)) if pct >= 80.0 => self.color_scheme.warning,
            ("Success Rate", Some(_)) => self.color_scheme.error,
            _ => self.color_scheme.info,
        }
    }

    fn render_section(&self, output: &mut String, section: &Section) -> std::fmt::Result {
        let marker = match &section.status {
            SectionStatus::Completed => self.colorize("✓", self.color_scheme.success),
            SectionStatus::Failed(_) => self.colorize("✗", self.color_scheme.error),
            SectionStatus::Skipped(_) => self.colorize("-", self.color_scheme.warning),
        };
        writeln!(
            output,
            "{} {}",
            marker,
            self.emphasize(section.heading, self.color_scheme.header)
        )?;

        match &section.status {
            SectionStatus::Completed => {}
            SectionStatus::Failed(reason) => {
                writeln!(output, "  Status: {} ({})", self.colorize("FAILED", self.color_scheme.error), reason)?;
            }
            SectionStatus::Skipped(reason) => {
                writeln!(output, "  Status: {} ({})", self.colorize("SKIPPED", self.color_scheme.warning), reason)?;
            }
        }

        for (label, value) in &section.lines {
            let rendered = match value {
                Some(value) => self.colorize(value, self.value_color(label, value)),
                None => self.colorize(UNAVAILABLE, self.color_scheme.muted),
            };
            writeln!(output, "  {}: {}", label, rendered)?;
        }
        writeln!(output)
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_report(&self, report: &Report) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "{}", self.emphasize(TITLE, self.color_scheme.header))?;
        for (label, value) in header_lines(report, self.options.verbose_mode) {
            writeln!(output, "{}: {}", label, self.colorize(&value, self.color_scheme.muted))?;
        }
        writeln!(output)?;

        for section in report_sections(report) {
            self.render_section(&mut output, &section)?;
        }

        let errors = report.errors();
        if !errors.is_empty() {
            writeln!(output, "{}", self.emphasize("ERRORS", self.color_scheme.error))?;
            for error in errors {
                writeln!(output, "  - {}", self.colorize(&error, self.color_scheme.error))?;
            }
        }

        Ok(output.trim_end().to_string())
    }
}
