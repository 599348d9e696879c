//! Statistics over timing samples
//!
//! Every function takes samples in arrival order, in seconds, and only
//! successful samples. Empty input is an error rather than a zero-filled
//! summary so that a missing measurement can never look like a fast one.


use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Summary of a non-empty sample set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Mean absolute difference between consecutive samples.
    /// `None` with fewer than two samples.
    pub jitter: Option<f64>,
}

impl StatSummary {
    pub fn mean_ms(&self) -> f64 {
        self.mean * 1000.0
    }

    pub fn min_ms(&self) -> f64 {
        self.min * 1000.0
    }

    pub fn max_ms(&self) -> f64 {
        self.max * 1000.0
    }

    pub fn jitter_ms(&self) -> Option<f64> {
        self.jitter.map(|j| j * 1000.0)
    }
}

/// Distribution of consecutive latency differences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JitterStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub std_dev: f64,
}

impl JitterStats {
    pub fn mean_ms(&self) -> f64 {
        self.mean * 1000.0
    }

    pub fn min_ms(&self) -> f64 {
        self.min * 1000.0
    }

    pub fn max_ms(&self) -> f64 {
        self.max * 1000.0
    }

    pub fn std_dev_ms(&self) -> f64 {
        self.std_dev * 1000.0
    }
}

/// Summarize successful samples
pub fn summarize(samples: &[f64]) -> Result<StatSummary> {
    if samples.is_empty() {
        return Err(AppError::insufficient_data("cannot summarize zero samples"));
    }

    let (min, max) = min_max(samples);
    // Rounding in the sum must not push the mean outside the observed range
    let average = mean(samples).clamp(min, max);

    let jitter = if samples.len() < 2 {
        None
    } else {
        Some(mean(&consecutive_differences(samples)))
    };

    Ok(StatSummary {
        count: samples.len(),
        mean: average,
        min,
        max,
        jitter,
    })
}

/// Absolute differences between neighbouring samples
pub fn consecutive_differences(samples: &[f64]) -> Vec<f64> {
    samples.windows(2).map(|pair| (pair[1] - pair[0]).abs()).collect()
}

/// Sample standard deviation; 0 for fewer than two values
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let mean = mean(values);
    let variance = values.iter()
        .map(|x| (x - mean).powi(2))
        .sum::<f64>() / (values.len() - 1) as f64;

    variance.sqrt()
}

/// Mean/min/max/standard deviation of consecutive differences
pub fn jitter_summary(samples: &[f64]) -> Result<JitterStats> {
    if samples.len() < 2 {
        return Err(AppError::insufficient_data(format!(
            "jitter needs at least 2 samples, got {}",
            samples.len()
        )));
    }

    let diffs = consecutive_differences(samples);
    let (min, max) = min_max(&diffs);

    Ok(JitterStats {
        mean: mean(&diffs).clamp(min, max),
        min,
        max,
        std_dev: std_dev(&diffs),
    })
}

/// Bits per second for `bytes` moved in `elapsed`.
///
/// Durations at or below `min_duration` are rejected since timer
/// resolution would dominate the result.
pub fn bitrate_bps(bytes: u64, elapsed: Duration, min_duration: Duration) -> Result<f64> {
    if elapsed <= min_duration {
        return Err(AppError::measurement(format!(
            "elapsed {:.3} ms is too short to measure (minimum {} ms)",
            elapsed.as_secs_f64() * 1000.0,
            min_duration.as_millis()
        )));
    }

    Ok(bytes as f64 * 8.0 / elapsed.as_secs_f64())
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}
