//! End-of-run summary statistics.

use serde::Serialize;
use thiserror::Error;

/// Errors computing statistics for one sensor.
#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    /// The series holds no values.
    #[error("no numeric readings for sensor: {0}")]
    EmptySeries(String),

    /// A statistic overflowed or was otherwise not a finite number.
    #[error("non-finite {statistic} for sensor: {sensor}")]
    NonFinite {
        sensor: String,
        statistic: &'static str,
    },
}

/// Round half away from zero to two decimal places.
///
/// Magnitudes too large to carry a fractional part are returned unchanged.
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / 100.0
}

/// Summary of one sensor's series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStatistics {
    pub sensor: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation; `None` when fewer than two values.
    pub std_dev: Option<f64>,
    pub computed_at: String,
}

impl SensorStatistics {
    /// Compute the summary for one series.
    ///
    /// All statistics except `count` are rounded to two decimal places.
    pub fn compute(sensor: &str, values: &[f64], computed_at: String) -> Result<Self, StatsError> {
        if values.is_empty() {
            return Err(StatsError::EmptySeries(sensor.to_string()));
        }

        let count = values.len();
        let mean = mean(values);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let median = median(values);
        let std_dev = (count > 1).then(|| sample_std_dev(values));

        let check = |statistic: &'static str, v: f64| {
            if v.is_finite() {
                Ok(round2(v))
            } else {
                Err(StatsError::NonFinite {
                    sensor: sensor.to_string(),
                    statistic,
                })
            }
        };

        Ok(Self {
            sensor: sensor.to_string(),
            count,
            mean: check("mean", mean)?,
            median: check("median", median)?,
            min: check("min", min)?,
            max: check("max", max)?,
            std_dev: std_dev.map(|s| check("std dev", s)).transpose()?,
            computed_at,
        })
    }
}

/// Arithmetic mean of a non-empty slice.
///
/// Falls back to summing `v / n` when the plain sum overflows, so any slice
/// of finite values has a finite mean.
fn mean(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        sum / n
    } else {
        values.iter().map(|v| v / n).sum()
    }
}

/// Sample standard deviation of a slice with at least two values.
///
/// Deviations are taken on values scaled by the largest magnitude so that
/// squaring them cannot overflow.
fn sample_std_dev(values: &[f64]) -> f64 {
    let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if scale == 0.0 {
        return 0.0;
    }

    let scaled: Vec<f64> = values.iter().map(|v| v / scale).collect();
    let centre = mean(&scaled);
    let sum_sq: f64 = scaled.iter().map(|v| (v - centre).powi(2)).sum();
    scale * (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Median of a non-empty slice; the mean of the two middle values when the
/// length is even.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        sorted[mid - 1] / 2.0 + sorted[mid] / 2.0
    } else {
        sorted[mid]
    }
}
