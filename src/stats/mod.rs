//! Streaming collection and end-of-run statistics.
//!
//! - [`collector`]: [`SensorSeries`], the per-sensor numeric series for one run
//! - [`summary`]: [`SensorStatistics`] computed once the run ends

pub mod collector;
pub mod summary;

pub use collector::{coerce_numeric, SensorSeries};
pub use summary::{round2, SensorStatistics, StatsError};

/// Compute statistics for every series in first-observed order.
///
/// A sensor whose statistics cannot be computed is reported in the second
/// vector and has no entry in the first.
pub fn summarize(
    series: &SensorSeries,
    computed_at: impl Fn() -> String,
) -> (Vec<SensorStatistics>, Vec<StatsError>) {
    let mut computed = Vec::with_capacity(series.len());
    let mut failed = Vec::new();

    for (sensor, values) in series.iter() {
        match SensorStatistics::compute(sensor, values, computed_at()) {
            Ok(stats) => computed.push(stats),
            Err(e) => failed.push(e),
        }
    }

    (computed, failed)
}
