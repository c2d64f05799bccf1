//! Resampling irregular sensor streams onto a uniform time grid.
//!
//! A [`Grid`] is the set of timestamps `k * period` (nanoseconds since the Unix epoch) that fall
//! inside a session's time range. Anchoring the grid to the epoch rather than to the first sample
//! makes every session at a given frequency share the same phase, and makes the grid a pure
//! function of the data and the frequency.
//!
//! Each column is resampled independently from its own non-missing samples. No value is ever
//! extrapolated: grid points before a column's first sample or after its last are missing.

use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};
use crate::stream::{Column, SensorStream};
use crate::timestamp::NANOS_PER_SECOND;

/// How a stream is mapped onto grid timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    /// Linear interpolation between the bracketing samples.
    Linear,
    /// The closer of the bracketing samples; ties go to the earlier one.
    Nearest,
    /// Mean of the samples in `[t, t + period)`.
    Mean,
}

/// Converts a frequency in hertz to a grid period in nanoseconds.
///
/// # Errors
/// Returns [`PreprocessError::InvalidFrequency`] for zero, negative, or non-finite frequencies,
/// and for frequencies so high the period rounds to zero nanoseconds.
pub fn period_from_frequency(frequency: f64) -> Result<i64> {
    if !frequency.is_finite() || frequency <= 0.0 {
        return Err(PreprocessError::InvalidFrequency { frequency });
    }
    let period = (NANOS_PER_SECOND as f64 / frequency).round();
    if period < 1.0 || period > i64::MAX as f64 {
        return Err(PreprocessError::InvalidFrequency { frequency });
    }
    Ok(period as i64)
}

/// Uniform, epoch-anchored output timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Grid {
    /// First timestamp, a multiple of `period`.
    pub start: i64,
    /// Spacing in nanoseconds.
    pub period: i64,
    /// Number of timestamps.
    pub len: usize,
}

impl Grid {
    /// Grid of every multiple of `period` inside `[first, last]`.
    ///
    /// Returns `None` when the range is empty or contains no multiple of the period.
    pub fn spanning(first: i64, last: i64, period: i64) -> Option<Grid> {
        if period <= 0 || last < first {
            return None;
        }
        let start = first.div_euclid(period) * period;
        let start = if start < first { start + period } else { start };
        let end = last.div_euclid(period) * period;
        if end < start {
            return None;
        }
        let len = ((end - start) / period) as usize + 1;
        Some(Grid { start, period, len })
    }

    /// Grid covering the union of the streams' time ranges.
    pub fn for_streams<'a, I>(streams: I, period: i64) -> Option<Grid>
    where
        I: IntoIterator<Item = &'a SensorStream>,
    {
        let (first, last) = streams
            .into_iter()
            .filter_map(SensorStream::span)
            .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))?;
        Grid::spanning(first, last, period)
    }

    /// Timestamp of the `i`th grid point.
    pub fn time(&self, i: usize) -> i64 {
        self.start + i as i64 * self.period
    }

    /// All grid timestamps in order.
    pub fn times(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len).map(move |i| self.time(i))
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Resamples one column given its timestamps.
///
/// `max_gap` (nanoseconds) stops `Linear` and `Nearest` from bridging dropouts: a grid point
/// whose bracketing samples are further apart than the gap is missing. Exact hits on a sample
/// always return that sample.
pub fn resample_column(
    times: &[i64],
    values: &[Option<f64>],
    grid: &Grid,
    method: ResampleMethod,
    max_gap: Option<i64>,
) -> Vec<Option<f64>> {
    let samples: Vec<(i64, f64)> = times
        .iter()
        .zip(values.iter())
        .filter_map(|(&t, v)| v.map(|v| (t, v)))
        .collect();
    if samples.is_empty() {
        return vec![None; grid.len];
    }
    match method {
        ResampleMethod::Linear | ResampleMethod::Nearest => {
            interpolate(&samples, grid, method, max_gap)
        }
        ResampleMethod::Mean => bin_mean(&samples, grid),
    }
}

fn interpolate(
    samples: &[(i64, f64)],
    grid: &Grid,
    method: ResampleMethod,
    max_gap: Option<i64>,
) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(grid.len);
    let mut j = 0usize;
    for t in grid.times() {
        while j + 1 < samples.len() && samples[j + 1].0 <= t {
            j += 1;
        }
        let (t0, v0) = samples[j];
        if t == t0 {
            out.push(Some(v0));
            continue;
        }
        if t < t0 || j + 1 >= samples.len() {
            out.push(None);
            continue;
        }
        let (t1, v1) = samples[j + 1];
        if max_gap.is_some_and(|gap| t1 - t0 > gap) {
            out.push(None);
            continue;
        }
        let value = match method {
            ResampleMethod::Nearest => {
                if t - t0 <= t1 - t {
                    v0
                } else {
                    v1
                }
            }
            _ => v0 + (v1 - v0) * ((t - t0) as f64 / (t1 - t0) as f64),
        };
        out.push(Some(value));
    }
    out
}

fn bin_mean(samples: &[(i64, f64)], grid: &Grid) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(grid.len);
    let mut j = 0usize;
    for t in grid.times() {
        let end = t + grid.period;
        while j < samples.len() && samples[j].0 < t {
            j += 1;
        }
        let mut sum = 0.0;
        let mut count = 0usize;
        while j < samples.len() && samples[j].0 < end {
            sum += samples[j].1;
            count += 1;
            j += 1;
        }
        out.push((count > 0).then(|| sum / count as f64));
    }
    out
}

/// Resamples every numeric column of a stream onto the grid, keeping the raw column names.
pub fn resample_stream(
    stream: &SensorStream,
    grid: &Grid,
    method: ResampleMethod,
    max_gap: Option<i64>,
) -> Vec<Column> {
    stream
        .columns
        .iter()
        .map(|column| {
            Column::new(
                column.name.clone(),
                resample_column(&stream.times, &column.values, grid, method, max_gap),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    const S: i64 = NANOS_PER_SECOND;

    #[test]
    fn test_period_from_frequency() {
        assert_eq!(period_from_frequency(1.0).unwrap(), S);
        assert_eq!(period_from_frequency(10.0).unwrap(), S / 10);
        assert_eq!(period_from_frequency(0.5).unwrap(), 2 * S);
        assert_eq!(period_from_frequency(3.0).unwrap(), 333_333_333);
    }

    #[test]
    fn test_invalid_frequencies() {
        for f in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e12] {
            assert!(matches!(
                period_from_frequency(f),
                Err(PreprocessError::InvalidFrequency { .. })
            ));
        }
    }

    #[test]
    fn test_grid_is_epoch_anchored() {
        let grid = Grid::spanning(S / 2, 3 * S + S / 2, S).unwrap();
        assert_eq!(grid.start, S);
        assert_eq!(grid.len, 3);
        let times: Vec<i64> = grid.times().collect();
        assert_eq!(times, vec![S, 2 * S, 3 * S]);
    }

    #[test]
    fn test_grid_includes_exact_endpoints() {
        let grid = Grid::spanning(0, 2 * S, S).unwrap();
        assert_eq!(grid.len, 3);
    }

    #[test]
    fn test_grid_without_multiple_is_none() {
        assert!(Grid::spanning(S / 4, S / 2, S).is_none());
        assert!(Grid::spanning(2 * S, S, S).is_none());
    }

    #[test]
    fn test_grid_negative_times() {
        let grid = Grid::spanning(-3 * S / 2, S / 2, S).unwrap();
        assert_eq!(grid.start, -S);
        assert_eq!(grid.len, 2);
    }

    #[test]
    fn test_linear_interpolation() {
        let times = [0, 2 * S];
        let values = [Some(0.0), Some(4.0)];
        let grid = Grid::spanning(0, 2 * S, S).unwrap();
        let out = resample_column(&times, &values, &grid, ResampleMethod::Linear, None);
        assert_eq!(out, vec![Some(0.0), Some(2.0), Some(4.0)]);
    }

    #[test]
    fn test_no_extrapolation() {
        let times = [S, 2 * S];
        let values = [Some(1.0), Some(2.0)];
        let grid = Grid::spanning(0, 3 * S, S).unwrap();
        for method in [ResampleMethod::Linear, ResampleMethod::Nearest] {
            let out = resample_column(&times, &values, &grid, method, None);
            assert_eq!(out, vec![None, Some(1.0), Some(2.0), None]);
        }
    }

    #[test]
    fn test_nearest_tie_goes_to_earlier() {
        let times = [0, S];
        let values = [Some(1.0), Some(2.0)];
        let grid = Grid::spanning(0, S, S / 2).unwrap();
        let out = resample_column(&times, &values, &grid, ResampleMethod::Nearest, None);
        assert_eq!(out, vec![Some(1.0), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_missing_values_are_bridged_per_column() {
        let times = [0, S, 2 * S];
        let values = [Some(0.0), None, Some(2.0)];
        let grid = Grid::spanning(0, 2 * S, S).unwrap();
        let out = resample_column(&times, &values, &grid, ResampleMethod::Linear, None);
        assert_eq!(out, vec![Some(0.0), Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_max_gap() {
        let times = [0, 10 * S];
        let values = [Some(0.0), Some(10.0)];
        let grid = Grid::spanning(0, 10 * S, 5 * S).unwrap();
        let out = resample_column(&times, &values, &grid, ResampleMethod::Linear, Some(2 * S));
        assert_eq!(out, vec![Some(0.0), None, Some(10.0)]);
    }

    #[test]
    fn test_bin_mean() {
        let times = [0, S / 4, S / 2, S + S / 2, 3 * S];
        let values = [Some(1.0), Some(2.0), Some(3.0), Some(10.0), Some(7.0)];
        let grid = Grid::spanning(0, 3 * S, S).unwrap();
        let out = resample_column(&times, &values, &grid, ResampleMethod::Mean, None);
        assert_eq!(out, vec![Some(2.0), Some(10.0), None, Some(7.0)]);
    }

    #[test]
    fn test_native_rate_reproduces_samples() {
        let period = S / 10;
        let times: Vec<i64> = (0..50).map(|i| 1_000 * S + i * period).collect();
        let values: Vec<Option<f64>> = (0..50).map(|i| Some((i as f64 * 0.3).sin())).collect();
        let grid = Grid::spanning(times[0], times[49], period).unwrap();
        assert_eq!(grid.len, 50);
        for method in [ResampleMethod::Linear, ResampleMethod::Nearest, ResampleMethod::Mean] {
            let out = resample_column(&times, &values, &grid, method, None);
            for (a, b) in out.iter().zip(values.iter()) {
                assert_approx_eq!(a.unwrap(), b.unwrap(), 1e-12);
            }
        }
    }

    #[test]
    fn test_all_missing_column() {
        let grid = Grid::spanning(0, 2 * S, S).unwrap();
        let out = resample_column(&[0, S], &[None, None], &grid, ResampleMethod::Linear, None);
        assert_eq!(out, vec![None, None, None]);
    }
}
