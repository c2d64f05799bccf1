//! Timestamp parsing and formatting.
//!
//! All timestamps are carried as `i64` nanoseconds since the Unix epoch (UTC). Integer arithmetic
//! on nanoseconds keeps resampling grids exactly evenly spaced, which floating point seconds
//! would not.
//!
//! Raw Sensor Logger files store the `time` column as integer nanoseconds. Tables written by this
//! crate (and by the earlier pandas pipeline) use `YYYY-MM-DD hh:mm:ss[.fff]+00:00` strings, and
//! the INS outputs use floating point Unix seconds. All of these parse here.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Nanoseconds in one second.
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Output format of the `time` column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    /// `YYYY-MM-DD hh:mm:ss[.fff]+00:00`, readable by the strapdown `TestDataRecord` loader.
    #[default]
    Datetime,
    /// Seconds since the Unix epoch.
    Unix,
}

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a timestamp cell into nanoseconds since the Unix epoch.
///
/// Numeric values are scaled by magnitude: at least 1e17 is nanoseconds, 1e14 microseconds,
/// 1e11 milliseconds, anything smaller is seconds. Strings are tried as RFC 3339, then as
/// `YYYY-MM-DD hh:mm:ss[.f]` with or without a UTC offset (no offset means UTC).
///
/// Returns `None` for empty or unparseable input.
pub fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(value) = raw.parse::<i64>() {
        return scale_integer(value);
    }
    if let Some(nanos) = parse_decimal_seconds(raw) {
        return Some(nanos);
    }
    if let Ok(value) = raw.parse::<f64>() {
        return scale_float(value);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp_nanos_opt();
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return dt.timestamp_nanos_opt();
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_utc().timestamp_nanos_opt();
        }
    }
    None
}

fn scale_integer(value: i64) -> Option<i64> {
    let magnitude = value.unsigned_abs();
    if magnitude >= 100_000_000_000_000_000 {
        Some(value)
    } else if magnitude >= 100_000_000_000_000 {
        value.checked_mul(1_000)
    } else if magnitude >= 100_000_000_000 {
        value.checked_mul(1_000_000)
    } else {
        value.checked_mul(NANOS_PER_SECOND)
    }
}

/// Exact parse of `[-]seconds.fraction` when the magnitude is in seconds.
fn parse_decimal_seconds(raw: &str) -> Option<i64> {
    let (whole, fraction) = raw.split_once('.')?;
    let negative = whole.starts_with('-');
    let digits = whole.trim_start_matches(|c| c == '-' || c == '+');
    if digits.is_empty() && fraction.is_empty() {
        return None;
    }
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if !all_digits(digits) || !all_digits(fraction) {
        return None;
    }
    let seconds: i64 = if digits.is_empty() { 0 } else { digits.parse().ok()? };
    if seconds >= 100_000_000_000 {
        return None;
    }
    let mut padded: String = fraction.chars().take(9).collect();
    while padded.len() < 9 {
        padded.push('0');
    }
    let nanos = seconds * NANOS_PER_SECOND + padded.parse::<i64>().ok()?;
    Some(if negative { -nanos } else { nanos })
}

fn scale_float(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let magnitude = value.abs();
    let nanos = if magnitude >= 1e17 {
        value
    } else if magnitude >= 1e14 {
        value * 1e3
    } else if magnitude >= 1e11 {
        value * 1e6
    } else {
        value * 1e9
    };
    // i64 holds roughly +-9.22e18 ns
    if nanos.abs() >= 9.2e18 {
        return None;
    }
    Some(nanos.round() as i64)
}

/// Format nanoseconds since the Unix epoch for an output table.
///
/// Fractional seconds are only printed when present, so whole-second grids read
/// `2025-06-01 12:00:00+00:00` exactly as the pandas pipeline wrote them.
pub fn format_timestamp(nanos: i64, format: TimeFormat) -> String {
    match format {
        TimeFormat::Datetime => DateTime::<Utc>::from_timestamp_nanos(nanos)
            .format("%Y-%m-%d %H:%M:%S%.f%:z")
            .to_string(),
        TimeFormat::Unix => {
            let sign = if nanos < 0 { "-" } else { "" };
            let magnitude = nanos.unsigned_abs();
            let seconds = magnitude / NANOS_PER_SECOND as u64;
            let fraction = magnitude % NANOS_PER_SECOND as u64;
            if fraction == 0 {
                format!("{}{}", sign, seconds)
            } else {
                let text = format!("{}{}.{:09}", sign, seconds, fraction);
                text.trim_end_matches('0').to_string()
            }
        }
    }
}
