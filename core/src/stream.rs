//! Loading raw per-sensor CSV files into time-indexed streams.
//!
//! A Sensor Logger export has one CSV per sensor with a `time` column (integer nanoseconds), a
//! `seconds_elapsed` column, and the sensor's fields. This module reads any such file into a
//! [`SensorStream`]: a sorted, duplicate-free vector of timestamps plus one column of optional
//! values per field. Empty cells are missing values. Rows that cannot be parsed are logged as
//! [`PreprocessError::MalformedRow`] and skipped.

use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};

use crate::error::{PreprocessError, Result};
use crate::timestamp::parse_timestamp;

/// Column names recognized as the time index (case-insensitive).
pub const TIME_COLUMNS: [&str; 2] = ["time", "timestamp"];

/// Column dropped from every Sensor Logger file.
pub const SECONDS_ELAPSED: &str = "seconds_elapsed";

/// Options controlling which columns of a CSV are kept and how they are read.
#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    /// Columns to discard entirely.
    pub drop_columns: Vec<String>,
    /// Columns kept verbatim as text instead of parsed as numbers.
    pub text_columns: Vec<String>,
    /// Ignore columns whose non-empty cells are all non-numeric instead of rejecting every row.
    pub skip_text_columns: bool,
}

impl ReadOptions {
    /// Options for raw Sensor Logger files: drop `seconds_elapsed` and any text-only column
    /// (such as a serialized covariance in a ground-truth export).
    pub fn sensor_logger() -> Self {
        ReadOptions {
            drop_columns: vec![SECONDS_ELAPSED.to_string()],
            text_columns: Vec::new(),
            skip_text_columns: true,
        }
    }

    fn drops(&self, name: &str) -> bool {
        self.drop_columns.iter().any(|c| c == name)
    }

    fn is_text(&self, name: &str) -> bool {
        self.text_columns.iter().any(|c| c == name)
    }
}

/// A column of numeric values with its header name.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    /// Number of non-missing values.
    pub fn count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// A column of raw text values with its header name.
#[derive(Clone, Debug, PartialEq)]
pub struct TextColumn {
    pub name: String,
    pub values: Vec<String>,
}

/// One sensor's readings, sorted by timestamp.
///
/// Timestamps are nanoseconds since the Unix epoch, strictly increasing. Every column has
/// exactly `times.len()` entries.
#[derive(Clone, Debug, Default)]
pub struct SensorStream {
    /// Source file the stream was read from.
    pub source: PathBuf,
    pub times: Vec<i64>,
    pub columns: Vec<Column>,
    pub text_columns: Vec<TextColumn>,
    /// Source line of every row, for error reporting.
    pub lines: Vec<u64>,
    /// Rows skipped as malformed.
    pub skipped_rows: usize,
    /// Rows dropped because their timestamp repeated an earlier row.
    pub duplicate_rows: usize,
}

impl SensorStream {
    /// Reads a CSV file into a stream.
    ///
    /// The time column is the header named `time` or `timestamp`, otherwise the first column.
    /// With [`ReadOptions::skip_text_columns`], columns holding only text are left out first.
    /// Rows with the wrong number of fields, an unparseable timestamp, or a non-numeric value in a
    /// numeric column are skipped with a warning. Rows are then sorted by time (stable) and
    /// repeated timestamps keep their first occurrence.
    ///
    /// A file without a header row yields an empty stream.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or read.
    ///
    /// # Example
    /// ```no_run
    /// use mems_nav::stream::{ReadOptions, SensorStream};
    ///
    /// let gyro = SensorStream::from_csv("data/raw/drive/Gyroscope.csv", &ReadOptions::sensor_logger())
    ///     .expect("Failed to read gyroscope data");
    /// println!("{} samples", gyro.len());
    /// ```
    pub fn from_csv<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            debug!("{} is empty", path.display());
            return Ok(SensorStream {
                source: path.to_path_buf(),
                ..Default::default()
            });
        }
        let time_idx = headers
            .iter()
            .position(|h| TIME_COLUMNS.iter().any(|t| h.trim().eq_ignore_ascii_case(t)))
            .unwrap_or(0);

        let mut numeric: Vec<(usize, String)> = Vec::new();
        let mut text: Vec<(usize, String)> = Vec::new();
        for (idx, name) in headers.iter().enumerate() {
            let name = name.trim();
            if idx == time_idx || options.drops(name) {
                continue;
            }
            if options.is_text(name) {
                text.push((idx, name.to_string()));
            } else {
                numeric.push((idx, name.to_string()));
            }
        }

        let mut stream = SensorStream {
            source: path.to_path_buf(),
            ..Default::default()
        };
        let mut rows: Vec<(i64, u64, StringRecord)> = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let fallback_line = i as u64 + 2;
            let record = match result {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    let line = e.position().map_or(fallback_line, |p| p.line());
                    stream.skip(PreprocessError::malformed_row(path, line, e.to_string()));
                    continue;
                }
            };
            let line = record.position().map_or(fallback_line, |p| p.line());

            if record.len() != headers.len() {
                stream.skip(PreprocessError::malformed_row(
                    path,
                    line,
                    format!("expected {} fields, found {}", headers.len(), record.len()),
                ));
                continue;
            }

            let raw_time = record.get(time_idx).unwrap_or_default();
            let Some(time) = parse_timestamp(raw_time) else {
                stream.skip(PreprocessError::malformed_row(
                    path,
                    line,
                    format!("unparseable timestamp '{}'", raw_time),
                ));
                continue;
            };
            rows.push((time, line, record));
        }

        if options.skip_text_columns {
            numeric.retain(|(idx, name)| {
                let text_only = is_text_only(&rows, *idx);
                if text_only {
                    debug!(
                        "{}: column '{}' holds no numeric values, ignoring it",
                        path.display(),
                        name
                    );
                }
                !text_only
            });
        }
        stream.columns = numeric
            .iter()
            .map(|(_, name)| Column::new(name.as_str(), Vec::new()))
            .collect();
        stream.text_columns = text
            .iter()
            .map(|(_, name)| TextColumn {
                name: name.clone(),
                values: Vec::new(),
            })
            .collect();

        let mut row_values: Vec<Option<f64>> = Vec::with_capacity(numeric.len());
        for (time, line, record) in rows {
            row_values.clear();
            let mut bad_field = None;
            for (idx, name) in &numeric {
                let cell = record.get(*idx).unwrap_or_default().trim();
                match parse_cell(cell) {
                    Ok(value) => row_values.push(value),
                    Err(()) => {
                        bad_field = Some(format!(
                            "non-numeric value '{}' in column '{}'",
                            cell, name
                        ));
                        break;
                    }
                }
            }
            if let Some(reason) = bad_field {
                stream.skip(PreprocessError::malformed_row(path, line, reason));
                continue;
            }

            stream.times.push(time);
            stream.lines.push(line);
            for (column, value) in stream.columns.iter_mut().zip(row_values.iter()) {
                column.values.push(*value);
            }
            for (column, (idx, _)) in stream.text_columns.iter_mut().zip(text.iter()) {
                column
                    .values
                    .push(record.get(*idx).unwrap_or_default().to_string());
            }
        }

        stream.sort_and_dedup();
        debug!(
            "Read {} rows from {} ({} malformed, {} duplicate timestamps)",
            stream.len(),
            path.display(),
            stream.skipped_rows,
            stream.duplicate_rows
        );
        Ok(stream)
    }

    fn skip(&mut self, err: PreprocessError) {
        warn!("Skipping row: {}", err);
        self.skipped_rows += 1;
    }

    /// Sorts rows by time (stable) and keeps the first row of every repeated timestamp.
    fn sort_and_dedup(&mut self) {
        let already_sorted = self.times.windows(2).all(|w| w[0] < w[1]);
        if already_sorted {
            return;
        }
        let mut order: Vec<usize> = (0..self.times.len()).collect();
        order.sort_by_key(|&i| self.times[i]);
        let mut keep: Vec<usize> = Vec::with_capacity(order.len());
        for i in order {
            match keep.last() {
                Some(&last) if self.times[last] == self.times[i] => self.duplicate_rows += 1,
                _ => keep.push(i),
            }
        }
        self.times = keep.iter().map(|&i| self.times[i]).collect();
        self.lines = keep.iter().map(|&i| self.lines[i]).collect();
        for column in &mut self.columns {
            column.values = keep.iter().map(|&i| column.values[i]).collect();
        }
        for column in &mut self.text_columns {
            column.values = keep.iter().map(|&i| column.values[i].clone()).collect();
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// First and last timestamp, if any rows exist.
    pub fn span(&self) -> Option<(i64, i64)> {
        Some((*self.times.first()?, *self.times.last()?))
    }

    /// Looks up a numeric column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Looks up a text column by name.
    pub fn text_column(&self, name: &str) -> Option<&TextColumn> {
        self.text_columns.iter().find(|c| c.name == name)
    }
}

/// True when the column has at least one non-empty cell and none of them parse as a number.
fn is_text_only(rows: &[(i64, u64, StringRecord)], idx: usize) -> bool {
    let mut cells = rows
        .iter()
        .map(|(_, _, record)| record.get(idx).unwrap_or_default().trim())
        .filter(|cell| !cell.is_empty())
        .peekable();
    cells.peek().is_some() && cells.all(|cell| parse_cell(cell).is_err())
}

/// Empty and non-finite cells are missing; anything else must parse as a float.
fn parse_cell(cell: &str) -> std::result::Result<Option<f64>, ()> {
    if cell.is_empty() {
        return Ok(None);
    }
    let value: f64 = cell.parse().map_err(|_| ())?;
    Ok(value.is_finite().then_some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_sensor_logger_file() {
        let file = write_csv(
            "time,seconds_elapsed,z,y,x\n\
             1748779200000000000,0.0,0.1,0.2,0.3\n\
             1748779200100000000,0.1,0.4,0.5,0.6\n",
        );
        let stream = SensorStream::from_csv(file.path(), &ReadOptions::sensor_logger()).unwrap();
        assert_eq!(stream.len(), 2);
        let names: Vec<&str> = stream.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["z", "y", "x"]);
        assert_eq!(stream.times[1] - stream.times[0], 100_000_000);
        assert_eq!(stream.column("x").unwrap().values, vec![Some(0.3), Some(0.6)]);
        assert_eq!(stream.skipped_rows, 0);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let file = write_csv(
            "time,seconds_elapsed,x\n\
             1748779200000000000,0.0,1.0\n\
             not-a-time,0.1,2.0\n\
             1748779200200000000,0.2,abc\n\
             1748779200300000000,0.3\n\
             1748779200400000000,0.4,5.0\n",
        );
        let stream = SensorStream::from_csv(file.path(), &ReadOptions::sensor_logger()).unwrap();
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.skipped_rows, 3);
        assert_eq!(stream.column("x").unwrap().values, vec![Some(1.0), Some(5.0)]);
    }

    #[test]
    fn test_empty_cells_are_missing_values() {
        let file = write_csv("time,pressure,relativeAltitude\n1748779200,1013.2,\n");
        let stream = SensorStream::from_csv(file.path(), &ReadOptions::default()).unwrap();
        assert_eq!(stream.skipped_rows, 0);
        assert_eq!(stream.column("pressure").unwrap().values, vec![Some(1013.2)]);
        assert_eq!(stream.column("relativeAltitude").unwrap().values, vec![None]);
    }

    #[test]
    fn test_unsorted_rows_and_duplicates() {
        let file = write_csv("time,x\n3,30.0\n1,10.0\n2,20.0\n1,99.0\n");
        let stream = SensorStream::from_csv(file.path(), &ReadOptions::default()).unwrap();
        assert_eq!(stream.times, vec![1_000_000_000, 2_000_000_000, 3_000_000_000]);
        // the first of the repeated rows wins
        assert_eq!(
            stream.column("x").unwrap().values,
            vec![Some(10.0), Some(20.0), Some(30.0)]
        );
        assert_eq!(stream.duplicate_rows, 1);
        assert_eq!(stream.lines, vec![3, 4, 2]);
    }

    #[test]
    fn test_time_column_found_by_name() {
        let file = write_csv("x,timestamp\n1.0,2025-06-01 12:00:00+00:00\n");
        let stream = SensorStream::from_csv(file.path(), &ReadOptions::default()).unwrap();
        assert_eq!(stream.times, vec![1_748_779_200_000_000_000]);
        assert_eq!(stream.columns.len(), 1);
        assert_eq!(stream.columns[0].name, "x");
    }

    #[test]
    fn test_text_columns() {
        let file = write_csv("time,latitude,covariance\n1,40.0,\"1,0,0,1\"\n");
        let options = ReadOptions {
            text_columns: vec!["covariance".to_string()],
            ..Default::default()
        };
        let stream = SensorStream::from_csv(file.path(), &options).unwrap();
        assert_eq!(stream.columns.len(), 1);
        assert_eq!(stream.text_column("covariance").unwrap().values, vec!["1,0,0,1"]);
    }

    #[test]
    fn test_text_only_columns_are_ignored() {
        let file = write_csv(
            "time,latitude,mode,covariance\n\
             1,40.0,walk,\"1,0,0,1\"\n\
             2,40.1,,\"1,0,0,1\"\n\
             3,40.2,run,\"1,0,0,1\"\n",
        );
        let stream = SensorStream::from_csv(file.path(), &ReadOptions::sensor_logger()).unwrap();
        assert_eq!(stream.len(), 3);
        assert_eq!(stream.skipped_rows, 0);
        let names: Vec<&str> = stream.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["latitude"]);

        // without the option every row is rejected
        let strict = SensorStream::from_csv(file.path(), &ReadOptions::default()).unwrap();
        assert!(strict.is_empty());
        assert_eq!(strict.skipped_rows, 3);
    }

    #[test]
    fn test_stray_text_in_numeric_column_still_skips_row() {
        let file = write_csv("time,x\n1,1.0\n2,abc\n3,3.0\n");
        let stream = SensorStream::from_csv(file.path(), &ReadOptions::sensor_logger()).unwrap();
        assert_eq!(stream.column("x").unwrap().values, vec![Some(1.0), Some(3.0)]);
        assert_eq!(stream.skipped_rows, 1);
    }

    #[test]
    fn test_empty_file_is_empty_stream() {
        let file = write_csv("");
        let stream = SensorStream::from_csv(file.path(), &ReadOptions::default()).unwrap();
        assert!(stream.is_empty());
        assert!(stream.span().is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = SensorStream::from_csv("nonexistent.csv", &ReadOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_span() {
        let file = write_csv("time,x\n5,1.0\n7,2.0\n");
        let stream = SensorStream::from_csv(file.path(), &ReadOptions::default()).unwrap();
        assert_eq!(stream.span(), Some((5_000_000_000, 7_000_000_000)));
    }
}
