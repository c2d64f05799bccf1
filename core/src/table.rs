//! Time-indexed tables and their CSV representation.
//!
//! [`Table`] is the output artifact of preprocessing: a `time` column followed by named numeric
//! columns, missing values written as empty cells. When built on a [`Grid`] its timestamps are
//! strictly increasing and evenly spaced.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resample::Grid;
use crate::stream::{Column, ReadOptions, SensorStream};
use crate::timestamp::{TimeFormat, format_timestamp};

/// Header of the time column in every written table.
pub const TIME_HEADER: &str = "time";

/// How table values are rendered as text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Format of the `time` column.
    #[serde(default)]
    pub time_format: TimeFormat,
    /// Fixed number of decimals; `None` writes the shortest representation that round-trips.
    #[serde(default)]
    pub float_precision: Option<usize>,
}

/// A table of numeric columns sharing one time index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub times: Vec<i64>,
    pub columns: Vec<Column>,
}

impl Table {
    /// Empty table with the grid's timestamps and no columns.
    pub fn on_grid(grid: &Grid) -> Self {
        Table {
            times: grid.times().collect(),
            columns: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Column names in order, without the time column.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Appends a column.
    ///
    /// # Panics
    /// Panics if the column length differs from the number of rows.
    pub fn push_column(&mut self, column: Column) {
        assert_eq!(
            column.values.len(),
            self.times.len(),
            "column '{}' length must match the time index",
            column.name
        );
        self.columns.push(column);
    }

    /// Removes every row with at least one missing value. Returns the number of rows removed.
    pub fn drop_incomplete(&mut self) -> usize {
        let keep: Vec<bool> = (0..self.len())
            .map(|row| self.columns.iter().all(|c| c.values[row].is_some()))
            .collect();
        let before = self.len();
        let mut row = 0;
        self.times.retain(|_| {
            row += 1;
            keep[row - 1]
        });
        for column in &mut self.columns {
            let mut row = 0;
            column.values.retain(|_| {
                row += 1;
                keep[row - 1]
            });
        }
        before - self.len()
    }

    /// True if timestamps are strictly increasing with constant spacing `period`.
    pub fn is_evenly_spaced(&self, period: i64) -> bool {
        self.times.windows(2).all(|w| w[1] - w[0] == period)
    }

    /// Writes the table as CSV to any writer.
    pub fn write_csv<W: Write>(&self, writer: W, options: &WriteOptions) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(TIME_HEADER.to_string());
        header.extend(self.columns.iter().map(|c| c.name.clone()));
        csv_writer.write_record(&header)?;

        let mut row = Vec::with_capacity(header.len());
        for (i, &time) in self.times.iter().enumerate() {
            row.clear();
            row.push(format_timestamp(time, options.time_format));
            for column in &self.columns {
                row.push(format_value(column.values[i], options.float_precision));
            }
            csv_writer.write_record(&row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Writes the table to a CSV file, replacing any existing file.
    pub fn to_csv<P: AsRef<Path>>(&self, path: P, options: &WriteOptions) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file), options)
    }

    /// Reads a table previously written by [`Table::to_csv`] (or any CSV with a time column and
    /// numeric fields). Malformed rows are skipped with a warning.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let stream = SensorStream::from_csv(path, &ReadOptions::default())?;
        Ok(Table {
            times: stream.times,
            columns: stream.columns,
        })
    }
}

fn format_value(value: Option<f64>, precision: Option<usize>) -> String {
    match (value, precision) {
        (None, _) => String::new(),
        (Some(v), Some(p)) => format!("{:.*}", p, v),
        (Some(v), None) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::NANOS_PER_SECOND;
    use tempfile::tempdir;

    fn sample_table() -> Table {
        let grid = Grid::spanning(0, 2 * NANOS_PER_SECOND, NANOS_PER_SECOND).unwrap();
        let mut table = Table::on_grid(&grid);
        table.push_column(Column::new("a", vec![Some(1.5), None, Some(3.0)]));
        table.push_column(Column::new("b", vec![Some(0.1), Some(0.2), Some(0.3)]));
        table
    }

    #[test]
    fn test_write_csv() {
        let table = sample_table();
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer, &WriteOptions::default()).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time,a,b");
        assert_eq!(lines[1], "1970-01-01 00:00:00+00:00,1.5,0.1");
        assert_eq!(lines[2], "1970-01-01 00:00:01+00:00,,0.2");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_write_csv_fixed_precision_unix() {
        let table = sample_table();
        let options = WriteOptions {
            time_format: TimeFormat::Unix,
            float_precision: Some(3),
        };
        let mut buffer = Vec::new();
        table.write_csv(&mut buffer, &options).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().nth(1).unwrap(), "0,1.500,0.100");
    }

    #[test]
    fn test_drop_incomplete() {
        let mut table = sample_table();
        let removed = table.drop_incomplete();
        assert_eq!(removed, 1);
        assert_eq!(table.times, vec![0, 2 * NANOS_PER_SECOND]);
        assert_eq!(table.column("a").unwrap().values, vec![Some(1.5), Some(3.0)]);
        assert_eq!(table.column("b").unwrap().values, vec![Some(0.1), Some(0.3)]);
    }

    #[test]
    fn test_even_spacing() {
        let table = sample_table();
        assert!(table.is_evenly_spaced(NANOS_PER_SECOND));
        assert!(!table.is_evenly_spaced(2 * NANOS_PER_SECOND));
    }

    #[test]
    fn test_csv_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table = sample_table();
        table.to_csv(&path, &WriteOptions::default()).unwrap();
        let read = Table::from_csv(&path).unwrap();
        assert_eq!(read, table);
    }

    #[test]
    #[should_panic]
    fn test_push_column_length_mismatch() {
        let mut table = sample_table();
        table.push_column(Column::new("c", vec![Some(1.0)]));
    }
}
