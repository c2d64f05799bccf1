//! Geophysical particle-filter dataset preparation.
//!
//! Joins closed-loop or degraded INS trajectories (`<name>_degraded.csv`, as written by the
//! strapdown simulation) with the aligned geophysical measurements of the same recording
//! (`<name>.csv`, as written by [`preprocess`](crate::preprocess::preprocess)), and derives the
//! free-air gravity anomaly and the magnetic anomaly for each INS epoch.
//!
//! The INS file carries its 15-state error covariance as one quoted cell of 225 comma-separated
//! values in row-major order. Only the position and velocity variances are kept, as
//! `*_accuracy` columns, since those seed the particle filter's initial spread.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use nalgebra::{DMatrix, Vector3};

use crate::common::validate_output_path;
use crate::earth::{free_air_anomaly, magnetic_anomaly};
use crate::error::{PreprocessError, Result};
use crate::stream::{Column, ReadOptions, SensorStream};
use crate::table::{Table, WriteOptions};
use crate::timestamp::TimeFormat;

/// Suffix identifying INS trajectory files.
pub const INS_SUFFIX: &str = "_degraded.csv";
/// Suffix of prepared output files.
pub const OUTPUT_SUFFIX: &str = "_geopf.csv";
/// Column holding the serialized covariance matrix.
pub const COVARIANCE_COLUMN: &str = "covariance";
/// Dimension of the INS error state.
pub const STATE_DIM: usize = 15;
/// Diagonal covariance terms extracted from the INS file, in state order.
pub const ACCURACY_COLUMNS: [&str; 6] = [
    "latitude_accuracy",
    "longitude_accuracy",
    "altitude_accuracy",
    "velocity_n_accuracy",
    "velocity_e_accuracy",
    "velocity_d_accuracy",
];
/// Geophysical measurements carried over from the aligned table.
pub const GEO_COLUMNS: [&str; 8] = [
    "mag_x",
    "mag_y",
    "mag_z",
    "grav_x",
    "grav_y",
    "grav_z",
    "pressure",
    "relativeAltitude",
];
/// Free-air gravity anomaly column, milligals.
pub const FREEAIR_COLUMN: &str = "freeair";
/// Magnetic anomaly column, microteslas.
pub const MAGNETIC_COLUMN: &str = "magnetic";

const POSITION_COLUMNS: [&str; 3] = ["latitude", "longitude", "altitude"];

/// Text options for prepared files: datetime index, six decimals.
pub fn output_options() -> WriteOptions {
    WriteOptions {
        time_format: TimeFormat::Datetime,
        float_precision: Some(6),
    }
}

/// Parses a row-major `STATE_DIM x STATE_DIM` covariance matrix.
///
/// Returns `None` unless the text holds exactly `STATE_DIM^2` finite numbers.
pub fn parse_covariance(text: &str) -> Option<DMatrix<f64>> {
    let values: Vec<f64> = text
        .split(',')
        .map(|v| v.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<Vec<f64>>>()?;
    if values.len() != STATE_DIM * STATE_DIM {
        return None;
    }
    Some(DMatrix::from_row_slice(STATE_DIM, STATE_DIM, &values))
}

/// Joins one INS trajectory with its geophysical table.
///
/// The output has one row per INS row with a parseable covariance. Its columns are the INS
/// numeric columns, the [`ACCURACY_COLUMNS`], the [`GEO_COLUMNS`] matched by exact timestamp
/// (empty where the geophysical table has no such row or column), then `freeair` and
/// `magnetic`.
///
/// # Errors
/// Returns [`PreprocessError::MissingColumn`] if the INS stream lacks `latitude`, `longitude`,
/// `altitude`, or `covariance`.
pub fn prepare_dataset(geo: &SensorStream, ins: &SensorStream) -> Result<Table> {
    for column in POSITION_COLUMNS {
        if ins.column(column).is_none() {
            return Err(PreprocessError::MissingColumn {
                path: ins.source.clone(),
                column: column.to_string(),
            });
        }
    }
    let covariance = ins
        .text_column(COVARIANCE_COLUMN)
        .ok_or_else(|| PreprocessError::MissingColumn {
            path: ins.source.clone(),
            column: COVARIANCE_COLUMN.to_string(),
        })?;

    // (INS row, variances)
    let mut rows: Vec<(usize, [f64; 6])> = Vec::with_capacity(ins.len());
    for (i, text) in covariance.values.iter().enumerate() {
        match parse_covariance(text) {
            Some(p) => rows.push((i, std::array::from_fn(|k| p[(k, k)]))),
            None => {
                let line = ins.lines.get(i).copied().unwrap_or(i as u64 + 2);
                let err = PreprocessError::malformed_row(
                    &ins.source,
                    line,
                    format!(
                        "covariance does not hold {} numbers",
                        STATE_DIM * STATE_DIM
                    ),
                );
                warn!("Skipping row: {}", err);
            }
        }
    }

    let mut table = Table {
        times: rows.iter().map(|&(i, _)| ins.times[i]).collect(),
        columns: Vec::new(),
    };
    for column in &ins.columns {
        table.push_column(Column::new(
            column.name.clone(),
            rows.iter().map(|&(i, _)| column.values[i]).collect(),
        ));
    }
    for (k, name) in ACCURACY_COLUMNS.iter().enumerate() {
        table.push_column(Column::new(
            *name,
            rows.iter().map(|(_, diag)| Some(diag[k])).collect(),
        ));
    }

    let geo_rows: Vec<Option<usize>> = table
        .times
        .iter()
        .map(|t| geo.times.binary_search(t).ok())
        .collect();
    let matched = geo_rows.iter().filter(|r| r.is_some()).count();
    debug!(
        "{}: {} of {} INS epochs have geophysical measurements",
        ins.source.display(),
        matched,
        table.len()
    );
    for name in GEO_COLUMNS {
        let values = match geo.column(name) {
            Some(column) => geo_rows
                .iter()
                .map(|row| row.and_then(|j| column.values[j]))
                .collect(),
            None => {
                warn!("{}: no '{}' column", geo.source.display(), name);
                vec![None; table.len()]
            }
        };
        // an INS column of the same name wins
        if !table.has_column(name) {
            table.push_column(Column::new(name, values));
        }
    }

    let vector = |table: &Table, prefix: &str, row: usize| -> Option<Vector3<f64>> {
        let get = |axis: &str| table.column(&format!("{}_{}", prefix, axis))?.values[row];
        Some(Vector3::new(get("x")?, get("y")?, get("z")?))
    };
    let position = |table: &Table, row: usize| -> Option<(f64, f64, f64)> {
        let get = |name: &str| table.column(name)?.values[row];
        Some((get("latitude")?, get("longitude")?, get("altitude")?))
    };
    let mut freeair = Vec::with_capacity(table.len());
    let mut magnetic = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let pos = position(&table, row);
        freeair.push(
            vector(&table, "grav", row)
                .zip(pos)
                .map(|(g, (lat, _, _))| free_air_anomaly(&g, &lat)),
        );
        magnetic.push(
            vector(&table, "mag", row)
                .zip(pos)
                .map(|(m, (lat, lon, alt))| magnetic_anomaly(&m, &lat, &lon, &alt)),
        );
    }
    table.push_column(Column::new(FREEAIR_COLUMN, freeair));
    table.push_column(Column::new(MAGNETIC_COLUMN, magnetic));
    Ok(table)
}

/// Every `*_degraded.csv` below `dir`, sorted.
pub fn find_ins_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if ins_base_name(&path).is_some() {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// `drive` for `.../drive_degraded.csv`.
pub fn ins_base_name(path: &Path) -> Option<&str> {
    path.file_name()?
        .to_str()?
        .strip_suffix(INS_SUFFIX)
        .filter(|base| !base.is_empty())
}

/// What a preparation run produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrepareSummary {
    pub written: Vec<PathBuf>,
    /// INS files without a matching geophysical table.
    pub skipped: Vec<PathBuf>,
}

/// Prepares every INS trajectory under `ins_dir` against the tables in `geo_dir`.
///
/// # Errors
/// Returns [`PreprocessError::MissingInput`] if either input directory is missing or `ins_dir`
/// holds no INS files. Errors from reading or writing a file abort the run.
pub fn prepare(geo_dir: &Path, ins_dir: &Path, output_dir: &Path) -> Result<PrepareSummary> {
    for dir in [geo_dir, ins_dir] {
        if !dir.is_dir() {
            return Err(PreprocessError::missing_input(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }
    }
    let ins_files = find_ins_files(ins_dir)?;
    if ins_files.is_empty() {
        return Err(PreprocessError::missing_input(format!(
            "no *{} files in '{}'",
            INS_SUFFIX,
            ins_dir.display()
        )));
    }
    validate_output_path(output_dir)?;

    let ins_options = ReadOptions {
        text_columns: vec![COVARIANCE_COLUMN.to_string()],
        ..Default::default()
    };
    let mut summary = PrepareSummary::default();
    for ins_path in ins_files {
        let Some(base) = ins_base_name(&ins_path) else {
            continue;
        };
        let geo_path = geo_dir.join(format!("{}.csv", base));
        if !geo_path.is_file() {
            warn!(
                "No geophysical data for {} (looked for {}), skipping",
                ins_path.display(),
                geo_path.display()
            );
            summary.skipped.push(ins_path);
            continue;
        }
        info!("Processing file: {}", ins_path.display());
        let ins = SensorStream::from_csv(&ins_path, &ins_options)?;
        let geo = SensorStream::from_csv(&geo_path, &ReadOptions::default())?;
        let table = prepare_dataset(&geo, &ins)?;
        let out_path = output_dir.join(format!("{}{}", base, OUTPUT_SUFFIX));
        table.to_csv(&out_path, &output_options())?;
        info!("Prepared dataset saved to {}", out_path.display());
        summary.written.push(out_path);
    }
    Ok(summary)
}
