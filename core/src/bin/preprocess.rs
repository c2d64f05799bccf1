//! PREPROCESS: resample and align raw Sensor Logger recordings.
//!
//! Every session directory under the base directory is resampled to the requested frequency
//! and written to `<output_dir>/<frequency>Hz/<session>.csv`.
//!
//! Parameters come from command-line flags, a configuration file (TOML/JSON/YAML), or both, in
//! which case the flags win.

use clap::Parser;
use log::{error, info, warn};
use mems_nav::common::init_logger;
use mems_nav::{LogLevel, PreprocessConfig, TimeFormat, preprocess};
use std::error::Error;
use std::path::PathBuf;

const LONG_ABOUT: &str = "PREPROCESS: resample and align raw Sensor Logger recordings.

The base directory holds one subdirectory per recording session, each with one CSV per sensor
(LocationGps.csv, Orientation.csv, TotalAcceleration.csv or Accelerometer.csv, Gyroscope.csv,
Magnetometer.csv, Barometer.csv, Gravity.csv). Every sensor is resampled onto a uniform grid at
the requested frequency and the sensors are joined into one table per session, written to
<output_dir>/<frequency>Hz/<session>.csv.

Parameters can also be loaded from a configuration file (TOML/JSON/YAML); flags given on the
command line override the file.";

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "Resample and align raw Sensor Logger recordings.", long_about = LONG_ABOUT)]
struct Cli {
    /// Base directory for the sensor logger app data [default: data/raw]
    #[arg(long = "base_dir", alias = "base-dir")]
    base_dir: Option<String>,

    /// Output directory for the cleaned data [default: data]
    #[arg(long = "output_dir", alias = "output-dir")]
    output_dir: Option<String>,

    /// Frequency in Hz for resampling the data [default: 1]
    #[arg(long, allow_negative_numbers = true)]
    frequency: Option<f64>,

    /// Load parameters from a configuration file (TOML/JSON/YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Process sessions in parallel
    #[arg(long)]
    parallel: bool,

    /// Drop rows with any missing value
    #[arg(long)]
    drop_incomplete: bool,

    /// Format of the output time column
    #[arg(long, value_enum)]
    time_format: Option<TimeFormat>,

    /// Log level [default: info]
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    /// Resolve the run configuration: file values first, then command-line overrides.
    fn resolve(&self) -> Result<PreprocessConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => PreprocessConfig::from_file(path)?,
            None => PreprocessConfig::default(),
        };
        if let Some(base_dir) = &self.base_dir {
            config.base_dir = base_dir.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(frequency) = self.frequency {
            config.frequency = frequency;
        }
        if self.parallel {
            config.parallel = true;
        }
        if self.drop_incomplete {
            config.drop_incomplete = true;
        }
        if let Some(time_format) = self.time_format {
            config.output.time_format = time_format;
        }
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        if let Some(file) = &self.log_file {
            config.logging.file = Some(file.display().to_string());
        }
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = cli.resolve()?;

    let log_file = config.logging.file.as_ref().map(PathBuf::from);
    init_logger(config.logging.level, log_file.as_ref())?;

    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path.display());
    }
    info!("Base directory: {}", config.base_dir);
    info!("Output directory: {}", config.output_dir);
    info!("Frequency: {} Hz", config.frequency);

    let summary = match preprocess(&config) {
        Ok(summary) => summary,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    for name in &summary.skipped {
        warn!("Session {} produced no output", name);
    }
    info!(
        "Preprocessed {} session(s) into {}",
        summary.written.len(),
        summary.output_dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_flag_names() {
        let cli = Cli::try_parse_from([
            "preprocess",
            "--base_dir",
            "raw",
            "--output_dir",
            "out",
            "--frequency",
            "10",
        ])
        .unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config.base_dir, "raw");
        assert_eq!(config.output_dir, "out");
        assert_eq!(config.frequency, 10.0);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["preprocess"]).unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config, PreprocessConfig::default());
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprocess.toml");
        std::fs::write(&path, "base_dir = \"from_file\"\nfrequency = 5.0\n").unwrap();
        let cli = Cli::try_parse_from([
            "preprocess",
            "--config",
            path.to_str().unwrap(),
            "--frequency",
            "2",
            "--parallel",
            "--log-level",
            "debug",
        ])
        .unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config.base_dir, "from_file");
        assert_eq!(config.frequency, 2.0);
        assert!(config.parallel);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }
}
