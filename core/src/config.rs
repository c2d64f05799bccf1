//! Preprocessing configuration.
//!
//! Every command-line option of the `preprocess` binary can also be given in a configuration
//! file. The format is chosen from the file extension: `.json`, `.yaml`/`.yml`, or `.toml`.
//! Command-line flags override the values loaded from file.
//!
//! ```toml
//! base_dir = "data/raw"
//! output_dir = "data"
//! frequency = 10.0
//! parallel = true
//! drop_incomplete = false
//! frequency_subdir = true
//! max_gap_s = 2.0
//!
//! [output]
//! time_format = "datetime"
//! float_precision = 6
//!
//! [methods]
//! location = "linear"
//! orientation = "nearest"
//! gyroscope = "mean"
//!
//! [logging]
//! level = "info"
//! file = "logs/preprocess.log"
//! ```

use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};
use crate::resample::{ResampleMethod, period_from_frequency};
use crate::sensors::SensorKind;
use crate::table::WriteOptions;
use crate::timestamp::NANOS_PER_SECOND;

/// Log verbosity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logging settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    /// Log file path; logs go to stderr when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_base_dir() -> String {
    "data/raw".to_string()
}

fn default_output_dir() -> String {
    "data".to_string()
}

fn default_frequency() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// Settings for one preprocessing run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Directory holding one subdirectory of raw sensor CSVs per session.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Directory the aligned tables are written under.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Output rate in hertz.
    #[serde(default = "default_frequency")]
    pub frequency: f64,

    /// Process sessions concurrently. Output is identical to a sequential run.
    #[serde(default)]
    pub parallel: bool,

    /// Remove rows with any missing value (the original pandas `dropna` behavior).
    #[serde(default)]
    pub drop_incomplete: bool,

    /// Write into `<output_dir>/<frequency>Hz/` rather than directly into `output_dir`.
    #[serde(default = "default_true")]
    pub frequency_subdir: bool,

    /// Largest sample gap (seconds) that linear/nearest resampling will bridge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_gap_s: Option<f64>,

    /// Output text formatting.
    #[serde(default)]
    pub output: WriteOptions,

    /// Per-sensor overrides of the default resampling method.
    #[serde(default)]
    pub methods: BTreeMap<SensorKind, ResampleMethod>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        PreprocessConfig {
            base_dir: default_base_dir(),
            output_dir: default_output_dir(),
            frequency: default_frequency(),
            parallel: false,
            drop_incomplete: false,
            frequency_subdir: true,
            max_gap_s: None,
            output: WriteOptions::default(),
            methods: BTreeMap::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PreprocessConfig {
    /// Checks parameters that would make the run meaningless.
    ///
    /// # Errors
    /// [`PreprocessError::InvalidFrequency`] for a bad frequency, [`PreprocessError::Config`]
    /// for a non-positive `max_gap_s`.
    pub fn validate(&self) -> Result<()> {
        period_from_frequency(self.frequency)?;
        if let Some(gap) = self.max_gap_s {
            if !gap.is_finite() || gap <= 0.0 {
                return Err(PreprocessError::config(format!(
                    "max_gap_s must be positive, got {}",
                    gap
                )));
            }
        }
        Ok(())
    }

    /// Grid period in nanoseconds.
    pub fn period(&self) -> Result<i64> {
        period_from_frequency(self.frequency)
    }

    /// Resampling method for a sensor: the configured override or the sensor's default.
    pub fn method_for(&self, kind: SensorKind) -> ResampleMethod {
        self.methods
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_method())
    }

    /// `max_gap_s` in nanoseconds.
    pub fn max_gap_ns(&self) -> Option<i64> {
        self.max_gap_s
            .map(|gap| (gap * NANOS_PER_SECOND as f64).round() as i64)
    }

    /// Label of the output subdirectory, e.g. `1Hz`, `2.5Hz`.
    pub fn frequency_label(&self) -> String {
        if self.frequency.fract() == 0.0 && self.frequency < 1e15 {
            format!("{}Hz", self.frequency as i64)
        } else {
            format!("{}Hz", self.frequency)
        }
    }

    /// Directory the session tables are written to.
    pub fn output_path(&self) -> std::path::PathBuf {
        let base = Path::new(&self.output_dir);
        if self.frequency_subdir {
            base.join(self.frequency_label())
        } else {
            base.to_path_buf()
        }
    }

    /// Write the configuration to a JSON file (pretty-printed).
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).map_err(|e| PreprocessError::config(e.to_string()))
    }

    /// Read the configuration from a JSON file.
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        serde_json::from_reader(file).map_err(|e| PreprocessError::config(e.to_string()))
    }

    /// Write the configuration as YAML.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        let s = serde_yaml::to_string(self).map_err(|e| PreprocessError::config(e.to_string()))?;
        file.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Read the configuration from YAML.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        serde_yaml::from_reader(file).map_err(|e| PreprocessError::config(e.to_string()))
    }

    /// Write the configuration as TOML.
    pub fn to_toml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        let s = toml::to_string(self).map_err(|e| PreprocessError::config(e.to_string()))?;
        file.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Read the configuration from TOML.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut s = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut s)?;
        toml::from_str(&s).map_err(|e| PreprocessError::config(e.to_string()))
    }

    /// Generic write: choose format by file extension (.json/.yaml/.yml/.toml)
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let p = path.as_ref();
        match extension(p).as_deref() {
            Some("json") => self.to_json(p),
            Some("yaml") | Some("yml") => self.to_yaml(p),
            Some("toml") => self.to_toml(p),
            _ => Err(unsupported_extension(p)),
        }
    }

    /// Generic read: choose format by file extension (.json/.yaml/.yml/.toml)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        match extension(p).as_deref() {
            Some("json") => Self::from_json(p),
            Some("yaml") | Some("yml") => Self::from_yaml(p),
            Some("toml") => Self::from_toml(p),
            _ => Err(unsupported_extension(p)),
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
}

fn unsupported_extension(path: &Path) -> PreprocessError {
    PreprocessError::config(format!(
        "unsupported configuration file extension for '{}' (expected .json, .yaml, .yml, or .toml)",
        path.display()
    ))
}
