//! MEMS navigation dataset preprocessing
//!
//! This crate turns raw smartphone recordings made with the
//! [Sensor Logger](https://github.com/tszheichoi/awesome-sensor-logger) app into uniformly sampled,
//! time-aligned tables suitable for strapdown navigation filters and geophysical navigation
//! research. Each recording session is a directory with one CSV per sensor, each sampled at its
//! own irregular rate. Preprocessing resamples every sensor onto a shared grid at a chosen
//! frequency and writes one aligned CSV per session.
//!
//! ## Crate overview
//!
//! - [sensors]: Recognized sensor files, their column naming, and default resampling methods.
//! - [stream]: Loading a raw sensor CSV into a sorted, time-indexed stream.
//! - [timestamp]: Parsing and formatting timestamps (nanoseconds since the Unix epoch).
//! - [resample]: The epoch-anchored output grid and the linear, nearest, and mean resamplers.
//! - [session]: Session discovery under a base directory.
//! - [table]: The aligned output table and its CSV form.
//! - [preprocess]: Session alignment and the full preprocessing run.
//! - [prepare]: Joining INS trajectories with aligned geophysical measurements.
//! - [earth]: Normal gravity and dipole magnetic field models.
//! - [config]: Run configuration, readable from JSON, YAML, or TOML.
//! - [common]: Logger initialization and path helpers shared by the binaries.
//!
//! ## Aligned table layout
//!
//! Column names follow the layout the strapdown simulation's `TestDataRecord` loader reads:
//! `time`, the GPS fields (`latitude`, `longitude`, `altitude`, `speed`, `bearing`, and their
//! accuracies), orientation (`qx`..`qw`, `roll`, `pitch`, `yaw`), `acc_*`, `gyro_*`, `mag_*`,
//! `relativeAltitude`, `pressure`, and `grav_*`. Sensors absent from a session contribute no
//! columns. Ground-truth columns, when present, are prefixed `truth_`.
//!
//! ## Example
//!
//! ```no_run
//! use mems_nav::{PreprocessConfig, preprocess};
//!
//! let config = PreprocessConfig {
//!     frequency: 1.0,
//!     ..Default::default()
//! };
//! let summary = preprocess(&config).expect("preprocessing failed");
//! for path in &summary.written {
//!     println!("{}", path.display());
//! }
//! ```
pub mod common;
pub mod config;
pub mod earth;
pub mod error;
pub mod prepare;
pub mod preprocess;
pub mod resample;
pub mod sensors;
pub mod session;
pub mod stream;
pub mod table;
pub mod timestamp;

pub use config::{LogLevel, LoggingConfig, PreprocessConfig};
pub use error::{PreprocessError, Result};
pub use prepare::{PrepareSummary, prepare};
pub use preprocess::{PreprocessSummary, align_session, preprocess};
pub use resample::{Grid, ResampleMethod};
pub use sensors::SensorKind;
pub use table::{Table, WriteOptions};
pub use timestamp::TimeFormat;
