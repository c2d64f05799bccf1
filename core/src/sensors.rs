//! Sensor kinds recognized in a recording session.
//!
//! The [Sensor Logger](https://www.tszheichoi.com/sensorlogger) app writes one CSV per sensor.
//! Each kind below knows which file names it is recorded under, how its columns are named in the
//! aligned output, and how it is resampled by default. The column naming reproduces the layout
//! consumed by the strapdown `TestDataRecord` loader: GPS, orientation, and barometer fields keep
//! their names, while the three-axis sensors are prefixed (`acc_x`, `gyro_x`, `mag_x`, `grav_x`).

use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::resample::ResampleMethod;

/// A recognized sensor stream.
///
/// The declaration order is the column order of the aligned table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// GPS fix: latitude, longitude, altitude, speed, bearing, and their accuracies.
    Location,
    /// Device attitude as a quaternion (`qw..qz`) and Euler angles (`roll`, `pitch`, `yaw`).
    Orientation,
    /// Specific force in m/s^2.
    Accelerometer,
    /// Rotation rate in rad/s.
    Gyroscope,
    /// Magnetic field in microteslas.
    Magnetometer,
    /// Pressure (mbar) and relative altitude (m).
    Barometer,
    /// Gravity vector in m/s^2.
    Gravity,
    /// Pre-computed reference trajectory.
    GroundTruth,
}

impl SensorKind {
    /// All kinds in output column order.
    pub const ALL: [SensorKind; 8] = [
        SensorKind::Location,
        SensorKind::Orientation,
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
        SensorKind::Magnetometer,
        SensorKind::Barometer,
        SensorKind::Gravity,
        SensorKind::GroundTruth,
    ];

    /// Candidate file names, most preferred first.
    ///
    /// `TotalAcceleration.csv` already includes gravity; `Accelerometer.csv` is user acceleration
    /// only and has gravity added back during alignment.
    pub fn file_names(&self) -> &'static [&'static str] {
        match self {
            SensorKind::Location => &["LocationGps.csv", "Location.csv"],
            SensorKind::Orientation => &["Orientation.csv"],
            SensorKind::Accelerometer => &["TotalAcceleration.csv", "Accelerometer.csv"],
            SensorKind::Gyroscope => &["Gyroscope.csv"],
            SensorKind::Magnetometer => &["Magnetometer.csv"],
            SensorKind::Barometer => &["Barometer.csv"],
            SensorKind::Gravity => &["Gravity.csv"],
            SensorKind::GroundTruth => &["GroundTruth.csv", "ground_truth.csv"],
        }
    }

    /// Short key used in configuration files and to disambiguate colliding column names.
    pub fn key(&self) -> &'static str {
        match self {
            SensorKind::Location => "location",
            SensorKind::Orientation => "orientation",
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Magnetometer => "magnetometer",
            SensorKind::Barometer => "barometer",
            SensorKind::Gravity => "gravity",
            SensorKind::GroundTruth => "ground_truth",
        }
    }

    /// Default resampling method.
    ///
    /// Orientation and ground truth carry wrapped angles, which linear interpolation would smear
    /// across the +-pi boundary, so they take the nearest sample. Everything else is linear.
    pub fn default_method(&self) -> ResampleMethod {
        match self {
            SensorKind::Orientation | SensorKind::GroundTruth => ResampleMethod::Nearest,
            _ => ResampleMethod::Linear,
        }
    }

    /// Name of a raw column in the aligned table.
    pub fn column_name(&self, raw: &str) -> String {
        let axis_prefix = match self {
            SensorKind::Accelerometer => Some("acc"),
            SensorKind::Gyroscope => Some("gyro"),
            SensorKind::Magnetometer => Some("mag"),
            SensorKind::Gravity => Some("grav"),
            _ => None,
        };
        match (self, axis_prefix) {
            (SensorKind::GroundTruth, _) => format!("truth_{}", raw),
            (_, Some(prefix)) if matches!(raw, "x" | "y" | "z") => format!("{}_{}", prefix, raw),
            _ => raw.to_string(),
        }
    }

    /// Finds this sensor's file in a session directory, honoring the preference order.
    pub fn locate(&self, dir: &Path) -> Option<PathBuf> {
        self.file_names()
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}

impl Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A sensor file found in a session directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SensorFile {
    pub kind: SensorKind,
    pub path: PathBuf,
}

impl SensorFile {
    /// True when the accelerometer file holds user acceleration (gravity removed).
    pub fn is_user_acceleration(&self) -> bool {
        self.kind == SensorKind::Accelerometer
            && self
                .path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n == "Accelerometer.csv")
    }
}
