//! Error types for dataset preprocessing.
//!
//! Parameter and path problems (`MissingInput`, `InvalidFrequency`) abort a run before anything
//! is written. `MalformedRow` is the one recoverable error: loaders construct it for every row
//! they cannot parse, log it as a warning, and carry on with the rest of the file.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessError>;

/// Errors that can occur while loading, resampling, or writing sensor tables.
#[derive(Error, Debug)]
pub enum PreprocessError {
    /// The base directory is missing or contains no recognized sensor files.
    #[error("Missing input: {message}")]
    MissingInput { message: String },

    /// The resampling frequency is not a positive, finite number of hertz.
    #[error("Invalid frequency: {frequency} Hz (must be a positive, finite value)")]
    InvalidFrequency { frequency: f64 },

    /// A CSV row that could not be parsed. Skipped, never fatal.
    #[error("Malformed row {line} in '{}': {reason}", path.display())]
    MalformedRow {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// A column required for the requested operation is not present.
    #[error("Missing column '{column}' in '{}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// The configuration file could not be read, parsed, or written.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// One or more sessions failed while the rest of the run completed.
    #[error("{failed} session(s) failed to process")]
    SessionsFailed { failed: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl PreprocessError {
    /// Create a missing input error.
    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::MissingInput {
            message: message.into(),
        }
    }

    /// Create a malformed row error for `line` of `path`.
    pub fn malformed_row(path: impl Into<PathBuf>, line: u64, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            path: path.into(),
            line,
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PreprocessError::InvalidFrequency { frequency: -1.0 };
        assert!(err.to_string().contains("-1"));

        let err = PreprocessError::malformed_row("Gyroscope.csv", 12, "bad float");
        let msg = err.to_string();
        assert!(msg.contains("12"));
        assert!(msg.contains("Gyroscope.csv"));
        assert!(msg.contains("bad float"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PreprocessError = io.into();
        assert!(matches!(err, PreprocessError::Io(_)));
    }
}
