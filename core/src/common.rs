//! Common utility functions for the command-line tools.
//!
//! This module contains shared utilities for the `preprocess` and `prepare` binaries:
//! - Logger initialization
//! - Input and output path validation

use std::error::Error;
use std::path::{Path, PathBuf};

use crate::config::LogLevel;

/// Initialize the logger with the specified configuration.
///
/// # Arguments
/// * `log_level` - Log verbosity
/// * `log_file` - Optional path to log file (logs to stderr if None)
///
/// # Errors
/// Returns an error if the log file cannot be opened or logger initialization fails.
pub fn init_logger(log_level: LogLevel, log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    use std::io::Write;

    let level = log_level
        .as_str()
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Info);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} [{}] - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.args()
        )
    });

    if let Some(log_path) = log_file {
        if let Some(parent) = log_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let target = Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.try_init()?;
    Ok(())
}

/// Validate input path exists and is either a file or directory.
///
/// # Errors
/// Returns an error if the path does not exist or is neither a file nor directory.
pub fn validate_input_path(input: &Path) -> Result<(), Box<dyn Error>> {
    if !input.exists() {
        return Err(format!("Input path '{}' does not exist.", input.display()).into());
    }
    if !input.is_file() && !input.is_dir() {
        return Err(format!(
            "Input path '{}' is neither a file nor a directory.",
            input.display()
        )
        .into());
    }
    Ok(())
}

/// Create the output directory (and parents) if it does not exist yet.
///
/// # Errors
/// Returns an error if directory creation fails.
pub fn validate_output_path(output: &Path) -> std::io::Result<()> {
    if !output.exists() {
        std::fs::create_dir_all(output)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_validate_input_path_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("geo.csv");
        File::create(&file_path).unwrap();
        assert!(validate_input_path(&file_path).is_ok());
    }

    #[test]
    fn test_validate_input_path_nonexistent() {
        assert!(validate_input_path(Path::new("/nonexistent/path")).is_err());
    }

    #[test]
    fn test_validate_output_path_creates_nested_directory() {
        let dir = tempdir().unwrap();
        let new_dir = dir.path().join("data").join("1Hz");
        assert!(!new_dir.exists());
        validate_output_path(&new_dir).unwrap();
        assert!(new_dir.is_dir());
        // second call is a no-op
        validate_output_path(&new_dir).unwrap();
    }
}
