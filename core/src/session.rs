//! Recording sessions: discovery and loading.
//!
//! A session is a directory holding one recording's sensor CSVs. The base directory given to the
//! preprocessor holds one subdirectory per session; a base directory that itself contains sensor
//! files is treated as a single session.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::{PreprocessError, Result};
use crate::sensors::{SensorFile, SensorKind};
use crate::stream::{ReadOptions, SensorStream};

/// A session directory and the recognized sensor files in it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Session identity, used as the output file stem.
    pub name: String,
    pub path: PathBuf,
    /// Recognized files in [`SensorKind`] order.
    pub files: Vec<SensorFile>,
}

impl Session {
    /// Scans a directory for recognized sensor files.
    ///
    /// Returns `None` if the directory has none.
    pub fn scan(path: &Path) -> Option<Session> {
        let files: Vec<SensorFile> = SensorKind::ALL
            .iter()
            .filter_map(|kind| {
                kind.locate(path).map(|file| SensorFile {
                    kind: *kind,
                    path: file,
                })
            })
            .collect();
        if files.is_empty() {
            return None;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "session".to_string());
        Some(Session {
            name,
            path: path.to_path_buf(),
            files,
        })
    }

    /// Kinds present in this session.
    pub fn kinds(&self) -> Vec<SensorKind> {
        self.files.iter().map(|f| f.kind).collect()
    }

    /// Reads every sensor file. Files that load with no rows are dropped with a warning.
    ///
    /// # Errors
    /// Returns an error if a file cannot be opened or read.
    pub fn load(&self) -> Result<LoadedSession> {
        let options = ReadOptions::sensor_logger();
        let mut streams = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let stream = SensorStream::from_csv(&file.path, &options)?;
            if stream.is_empty() {
                warn!(
                    "{}: {} has no usable rows, ignoring",
                    self.name,
                    file.path.display()
                );
                continue;
            }
            if stream.skipped_rows > 0 {
                warn!(
                    "{}: skipped {} malformed row(s) in {}",
                    self.name,
                    stream.skipped_rows,
                    file.path.display()
                );
            }
            streams.push((file.clone(), stream));
        }
        Ok(LoadedSession {
            name: self.name.clone(),
            streams,
        })
    }
}

/// A session with its sensor streams read into memory.
#[derive(Clone, Debug)]
pub struct LoadedSession {
    pub name: String,
    pub streams: Vec<(SensorFile, SensorStream)>,
}

impl LoadedSession {
    pub fn stream(&self, kind: SensorKind) -> Option<&(SensorFile, SensorStream)> {
        self.streams.iter().find(|(file, _)| file.kind == kind)
    }
}

/// Finds every session under `base_dir`, sorted by name.
///
/// Subdirectories with recognized sensor files are sessions. If there are none but `base_dir`
/// itself holds sensor files, it is returned as the only session. Other entries are skipped.
///
/// # Errors
/// Returns [`PreprocessError::MissingInput`] if `base_dir` does not exist, is not a directory, or
/// holds no recognized sensor files.
pub fn discover_sessions(base_dir: &Path) -> Result<Vec<Session>> {
    if !base_dir.exists() {
        return Err(PreprocessError::missing_input(format!(
            "base directory '{}' does not exist",
            base_dir.display()
        )));
    }
    if !base_dir.is_dir() {
        return Err(PreprocessError::missing_input(format!(
            "base directory '{}' is not a directory",
            base_dir.display()
        )));
    }

    let mut entries: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(base_dir)? {
        match entry {
            Ok(entry) => entries.push(entry.path()),
            Err(e) => warn!(
                "Skipping unreadable entry in {}: {}",
                base_dir.display(),
                e
            ),
        }
    }
    entries.sort();

    let mut sessions = Vec::new();
    for path in entries {
        if !path.is_dir() {
            debug!("Skipping {}, not a directory", path.display());
            continue;
        }
        match Session::scan(&path) {
            Some(session) => {
                debug!(
                    "Found session {} with sensors {:?}",
                    session.name,
                    session.kinds()
                );
                sessions.push(session);
            }
            None => warn!(
                "Skipping {}, no recognized sensor files",
                path.display()
            ),
        }
    }

    if sessions.is_empty() {
        if let Some(session) = Session::scan(base_dir) {
            info!(
                "No session subdirectories in {}, treating it as a single session",
                base_dir.display()
            );
            sessions.push(session);
        }
    }

    if sessions.is_empty() {
        return Err(PreprocessError::missing_input(format!(
            "no recognized sensor files in '{}' (expected files such as {})",
            base_dir.display(),
            SensorKind::ALL
                .iter()
                .map(|k| k.file_names()[0])
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    #[test]
    fn test_discover_sorted_sessions() {
        let dir = tempdir().unwrap();
        for name in ["b_drive", "a_walk"] {
            let session = dir.path().join(name);
            fs::create_dir(&session).unwrap();
            File::create(session.join("Gyroscope.csv")).unwrap();
        }
        fs::create_dir(dir.path().join("pictures")).unwrap();
        File::create(dir.path().join("README.md")).unwrap();

        let sessions = discover_sessions(dir.path()).unwrap();
        let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["a_walk", "b_drive"]);
        assert_eq!(sessions[0].kinds(), vec![SensorKind::Gyroscope]);
    }

    #[test]
    fn test_base_dir_as_single_session() {
        let dir = tempdir().unwrap();
        File::create(dir.path().join("Barometer.csv")).unwrap();
        File::create(dir.path().join("LocationGps.csv")).unwrap();
        let sessions = discover_sessions(dir.path()).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(
            sessions[0].kinds(),
            vec![SensorKind::Location, SensorKind::Barometer]
        );
    }

    #[test]
    fn test_missing_base_dir() {
        let result = discover_sessions(Path::new("/nonexistent/base/dir"));
        assert!(matches!(result, Err(PreprocessError::MissingInput { .. })));
    }

    #[test]
    fn test_no_recognized_files() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("session")).unwrap();
        File::create(dir.path().join("session").join("notes.csv")).unwrap();
        let result = discover_sessions(dir.path());
        assert!(matches!(result, Err(PreprocessError::MissingInput { .. })));
    }

    #[test]
    fn test_load_ignores_empty_files() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Gyroscope.csv"),
            "time,seconds_elapsed,z,y,x\n1748779200000000000,0,0.1,0.2,0.3\n",
        )
        .unwrap();
        fs::write(dir.path().join("Barometer.csv"), "time,seconds_elapsed,relativeAltitude,pressure\n")
            .unwrap();
        let session = Session::scan(dir.path()).unwrap();
        let loaded = session.load().unwrap();
        assert_eq!(loaded.streams.len(), 1);
        assert!(loaded.stream(SensorKind::Gyroscope).is_some());
        assert!(loaded.stream(SensorKind::Barometer).is_none());
    }
}
