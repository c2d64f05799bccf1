//! Session alignment and the preprocessing run.
//!
//! [`align_session`] turns one session's raw streams into an aligned [`Table`]; [`preprocess`]
//! runs it for every session under the base directory and writes one CSV per session.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{debug, error, info, warn};
use rayon::prelude::*;

use crate::common::validate_output_path;
use crate::config::PreprocessConfig;
use crate::error::{PreprocessError, Result};
use crate::resample::{Grid, resample_stream};
use crate::sensors::SensorKind;
use crate::session::{LoadedSession, Session, discover_sessions};
use crate::stream::Column;
use crate::table::Table;

const AXES: [&str; 3] = ["x", "y", "z"];

/// What a preprocessing run produced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreprocessSummary {
    /// Directory the tables were written to.
    pub output_dir: PathBuf,
    /// Written tables, in session order.
    pub written: Vec<PathBuf>,
    /// Sessions that produced no table because no grid point fell inside their time range.
    pub skipped: Vec<String>,
}

enum SessionOutcome {
    Written(PathBuf),
    Skipped(String),
}

/// Resamples every stream of a session onto a common grid and joins them into one table.
///
/// Columns appear in sensor-kind order. A column whose name is already taken by an earlier
/// sensor is renamed `<key>_<name>`. When the accelerometer file holds user acceleration and a
/// gravity stream is present, gravity is added back so `acc_*` is total specific force.
///
/// Returns `Ok(None)` when the session's time range contains no grid point.
///
/// # Errors
/// Returns [`PreprocessError::InvalidFrequency`] if the configured frequency is invalid.
pub fn align_session(session: &LoadedSession, config: &PreprocessConfig) -> Result<Option<Table>> {
    let period = config.period()?;
    let max_gap = config.max_gap_ns();
    let Some(grid) = Grid::for_streams(session.streams.iter().map(|(_, s)| s), period) else {
        return Ok(None);
    };
    debug!(
        "{}: grid of {} points starting at {} ns, period {} ns",
        session.name, grid.len, grid.start, grid.period
    );

    let mut table = Table::on_grid(&grid);
    for (file, stream) in &session.streams {
        let method = config.method_for(file.kind);
        debug!(
            "{}: resampling {} ({} rows) with {:?}",
            session.name,
            file.kind,
            stream.len(),
            method
        );
        for column in resample_stream(stream, &grid, method, max_gap) {
            let mut name = file.kind.column_name(&column.name);
            if table.has_column(&name) {
                let renamed = format!("{}_{}", file.kind.key(), name);
                if table.has_column(&renamed) {
                    warn!(
                        "{}: dropping repeated column '{}' from {}",
                        session.name, name, file.kind
                    );
                    continue;
                }
                warn!(
                    "{}: column '{}' from {} already present, writing it as '{}'",
                    session.name, name, file.kind, renamed
                );
                name = renamed;
            }
            table.push_column(Column::new(name, column.values));
        }
    }

    if let Some((file, _)) = session.stream(SensorKind::Accelerometer)
        && file.is_user_acceleration()
    {
        if session.stream(SensorKind::Gravity).is_some() {
            add_gravity(&mut table);
        } else {
            warn!(
                "{}: {} holds user acceleration and there is no gravity stream, acc_* excludes gravity",
                session.name,
                file.path.display()
            );
        }
    }

    if config.drop_incomplete {
        let removed = table.drop_incomplete();
        if removed > 0 {
            debug!("{}: dropped {} incomplete rows", session.name, removed);
        }
        if table.is_empty() {
            warn!("{}: no complete rows remain", session.name);
        }
    }
    Ok(Some(table))
}

/// `acc_i += grav_i`; a missing value on either side leaves the sum missing.
fn add_gravity(table: &mut Table) {
    for axis in AXES {
        let Some(gravity) = table
            .column(&format!("grav_{}", axis))
            .map(|c| c.values.clone())
        else {
            continue;
        };
        if let Some(acc) = table.column_mut(&format!("acc_{}", axis)) {
            for (a, g) in acc.values.iter_mut().zip(gravity) {
                *a = match (*a, g) {
                    (Some(a), Some(g)) => Some(a + g),
                    _ => None,
                };
            }
        }
    }
}

fn load_session(session: &Session) -> Result<LoadedSession> {
    info!(
        "Loading session {} ({} sensor files)",
        session.name,
        session.files.len()
    );
    let present = session.kinds();
    let missing: Vec<&str> = SensorKind::ALL
        .iter()
        .filter(|k| !present.contains(k))
        .map(|k| k.key())
        .collect();
    if !missing.is_empty() {
        debug!("{}: no data for {}", session.name, missing.join(", "));
    }
    session.load()
}

fn process_session(
    session: &LoadedSession,
    config: &PreprocessConfig,
    output_dir: &Path,
) -> Result<SessionOutcome> {
    let Some(table) = align_session(session, config)? else {
        warn!(
            "{}: time range holds no {} grid point, skipping",
            session.name,
            config.frequency_label()
        );
        return Ok(SessionOutcome::Skipped(session.name.clone()));
    };

    let path = output_dir.join(format!("{}.csv", session.name));
    table.to_csv(&path, &config.output)?;
    info!(
        "Wrote {} rows x {} columns to {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(SessionOutcome::Written(path))
}

type SessionErrors = Mutex<Vec<(String, String)>>;

fn session_name(session: &Session) -> &str {
    &session.name
}

fn loaded_name(session: &LoadedSession) -> &str {
    &session.name
}

/// Runs `task` for every item, in parallel when asked. Failures are logged and collected into
/// `errors`; the successful results keep the input order.
fn run_sessions<T, U, F>(
    items: &[T],
    parallel: bool,
    errors: &SessionErrors,
    name: fn(&T) -> &str,
    task: F,
) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U> + Sync,
{
    let run = |item: &T| match task(item) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            error!("Error processing session {}: {}", name(item), e);
            errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((name(item).to_string(), e.to_string()));
            None
        }
    };
    if parallel && items.len() > 1 {
        items.par_iter().filter_map(run).collect()
    } else {
        items.iter().filter_map(run).collect()
    }
}

/// Preprocesses every session under `config.base_dir`.
///
/// The frequency and the input directory are checked, and every session is read, before anything
/// is written. A session that fails to load or write is logged and the remaining sessions still
/// run; the run then returns [`PreprocessError::SessionsFailed`].
///
/// # Errors
/// Returns [`PreprocessError::MissingInput`] when no session has a sensor file with usable rows.
///
/// # Example
/// ```no_run
/// use mems_nav::{PreprocessConfig, preprocess};
///
/// let config = PreprocessConfig {
///     base_dir: "data/raw".to_string(),
///     output_dir: "data".to_string(),
///     frequency: 10.0,
///     ..Default::default()
/// };
/// let summary = preprocess(&config).expect("preprocessing failed");
/// println!("wrote {} sessions to {}", summary.written.len(), summary.output_dir.display());
/// ```
pub fn preprocess(config: &PreprocessConfig) -> Result<PreprocessSummary> {
    config.validate()?;
    let sessions = discover_sessions(Path::new(&config.base_dir))?;
    if config.parallel && sessions.len() > 1 {
        info!("Running in parallel mode");
    }

    let errors: SessionErrors = Mutex::new(Vec::new());
    let loaded = run_sessions(&sessions, config.parallel, &errors, session_name, load_session);
    let usable = loaded.iter().any(|session| !session.streams.is_empty());
    let load_failures = errors.lock().unwrap_or_else(PoisonError::into_inner).len();
    if !usable && load_failures == 0 {
        return Err(PreprocessError::missing_input(format!(
            "no usable sensor data in '{}', every recognized file is empty or malformed",
            config.base_dir
        )));
    }

    let output_dir = config.output_path();
    let outcomes = if usable {
        validate_output_path(&output_dir)?;
        info!(
            "Preprocessing {} session(s) from {} at {} Hz into {}",
            loaded.len(),
            config.base_dir,
            config.frequency,
            output_dir.display()
        );
        run_sessions(&loaded, config.parallel, &errors, loaded_name, |session| {
            process_session(session, config, &output_dir)
        })
    } else {
        Vec::new()
    };

    let mut errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
    if !errors.is_empty() {
        errors.sort();
        error!("{} session(s) failed to process", errors.len());
        for (name, err) in &errors {
            error!("  {}: {}", name, err);
        }
        return Err(PreprocessError::SessionsFailed {
            failed: errors.len(),
        });
    }

    let mut summary = PreprocessSummary {
        output_dir,
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome {
            SessionOutcome::Written(path) => summary.written.push(path),
            SessionOutcome::Skipped(name) => summary.skipped.push(name),
        }
    }
    Ok(summary)
}
