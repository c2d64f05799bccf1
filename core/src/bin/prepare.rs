//! PREPARE: build the geophysical particle-filter dataset.
//!
//! Joins every `<name>_degraded.csv` INS trajectory under `--ins` with the aligned table
//! `<geo>/<name>.csv` and writes `<output>/<name>_geopf.csv` with free-air gravity and magnetic
//! anomalies.

use clap::Parser;
use log::{error, info};
use mems_nav::common::{init_logger, validate_input_path};
use mems_nav::{LogLevel, prepare};
use std::error::Error;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about = "Prepare geonav particle filter dataset")]
struct Cli {
    /// Directory containing the aligned CSV files with geophysical measurements
    #[arg(long)]
    geo: PathBuf,

    /// Directory containing closed-loop or degraded INS CSV files (searched recursively)
    #[arg(long)]
    ins: PathBuf,

    /// Output directory for the prepared CSV files
    #[arg(long)]
    output: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logger(cli.log_level, cli.log_file.as_ref())?;

    validate_input_path(&cli.geo)?;
    validate_input_path(&cli.ins)?;

    let summary = match prepare(&cli.geo, &cli.ins, &cli.output) {
        Ok(summary) => summary,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };
    info!(
        "Prepared {} dataset(s) in {} ({} without geophysical data)",
        summary.written.len(),
        cli.output.display(),
        summary.skipped.len()
    );
    Ok(())
}
