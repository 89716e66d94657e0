// ============================================================================
// proxymirror-cli/src/logging.rs
// ============================================================================
//
// LOGGING UTILITIES: Run log naming and logger bootstrap
//
// Each run writes to its own timestamped file under the log directory. The
// logger itself (console + file appenders) is installed by
// proxymirror_core::logging::setup_logging.

use std::path::{Path, PathBuf};

use log::LevelFilter;

use crate::error::{CliErrorContext, CliResult};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Path of the log file for a run started at `timestamp`.
pub fn run_log_path(log_dir: &Path, timestamp: &str) -> PathBuf {
    log_dir.join(format!("proxymirror_run_{timestamp}.log"))
}

/// Installs the process-wide logger writing to `log_file`. The file always
/// records debug detail; the console shows info unless `verbose` is set.
pub fn init_logging(log_file: &Path, verbose: bool) -> CliResult<()> {
    let console_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    proxymirror_core::setup_logging(log_file, console_level, LevelFilter::Debug)
        .map_err(|e| format!("{e:#}"))
        .cli_with_context(|| format!("Failed to set up logging to '{}'", log_file.display()))
}
