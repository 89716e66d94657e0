//! Log sink setup.
//!
//! Installs a `log4rs` configuration with two appenders: the console (stderr)
//! and an append-only run log file. Each appender has its own threshold, so the
//! file can keep debug detail while the console stays at info.

use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;

/// Line format of the run log file.
pub const FILE_LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}";

const CONSOLE_LOG_PATTERN: &str = "{h([{l}])} {m}{n}";

/// Builds the logger configuration without installing it.
pub fn build_log_config(
    log_file: &Path,
    console_level: LevelFilter,
    file_level: LevelFilter,
) -> Result<Config> {
    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_LOG_PATTERN)))
        .build();

    let file = FileAppender::builder()
        .append(true)
        .encoder(Box::new(PatternEncoder::new(FILE_LOG_PATTERN)))
        .build(log_file)
        .with_context(|| format!("opening log file {}", log_file.display()))?;

    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(console_level)))
                .build("console", Box::new(console)),
        )
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(file_level)))
                .build("file", Box::new(file)),
        )
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(console_level.max(file_level)),
        )?;

    Ok(config)
}

/// Installs the console and file appenders as the process-wide logger.
/// Call once per process.
pub fn setup_logging(
    log_file: &Path,
    console_level: LevelFilter,
    file_level: LevelFilter,
) -> Result<()> {
    let config = build_log_config(log_file, console_level, file_level)?;
    log4rs::init_config(config).context("installing logger")?;
    Ok(())
}
