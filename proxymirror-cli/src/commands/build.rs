//! Implementation of the 'build' subcommand.
//!
//! Validates the roots, turns the arguments into a core configuration, sets up
//! logging, runs the scan pipeline and prints the summary.

use crate::cli::BuildArgs;
use crate::error::{CliErrorContext, CliResult};
use crate::logging::{get_timestamp, init_logging, run_log_path};
use crate::terminal;

use proxymirror_core::path_mirror::normalize_root;
use proxymirror_core::{CoreConfig, CoreConfigBuilder, CoreError, ScanPipeline, SidecarSpawner, Summary};

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use log::{debug, info};

/// Checks that the input exists and is a directory.
fn validate_input(args: &BuildArgs) -> CliResult<()> {
    let input = normalize_root(&args.input_dir);
    if !input.exists() {
        return Err(CoreError::PathError(format!(
            "Input directory not found: '{}'",
            args.input_dir.display()
        )));
    }
    if !input.is_dir() {
        return Err(CoreError::PathError(format!(
            "Input path '{}' is not a directory",
            args.input_dir.display()
        )));
    }
    Ok(())
}

/// Creates and validates the core configuration from CLI arguments.
pub fn create_core_config(args: &BuildArgs) -> CliResult<CoreConfig> {
    let mut builder = CoreConfigBuilder::new()
        .source_dir(args.input_dir.clone())
        .dest_dir(args.output_dir.clone())
        .jobs(usize::from(args.jobs));

    if let Some(log_dir) = &args.log_dir {
        builder = builder.log_dir(log_dir.clone());
    }
    if let Some(ffmpeg) = &args.ffmpeg {
        builder = builder.ffmpeg_path(ffmpeg.clone());
    }
    if !args.stream_maps.is_empty() {
        builder = builder.stream_maps(args.stream_maps.clone());
    }
    if !args.extensions.is_empty() {
        builder = builder.media_extensions(&args.extensions);
    }
    if let Some(crf) = args.crf {
        builder = builder.crf(crf);
    }
    if let Some(preset) = &args.preset {
        builder = builder.preset(preset);
    }
    if let Some(scale) = &args.scale {
        builder = builder.scale(scale);
    }
    if let Some(rate) = &args.video_bitrate {
        builder = builder.video_bitrate(rate);
    }
    if let Some(rate) = &args.audio_bitrate {
        builder = builder.audio_bitrate(rate);
    }
    if let Some(secs) = args.max_duration {
        builder = builder.max_duration_secs(secs);
    }

    builder.build()
}

/// Main entry point for the build command.
///
/// Per-file failures are reported in the summary and do not make this return
/// an error; only invalid arguments and root-level failures do.
pub fn run_build(args: BuildArgs, cancel: Arc<AtomicBool>) -> CliResult<Summary> {
    let start = Instant::now();

    validate_input(&args)?;
    let config = create_core_config(&args)?;

    let log_path = run_log_path(&config.log_dir, &get_timestamp());
    init_logging(&log_path, args.verbose)?;

    if !args.json {
        terminal::print_section("Proxy build");
        terminal::print_status("Input", &config.source_dir.display().to_string(), false);
        terminal::print_status("Output", &config.dest_dir.display().to_string(), false);
        terminal::print_status("Log file", &log_path.display().to_string(), false);
        terminal::print_status("Jobs", &config.jobs.to_string(), false);
    }
    info!("Log file: {}", log_path.display());
    debug!("Configuration: {config:?}");

    let summary = ScanPipeline::new(config, SidecarSpawner)?
        .with_cancel_flag(cancel)
        .run()?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary).cli_context("Failed to serialize summary")?;
        println!("{json}");
    } else {
        terminal::print_summary(&summary, start.elapsed());
    }

    Ok(summary)
}
