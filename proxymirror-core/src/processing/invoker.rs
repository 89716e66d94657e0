// ============================================================================
// proxymirror-core/src/processing/invoker.rs
// ============================================================================
//
// ENCODE INVOKER: One proxy encode, start to finish
//
// Builds the encoder command for a job, runs it against a staging file, and
// reports the outcome as an EncodeResult. Nothing in here returns an error to
// the caller: every failure becomes an EncodeResult carrying the cause, so the
// pipeline can record it and move on to the next file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ffmpeg_sidecar::event::FfmpegEvent;

use crate::config::{EncodeOptions, EncodeProfile};
use crate::error::{CoreResult, command_failed_error};
use crate::external::ffmpeg::{CommandSpec, build_proxy_args};
use crate::external::{FfmpegProcess, FfmpegSpawner};
use crate::temp_files::{commit_staging_file, create_staging_file};
use crate::utils::{display_name, format_duration};

/// Encoder binary used when none is configured.
pub const DEFAULT_FFMPEG_PROGRAM: &str = "ffmpeg";

/// A single unit of work: encode `input_path` into `output_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub options: EncodeOptions,
}

impl EncodeJob {
    pub fn new(input_path: PathBuf, output_path: PathBuf, options: EncodeOptions) -> Self {
        Self {
            input_path,
            output_path,
            options,
        }
    }
}

/// Why a job produced no proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeErrorKind {
    /// The stream mapping overrides could not form a valid command.
    InvalidOptions,
    /// The encoder could not be started, exited non-zero, or its output could
    /// not be moved into place.
    EncodeFailure,
}

impl fmt::Display for EncodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidOptions => write!(f, "invalid options"),
            Self::EncodeFailure => write!(f, "encode failure"),
        }
    }
}

/// Outcome of one job.
#[derive(Debug, Clone)]
pub struct EncodeResult {
    pub job: EncodeJob,
    /// Encoder exit code; `None` when no process ran to completion.
    pub exit_code: Option<i32>,
    /// Diagnostics captured from the encoder, or the failure description.
    pub output: String,
    pub error: Option<EncodeErrorKind>,
    pub elapsed: Duration,
}

impl EncodeResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// One-line cause for logs and the run summary.
    pub fn reason(&self) -> String {
        let Some(kind) = self.error else {
            return String::new();
        };
        let detail = self
            .output
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or("")
            .trim();
        match (self.exit_code, detail.is_empty()) {
            (Some(code), true) => format!("{kind}: exit code {code}"),
            (Some(code), false) => format!("{kind}: exit code {code}: {detail}"),
            (None, true) => kind.to_string(),
            (None, false) => format!("{kind}: {detail}"),
        }
    }

    fn failure(
        job: EncodeJob,
        kind: EncodeErrorKind,
        exit_code: Option<i32>,
        output: String,
        start: Instant,
    ) -> Self {
        Self {
            job,
            exit_code,
            output,
            error: Some(kind),
            elapsed: start.elapsed(),
        }
    }
}

/// Turns jobs into encoder invocations through a [`FfmpegSpawner`].
pub struct EncodeInvoker<S: FfmpegSpawner> {
    spawner: S,
    program: PathBuf,
    profile: EncodeProfile,
}

impl<S: FfmpegSpawner> EncodeInvoker<S> {
    pub fn new(spawner: S, program: Option<PathBuf>, profile: EncodeProfile) -> Self {
        Self {
            spawner,
            program: program.unwrap_or_else(|| PathBuf::from(DEFAULT_FFMPEG_PROGRAM)),
            profile,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Assembles the command for `job`. Fails with [`crate::CoreError::InvalidOptions`]
    /// before any process is started when the stream overrides are unusable.
    pub fn build(&self, job: &EncodeJob) -> CoreResult<CommandSpec> {
        let args = build_proxy_args(&self.profile, &job.options, &job.input_path)?;
        Ok(CommandSpec {
            program: self.program.clone(),
            args,
            input: job.input_path.clone(),
            output: job.output_path.clone(),
        })
    }

    /// Runs `spec` to completion and reports the outcome for `job`.
    pub fn invoke(&self, job: EncodeJob, spec: &CommandSpec) -> EncodeResult {
        let start = Instant::now();

        let staging = match create_staging_file(&spec.output) {
            Ok(staging) => staging,
            Err(e) => {
                return EncodeResult::failure(
                    job,
                    EncodeErrorKind::EncodeFailure,
                    None,
                    format!("could not create staging file: {e}"),
                    start,
                );
            }
        };

        let argv = spec.argv(&staging);
        let mut process = match self.spawner.spawn(&spec.program, &argv) {
            Ok(process) => process,
            Err(e) => {
                return EncodeResult::failure(
                    job,
                    EncodeErrorKind::EncodeFailure,
                    None,
                    e.to_string(),
                    start,
                );
            }
        };

        let mut captured = String::new();
        let events = process.handle_events(|event| {
            if let FfmpegEvent::Log(_, line) | FfmpegEvent::Error(line) = event {
                captured.push_str(&line);
                captured.push('\n');
            }
            Ok(())
        });
        if let Err(e) = events {
            log::warn!(
                "Lost encoder output for {}: {e}",
                display_name(&spec.input)
            );
        }

        let status = match process.wait() {
            Ok(status) => status,
            Err(e) => {
                captured.push_str(&e.to_string());
                return EncodeResult::failure(
                    job,
                    EncodeErrorKind::EncodeFailure,
                    None,
                    captured,
                    start,
                );
            }
        };

        if !status.success() {
            log::debug!(
                "{}",
                command_failed_error(
                    spec.program.display().to_string(),
                    status,
                    captured.trim_end()
                )
            );
            // Dropping `staging` removes the partial output.
            return EncodeResult::failure(
                job,
                EncodeErrorKind::EncodeFailure,
                status.code(),
                captured,
                start,
            );
        }

        if let Err(e) = commit_staging_file(staging, &spec.output) {
            captured.push_str(&e.to_string());
            return EncodeResult::failure(
                job,
                EncodeErrorKind::EncodeFailure,
                status.code(),
                captured,
                start,
            );
        }

        let elapsed = start.elapsed();
        log::info!(
            "Built proxy {} in {}",
            spec.output.display(),
            format_duration(elapsed)
        );
        EncodeResult {
            job,
            exit_code: status.code(),
            output: captured,
            error: None,
            elapsed,
        }
    }

    /// [`build`](Self::build) followed by [`invoke`](Self::invoke).
    pub fn run_job(&self, job: EncodeJob) -> EncodeResult {
        let start = Instant::now();
        log::info!(
            "Building proxy: {} -> {}",
            job.input_path.display(),
            job.output_path.display()
        );

        match self.build(&job) {
            Ok(spec) => {
                log::debug!("Encoder command: {} {}", spec.program.display(), spec.args.join(" "));
                self.invoke(job, &spec)
            }
            Err(e) => EncodeResult::failure(
                job,
                EncodeErrorKind::InvalidOptions,
                None,
                e.to_string(),
                start,
            ),
        }
    }
}
