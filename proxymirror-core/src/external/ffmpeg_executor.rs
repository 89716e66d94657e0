// ============================================================================
// proxymirror-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// Traits for spawning an encoder process and consuming its events, plus the
// concrete implementation on top of ffmpeg-sidecar. The pipeline is generic
// over FfmpegSpawner so tests can substitute a scripted spawner.

use std::ffi::OsString;
use std::path::Path;
use std::process::ExitStatus;

use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;

use crate::error::{CoreError, CoreResult, command_start_error, command_wait_error};

/// An active encoder process.
pub trait FfmpegProcess {
    /// Feeds every event the process emits to `handler` until its output closes.
    fn handle_events<F>(&mut self, handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>;

    /// Waits for the process to exit and returns its status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Something that can start an encoder process.
///
/// Implementations are shared between worker threads, hence `Sync`.
pub trait FfmpegSpawner: Sync {
    type Process: FfmpegProcess;

    /// Starts `program` with `args`. The last argument is the file to write.
    fn spawn(&self, program: &Path, args: &[OsString]) -> CoreResult<Self::Process>;
}

/// Wrapper around [`FfmpegChild`] implementing [`FfmpegProcess`].
pub struct SidecarProcess(FfmpegChild);

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> CoreResult<()>
    where
        F: FnMut(FfmpegEvent) -> CoreResult<()>,
    {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to read ffmpeg events: {e}");
            CoreError::OperationFailed(format!("failed to read ffmpeg output: {e}"))
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0
            .wait()
            .map_err(|e| command_wait_error("ffmpeg (sidecar)", e))
    }
}

/// Spawns real encoder processes through `ffmpeg-sidecar`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, program: &Path, args: &[OsString]) -> CoreResult<Self::Process> {
        let mut cmd = FfmpegCommand::new_with_path(program);
        cmd.args(args);
        log::debug!("Spawning encoder: {} {:?}", program.display(), args);

        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error(program.display().to_string(), e))
    }
}
