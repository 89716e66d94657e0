// ============================================================================
// proxymirror-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with the ffmpeg binary
//
// Argument building, process spawning behind a trait, a scripted spawner for
// tests, and the startup availability check for the encoder.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{CoreError, CoreResult};

/// Encoder argument building and stream selector validation
pub mod ffmpeg;

/// Traits and implementations for running encoder processes
pub mod ffmpeg_executor;

/// Scripted spawner used by the test suites
pub mod mocks;

pub use ffmpeg::{CommandSpec, build_proxy_args, validate_stream_selector};
pub use ffmpeg_executor::{FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner};

/// Checks that an external command can be started, by running it with `-version`.
///
/// Returns [`CoreError::DependencyNotFound`] when the binary does not exist and
/// [`CoreError::CommandStart`] when it exists but cannot be executed.
pub fn check_dependency(cmd: &Path) -> CoreResult<()> {
    let result = Command::new(cmd)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", cmd.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("Dependency '{}' not found", cmd.display());
            Err(CoreError::DependencyNotFound(cmd.display().to_string()))
        }
        Err(e) => Err(CoreError::CommandStart(cmd.display().to_string(), e)),
    }
}
