//! Staging files for in-progress encodes.
//!
//! The encoder never writes the proxy path directly. It writes a hidden file in
//! the same directory, which is renamed onto the target once the encoder exits
//! successfully. Dropping the staging handle deletes whatever was written, so a
//! failed or interrupted encode leaves nothing that looks like a finished proxy.

use std::path::Path;

use tempfile::{Builder as TempFileBuilder, TempPath};

use crate::error::{CoreError, CoreResult};
use crate::path_mirror::PathParts;

/// Creates `.<stem>.partial-XXXXXX.<ext>` beside `target`. Auto-deleted when dropped.
pub fn create_staging_file(target: &Path) -> CoreResult<TempPath> {
    let parts = PathParts::decompose(target)?;
    let dir = if parts.dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parts.dir.as_path()
    };

    let prefix = format!(".{}.partial-", parts.stem.to_string_lossy());
    let suffix = parts
        .extension
        .as_ref()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let file = TempFileBuilder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile_in(dir)?;

    Ok(file.into_temp_path())
}

/// Moves a finished staging file onto `target`.
pub fn commit_staging_file(staging: TempPath, target: &Path) -> CoreResult<()> {
    staging.persist(target).map_err(|e| {
        CoreError::OperationFailed(format!(
            "failed to move finished proxy into place at '{}': {}",
            target.display(),
            e.error
        ))
    })
}
