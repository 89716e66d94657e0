//! Mirrored path computation between the source and destination roots.
//!
//! Every path here is derived by decomposition (`PathParts`) rather than string
//! replacement, so `clip.mov.mov` maps to `clip.mov.mp4` and roots given with
//! trailing separators never produce doubled separators.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};

/// Normalizes a root path: drops trailing separators, repeated separators and
/// interior `.` components. Relative paths stay relative.
pub fn normalize_root(path: &Path) -> PathBuf {
    let normalized: PathBuf = path.components().collect();
    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// A file path split into directory, stem and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParts {
    pub dir: PathBuf,
    pub stem: OsString,
    pub extension: Option<OsString>,
}

impl PathParts {
    /// Splits `path` into its parts. Fails for paths with no file name (`/`, `..`).
    pub fn decompose(path: &Path) -> CoreResult<Self> {
        let stem = path
            .file_stem()
            .ok_or_else(|| {
                CoreError::PathError(format!("'{}' has no file name", path.display()))
            })?
            .to_os_string();

        Ok(Self {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            stem,
            extension: path.extension().map(|e| e.to_os_string()),
        })
    }

    /// Reassembles the path with `extension` in place of the original one.
    pub fn with_extension(&self, extension: &str) -> PathBuf {
        let mut file_name = self.stem.clone();
        if !extension.is_empty() {
            file_name.push(".");
            file_name.push(extension);
        }
        self.dir.join(file_name)
    }
}

/// Computes destination paths that reproduce the source tree under another root.
#[derive(Debug, Clone)]
pub struct PathMirror {
    source_root: PathBuf,
    dest_root: PathBuf,
    proxy_extension: String,
    legacy_extensions: Vec<String>,
}

impl PathMirror {
    pub fn new(
        source_root: &Path,
        dest_root: &Path,
        proxy_extension: &str,
        legacy_extensions: &[String],
    ) -> Self {
        Self {
            source_root: normalize_root(source_root),
            dest_root: normalize_root(dest_root),
            proxy_extension: proxy_extension.to_string(),
            legacy_extensions: legacy_extensions.to_vec(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(
            &config.source_dir,
            &config.dest_dir,
            &config.proxy_extension,
            &config.legacy_proxy_extensions,
        )
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn dest_root(&self) -> &Path {
        &self.dest_root
    }

    /// Path of `source_path` relative to the source root.
    pub fn relative_path(&self, source_path: &Path) -> CoreResult<PathBuf> {
        let normalized = normalize_root(source_path);
        normalized
            .strip_prefix(&self.source_root)
            .map(Path::to_path_buf)
            .map_err(|_| {
                CoreError::PathError(format!(
                    "'{}' is not inside source root '{}'",
                    source_path.display(),
                    self.source_root.display()
                ))
            })
    }

    /// Destination counterpart of a source file or directory.
    pub fn output_path_for(&self, source_path: &Path) -> CoreResult<PathBuf> {
        let relative = self.relative_path(source_path)?;
        if relative.as_os_str().is_empty() {
            Ok(self.dest_root.clone())
        } else {
            Ok(self.dest_root.join(relative))
        }
    }

    /// Proxy path for a source media file: mirrored location, proxy extension.
    pub fn proxy_target(&self, source_file: &Path) -> CoreResult<PathBuf> {
        let mirrored = self.output_path_for(source_file)?;
        if mirrored == self.dest_root {
            return Err(CoreError::PathError(format!(
                "'{}' is the source root, not a file",
                source_file.display()
            )));
        }
        Ok(PathParts::decompose(&mirrored)?.with_extension(&self.proxy_extension))
    }

    /// Returns the proxy already present for `target`, checking the primary
    /// extension first and then every legacy extension.
    pub fn existing_proxy(&self, target: &Path) -> Option<PathBuf> {
        let parts = PathParts::decompose(target).ok()?;
        std::iter::once(&self.proxy_extension)
            .chain(self.legacy_extensions.iter())
            .map(|ext| parts.with_extension(ext))
            .find(|candidate| candidate.is_file())
    }

    /// Whether `path` lies inside the destination root.
    pub fn is_inside_dest(&self, path: &Path) -> bool {
        normalize_root(path).starts_with(&self.dest_root)
    }

    /// Creates `path` and any missing parents. An existing directory is success.
    pub fn ensure_dir(path: &Path) -> CoreResult<()> {
        fs::create_dir_all(path).map_err(|source| CoreError::DirectoryCreate {
            path: path.to_path_buf(),
            source,
        })
    }
}
