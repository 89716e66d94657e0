//! Classification of source tree entries.
//!
//! Decides, from the path and entry type alone, whether an entry is a directory
//! to mirror, a media file that needs a proxy, a platform sidecar artifact, or
//! simply some other file. File contents are never read.

use std::path::{Component, Path};

use crate::config::{CoreConfig, normalize_extension};

/// How a single walked entry is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEntry {
    /// A directory to mirror and descend into.
    Directory,
    /// A recognized media file.
    CandidateFile,
    /// Platform metadata (AppleDouble shadow files, `__MACOSX`, ...). Never a
    /// candidate, whatever its extension.
    IgnoredArtifact,
    /// A file whose extension is not a recognized media extension.
    NonCandidate,
}

/// Entry classifier built from the recognized extension set and sidecar markers.
#[derive(Debug, Clone)]
pub struct Classifier {
    media_extensions: Vec<String>,
    sidecar_names: Vec<String>,
    sidecar_prefixes: Vec<String>,
}

impl Classifier {
    pub fn new(
        media_extensions: &[String],
        sidecar_names: &[String],
        sidecar_prefixes: &[String],
    ) -> Self {
        Self {
            media_extensions: media_extensions
                .iter()
                .map(|e| normalize_extension(e))
                .filter(|e| !e.is_empty())
                .collect(),
            sidecar_names: sidecar_names.to_vec(),
            sidecar_prefixes: sidecar_prefixes
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(
            &config.media_extensions,
            &config.sidecar_names,
            &config.sidecar_prefixes,
        )
    }

    /// Classifies an entry. `relative_path` is the entry's path below the
    /// source root, so sidecar markers above the root never exclude the tree.
    pub fn classify(&self, relative_path: &Path, is_dir: bool) -> ScanEntry {
        if self.is_sidecar_artifact(relative_path) {
            return ScanEntry::IgnoredArtifact;
        }

        if is_dir {
            ScanEntry::Directory
        } else if self.is_media_file(relative_path) {
            ScanEntry::CandidateFile
        } else {
            ScanEntry::NonCandidate
        }
    }

    /// Whether the file extension is in the recognized set (case-insensitive).
    pub fn is_media_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.media_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }

    /// Whether any component of the path is a sidecar marker.
    pub fn is_sidecar_artifact(&self, path: &Path) -> bool {
        path.components().any(|component| match component {
            Component::Normal(name) => name.to_str().is_some_and(|name| {
                self.sidecar_names.iter().any(|marker| marker == name)
                    || self
                        .sidecar_prefixes
                        .iter()
                        .any(|prefix| name.starts_with(prefix.as_str()))
            }),
            _ => false,
        })
    }
}
