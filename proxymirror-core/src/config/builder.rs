// ============================================================================
// proxymirror-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig with defaults for everything except the
// two roots. Extensions are normalized on the way in so the classifier only
// ever compares lowercase, dot-free strings.

use std::path::PathBuf;

use super::{CoreConfig, EncodeOptions, EncodeProfile, normalize_extension};
use crate::error::{CoreError, CoreResult};
use crate::path_mirror::normalize_root;

/// Builder for creating [`CoreConfig`] instances.
///
/// # Examples
///
/// ```rust
/// use proxymirror_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .source_dir(PathBuf::from("/media/rushes/"))
///     .dest_dir(PathBuf::from("/media/proxies"))
///     .crf(28)
///     .stream_maps(vec!["0:v:0".to_string(), "0:a:1".to_string()])
///     .jobs(2)
///     .build()
///     .unwrap();
///
/// assert_eq!(config.source_dir, PathBuf::from("/media/rushes"));
/// assert_eq!(config.log_dir, PathBuf::from("/media/proxies/.proxymirror-logs"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    // Required fields
    source_dir: Option<PathBuf>,
    dest_dir: Option<PathBuf>,

    // Optional fields
    log_dir: Option<PathBuf>,
    ffmpeg_path: Option<PathBuf>,
    media_extensions: Option<Vec<String>>,
    proxy_extension: Option<String>,
    legacy_proxy_extensions: Option<Vec<String>>,
    profile: EncodeProfile,
    options: EncodeOptions,
    jobs: Option<usize>,
}

impl CoreConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source root.
    pub fn source_dir(mut self, dir: PathBuf) -> Self {
        self.source_dir = Some(dir);
        self
    }

    /// Sets the destination root.
    pub fn dest_dir(mut self, dir: PathBuf) -> Self {
        self.dest_dir = Some(dir);
        self
    }

    /// Sets the log directory (defaults to `dest_dir/.proxymirror-logs`).
    pub fn log_dir(mut self, dir: PathBuf) -> Self {
        self.log_dir = Some(dir);
        self
    }

    /// Uses a specific encoder binary instead of `ffmpeg` from `PATH`.
    pub fn ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.ffmpeg_path = Some(path);
        self
    }

    /// Replaces the recognized media extensions.
    pub fn media_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.media_extensions = Some(
            extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        );
        self
    }

    /// Sets the extension written for new proxies.
    pub fn proxy_extension(mut self, ext: &str) -> Self {
        self.proxy_extension = Some(normalize_extension(ext));
        self
    }

    /// Replaces the extensions accepted as an existing proxy from older runs.
    pub fn legacy_proxy_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.legacy_proxy_extensions = Some(
            extensions
                .into_iter()
                .map(|e| normalize_extension(e.as_ref()))
                .collect(),
        );
        self
    }

    /// Replaces the whole encode profile.
    pub fn profile(mut self, profile: EncodeProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the CRF quality value.
    pub fn crf(mut self, crf: u8) -> Self {
        self.profile.crf = crf;
        self
    }

    /// Sets the encoder speed preset.
    pub fn preset(mut self, preset: &str) -> Self {
        self.profile.preset = preset.to_string();
        self
    }

    /// Sets the proxy frame size (`WIDTH:HEIGHT`).
    pub fn scale(mut self, scale: &str) -> Self {
        self.profile.scale = scale.to_string();
        self
    }

    /// Sets the video bitrate (e.g. `100k`).
    pub fn video_bitrate(mut self, bitrate: &str) -> Self {
        self.profile.video_bitrate = bitrate.to_string();
        self
    }

    /// Sets the audio bitrate (e.g. `96k`).
    pub fn audio_bitrate(mut self, bitrate: &str) -> Self {
        self.profile.audio_bitrate = bitrate.to_string();
        self
    }

    /// Caps the encoded duration of every proxy.
    pub fn max_duration_secs(mut self, secs: u32) -> Self {
        self.profile.max_duration_secs = Some(secs);
        self
    }

    /// Replaces the default stream mapping with explicit selectors.
    pub fn stream_maps(mut self, selectors: Vec<String>) -> Self {
        self.options = EncodeOptions {
            stream_maps: Some(selectors),
        };
        self
    }

    /// Sets the number of concurrent encodes.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> CoreResult<CoreConfig> {
        let source_dir = self
            .source_dir
            .ok_or_else(|| CoreError::Config("source directory is required".to_string()))?;
        let dest_dir = self
            .dest_dir
            .ok_or_else(|| CoreError::Config("destination directory is required".to_string()))?;

        let mut config = CoreConfig::new(source_dir, dest_dir);

        if let Some(log_dir) = self.log_dir {
            config.log_dir = normalize_root(&log_dir);
        }
        config.ffmpeg_path = self.ffmpeg_path;
        if let Some(extensions) = self.media_extensions {
            config.media_extensions = extensions;
        }
        if let Some(ext) = self.proxy_extension {
            config.proxy_extension = ext;
        }
        if let Some(extensions) = self.legacy_proxy_extensions {
            config.legacy_proxy_extensions = extensions;
        }
        config.profile = self.profile;
        config.options = self.options;
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_roots_fail() {
        let err = CoreConfigBuilder::new()
            .source_dir(PathBuf::from("/in"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("destination"));
    }

    #[test]
    fn extensions_are_normalized() {
        let config = CoreConfigBuilder::new()
            .source_dir(PathBuf::from("/in"))
            .dest_dir(PathBuf::from("/out"))
            .media_extensions([".MOV", "R3D", ""])
            .proxy_extension(".MP4")
            .build()
            .unwrap();
        assert_eq!(config.media_extensions, vec!["mov", "r3d"]);
        assert_eq!(config.proxy_extension, "mp4");
    }

    #[test]
    fn profile_overrides_are_applied() {
        let config = CoreConfigBuilder::new()
            .source_dir(PathBuf::from("/in"))
            .dest_dir(PathBuf::from("/out"))
            .crf(30)
            .preset("veryfast")
            .scale("640:360")
            .max_duration_secs(6)
            .build()
            .unwrap();
        assert_eq!(config.profile.crf, 30);
        assert_eq!(config.profile.preset, "veryfast");
        assert_eq!(config.profile.scale, "640:360");
        assert_eq!(config.profile.max_duration_secs, Some(6));
    }

    #[test]
    fn custom_log_dir_is_kept() {
        let config = CoreConfigBuilder::new()
            .source_dir(PathBuf::from("/in"))
            .dest_dir(PathBuf::from("/out"))
            .log_dir(PathBuf::from("/var/log/proxymirror/"))
            .build()
            .unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/var/log/proxymirror"));
    }
}
