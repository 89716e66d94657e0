//! Configuration structures and constants for the proxymirror-core library.
//!
//! This module provides the configuration for a proxy build run: the source and
//! destination roots, which files count as media, how existing proxies are
//! recognized, and the base ffmpeg profile every proxy is encoded with.

mod builder;

use std::path::PathBuf;

pub use builder::CoreConfigBuilder;

use crate::error::{CoreError, CoreResult};
use crate::path_mirror::normalize_root;

// Default constants

/// Source extensions recognized as media (compared case-insensitively).
pub const DEFAULT_MEDIA_EXTENSIONS: &[&str] = &["mov", "mxf", "mpg", "avi"];

/// Container extension written for new proxies.
pub const DEFAULT_PROXY_EXTENSION: &str = "mp4";

/// Extensions that older runs produced proxies in. A proxy found under any of
/// these counts as already built.
pub const DEFAULT_LEGACY_PROXY_EXTENSIONS: &[&str] = &["mov"];

/// Path components that mark platform metadata directories.
pub const DEFAULT_SIDECAR_NAMES: &[&str] = &[".AppleDouble", "__MACOSX"];

/// Component prefixes that mark platform metadata files (AppleDouble shadow files).
pub const DEFAULT_SIDECAR_PREFIXES: &[&str] = &["._"];

/// Default ffmpeg video encoder.
pub const DEFAULT_VIDEO_CODEC: &str = "h264";

/// Default target video bitrate.
pub const DEFAULT_VIDEO_BITRATE: &str = "100k";

/// Default CRF quality value. 0 is lossless, 23 is the x264 default, 51 is the worst.
pub const DEFAULT_CRF: u8 = 25;

/// Highest CRF value accepted by the x264 family of encoders.
pub const MAX_CRF: u8 = 51;

/// Default output pixel format.
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Default proxy frame size passed to the scale filter.
pub const DEFAULT_SCALE: &str = "320:240";

/// Default resize algorithm (`-sws_flags`).
pub const DEFAULT_SCALER: &str = "lanczos";

/// Default encoder speed preset.
pub const DEFAULT_PRESET: &str = "ultrafast";

/// Default audio encoder.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";

/// Default number of output audio channels.
pub const DEFAULT_AUDIO_CHANNELS: u8 = 2;

/// Default target audio bitrate.
pub const DEFAULT_AUDIO_BITRATE: &str = "96k";

/// Default number of concurrent encode jobs (1 keeps the run sequential).
pub const DEFAULT_JOBS: usize = 1;

/// Log directory created under the destination root when none is given.
/// Dot-prefixed so it cannot collide with a mirrored source directory.
pub const DEFAULT_LOG_DIR_NAME: &str = ".proxymirror-logs";

/// Base ffmpeg parameters applied to every proxy encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeProfile {
    pub video_codec: String,
    pub video_bitrate: String,
    pub crf: u8,
    pub pixel_format: String,
    /// Scale filter argument, `WIDTH:HEIGHT`.
    pub scale: String,
    pub scaler: String,
    pub preset: String,
    pub audio_codec: String,
    pub audio_channels: u8,
    pub audio_bitrate: String,
    /// Optional cap on encoded duration (`-t`), useful for quick test passes.
    pub max_duration_secs: Option<u32>,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        Self {
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            video_bitrate: DEFAULT_VIDEO_BITRATE.to_string(),
            crf: DEFAULT_CRF,
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            scale: DEFAULT_SCALE.to_string(),
            scaler: DEFAULT_SCALER.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_channels: DEFAULT_AUDIO_CHANNELS,
            audio_bitrate: DEFAULT_AUDIO_BITRATE.to_string(),
            max_duration_secs: None,
        }
    }
}

impl EncodeProfile {
    fn validate(&self) -> CoreResult<()> {
        let required = [
            ("video codec", &self.video_codec),
            ("video bitrate", &self.video_bitrate),
            ("pixel format", &self.pixel_format),
            ("scale", &self.scale),
            ("scaler", &self.scaler),
            ("preset", &self.preset),
            ("audio codec", &self.audio_codec),
            ("audio bitrate", &self.audio_bitrate),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::Config(format!("{name} must not be empty")));
            }
        }

        if self.crf > MAX_CRF {
            return Err(CoreError::Config(format!(
                "CRF {} is out of range (0-{MAX_CRF})",
                self.crf
            )));
        }

        if self.audio_channels == 0 {
            return Err(CoreError::Config(
                "audio channel count must be at least 1".to_string(),
            ));
        }

        if self.max_duration_secs == Some(0) {
            return Err(CoreError::Config(
                "max duration must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Per-run overrides for how streams are selected from the source container.
///
/// `stream_maps: None` selects the default mapping (first video stream plus the
/// first audio stream when present). `Some(list)` replaces it with one `-map`
/// per selector; an empty list is rejected per job as invalid options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub stream_maps: Option<Vec<String>>,
}

impl EncodeOptions {
    /// Options that map exactly the given selectors.
    pub fn with_stream_maps<I, S>(selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stream_maps: Some(selectors.into_iter().map(Into::into).collect()),
        }
    }
}

/// Main configuration structure for the proxymirror-core library.
///
/// Typically created by the CLI through [`CoreConfigBuilder`] and passed to
/// [`crate::ScanPipeline::new`].
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Root of the tree to scan for media
    pub source_dir: PathBuf,

    /// Root under which the source tree is mirrored
    pub dest_dir: PathBuf,

    /// Directory for run log files
    pub log_dir: PathBuf,

    /// Encoder binary; `None` resolves `ffmpeg` from `PATH`
    pub ffmpeg_path: Option<PathBuf>,

    /// Recognized media extensions, lowercase without the leading dot
    pub media_extensions: Vec<String>,

    /// Extension written for new proxies
    pub proxy_extension: String,

    /// Extensions also accepted as an existing proxy
    pub legacy_proxy_extensions: Vec<String>,

    /// Path components that mark sidecar metadata
    pub sidecar_names: Vec<String>,

    /// Path component prefixes that mark sidecar metadata
    pub sidecar_prefixes: Vec<String>,

    /// Base ffmpeg parameters
    pub profile: EncodeProfile,

    /// Stream mapping overrides
    pub options: EncodeOptions,

    /// Maximum number of encodes running at once
    pub jobs: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            dest_dir: PathBuf::from("proxies"),
            log_dir: PathBuf::from("proxies").join(DEFAULT_LOG_DIR_NAME),
            ffmpeg_path: None,
            media_extensions: to_strings(DEFAULT_MEDIA_EXTENSIONS),
            proxy_extension: DEFAULT_PROXY_EXTENSION.to_string(),
            legacy_proxy_extensions: to_strings(DEFAULT_LEGACY_PROXY_EXTENSIONS),
            sidecar_names: to_strings(DEFAULT_SIDECAR_NAMES),
            sidecar_prefixes: to_strings(DEFAULT_SIDECAR_PREFIXES),
            profile: EncodeProfile::default(),
            options: EncodeOptions::default(),
            jobs: DEFAULT_JOBS,
        }
    }
}

impl CoreConfig {
    /// Creates a configuration with default settings for the given roots.
    /// The log directory defaults to `dest_dir/.proxymirror-logs`.
    pub fn new(source_dir: PathBuf, dest_dir: PathBuf) -> Self {
        let source_dir = normalize_root(&source_dir);
        let dest_dir = normalize_root(&dest_dir);
        Self {
            log_dir: dest_dir.join(DEFAULT_LOG_DIR_NAME),
            source_dir,
            dest_dir,
            ..Self::default()
        }
    }

    /// Checks the configuration for values that would make every job fail.
    pub fn validate(&self) -> CoreResult<()> {
        if normalize_root(&self.source_dir) == normalize_root(&self.dest_dir) {
            return Err(CoreError::Config(format!(
                "source and destination must differ (both are '{}')",
                self.source_dir.display()
            )));
        }

        if self.media_extensions.iter().all(|e| e.trim().is_empty()) {
            return Err(CoreError::Config(
                "at least one media extension is required".to_string(),
            ));
        }

        if self.proxy_extension.is_empty() || self.proxy_extension.contains(['.', '/', '\\']) {
            return Err(CoreError::Config(format!(
                "invalid proxy extension '{}'",
                self.proxy_extension
            )));
        }

        if self.jobs == 0 {
            return Err(CoreError::Config("jobs must be at least 1".to_string()));
        }

        self.profile.validate()
    }
}

/// Lowercases an extension and strips any leading dots (`.MOV` -> `mov`).
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}
