//! FFmpeg argument building for proxy encodes.
//!
//! The argument list is a fixed base profile followed by exactly one of two
//! mapping modes: the default mapping (first video stream, first audio stream
//! if any) or one `-map` per caller-supplied selector.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::{EncodeOptions, EncodeProfile};
use crate::error::{CoreError, CoreResult};

/// Default video stream selector.
pub const DEFAULT_VIDEO_MAP: &str = "0:v:0";

/// Default audio stream selector. The trailing `?` keeps video-only sources encodable.
pub const DEFAULT_AUDIO_MAP: &str = "0:a:0?";

/// Log level passed to ffmpeg; routine informational output is suppressed.
pub const FFMPEG_LOG_LEVEL: &str = "warning";

/// A fully assembled encoder invocation, minus the path ffmpeg writes to.
///
/// The output argument is appended by [`CommandSpec::argv`] so the invoker can
/// point ffmpeg at a staging file and rename it onto `output` afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl CommandSpec {
    /// Complete argument vector writing to `write_to`.
    pub fn argv(&self, write_to: &Path) -> Vec<OsString> {
        self.args
            .iter()
            .map(OsString::from)
            .chain(std::iter::once(write_to.as_os_str().to_os_string()))
            .collect()
    }

    /// The `-map` selectors in argument order.
    pub fn map_selectors(&self) -> Vec<&str> {
        self.args
            .windows(2)
            .filter(|pair| pair[0] == "-map")
            .map(|pair| pair[1].as_str())
            .collect()
    }
}

/// Checks a single `-map` selector such as `0:v:0`, `0:a:1?`, `-0:s` or
/// `0:m:language:eng`. Anything else would corrupt the whole command line.
pub fn validate_stream_selector(selector: &str) -> CoreResult<()> {
    let invalid = |reason: &str| {
        CoreError::InvalidOptions(format!("stream selector '{selector}' {reason}"))
    };

    if selector.is_empty() {
        return Err(invalid("is empty"));
    }
    if selector.chars().any(char::is_whitespace) {
        return Err(invalid("contains whitespace"));
    }

    let body = selector.strip_prefix('-').unwrap_or(selector);
    let body = body.strip_suffix('?').unwrap_or(body);

    let mut segments = body.split(':');
    let input_index = segments.next().unwrap_or_default();
    if input_index.is_empty() || !input_index.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("must start with an input index"));
    }

    for segment in segments {
        if segment.is_empty() {
            return Err(invalid("has an empty specifier"));
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '#' | '.' | '=' | '+' | '-'))
        {
            return Err(invalid("has an invalid specifier"));
        }
    }

    Ok(())
}

/// Resolves the `-map` selectors for a job: the defaults when no overrides are
/// given, otherwise the validated overrides.
pub fn resolve_stream_maps(options: &EncodeOptions) -> CoreResult<Vec<String>> {
    match &options.stream_maps {
        None => Ok(vec![
            DEFAULT_VIDEO_MAP.to_string(),
            DEFAULT_AUDIO_MAP.to_string(),
        ]),
        Some(selectors) if selectors.is_empty() => Err(CoreError::InvalidOptions(
            "stream map override list is empty".to_string(),
        )),
        Some(selectors) => {
            let trimmed: Vec<String> = selectors.iter().map(|s| s.trim().to_string()).collect();
            for selector in &trimmed {
                validate_stream_selector(selector)?;
            }
            Ok(trimmed)
        }
    }
}

/// Builds the encoder arguments (without the output path) for one source file.
pub fn build_proxy_args(
    profile: &EncodeProfile,
    options: &EncodeOptions,
    input: &Path,
) -> CoreResult<Vec<String>> {
    let maps = resolve_stream_maps(options)?;

    let mut args: Vec<String> = vec![
        "-nostdin".into(),
        "-y".into(),
        "-loglevel".into(),
        FFMPEG_LOG_LEVEL.into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
    ];

    if let Some(secs) = profile.max_duration_secs {
        args.extend(["-t".to_string(), secs.to_string()]);
    }

    args.extend([
        "-c:v".to_string(),
        profile.video_codec.clone(),
        "-b:v".to_string(),
        profile.video_bitrate.clone(),
        "-crf".to_string(),
        profile.crf.to_string(),
        "-pix_fmt".to_string(),
        profile.pixel_format.clone(),
        "-vf".to_string(),
        format!("scale={}", profile.scale),
        "-sws_flags".to_string(),
        profile.scaler.clone(),
        "-preset".to_string(),
        profile.preset.clone(),
        "-c:a".to_string(),
        profile.audio_codec.clone(),
        "-ac".to_string(),
        profile.audio_channels.to_string(),
        "-b:a".to_string(),
        profile.audio_bitrate.clone(),
    ]);

    for selector in maps {
        args.push("-map".to_string());
        args.push(selector);
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn base_profile_arguments_are_present() {
        let args = build_proxy_args(
            &EncodeProfile::default(),
            &EncodeOptions::default(),
            Path::new("/in/clip.mov"),
        )
        .unwrap();

        assert_eq!(value_after(&args, "-i"), Some("/in/clip.mov"));
        assert!(args.contains(&"-y".to_string()));
        assert_eq!(value_after(&args, "-loglevel"), Some("warning"));
        assert_eq!(value_after(&args, "-c:v"), Some("h264"));
        assert_eq!(value_after(&args, "-b:v"), Some("100k"));
        assert_eq!(value_after(&args, "-crf"), Some("25"));
        assert_eq!(value_after(&args, "-pix_fmt"), Some("yuv420p"));
        assert_eq!(value_after(&args, "-vf"), Some("scale=320:240"));
        assert_eq!(value_after(&args, "-sws_flags"), Some("lanczos"));
        assert_eq!(value_after(&args, "-preset"), Some("ultrafast"));
        assert_eq!(value_after(&args, "-c:a"), Some("aac"));
        assert_eq!(value_after(&args, "-ac"), Some("2"));
        assert_eq!(value_after(&args, "-b:a"), Some("96k"));
        assert!(value_after(&args, "-t").is_none());
    }

    #[test]
    fn duration_cap_is_emitted_when_set() {
        let profile = EncodeProfile {
            max_duration_secs: Some(6),
            ..EncodeProfile::default()
        };
        let args =
            build_proxy_args(&profile, &EncodeOptions::default(), Path::new("a.mov")).unwrap();
        assert_eq!(value_after(&args, "-t"), Some("6"));
    }

    #[test]
    fn default_mapping_without_overrides() {
        let args = build_proxy_args(
            &EncodeProfile::default(),
            &EncodeOptions::default(),
            Path::new("a.mov"),
        )
        .unwrap();
        let spec = CommandSpec {
            program: PathBuf::from("ffmpeg"),
            args,
            input: PathBuf::from("a.mov"),
            output: PathBuf::from("a.mp4"),
        };
        assert_eq!(spec.map_selectors(), vec![DEFAULT_VIDEO_MAP, DEFAULT_AUDIO_MAP]);
    }

    #[test]
    fn overrides_replace_default_mapping() {
        let options = EncodeOptions::with_stream_maps(["0:v:1", "0:a:2"]);
        let args =
            build_proxy_args(&EncodeProfile::default(), &options, Path::new("a.mov")).unwrap();
        let spec = CommandSpec {
            program: PathBuf::from("ffmpeg"),
            args,
            input: PathBuf::from("a.mov"),
            output: PathBuf::from("a.mp4"),
        };
        let maps = spec.map_selectors();
        assert_eq!(maps, vec!["0:v:1", "0:a:2"]);
        assert!(!maps.contains(&DEFAULT_VIDEO_MAP));
        assert!(!maps.contains(&DEFAULT_AUDIO_MAP));
    }

    #[test]
    fn empty_override_list_is_invalid() {
        let options = EncodeOptions {
            stream_maps: Some(Vec::new()),
        };
        let result = build_proxy_args(&EncodeProfile::default(), &options, Path::new("a.mov"));
        assert!(matches!(result, Err(CoreError::InvalidOptions(_))));
    }

    #[test]
    fn selector_validation() {
        for ok in ["0:v:0", "0:a:1?", "-0:s", "1", "0:m:language:eng", "0:#0x101"] {
            assert!(validate_stream_selector(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["", "v:0", "0::1", "0:a 1", "0:a;rm", ":0"] {
            assert!(validate_stream_selector(bad).is_err(), "{bad} should be invalid");
        }
    }

    #[test]
    fn argv_appends_write_target() {
        let spec = CommandSpec {
            program: PathBuf::from("ffmpeg"),
            args: vec!["-y".to_string()],
            input: PathBuf::from("a.mov"),
            output: PathBuf::from("/out/a.mp4"),
        };
        let argv = spec.argv(Path::new("/out/.a.partial-x.mp4"));
        assert_eq!(argv.last().unwrap(), "/out/.a.partial-x.mp4");
        assert_eq!(argv.len(), 2);
    }
}
