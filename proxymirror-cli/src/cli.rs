// proxymirror-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Proxymirror: proxy media builder",
    long_about = "Mirrors a media tree under a destination directory and encodes a \
                  low-resolution ffmpeg proxy for every media file that lacks one."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Builds missing proxies for every media file under the input directory
    Build(BuildArgs),
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Source directory to scan
    #[arg(short = 'i', long = "input", required = true, value_name = "SOURCE_DIR")]
    pub input_dir: PathBuf,

    /// Directory under which the source tree is mirrored
    #[arg(short = 'o', long = "output", required = true, value_name = "DEST_DIR")]
    pub output_dir: PathBuf,

    /// Stream selector passed as `-map` (repeatable). Replaces the default
    /// mapping of the first video and first audio stream.
    #[arg(long = "map", value_name = "SELECTOR", action = ArgAction::Append)]
    pub stream_maps: Vec<String>,

    /// Number of encodes to run at once
    #[arg(short = 'j', long, value_name = "N", default_value_t = 1,
          value_parser = clap::value_parser!(u8).range(1..=64))]
    pub jobs: u8,

    /// Optional: Directory for log files (defaults to DEST_DIR/.proxymirror-logs)
    #[arg(short, long, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Encoder binary to run instead of `ffmpeg` from PATH
    #[arg(long, value_name = "PATH", env = "PROXYMIRROR_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    // --- Profile Overrides ---
    /// Optional: Override the CRF quality value (0-51, lower is better quality)
    #[arg(long, value_name = "CRF", value_parser = clap::value_parser!(u8).range(0..=51))]
    pub crf: Option<u8>,

    /// Optional: Override the encoder speed preset (e.g. ultrafast, veryfast)
    #[arg(long, value_name = "PRESET")]
    pub preset: Option<String>,

    /// Optional: Override the proxy frame size
    #[arg(long, value_name = "WIDTH:HEIGHT")]
    pub scale: Option<String>,

    /// Optional: Override the video bitrate (e.g. 100k)
    #[arg(long, value_name = "RATE")]
    pub video_bitrate: Option<String>,

    /// Optional: Override the audio bitrate (e.g. 96k)
    #[arg(long, value_name = "RATE")]
    pub audio_bitrate: Option<String>,

    /// Optional: Encode at most this many seconds of each file
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_duration: Option<u32>,

    /// Media extension to scan for (repeatable). Replaces mov, mxf, mpg and avi.
    #[arg(long = "ext", value_name = "EXT", action = ArgAction::Append)]
    pub extensions: Vec<String>,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Show debug output on the console
    #[arg(short, long)]
    pub verbose: bool,
}
