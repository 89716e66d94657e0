//! Core library for building low-resolution proxy encodes of a media tree.
//!
//! The pipeline walks a source directory, reproduces its structure under a
//! destination root, and asks ffmpeg to encode a proxy for every recognized
//! media file that does not have one yet. Reruns are cheap: existing proxies
//! are skipped, and one failed encode never stops the rest of the run.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use proxymirror_core::{CoreConfigBuilder, ScanPipeline, SidecarSpawner};
//! use std::path::PathBuf;
//!
//! let config = CoreConfigBuilder::new()
//!     .source_dir(PathBuf::from("/media/rushes"))
//!     .dest_dir(PathBuf::from("/media/proxies"))
//!     .jobs(2)
//!     .build()
//!     .unwrap();
//!
//! let summary = ScanPipeline::new(config, SidecarSpawner)
//!     .unwrap()
//!     .run()
//!     .unwrap();
//! println!("{} built, {} errors", summary.files_built, summary.errors);
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod external;
pub mod logging;
pub mod path_mirror;
pub mod processing;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use config::{CoreConfig, CoreConfigBuilder, EncodeOptions, EncodeProfile};
pub use discovery::{Classifier, ScanEntry};
pub use error::{CoreError, CoreResult};
pub use external::{CommandSpec, FfmpegProcess, FfmpegSpawner, SidecarSpawner};
pub use logging::setup_logging;
pub use path_mirror::{PathMirror, PathParts};
pub use processing::{
    EncodeErrorKind, EncodeInvoker, EncodeJob, EncodeResult, FailedJob, ScanPipeline, Summary,
};
pub use utils::format_duration;
