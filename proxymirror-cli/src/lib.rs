// proxymirror-cli/src/lib.rs
//
// Library portion of the proxymirror CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod terminal;

// Re-export items needed by the binary or integration tests
pub use cli::{BuildArgs, Cli, Commands};
pub use commands::build::run_build;
pub use error::{CliErrorContext, CliResult};
