//! Command implementations for the CLI.

/// Module containing the implementation of the `build` command.
/// This command mirrors the source tree and encodes every missing proxy.
pub mod build;
