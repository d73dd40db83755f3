//! brewbump: update a Homebrew formula from a GitHub release.
//!
//! The binary is a thin shell over this library:
//!
//! - [`cli`] - argument parsing, exit codes and error rendering
//! - [`update`] - the locate, extract, patch, write pipeline
//! - [`report`] - text output and dry-run diffs
//! - [`tracing`] - subscriber setup

pub mod cli;
pub mod report;
pub mod tracing;
pub mod update;

pub use update::{UpdateReport, UpdateRequest, Updater};
