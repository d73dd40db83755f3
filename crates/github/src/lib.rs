//! GitHub release page source for brewbump.
//!
//! Provides [`GitHubWebSource`], the [`brewbump_core::ReleaseSource`]
//! implementation that reads public release pages, their lazily loaded asset
//! lists and attached files over a blocking HTTP client.

mod client;
pub mod config;
pub mod html;

pub use client::GitHubWebSource;
pub use config::{DEFAULT_TIMEOUT, SourceConfig};
