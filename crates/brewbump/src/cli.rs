//! Command-line surface: arguments, exit codes, error rendering and JSON envelopes.

use crate::tracing::{LogLevel, TracingFormat};
use crate::update::UpdateRequest;
use brewbump_core::Error;
use brewbump_github::SourceConfig;
use clap::Parser;
use miette::Report;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Fetch, extraction, formula or I/O failure exit code
pub const EXIT_FAILURE: i32 = 1;
/// Invalid input exit code, shared with clap usage errors
pub const EXIT_USAGE: i32 = 2;

/// Update a Homebrew formula's version and per-platform sha256 fields
/// from a GitHub release.
#[derive(Parser, Debug)]
#[command(name = "brewbump")]
#[command(about = "Update a Homebrew formula's version and sha256 fields from a GitHub release")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// Release URL, e.g. https://github.com/acme/widget/releases/tag/2.3.0
    /// or https://github.com/acme/widget/releases/latest
    #[arg(value_name = "RELEASE_URL")]
    pub url: String,

    /// Formula file to update.
    #[arg(short = 'o', long = "output", env = "BREWBUMP_FORMULA", value_name = "FORMULA")]
    pub formula: PathBuf,

    /// Application name used to pick checksum lines (defaults to the repository name).
    #[arg(short = 'n', long, env = "BREWBUMP_APP_NAME")]
    pub app_name: Option<String>,

    /// Show the changes as a diff without writing the formula.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit a JSON envelope instead of text.
    #[arg(long)]
    pub json: bool,

    /// HTTP timeout in seconds.
    #[arg(long, env = "BREWBUMP_HTTP_TIMEOUT", default_value_t = 30, value_name = "SECS")]
    pub timeout: u64,

    /// Logging verbosity level.
    #[arg(short = 'L', long, default_value = "warn", value_enum)]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, default_value = "compact", value_enum)]
    pub log_format: TracingFormat,
}

impl Cli {
    /// HTTP settings for the release source.
    #[must_use]
    pub fn source_config(&self) -> SourceConfig {
        SourceConfig::default().with_timeout(Duration::from_secs(self.timeout))
    }

    /// The update this invocation asks for.
    #[must_use]
    pub fn request(&self) -> UpdateRequest {
        UpdateRequest {
            url: self.url.clone(),
            formula: self.formula.clone(),
            app_name: self.app_name.clone(),
            dry_run: self.dry_run,
        }
    }
}

/// Parse the process arguments, exiting on usage errors.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Map an error to the process exit code
#[must_use]
pub const fn exit_code_for(err: &Error) -> i32 {
    match err {
        Error::InvalidUrl { .. } => EXIT_USAGE,
        Error::Fetch { .. }
        | Error::NoChecksumsFound { .. }
        | Error::VersionFieldNotFound { .. }
        | Error::FileIo { .. } => EXIT_FAILURE,
    }
}

/// Error body of the JSON envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable error kind, e.g. `no_checksums_found`
    pub code: String,
    /// Display message
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            code: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: Error, json_mode: bool) {
    if json_mode {
        let envelope = ErrorEnvelope::new(ErrorBody::from(&err));
        match serde_json::to_string(&envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err);
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}
