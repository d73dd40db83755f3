//! Error types for brewbump operations.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for brewbump operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a formula update run.
///
/// Every variant is terminal. Nothing is retried internally.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The input does not look like a GitHub release URL.
    #[error("Invalid release URL '{url}': {reason}")]
    #[diagnostic(
        code(brewbump::invalid_url),
        help(
            "Release URL should look like https://github.com/<owner>/<repo>/releases/tag/<tag> \
             or https://github.com/<owner>/<repo>/releases/latest"
        )
    )]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// A page or release asset could not be fetched.
    #[error("Failed to fetch {url}: {message}")]
    #[diagnostic(
        code(brewbump::fetch),
        help("Check the URL and your network connection; GitHub may also be rate limiting you")
    )]
    Fetch {
        /// The URL that was requested
        url: String,
        /// HTTP status, when the server answered
        status: Option<u16>,
        /// The error message
        message: String,
    },

    /// Release content was fetched but no platform checksum was recognised.
    #[error("No SHA256 checksums found for {release} (searched: {})", searched.join(", "))]
    #[diagnostic(
        code(brewbump::no_checksums),
        help(
            "Saw {hash_lines} hash-like line(s) but none named a supported platform. The release \
             may not publish SHA256 sums, its file names may not carry a platform tag such as \
             darwin_amd64, or the page layout has changed"
        )
    )]
    NoChecksumsFound {
        /// The release that was searched (`owner/repo@version`)
        release: String,
        /// Sources that were searched, in order
        searched: Vec<String>,
        /// Number of lines that carried a 64-hex token
        hash_lines: usize,
    },

    /// The formula has no `version "..."` line to update.
    #[error("No version field found in {}", path.display())]
    #[diagnostic(
        code(brewbump::version_field_not_found),
        help("The formula must contain a line such as: version \"1.2.3\"")
    )]
    VersionFieldNotFound {
        /// The formula path
        path: PathBuf,
    },

    /// Reading or writing the formula file failed.
    #[error("Failed to {operation} {}: {source}", path.display())]
    #[diagnostic(
        code(brewbump::file_io),
        help("Check that the formula path exists and is writable")
    )]
    FileIo {
        /// The file involved
        path: PathBuf,
        /// What was being attempted ("read", "write", ...)
        operation: &'static str,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a new invalid URL error.
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new fetch error without an HTTP status.
    #[must_use]
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            status: None,
            message: message.into(),
        }
    }

    /// Create a new fetch error for a non-success HTTP status.
    #[must_use]
    pub fn fetch_status(url: impl Into<String>, status: u16) -> Self {
        let message = match status {
            403 | 429 => format!("HTTP {status} (rate limited or forbidden)"),
            404 => format!("HTTP {status} (not found)"),
            _ => format!("HTTP {status}"),
        };
        Self::Fetch {
            url: url.into(),
            status: Some(status),
            message,
        }
    }

    /// Create a new "no checksums found" error.
    #[must_use]
    pub fn no_checksums(release: impl Into<String>, searched: Vec<String>, hash_lines: usize) -> Self {
        Self::NoChecksumsFound {
            release: release.into(),
            searched,
            hash_lines,
        }
    }

    /// Create a new missing version field error.
    #[must_use]
    pub fn version_field_not_found(path: impl Into<PathBuf>) -> Self {
        Self::VersionFieldNotFound { path: path.into() }
    }

    /// Create a new file I/O error.
    #[must_use]
    pub fn file_io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            operation,
            source,
        }
    }

    /// Short machine-readable name of the error kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl { .. } => "invalid_url",
            Self::Fetch { .. } => "fetch",
            Self::NoChecksumsFound { .. } => "no_checksums_found",
            Self::VersionFieldNotFound { .. } => "version_field_not_found",
            Self::FileIo { .. } => "file_io",
        }
    }
}
