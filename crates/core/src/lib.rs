//! Core types for brewbump.
//!
//! This crate holds everything between a release URL and a per-platform
//! checksum map:
//!
//! - [`release`] - parsing release URLs and resolving them to a [`ReleaseRef`]
//! - [`source`] - the [`ReleaseSource`] capability the network layer implements
//! - [`checksum`] - parsing checksum artifacts into a [`ChecksumMap`]
//! - [`extract`] - locating the checksum artifact of a release
//! - [`error`] - the error taxonomy shared by every crate
//!
//! # Example
//!
//! ```rust,ignore
//! use brewbump_core::{ChecksumExtractor, locate};
//!
//! let release = locate(url, None, &source)?;
//! let extraction = ChecksumExtractor::new(&source).extract(&release)?;
//! ```

pub mod checksum;
pub mod error;
pub mod extract;
pub mod platform;
pub mod release;
pub mod source;

pub use checksum::{ChecksumEntry, ChecksumMap, Sha256, parse_entries};
pub use error::{Error, Result};
pub use extract::{ChecksumExtractor, ChecksumSource, Extraction};
pub use platform::PlatformKey;
pub use release::{ReleaseRef, ReleaseUrl, locate, resolve};
pub use source::{GITHUB_URL, ReleaseAsset, ReleaseSource};
