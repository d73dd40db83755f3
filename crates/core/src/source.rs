//! The capability seam between release parsing and the network.
//!
//! Everything that talks to GitHub goes through [`ReleaseSource`], so the
//! locator and the checksum extractor can run against an in-memory fake.

use crate::error::Result;
use crate::release::ReleaseRef;

/// Default web host for releases.
pub const GITHUB_URL: &str = "https://github.com";

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    /// File name, e.g. `checksums.txt`
    pub name: String,
    /// Absolute download URL
    pub url: String,
}

impl ReleaseAsset {
    /// Create an asset from its name and absolute URL.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Read-only access to a hosted release: its assets and rendered page text.
pub trait ReleaseSource {
    /// Base URL of the web host, without a trailing slash.
    fn base_url(&self) -> &str {
        GITHUB_URL
    }

    /// Follow the `releases/latest` redirect and return the tag it lands on.
    fn resolve_latest_tag(&self, owner: &str, repo: &str) -> Result<String>;

    /// List the assets attached to a release, in page order.
    fn list_assets(&self, release: &ReleaseRef) -> Result<Vec<ReleaseAsset>>;

    /// Plain text of the rendered release notes.
    fn release_notes(&self, release: &ReleaseRef) -> Result<String>;

    /// Fetch a URL as text. `Ok(None)` means the server answered 404.
    fn fetch_text(&self, url: &str) -> Result<Option<String>>;

    /// URL of the human-facing release page.
    fn release_page_url(&self, release: &ReleaseRef) -> String {
        format!(
            "{}/{}/{}/releases/tag/{}",
            self.base_url(),
            release.owner(),
            release.repo(),
            release.version()
        )
    }

    /// Download URL for a named asset of the release.
    fn asset_download_url(&self, release: &ReleaseRef, file_name: &str) -> String {
        format!(
            "{}/{}/{}/releases/download/{}/{}",
            self.base_url(),
            release.owner(),
            release.repo(),
            release.version(),
            file_name
        )
    }
}
