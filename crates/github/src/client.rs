//! Blocking HTTP implementation of [`ReleaseSource`] for the GitHub web host.

use crate::config::SourceConfig;
use crate::html;
use brewbump_core::{Error, ReleaseAsset, ReleaseRef, ReleaseSource, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use tracing::{debug, instrument};

/// Reads release pages and assets from GitHub over plain HTTPS.
///
/// No authentication is sent and nothing is retried; rate limiting
/// surfaces as [`Error::Fetch`].
pub struct GitHubWebSource {
    client: Client,
    config: SourceConfig,
}

impl GitHubWebSource {
    /// Create a source with the given settings.
    pub fn new(config: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::fetch(&config.base_url, format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The settings this source was built with.
    #[must_use]
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn get(&self, url: &str) -> Result<Response> {
        debug!(%url, "GET");
        self.client
            .get(url)
            .send()
            .map_err(|e| Error::fetch(url, describe(&e)))
    }

    fn get_success(&self, url: &str) -> Result<Response> {
        let response = self.get(url)?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::fetch_status(url, status.as_u16()))
        }
    }

    fn get_text(&self, url: &str) -> Result<String> {
        self.get_success(url)?
            .text()
            .map_err(|e| Error::fetch(url, format!("Failed to read response: {}", describe(&e))))
    }

    fn expanded_assets_url(&self, release: &ReleaseRef) -> String {
        format!(
            "{}/{}/{}/releases/expanded_assets/{}",
            self.config.base_url,
            release.owner(),
            release.repo(),
            release.version()
        )
    }
}

/// Flatten a reqwest error into a one-line description.
fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

impl ReleaseSource for GitHubWebSource {
    fn base_url(&self) -> &str {
        &self.config.base_url
    }

    #[instrument(skip(self))]
    fn resolve_latest_tag(&self, owner: &str, repo: &str) -> Result<String> {
        let url = format!("{}/{owner}/{repo}/releases/latest", self.config.base_url);
        let response = self.get_success(&url)?;
        let landed = response.url().as_str().to_string();
        debug!(%landed, "Followed latest release redirect");

        html::tag_from_url(&landed).ok_or_else(|| {
            Error::fetch(
                &url,
                format!("redirected to {landed}, which is not a tagged release (no published release?)"),
            )
        })
    }

    #[instrument(skip(self, release), fields(release = %release))]
    fn list_assets(&self, release: &ReleaseRef) -> Result<Vec<ReleaseAsset>> {
        let page = self.get_text(&self.release_page_url(release))?;
        let mut assets = html::asset_links(&page, &self.config.base_url);

        // Release pages load the asset list lazily from a separate fragment.
        match self.get_text(&self.expanded_assets_url(release)) {
            Ok(fragment) => {
                for asset in html::asset_links(&fragment, &self.config.base_url) {
                    if !assets.iter().any(|a| a.url == asset.url) {
                        assets.push(asset);
                    }
                }
            }
            Err(e) => debug!(error = %e, "No expanded assets fragment"),
        }

        Ok(assets)
    }

    #[instrument(skip(self, release), fields(release = %release))]
    fn release_notes(&self, release: &ReleaseRef) -> Result<String> {
        let page = self.get_text(&self.release_page_url(release))?;
        Ok(html::markdown_body_text(&page).unwrap_or_default())
    }

    fn fetch_text(&self, url: &str) -> Result<Option<String>> {
        let response = self.get(url)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::fetch_status(url, status.as_u16()));
        }
        response
            .text()
            .map(Some)
            .map_err(|e| Error::fetch(url, format!("Failed to read response: {}", describe(&e))))
    }
}
