//! Release locating: turning a release URL into a [`ReleaseRef`].

use crate::error::{Error, Result};
use crate::source::ReleaseSource;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

#[allow(clippy::expect_used)]
static RELEASE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i:https?)://(?i:www\.)?(?i:github\.com)/([^/?#]+)/([^/?#]+)/releases/(?:tag/([^/?#]+)|(latest))/?(?:[?#].*)?$",
    )
    .expect("release URL pattern is a valid literal")
});

/// A release URL after parsing, before `latest` is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseUrl {
    /// `.../releases/tag/<tag>`
    Tag {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
        /// Tag exactly as written in the URL
        tag: String,
    },
    /// `.../releases/latest`
    Latest {
        /// Repository owner
        owner: String,
        /// Repository name
        repo: String,
    },
}

impl ReleaseUrl {
    /// Parse a GitHub release URL.
    pub fn parse(url: &str) -> Result<Self> {
        let trimmed = url.trim();
        let caps = RELEASE_URL.captures(trimmed).ok_or_else(|| {
            Error::invalid_url(
                trimmed,
                "expected https://github.com/<owner>/<repo>/releases/tag/<tag> or .../releases/latest",
            )
        })?;

        let owner = caps.get(1).map_or("", |m| m.as_str());
        let repo = caps.get(2).map_or("", |m| m.as_str());
        validate_owner(trimmed, owner)?;
        validate_repo(trimmed, repo)?;

        if let Some(tag) = caps.get(3) {
            Ok(Self::Tag {
                owner: owner.to_string(),
                repo: repo.to_string(),
                tag: tag.as_str().to_string(),
            })
        } else {
            Ok(Self::Latest {
                owner: owner.to_string(),
                repo: repo.to_string(),
            })
        }
    }

    /// Repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        match self {
            Self::Tag { owner, .. } | Self::Latest { owner, .. } => owner,
        }
    }

    /// Repository name.
    #[must_use]
    pub fn repo(&self) -> &str {
        match self {
            Self::Tag { repo, .. } | Self::Latest { repo, .. } => repo,
        }
    }
}

fn validate_owner(url: &str, owner: &str) -> Result<()> {
    let valid = !owner.is_empty()
        && owner.len() <= 39
        && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !owner.starts_with('-')
        && !owner.ends_with('-')
        && !owner.contains("--");
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_url(
            url,
            format!("'{owner}' is not a valid GitHub owner"),
        ))
    }
}

fn validate_repo(url: &str, repo: &str) -> Result<()> {
    let valid = !repo.is_empty()
        && repo.len() <= 100
        && repo != "."
        && repo != ".."
        && repo
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_url(
            url,
            format!("'{repo}' is not a valid GitHub repository name"),
        ))
    }
}

/// A fully resolved release: where it lives, which version, which app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRef {
    owner: String,
    repo: String,
    version: String,
    app_name: String,
}

impl ReleaseRef {
    /// Build a release reference, deriving the app name from the repository
    /// when no non-blank override is given.
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        version: impl Into<String>,
        app_name: Option<&str>,
    ) -> Result<Self> {
        let owner = owner.into();
        let repo = repo.into();
        let version = version.into();
        let display = format!("{owner}/{repo}");
        validate_owner(&display, &owner)?;
        validate_repo(&display, &repo)?;
        if version.trim().is_empty() {
            return Err(Error::invalid_url(display, "release version is empty"));
        }

        let app_name = match app_name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => repo.clone(),
        };

        Ok(Self {
            owner,
            repo,
            version,
            app_name,
        })
    }

    /// Repository owner.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Repository name.
    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Release tag, verbatim.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Application name used to pick artifacts.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }
}

impl fmt::Display for ReleaseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.version)
    }
}

/// Resolve a release URL into a [`ReleaseRef`].
///
/// `latest` URLs are resolved through the source's redirect lookup; the
/// literal string "latest" is never used as a version.
pub fn locate(
    url: &str,
    app_name: Option<&str>,
    source: &dyn ReleaseSource,
) -> Result<ReleaseRef> {
    let parsed = ReleaseUrl::parse(url)?;
    debug!(?parsed, "Parsed release URL");
    resolve(&parsed, app_name, source)
}

/// Resolve an already parsed release URL into a [`ReleaseRef`].
pub fn resolve(
    parsed: &ReleaseUrl,
    app_name: Option<&str>,
    source: &dyn ReleaseSource,
) -> Result<ReleaseRef> {
    let version = match parsed {
        ReleaseUrl::Tag { tag, .. } => tag.clone(),
        ReleaseUrl::Latest { owner, repo } => {
            let tag = source.resolve_latest_tag(owner, repo)?;
            if tag.trim().is_empty() || tag.eq_ignore_ascii_case("latest") {
                return Err(Error::fetch(
                    format!("{}/{owner}/{repo}/releases/latest", source.base_url()),
                    "the latest release did not redirect to a tagged release",
                ));
            }
            info!(%owner, %repo, %tag, "Resolved latest release");
            tag
        }
    };

    ReleaseRef::new(parsed.owner(), parsed.repo(), version, app_name)
}
