//! Checksum extraction: find a release's checksum artifact and parse it.
//!
//! Strategies are layered, first hit wins:
//!
//! 1. the first listed asset whose name looks like a checksum file, with
//!    aggregate lists preferred over per-archive digest files
//! 2. conventional checksum file names, probed directly
//! 3. hash tables or code blocks in the rendered release notes

use crate::checksum::{ChecksumEntry, ChecksumMap, parse_entries};
use crate::error::{Error, Result};
use crate::platform::PlatformKey;
use crate::release::ReleaseRef;
use crate::source::{ReleaseAsset, ReleaseSource};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Checksum file names probed when the asset listing has no match.
pub const CONVENTIONAL_NAMES: &[&str] = &[
    "checksums.txt",
    "checksums.sha256",
    "SHA256SUMS",
    "SHA256SUMS.txt",
];

/// Where a release's checksums were read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChecksumSource {
    /// A checksum file attached to the release
    Asset {
        /// Asset file name
        name: String,
        /// Download URL
        url: String,
    },
    /// The rendered release notes
    ReleaseNotes {
        /// Release page URL
        url: String,
    },
}

impl fmt::Display for ChecksumSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset { name, url } => write!(f, "asset {name} ({url})"),
            Self::ReleaseNotes { url } => write!(f, "release notes ({url})"),
        }
    }
}

/// The result of a successful extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Where the checksums came from
    pub source: ChecksumSource,
    /// Every hash line found, in source order
    pub entries: Vec<ChecksumEntry>,
    /// Per-platform digests
    pub map: ChecksumMap,
}

/// Whether an asset name looks like a checksum listing.
#[must_use]
pub fn is_checksum_asset(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("checksum") || lower.contains("sha256") || lower.ends_with("sums.txt")
}

/// Whether a checksum-looking asset holds the digest of a single archive,
/// e.g. `widget_darwin_amd64.tar.gz.sha256`.
#[must_use]
pub fn is_per_file_digest(name: &str) -> bool {
    const ARCHIVES: &[&str] = &[".tar.gz", ".tgz", ".tar.xz", ".tar.bz2", ".zip", ".dmg", ".pkg", ".deb", ".rpm"];

    let lower = name.to_ascii_lowercase();
    let Some(stem) = lower
        .strip_suffix(".sha256")
        .or_else(|| lower.strip_suffix(".sha256sum"))
    else {
        return false;
    };
    PlatformKey::find_in(stem).is_some() || ARCHIVES.iter().any(|ext| stem.ends_with(ext))
}

/// Pulls a [`ChecksumMap`] out of a release through a [`ReleaseSource`].
pub struct ChecksumExtractor<'a> {
    source: &'a dyn ReleaseSource,
}

impl<'a> ChecksumExtractor<'a> {
    /// Create an extractor backed by `source`.
    #[must_use]
    pub fn new(source: &'a dyn ReleaseSource) -> Self {
        Self { source }
    }

    /// Extract per-platform checksums for `release`.
    ///
    /// Fails with [`Error::NoChecksumsFound`] when every strategy came up
    /// empty, and with [`Error::Fetch`] when the release notes page itself
    /// cannot be fetched.
    pub fn extract(&self, release: &ReleaseRef) -> Result<Extraction> {
        let mut searched = Vec::new();
        let mut hash_lines = 0;

        for candidate in self.checksum_candidates(release, &mut searched)? {
            debug!(name = %candidate.name, url = %candidate.url, "Trying checksum file");
            let text = match self.source.fetch_text(&candidate.url) {
                Ok(Some(text)) => text,
                Ok(None) => {
                    debug!(url = %candidate.url, "Checksum file not found");
                    continue;
                }
                Err(e) => {
                    warn!(url = %candidate.url, error = %e, "Could not fetch checksums file");
                    continue;
                }
            };

            let entries = parse_entries(&text);
            hash_lines += entries.len();
            let map = ChecksumMap::from_entries(&entries, Some(release.app_name()));
            if map.is_empty() {
                debug!(name = %candidate.name, lines = entries.len(), "No platform checksums in file");
                continue;
            }

            info!(name = %candidate.name, platforms = map.len(), "Found checksums file");
            return Ok(Extraction {
                source: ChecksumSource::Asset {
                    name: candidate.name,
                    url: candidate.url,
                },
                entries,
                map,
            });
        }

        let page_url = self.source.release_page_url(release);
        searched.push(format!("release notes ({page_url})"));
        let notes = self.source.release_notes(release)?;
        let entries = parse_entries(&notes);
        hash_lines += entries.len();
        let map = ChecksumMap::from_entries(&entries, Some(release.app_name()));

        if map.is_empty() {
            return Err(Error::no_checksums(release.to_string(), searched, hash_lines));
        }

        info!(platforms = map.len(), "Found checksums in release notes");
        Ok(Extraction {
            source: ChecksumSource::ReleaseNotes { url: page_url },
            entries,
            map,
        })
    }

    /// The checksum files to try, in order.
    ///
    /// The first listed asset matching the checksum name pattern comes
    /// first, skipping per-archive digest files when an aggregate list is
    /// listed too; conventional names follow unless the listing already
    /// named them.
    fn checksum_candidates(
        &self,
        release: &ReleaseRef,
        searched: &mut Vec<String>,
    ) -> Result<Vec<ReleaseAsset>> {
        let assets = match self.source.list_assets(release) {
            Ok(assets) => assets,
            Err(e @ Error::Fetch { .. }) => {
                warn!(error = %e, "Could not list release assets");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        debug!(count = assets.len(), "Listed release assets");

        let mut candidates = Vec::new();
        let listed = assets
            .iter()
            .filter(|a| is_checksum_asset(&a.name))
            .collect::<Vec<_>>();
        let chosen = listed
            .iter()
            .find(|a| !is_per_file_digest(&a.name))
            .or_else(|| listed.first())
            .copied();
        if let Some(asset) = chosen {
            searched.push(format!("asset {}", asset.name));
            candidates.push(asset.clone());
        }

        for name in CONVENTIONAL_NAMES {
            if candidates.iter().any(|c| c.name == *name) {
                continue;
            }
            searched.push(format!("{name} (probe)"));
            candidates.push(ReleaseAsset::new(
                *name,
                self.source.asset_download_url(release, name),
            ));
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSource {
        assets: Vec<ReleaseAsset>,
        files: HashMap<String, String>,
        notes: String,
        notes_error: bool,
        assets_error: bool,
        fetched: RefCell<Vec<String>>,
    }

    impl ReleaseSource for FakeSource {
        fn resolve_latest_tag(&self, _owner: &str, _repo: &str) -> Result<String> {
            Ok("1.0.0".into())
        }

        fn list_assets(&self, _release: &ReleaseRef) -> Result<Vec<ReleaseAsset>> {
            if self.assets_error {
                return Err(Error::fetch_status("https://github.com/acme/widget", 429));
            }
            Ok(self.assets.clone())
        }

        fn release_notes(&self, release: &ReleaseRef) -> Result<String> {
            if self.notes_error {
                return Err(Error::fetch_status(self.release_page_url(release), 503));
            }
            Ok(self.notes.clone())
        }

        fn fetch_text(&self, url: &str) -> Result<Option<String>> {
            self.fetched.borrow_mut().push(url.to_string());
            Ok(self.files.get(url).cloned())
        }
    }

    fn hex(c: char) -> String {
        std::iter::repeat_n(c, 64).collect()
    }

    fn widget() -> ReleaseRef {
        ReleaseRef::new("acme", "widget", "2.3.0", None).unwrap()
    }

    const BASE: &str = "https://github.com/acme/widget/releases/download/2.3.0";

    #[test]
    fn test_checksum_asset_pattern() {
        assert!(is_checksum_asset("checksums.txt"));
        assert!(is_checksum_asset("widget_2.3.0_CHECKSUMS"));
        assert!(is_checksum_asset("widget.sha256"));
        assert!(is_checksum_asset("SHA256SUMS.txt"));
        assert!(is_checksum_asset("widget_sums.txt"));
        assert!(!is_checksum_asset("widget_linux_amd64.tar.gz"));
    }

    #[test]
    fn test_per_file_digest_names() {
        assert!(is_per_file_digest("widget_darwin_amd64.tar.gz.sha256"));
        assert!(is_per_file_digest("widget.zip.sha256sum"));
        assert!(is_per_file_digest("widget_linux_arm64.sha256"));
        assert!(!is_per_file_digest("checksums.sha256"));
        assert!(!is_per_file_digest("widget_2.3.0_checksums.txt"));
        assert!(!is_per_file_digest("SHA256SUMS"));
    }

    #[test]
    fn test_aggregate_list_beats_earlier_per_file_digest() {
        let sums = format!("{BASE}/widget_2.3.0_checksums.txt");
        let mut source = FakeSource {
            assets: vec![
                ReleaseAsset::new(
                    "widget_darwin_amd64.tar.gz.sha256",
                    format!("{BASE}/widget_darwin_amd64.tar.gz.sha256"),
                ),
                ReleaseAsset::new("widget_2.3.0_checksums.txt", &sums),
            ],
            ..FakeSource::default()
        };
        source.files.insert(
            sums.clone(),
            format!(
                "{}  widget_darwin_amd64.tar.gz\n{}  widget_linux_amd64.tar.gz\n",
                hex('a'),
                hex('b')
            ),
        );

        let extraction = ChecksumExtractor::new(&source).extract(&widget()).unwrap();
        assert!(matches!(extraction.source, ChecksumSource::Asset { ref name, .. } if name == "widget_2.3.0_checksums.txt"));
        assert_eq!(extraction.map.len(), 2);
        assert_eq!(source.fetched.borrow().as_slice(), &[sums]);
    }

    #[test]
    fn test_per_file_digest_used_when_nothing_else_listed() {
        let url = format!("{BASE}/widget_linux_amd64.tar.gz.sha256");
        let mut source = FakeSource {
            assets: vec![ReleaseAsset::new("widget_linux_amd64.tar.gz.sha256", &url)],
            ..FakeSource::default()
        };
        source
            .files
            .insert(url.clone(), format!("{}  widget_linux_amd64.tar.gz\n", hex('c')));

        let extraction = ChecksumExtractor::new(&source).extract(&widget()).unwrap();
        assert_eq!(extraction.map.len(), 1);
        assert_eq!(source.fetched.borrow().first(), Some(&url));
    }

    #[test]
    fn test_listed_asset_is_used_first() {
        let url = format!("{BASE}/widget_2.3.0_checksums.txt");
        let mut source = FakeSource {
            assets: vec![
                ReleaseAsset::new("widget_linux_amd64.tar.gz", format!("{BASE}/widget_linux_amd64.tar.gz")),
                ReleaseAsset::new("widget_2.3.0_checksums.txt", &url),
                ReleaseAsset::new("SHA256SUMS", format!("{BASE}/SHA256SUMS")),
            ],
            ..FakeSource::default()
        };
        source.files.insert(
            url.clone(),
            format!("{}  widget_2.3.0_linux_amd64.tar.gz\n", hex('a')),
        );

        let extraction = ChecksumExtractor::new(&source).extract(&widget()).unwrap();
        assert_eq!(
            extraction.source,
            ChecksumSource::Asset {
                name: "widget_2.3.0_checksums.txt".into(),
                url: url.clone(),
            }
        );
        assert_eq!(
            extraction.map.get(PlatformKey::LinuxAmd64).unwrap().as_str(),
            hex('a')
        );
        assert_eq!(source.fetched.borrow().as_slice(), &[url]);
    }

    #[test]
    fn test_conventional_names_are_probed_when_listing_is_empty() {
        let mut source = FakeSource::default();
        source.files.insert(
            format!("{BASE}/SHA256SUMS"),
            format!("{}  widget_darwin_arm64.tar.gz\n", hex('b')),
        );

        let extraction = ChecksumExtractor::new(&source).extract(&widget()).unwrap();
        assert!(matches!(extraction.source, ChecksumSource::Asset { ref name, .. } if name == "SHA256SUMS"));
        assert_eq!(
            source.fetched.borrow().as_slice(),
            &[
                format!("{BASE}/checksums.txt"),
                format!("{BASE}/checksums.sha256"),
                format!("{BASE}/SHA256SUMS"),
            ]
        );
    }

    #[test]
    fn test_asset_listing_failure_falls_back_to_probes() {
        let mut source = FakeSource {
            assets_error: true,
            ..FakeSource::default()
        };
        source.files.insert(
            format!("{BASE}/checksums.txt"),
            format!("{}  widget_linux_386.tar.gz\n", hex('c')),
        );
        let extraction = ChecksumExtractor::new(&source).extract(&widget()).unwrap();
        assert!(extraction.map.contains(PlatformKey::Linux386));
    }

    #[test]
    fn test_release_notes_fallback() {
        let source = FakeSource {
            notes: format!(
                "## Checksums\n\nwidget_linux_arm64.tar.gz: {}\nwidget_source.tar.gz: {}\n",
                hex('d'),
                hex('e')
            ),
            ..FakeSource::default()
        };

        let extraction = ChecksumExtractor::new(&source).extract(&widget()).unwrap();
        assert_eq!(
            extraction.source,
            ChecksumSource::ReleaseNotes {
                url: "https://github.com/acme/widget/releases/tag/2.3.0".into()
            }
        );
        assert_eq!(extraction.entries.len(), 2);
        assert_eq!(extraction.map.len(), 1);
    }

    #[test]
    fn test_unmatched_artifact_reports_no_checksums() {
        let mut source = FakeSource::default();
        source.files.insert(
            format!("{BASE}/checksums.txt"),
            format!("{}  widget_windows_amd64.zip\n", hex('f')),
        );

        let err = ChecksumExtractor::new(&source).extract(&widget()).unwrap_err();
        match err {
            Error::NoChecksumsFound {
                release,
                searched,
                hash_lines,
            } => {
                assert_eq!(release, "acme/widget@2.3.0");
                assert_eq!(hash_lines, 1);
                assert_eq!(searched.len(), CONVENTIONAL_NAMES.len() + 1);
            }
            other => panic!("expected NoChecksumsFound, got {other:?}"),
        }
    }

    #[test]
    fn test_release_notes_fetch_failure_is_a_fetch_error() {
        let source = FakeSource {
            notes_error: true,
            ..FakeSource::default()
        };
        let err = ChecksumExtractor::new(&source).extract(&widget()).unwrap_err();
        assert!(matches!(err, Error::Fetch { status: Some(503), .. }));
    }

    #[test]
    fn test_checksum_source_display() {
        let source = ChecksumSource::Asset {
            name: "checksums.txt".into(),
            url: format!("{BASE}/checksums.txt"),
        };
        assert!(source.to_string().starts_with("asset checksums.txt"));
    }
}
