//! Parsing checksum artifacts into per-platform SHA256 digests.
//!
//! Checksum files come in a handful of shapes:
//!
//! - `sha256sum` output: `<hash>  <file>` (optionally `*<file>`)
//! - reversed listings: `<file>: <hash>`
//! - Markdown tables or code blocks pasted into release notes
//!
//! Every line is tokenised the same way, so all of these parse without a
//! format switch.

use crate::platform::PlatformKey;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// Labels with these suffixes describe detached signatures or attestations,
/// never the archive a formula downloads.
const SIDECAR_SUFFIXES: &[&str] = &[
    ".sig",
    ".asc",
    ".pem",
    ".cert",
    ".sbom",
    ".sbom.json",
    ".spdx.json",
    ".intoto.jsonl",
];

/// A validated SHA256 digest: exactly 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256(String);

impl Sha256 {
    /// Accept a 64-character hex token (any case) and normalise it.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        if token.len() == 64 && token.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(token.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// The digest as lowercase hex.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One hash line from a checksum artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecksumEntry {
    /// Everything on the line except the hash, e.g. `widget_linux_amd64.tar.gz`
    pub label: String,
    /// The digest
    pub sha256: Sha256,
}

impl ChecksumEntry {
    /// The platform the label names, if any.
    #[must_use]
    pub fn platform(&self) -> Option<PlatformKey> {
        PlatformKey::find_in(&self.label)
    }

    /// File name the label refers to: the token carrying a platform tag
    /// (or the first token), without any directory part.
    #[must_use]
    pub fn file_name(&self) -> &str {
        let token = self
            .label
            .split_whitespace()
            .find(|token| PlatformKey::find_in(token).is_some())
            .or_else(|| self.label.split_whitespace().next())
            .unwrap_or(&self.label);
        token.rsplit('/').next().unwrap_or(token)
    }

    fn is_sidecar(&self) -> bool {
        let lower = self.label.to_ascii_lowercase();
        SIDECAR_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
    }
}

fn is_decoration(c: char) -> bool {
    matches!(
        c,
        '|' | '`' | '*' | ':' | ',' | ';' | '"' | '\'' | '(' | ')' | '[' | ']' | '<' | '>'
    )
}

/// Extract `(label, hash)` entries from artifact text, in source order.
///
/// The first 64-hex token on a line is the hash; the remaining tokens form
/// the label. Lines without a hash token, or with nothing besides the hash,
/// are dropped.
#[must_use]
pub fn parse_entries(text: &str) -> Vec<ChecksumEntry> {
    let mut entries = Vec::new();

    for line in text.lines() {
        let tokens: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == '|')
            .map(|token| token.trim_matches(is_decoration))
            .filter(|token| !token.is_empty())
            .collect();

        let Some(hash_index) = tokens.iter().position(|t| Sha256::parse(t).is_some()) else {
            continue;
        };
        let Some(sha256) = Sha256::parse(tokens[hash_index]) else {
            continue;
        };

        let label = tokens
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != hash_index)
            .map(|(_, t)| *t)
            .collect::<Vec<_>>()
            .join(" ");

        if label.is_empty() {
            trace!(%sha256, "Hash line without a label");
            continue;
        }

        entries.push(ChecksumEntry { label, sha256 });
    }

    entries
}

/// Per-platform digests for one release.
///
/// Built once by [`ChecksumMap::from_entries`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChecksumMap(BTreeMap<PlatformKey, Sha256>);

impl ChecksumMap {
    /// Parse artifact text without app-name filtering.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self::from_entries(&parse_entries(text), None)
    }

    /// Build the map from parsed entries.
    ///
    /// Signature and attestation labels are skipped. When `app_name` is set
    /// and some platform label's file name starts with it, only those
    /// labels are considered. For each platform the last matching entry wins.
    #[must_use]
    pub fn from_entries(entries: &[ChecksumEntry], app_name: Option<&str>) -> Self {
        let candidates: Vec<(&ChecksumEntry, PlatformKey)> = entries
            .iter()
            .filter(|entry| !entry.is_sidecar())
            .filter_map(|entry| match entry.platform() {
                Some(key) => Some((entry, key)),
                None => {
                    trace!(label = %entry.label, "No platform tag in checksum label");
                    None
                }
            })
            .collect();

        let app_prefix = app_name
            .map(|name| name.trim().to_ascii_lowercase())
            .filter(|name| !name.is_empty());
        let for_app = |entry: &ChecksumEntry| {
            app_prefix.as_ref().is_some_and(|prefix| {
                entry.file_name().to_ascii_lowercase().starts_with(prefix.as_str())
            })
        };
        let restrict = candidates.iter().any(|(entry, _)| for_app(entry));

        let mut map = BTreeMap::new();
        for (entry, key) in candidates {
            if restrict && !for_app(entry) {
                trace!(label = %entry.label, "Checksum label belongs to another app");
                continue;
            }
            map.insert(key, entry.sha256.clone());
        }

        Self(map)
    }

    /// The digest for a platform.
    #[must_use]
    pub fn get(&self, key: PlatformKey) -> Option<&Sha256> {
        self.0.get(&key)
    }

    /// Whether a platform has a digest.
    #[must_use]
    pub fn contains(&self, key: PlatformKey) -> bool {
        self.0.contains_key(&key)
    }

    /// Number of platforms with a digest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no platform has a digest.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Platforms and digests, ordered by platform.
    pub fn iter(&self) -> impl Iterator<Item = (PlatformKey, &Sha256)> {
        self.0.iter().map(|(key, sha)| (*key, sha))
    }
}

impl FromIterator<(PlatformKey, Sha256)> for ChecksumMap {
    fn from_iter<I: IntoIterator<Item = (PlatformKey, Sha256)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
