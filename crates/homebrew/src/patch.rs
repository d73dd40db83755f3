//! Formula patching: rewrite the version and per-platform sha256 fields.
//!
//! Patching never re-renders the formula. Only the quoted values of the
//! version field and of each platform's sha256 field are replaced; every
//! other byte, line endings included, is copied through.

use crate::document::FormulaDocument;
use brewbump_core::{ChecksumMap, Error, PlatformKey, Result};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;
use tracing::{debug, warn};

#[allow(clippy::expect_used)]
static VERSION_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[ \t]*version[ \t]*(?:=[ \t]*)?(?:"(?P<dq>[^"\r\n]*)"|'(?P<sq>[^'\r\n]*)')"#)
        .expect("version field pattern is a valid literal")
});

#[allow(clippy::expect_used)]
static SHA256_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:^|[\s,(])sha256[ \t]*:?[ \t]*(?:"(?P<dq>[^"\r\n]*)"|'(?P<sq>[^'\r\n]*)')"#,
    )
    .expect("sha256 field pattern is a valid literal")
});

#[allow(clippy::expect_used)]
static URL_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s,(])url[ \t]*:?[ \t]*["']"#).expect("url field pattern is a valid literal")
});

/// A line opening a nested block: `resource "x" do`, `on_linux do`, `do |x|`.
#[allow(clippy::expect_used)]
static BLOCK_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^[ \t]*resource\b|\bdo\b(?:[ \t]*\|[^|]*\|)?[ \t]*(?:#.*)?$)")
        .expect("block open pattern is a valid literal")
});

fn quoted_value(caps: &Captures<'_>) -> Option<Range<usize>> {
    caps.name("dq").or_else(|| caps.name("sq")).map(|m| m.range())
}

/// What happened to each platform during a patch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    /// Version value before patching
    pub previous_version: String,
    /// Version value after patching
    pub version: String,
    /// Platforms whose hash was replaced
    pub updated: Vec<PlatformKey>,
    /// Platforms whose hash already matched
    pub unchanged: Vec<PlatformKey>,
    /// Platforms with a block in the formula but no fetched checksum
    pub missing_checksum: Vec<PlatformKey>,
    /// Platforms referenced by the formula without a sha256 field to update
    pub missing_field: Vec<PlatformKey>,
    /// Fetched checksums the formula has no block for
    pub unused: Vec<PlatformKey>,
}

impl PatchReport {
    /// Whether any platform was left as it was because of a gap.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.missing_checksum.is_empty() || !self.missing_field.is_empty()
    }
}

/// A patched formula and its report.
#[derive(Debug, Clone)]
pub struct PatchOutcome {
    /// The full patched text
    pub content: String,
    /// Per-platform report
    pub report: PatchReport,
}

/// Rewrites Homebrew formula text in memory.
pub struct FormulaPatcher;

#[derive(Default)]
struct Tally {
    blocks: BTreeSet<PlatformKey>,
    updated: BTreeSet<PlatformKey>,
    unchanged: BTreeSet<PlatformKey>,
    missing_checksum: BTreeSet<PlatformKey>,
    missing_field: BTreeSet<PlatformKey>,
}

impl FormulaPatcher {
    /// Replace the version and every platform hash the map has a value for.
    ///
    /// A line that mentions a platform tag (in a URL, comment or branch
    /// label) opens that platform's block; the next sha256 field belongs to
    /// it. A `url` without a platform tag, or the start of a `resource` or
    /// other `do` block, closes an open block before it finds its field, so
    /// source tarball and resource hashes are never claimed.
    ///
    /// Fails with [`Error::VersionFieldNotFound`] when the formula has no
    /// version field. Platform gaps are reported, not fatal.
    pub fn patch(
        document: &FormulaDocument,
        version: &str,
        checksums: &ChecksumMap,
    ) -> Result<PatchOutcome> {
        let mut content = String::with_capacity(document.content().len() + 64);
        let mut previous_version = None;
        let mut pending: Option<PlatformKey> = None;
        let mut tally = Tally::default();

        for segment in document.content().split_inclusive('\n') {
            let body_len = segment.trim_end_matches(['\n', '\r']).len();
            let (body, ending) = segment.split_at(body_len);
            let mut line = body.to_string();

            if previous_version.is_none() {
                if let Some(range) = VERSION_FIELD.captures(body).as_ref().and_then(quoted_value) {
                    previous_version = Some(body[range.clone()].to_string());
                    line.replace_range(range, version);
                    content.push_str(&line);
                    content.push_str(ending);
                    continue;
                }
            }

            let marker = PlatformKey::find_in(body);
            if marker.is_none() && (URL_FIELD.is_match(body) || BLOCK_OPEN.is_match(body)) {
                if let Some(open) = pending.take() {
                    debug!(platform = %open, "Platform block ended before a sha256 field");
                    tally.missing_field.insert(open);
                }
            }

            if let Some(key) = marker {
                if let Some(open) = pending.filter(|open| *open != key) {
                    debug!(platform = %open, "Platform block closed without a sha256 field");
                    tally.missing_field.insert(open);
                }
                pending = Some(key);
                tally.blocks.insert(key);
            }

            if let Some(range) = SHA256_FIELD.captures(body).as_ref().and_then(quoted_value) {
                if let Some(key) = pending.take() {
                    match checksums.get(key) {
                        Some(sha) if body[range.clone()].eq_ignore_ascii_case(sha.as_str()) => {
                            tally.unchanged.insert(key);
                        }
                        Some(sha) => {
                            debug!(platform = %key, sha256 = %sha, "Updating checksum");
                            line.replace_range(range, sha.as_str());
                            tally.updated.insert(key);
                        }
                        None => {
                            tally.missing_checksum.insert(key);
                        }
                    }
                }
            }

            content.push_str(&line);
            content.push_str(ending);
        }

        if let Some(open) = pending {
            tally.missing_field.insert(open);
        }

        let Some(previous_version) = previous_version else {
            return Err(Error::version_field_not_found(document.path()));
        };

        // A platform fixed in one block is not missing because another block lacked a field.
        for done in tally.updated.iter().chain(&tally.unchanged) {
            tally.missing_field.remove(done);
        }

        for key in &tally.missing_checksum {
            warn!(platform = %key, "No checksum found for platform; leaving its block unchanged");
        }
        for key in &tally.missing_field {
            warn!(platform = %key, "Formula references platform but has no sha256 field for it");
        }

        let unused = checksums
            .iter()
            .map(|(key, _)| key)
            .filter(|key| !tally.blocks.contains(key))
            .collect::<Vec<_>>();
        for key in &unused {
            debug!(platform = %key, "Formula has no block for fetched checksum");
        }

        Ok(PatchOutcome {
            content,
            report: PatchReport {
                previous_version,
                version: version.to_string(),
                updated: tally.updated.into_iter().collect(),
                unchanged: tally.unchanged.into_iter().collect(),
                missing_checksum: tally.missing_checksum.into_iter().collect(),
                missing_field: tally.missing_field.into_iter().collect(),
                unused,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewbump_core::Sha256;

    fn hex(c: char) -> String {
        std::iter::repeat_n(c, 64).collect()
    }

    fn sha(c: char) -> Sha256 {
        Sha256::parse(&hex(c)).unwrap()
    }

    const OLD: &str = "0000000000000000000000000000000000000000000000000000000000000000";

    fn full_formula() -> String {
        format!(
            r#"class Devbox < Formula
  desc "Instant, easy, predictable development environments"
  homepage "https://www.jetify.com/devbox"
  version "0.15.0"
  license "Apache-2.0"

  on_macos do
    if Hardware::CPU.intel?
      url "https://github.com/jetify-com/devbox/releases/download/#{{version}}/devbox_#{{version}}_darwin_amd64.tar.gz"
      sha256 "{OLD}"
    end
    if Hardware::CPU.arm?
      url "https://github.com/jetify-com/devbox/releases/download/#{{version}}/devbox_#{{version}}_darwin_arm64.tar.gz"
      sha256 "{OLD}"
    end
  end

  on_linux do
    if Hardware::CPU.intel? && !Hardware::CPU.is_64_bit?
      url "https://github.com/jetify-com/devbox/releases/download/#{{version}}/devbox_#{{version}}_linux_386.tar.gz"
      sha256 "{OLD}"
    end
    if Hardware::CPU.intel? && Hardware::CPU.is_64_bit?
      url "https://github.com/jetify-com/devbox/releases/download/#{{version}}/devbox_#{{version}}_linux_amd64.tar.gz"
      sha256 "{OLD}"
    end
    if Hardware::CPU.arm? && Hardware::CPU.is_64_bit?
      url "https://github.com/jetify-com/devbox/releases/download/#{{version}}/devbox_#{{version}}_linux_arm64.tar.gz"
      sha256 "{OLD}"
    end
    if Hardware::CPU.arm? && !Hardware::CPU.is_64_bit?
      url "https://github.com/jetify-com/devbox/releases/download/#{{version}}/devbox_#{{version}}_linux_armv7l.tar.gz"
      sha256 "{OLD}"
    end
  end

  def install
    bin.install "devbox"
  end
end
"#
        )
    }

    fn full_map() -> ChecksumMap {
        [
            (PlatformKey::DarwinAmd64, sha('a')),
            (PlatformKey::DarwinArm64, sha('b')),
            (PlatformKey::Linux386, sha('c')),
            (PlatformKey::LinuxAmd64, sha('d')),
            (PlatformKey::LinuxArm64, sha('e')),
            (PlatformKey::LinuxArmv7l, sha('f')),
        ]
        .into_iter()
        .collect()
    }

    fn doc(content: &str) -> FormulaDocument {
        FormulaDocument::new("Formula/devbox.rb", content)
    }

    #[test]
    fn test_full_patch_replaces_every_hash_and_nothing_else() {
        let original = full_formula();
        let outcome = FormulaPatcher::patch(&doc(&original), "0.16.0", &full_map()).unwrap();

        assert_eq!(outcome.report.previous_version, "0.15.0");
        assert_eq!(outcome.report.updated, PlatformKey::ALL.to_vec());
        assert!(outcome.report.missing_checksum.is_empty());
        assert!(outcome.report.unused.is_empty());
        assert!(!outcome.report.has_warnings());

        let expected = original
            .replacen("version \"0.15.0\"", "version \"0.16.0\"", 1)
            .replacen(OLD, &hex('a'), 1)
            .replacen(OLD, &hex('b'), 1)
            .replacen(OLD, &hex('c'), 1)
            .replacen(OLD, &hex('d'), 1)
            .replacen(OLD, &hex('e'), 1)
            .replacen(OLD, &hex('f'), 1);
        assert_eq!(outcome.content, expected);
    }

    #[test]
    fn test_missing_platform_leaves_block_untouched() {
        let map: ChecksumMap = full_map()
            .iter()
            .filter(|(key, _)| *key != PlatformKey::LinuxArmv7l)
            .map(|(key, sha)| (key, sha.clone()))
            .collect();

        let outcome = FormulaPatcher::patch(&doc(&full_formula()), "0.16.0", &map).unwrap();
        assert_eq!(outcome.report.updated.len(), 5);
        assert_eq!(outcome.report.missing_checksum, vec![PlatformKey::LinuxArmv7l]);
        assert!(outcome.report.has_warnings());

        let armv7_block = outcome
            .content
            .split("linux_armv7l.tar.gz\"")
            .nth(1)
            .unwrap();
        assert!(armv7_block.trim_start().starts_with(&format!("sha256 \"{OLD}\"")));
        assert_eq!(outcome.content.matches(OLD).count(), 1);
    }

    #[test]
    fn test_missing_version_field_is_an_error() {
        let content = full_formula().replace("  version \"0.15.0\"\n", "");
        let err = FormulaPatcher::patch(&doc(&content), "0.16.0", &full_map()).unwrap_err();
        assert!(matches!(err, Error::VersionFieldNotFound { ref path } if path.ends_with("devbox.rb")));
    }

    #[test]
    fn test_version_is_replaced_verbatim_and_only_once() {
        let content = "class W < Formula\n  version \"1.0.0\"\n  # version \"ignored\"\n  version \"2.0.0\"\nend\n";
        let outcome = FormulaPatcher::patch(&doc(content), "v3.0.0", &ChecksumMap::default()).unwrap();
        assert_eq!(
            outcome.content,
            "class W < Formula\n  version \"v3.0.0\"\n  # version \"ignored\"\n  version \"2.0.0\"\nend\n"
        );
    }

    #[test]
    fn test_version_key_value_and_single_quotes() {
        let outcome =
            FormulaPatcher::patch(&doc("version = '1.0'\n"), "1.1", &ChecksumMap::default()).unwrap();
        assert_eq!(outcome.content, "version = '1.1'\n");
        assert_eq!(outcome.report.previous_version, "1.0");
    }

    #[test]
    fn test_end_to_end_widget_scenario() {
        let content = format!(
            r#"class Widget < Formula
  version "2.2.0"
  on_macos do
    url "https://github.com/acme/widget/releases/download/#{{version}}/widget_darwin_amd64.tar.gz"
    sha256 "{OLD}"
  end
  on_linux do
    url "https://github.com/acme/widget/releases/download/#{{version}}/widget_linux_amd64.tar.gz"
    sha256 "{OLD}"
  end
end
"#
        );
        let map = ChecksumMap::parse(&format!(
            "{}  widget_darwin_amd64.tar.gz\n{}  widget_linux_amd64.tar.gz\n",
            hex('a'),
            hex('b')
        ));

        let outcome = FormulaPatcher::patch(&doc(&content), "2.3.0", &map).unwrap();
        assert!(outcome.content.contains("version \"2.3.0\""));
        assert!(outcome.content.contains(&format!(
            "widget_darwin_amd64.tar.gz\"\n    sha256 \"{}\"",
            hex('a')
        )));
        assert!(outcome.content.contains(&format!(
            "widget_linux_amd64.tar.gz\"\n    sha256 \"{}\"",
            hex('b')
        )));
        assert_eq!(
            outcome.report.updated,
            vec![PlatformKey::DarwinAmd64, PlatformKey::LinuxAmd64]
        );
    }

    #[test]
    fn test_unused_checksums_are_reported_not_applied() {
        let content = format!(
            "version \"1\"\nurl \"x_linux_amd64.tar.gz\"\nsha256 \"{OLD}\"\n"
        );
        let outcome = FormulaPatcher::patch(&doc(&content), "2", &full_map()).unwrap();
        assert_eq!(outcome.report.updated, vec![PlatformKey::LinuxAmd64]);
        assert_eq!(outcome.report.unused.len(), 5);
        assert!(!outcome.report.unused.contains(&PlatformKey::LinuxAmd64));
    }

    #[test]
    fn test_comment_markers_and_crlf_are_preserved() {
        let content = format!(
            "version \"1\"\r\n# darwin_arm64\r\nsha256 \"{OLD}\" # pinned\r\n  sha256 \"{OLD}\"\r\n"
        );
        let outcome = FormulaPatcher::patch(&doc(&content), "2", &full_map()).unwrap();
        assert_eq!(
            outcome.content,
            format!(
                "version \"2\"\r\n# darwin_arm64\r\nsha256 \"{}\" # pinned\r\n  sha256 \"{OLD}\"\r\n",
                hex('b')
            )
        );
    }

    #[test]
    fn test_source_tarball_hash_without_marker_is_untouched() {
        let content = format!(
            "version \"1\"\nurl \"https://github.com/acme/widget/archive/1.tar.gz\"\nsha256 \"{OLD}\"\n"
        );
        let outcome = FormulaPatcher::patch(&doc(&content), "2", &full_map()).unwrap();
        assert!(outcome.content.contains(OLD));
        assert!(outcome.report.updated.is_empty());
    }

    #[test]
    fn test_marker_without_field_is_reported() {
        let content = format!(
            "version \"1\"\nurl \"w_linux_386.tar.gz\"\nurl \"w_linux_amd64.tar.gz\"\nsha256 \"{OLD}\"\n"
        );
        let outcome = FormulaPatcher::patch(&doc(&content), "2", &full_map()).unwrap();
        assert_eq!(outcome.report.missing_field, vec![PlatformKey::Linux386]);
        assert_eq!(outcome.report.updated, vec![PlatformKey::LinuxAmd64]);
    }

    #[test]
    fn test_inline_sha256_keyword_argument() {
        let content = format!(
            "version \"1\"\nresource \"x\" do\n  url \"w_linux_arm64.tar.gz\", sha256: \"{OLD}\"\nend\n"
        );
        let outcome = FormulaPatcher::patch(&doc(&content), "2", &full_map()).unwrap();
        assert!(outcome.content.contains(&format!("sha256: \"{}\"", hex('e'))));
    }

    #[test]
    fn test_already_current_hash_is_unchanged() {
        let content = format!("version \"2\"\nurl \"w_linux_amd64.tar.gz\"\nsha256 \"{}\"\n", hex('d'));
        let outcome = FormulaPatcher::patch(&doc(&content), "2", &full_map()).unwrap();
        assert_eq!(outcome.content, content);
        assert_eq!(outcome.report.unchanged, vec![PlatformKey::LinuxAmd64]);
        assert!(outcome.report.updated.is_empty());
    }

    #[test]
    fn test_no_trailing_newline_is_kept() {
        let outcome =
            FormulaPatcher::patch(&doc("version \"1\""), "2", &ChecksumMap::default()).unwrap();
        assert_eq!(outcome.content, "version \"2\"");
    }

    #[test]
    fn test_comment_marker_does_not_claim_source_tarball_hash() {
        let source_sha = hex('1');
        let content = format!(
            "version \"1\"\n# prebuilt for darwin_amd64 lives in the tap\nurl \"https://github.com/acme/widget/archive/1.tar.gz\"\nsha256 \"{source_sha}\"\n"
        );
        let outcome = FormulaPatcher::patch(&doc(&content), "2", &full_map()).unwrap();

        assert!(outcome.content.contains(&source_sha));
        assert!(!outcome.content.contains(&hex('a')));
        assert!(outcome.report.updated.is_empty());
        assert_eq!(outcome.report.missing_field, vec![PlatformKey::DarwinAmd64]);
    }

    #[test]
    fn test_block_without_field_does_not_claim_resource_hash() {
        let resource_sha = hex('1');
        let content = format!(
            r#"version "1"
url "https://x/w_darwin_amd64.tar.gz"

resource "completions" do
  url "https://x/completions.tar.gz"
  sha256 "{resource_sha}"
end
"#
        );
        let outcome = FormulaPatcher::patch(&doc(&content), "2", &full_map()).unwrap();

        assert!(outcome.content.contains(&resource_sha));
        assert!(outcome.report.updated.is_empty());
        assert_eq!(outcome.report.missing_field, vec![PlatformKey::DarwinAmd64]);
    }

    #[test]
    fn test_branch_label_marker_on_do_line() {
        let content = format!(
            "version \"1\"\non_arm do # linux_arm64\n  sha256 \"{OLD}\"\nend\n"
        );
        let outcome = FormulaPatcher::patch(&doc(&content), "2", &full_map()).unwrap();
        assert_eq!(outcome.report.updated, vec![PlatformKey::LinuxArm64]);
        assert!(outcome.content.contains(&hex('e')));
    }
}
