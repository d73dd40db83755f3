//! Scraping helpers for rendered GitHub release pages.
//!
//! These operate on raw HTML with a few anchored patterns. GitHub's markup
//! changes over time, so each helper degrades to "nothing found" rather than
//! failing.

use brewbump_core::ReleaseAsset;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static DOWNLOAD_HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href\s*=\s*["']([^"']*/releases/download/[^"']+)["']"#)
        .expect("download href pattern is a valid literal")
});

#[allow(clippy::expect_used)]
static TAG_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/releases/tag/([^/?#]+)/?(?:[?#].*)?$").expect("tag path pattern is a valid literal")
});

#[allow(clippy::expect_used)]
static MARKDOWN_BODY_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div\b[^>]*\bclass\s*=\s*["'][^"']*\bmarkdown-body\b[^"']*["'][^>]*>"#)
        .expect("markdown-body pattern is a valid literal")
});

#[allow(clippy::expect_used)]
static DIV_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)div\b[^>]*>").expect("div pattern is a valid literal"));

#[allow(clippy::expect_used)]
static BLOCK_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</(?:p|div|li|tr|h[1-6]|pre|table|thead|tbody|ul|ol|blockquote)>|<br\s*/?>")
        .expect("block end pattern is a valid literal")
});

#[allow(clippy::expect_used)]
static CELL_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</t[dh]>").expect("cell end pattern is a valid literal"));

#[allow(clippy::expect_used)]
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is a valid literal"));

/// Collect release download links from a release page or its
/// `expanded_assets` fragment, in document order without duplicates.
///
/// Relative links are resolved against `base_url`.
#[must_use]
pub fn asset_links(html: &str, base_url: &str) -> Vec<ReleaseAsset> {
    let mut seen = HashSet::new();
    let mut assets = Vec::new();

    for caps in DOWNLOAD_HREF.captures_iter(html) {
        let Some(href) = caps.get(1) else {
            continue;
        };
        let href = decode_entities(href.as_str());
        let url = if href.starts_with('/') {
            format!("{base_url}{href}")
        } else {
            href
        };
        if !seen.insert(url.clone()) {
            continue;
        }

        let name = url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit('/').next())
            .unwrap_or_default()
            .to_string();
        if name.is_empty() {
            continue;
        }
        assets.push(ReleaseAsset::new(name, url));
    }

    assets
}

/// Tag at the end of a `/releases/tag/<tag>` URL.
#[must_use]
pub fn tag_from_url(url: &str) -> Option<String> {
    TAG_PATH
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Plain text of the first `markdown-body` element, or `None` when the page
/// has no release notes.
#[must_use]
pub fn markdown_body_text(html: &str) -> Option<String> {
    let open = MARKDOWN_BODY_OPEN.find(html)?;
    let rest = &html[open.end()..];

    let mut depth = 1usize;
    let mut end = rest.len();
    for caps in DIV_TAG.captures_iter(rest) {
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if closing {
            depth -= 1;
            if depth == 0 {
                end = caps.get(0).map_or(rest.len(), |m| m.start());
                break;
            }
        } else {
            depth += 1;
        }
    }

    Some(html_to_text(&rest[..end]))
}

/// Strip markup, keeping block boundaries as line breaks and table cells
/// separated by spaces.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let text = BLOCK_END.replace_all(html, "\n");
    let text = CELL_END.replace_all(&text, " ");
    let text = ANY_TAG.replace_all(&text, "");
    decode_entities(&text)
}

/// Decode the handful of entities GitHub emits in attributes and text.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
