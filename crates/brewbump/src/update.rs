//! The update pipeline: locate the release, extract its checksums, patch the
//! formula and write it back.

use brewbump_core::{
    ChecksumEntry, ChecksumExtractor, ChecksumMap, ChecksumSource, Error, ReleaseRef,
    ReleaseSource, ReleaseUrl, Result, resolve,
};
use brewbump_homebrew::{FormulaDocument, FormulaPatcher, PatchReport};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// What to update and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// GitHub release URL (`.../releases/tag/<tag>` or `.../releases/latest`)
    pub url: String,
    /// Formula file to patch
    pub formula: PathBuf,
    /// Overrides the repository name when selecting checksum lines
    pub app_name: Option<String>,
    /// Patch in memory only
    pub dry_run: bool,
}

/// Everything an update found and did.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateReport {
    /// The resolved release
    pub release: ReleaseRef,
    /// The formula that was patched
    pub formula: PathBuf,
    /// Where the checksums came from
    pub checksum_source: ChecksumSource,
    /// Every hash line found, in source order
    pub entries: Vec<ChecksumEntry>,
    /// Per-platform digests applied to the formula
    pub checksums: ChecksumMap,
    /// Per-platform patch results
    pub patch: PatchReport,
    /// Whether the formula file was rewritten
    pub written: bool,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Formula text before patching
    #[serde(skip)]
    pub original: String,
    /// Formula text after patching
    #[serde(skip)]
    pub patched: String,
}

impl UpdateReport {
    /// Whether patching changed any byte of the formula.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.original != self.patched
    }
}

/// Runs updates against a [`ReleaseSource`].
pub struct Updater<'a> {
    source: &'a dyn ReleaseSource,
}

impl<'a> Updater<'a> {
    /// Create an updater reading releases from `source`.
    #[must_use]
    pub fn new(source: &'a dyn ReleaseSource) -> Self {
        Self { source }
    }

    /// Run one update.
    ///
    /// The formula is only touched after every fallible step has succeeded,
    /// and never in dry-run mode or when nothing changed.
    #[instrument(skip(self, request), fields(url = %request.url, formula = %request.formula.display()))]
    pub fn run(&self, request: &UpdateRequest) -> Result<UpdateReport> {
        let parsed = ReleaseUrl::parse(&request.url)?;
        preflight(&request.formula)?;

        let release = resolve(&parsed, request.app_name.as_deref(), self.source)?;
        info!(%release, app = release.app_name(), "Updating formula");

        let extraction = ChecksumExtractor::new(self.source).extract(&release)?;
        info!(
            source = %extraction.source,
            platforms = extraction.map.len(),
            "Extracted checksums"
        );

        let document = FormulaDocument::read(&request.formula)?;
        let outcome = FormulaPatcher::patch(&document, release.version(), &extraction.map)?;

        let changed = outcome.content != document.content();
        let written = if request.dry_run {
            debug!("Dry run; formula not written");
            false
        } else if !changed {
            info!("Formula already up to date");
            false
        } else {
            write_atomic(&request.formula, &outcome.content)?;
            info!(path = %request.formula.display(), "Formula written");
            true
        };

        Ok(UpdateReport {
            release,
            formula: request.formula.clone(),
            checksum_source: extraction.source,
            entries: extraction.entries,
            checksums: extraction.map,
            patch: outcome.report,
            written,
            dry_run: request.dry_run,
            original: document.content().to_string(),
            patched: outcome.content,
        })
    }
}

/// The formula must be an existing regular file before any network access.
fn preflight(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| Error::file_io(path, "open", e))?;
    if metadata.is_file() {
        Ok(())
    } else {
        Err(Error::file_io(
            path,
            "open",
            io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        ))
    }
}

/// Replace `path` with `content` via a sibling temporary file and a rename.
///
/// The replacement keeps the original file's permissions. On failure the
/// original is left as it was and the temporary file is removed.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = fs::metadata(path)
        .map_err(|e| Error::file_io(path, "stat", e))?
        .permissions();

    let mut temp =
        NamedTempFile::new_in(dir).map_err(|e| Error::file_io(dir, "create temporary file", e))?;
    temp.write_all(content.as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| Error::file_io(temp.path(), "write", e))?;
    fs::set_permissions(temp.path(), permissions)
        .map_err(|e| Error::file_io(temp.path(), "set permissions", e))?;

    temp.persist(path)
        .map_err(|e| Error::file_io(path, "rename", e.error))?;
    Ok(())
}
