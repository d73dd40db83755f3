//! Human-readable output for an [`UpdateReport`].

use crate::update::UpdateReport;
use brewbump_core::PlatformKey;
use similar::TextDiff;

/// Unified diff between the current and patched formula.
#[must_use]
pub fn format_unified_diff(path: &str, current: &str, expected: &str) -> String {
    let diff = TextDiff::from_lines(current, expected);
    let from = format!("a/{path}");
    let to = format!("b/{path}");
    diff.unified_diff().header(&from, &to).to_string()
}

fn platform_line(key: PlatformKey) -> String {
    format!("  {key} ({})", key.description())
}

/// Render the text summary printed after an update.
#[must_use]
pub fn render_text(report: &UpdateReport) -> String {
    let patch = &report.patch;
    let mut lines = vec![
        format!("Application: {}", report.release.app_name()),
        if patch.previous_version == patch.version {
            format!("Version: {}", patch.version)
        } else {
            format!("Version: {} (was {})", patch.version, patch.previous_version)
        },
        format!("Checksums from: {}", report.checksum_source),
        "Found checksums:".to_string(),
    ];
    lines.extend(
        report
            .entries
            .iter()
            .map(|entry| format!("  {}  {}", entry.sha256, entry.label)),
    );

    if !patch.updated.is_empty() {
        lines.push("Updated:".to_string());
        lines.extend(patch.updated.iter().copied().map(platform_line));
    }
    if !patch.unchanged.is_empty() {
        lines.push("Already current:".to_string());
        lines.extend(patch.unchanged.iter().copied().map(platform_line));
    }
    if patch.has_warnings() {
        lines.push("Skipped:".to_string());
        lines.extend(
            patch
                .missing_checksum
                .iter()
                .map(|key| format!("{}: no checksum in release", platform_line(*key))),
        );
        lines.extend(
            patch
                .missing_field
                .iter()
                .map(|key| format!("{}: no sha256 field in formula", platform_line(*key))),
        );
    }
    if !patch.unused.is_empty() {
        lines.push("Not in formula:".to_string());
        lines.extend(patch.unused.iter().copied().map(platform_line));
    }

    let path = report.formula.display();
    lines.push(if report.dry_run {
        format!("Dry run: {path} not written")
    } else if report.written {
        format!("Updated {path}")
    } else {
        format!("{path} already up to date")
    });

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
