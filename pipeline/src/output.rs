//! Output formatting for the `skillpack` CLI.
//!
//! Results are rendered either as short human-readable summaries or as
//! pretty-printed JSON for scripting. Progress and errors go to stderr
//! through [`write_stderr_line`].

use crate::archive::inspect::InspectionEvidence;
use crate::install::InstallOutcome;
use crate::publish::PublishOutcome;
use serde::Serialize;
use skillpack_common::TrustComputation;
use std::fmt;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; nothing useful to do on failure.
    }
}

/// Render any result as pretty JSON.
///
/// # Examples
///
/// ```
/// use skillpack::output::format_json;
/// use skillpack_common::{TrustSignals, compute_trust_score};
///
/// let json = format_json(&compute_trust_score(&TrustSignals::default()));
/// assert!(json.contains("\"score\": 0"));
/// ```
#[must_use]
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_owned())
}

/// Render a trust computation with its per-rule breakdown.
#[must_use]
pub fn format_trust_human(trust: &TrustComputation) -> String {
    let verdict = if trust.trusted { "trusted" } else { "not trusted" };
    let mut output = format!("Trust score: {} ({}, {verdict})\n", trust.score, trust.tier);
    for (rule, points) in &trust.breakdown.rules {
        output.push_str(&format!("  {:<18} {points:>3}\n", rule.as_str()));
    }
    output
}

/// Render a successful publish.
#[must_use]
pub fn format_publish_human(outcome: &PublishOutcome) -> String {
    let mut output = format!(
        concat!(
            "Published {}@{}\n",
            "  sha256: {}\n",
            "  size:   {} bytes\n",
            "  stored: {}\n",
        ),
        outcome.package, outcome.version, outcome.digest, outcome.size_bytes, outcome.locator,
    );
    output.push_str(&format_trust_human(&outcome.trust));
    output
}

/// Render a successful install.
#[must_use]
pub fn format_install_human(outcome: &InstallOutcome) -> String {
    let plural = if outcome.files_written == 1 { "file" } else { "files" };
    format!(
        "Installed {} ({} {plural}) to {}\n  sha256: {}",
        outcome.version,
        outcome.files_written,
        outcome.installed_path.display(),
        outcome.digest,
    )
}

/// Render inspection evidence.
#[must_use]
pub fn format_inspection_human(evidence: &InspectionEvidence) -> String {
    let yes_no = |flag: bool| if flag { "yes" } else { "no" };
    format!(
        concat!(
            "Archive passed the safety policy\n",
            "  files:        {}\n",
            "  declared:     {} bytes\n",
            "  SKILL.md:     {}\n",
            "  licence file: {}",
        ),
        evidence.file_count,
        evidence.total_declared_bytes,
        yes_no(evidence.has_usable_manifest()),
        yes_no(evidence.has_license_file),
    )
}
