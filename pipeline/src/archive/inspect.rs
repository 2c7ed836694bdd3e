//! Read-only archive inspection for the publish pipeline.
//!
//! Inspection streams the archive once. Every entry passes through the
//! safety scan before it is classified, so no evidence is produced for an
//! archive that would later be refused at install time.

use super::codec::open_archive;
use super::entry::ArchiveEntry;
use super::error::ArchiveError;
use super::policy::{ArchiveLimits, ArchiveScan};
use log::debug;
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// Designated manifest file name, matched case-insensitively.
pub const MANIFEST_FILE_NAME: &str = "skill.md";

const LICENSE_NAMES: [&str; 2] = ["license", "license.md"];
const LOG_TARGET: &str = "skillpack::archive";

/// Facts gathered about an archive without extracting it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionEvidence {
    /// A `SKILL.md` entry exists at any depth.
    #[serde(rename = "hasSkillMd")]
    pub has_manifest_file: bool,
    /// A `LICENSE` or `LICENSE.md` exists at the top level or one
    /// directory down.
    pub has_license_file: bool,
    /// Text of the first `SKILL.md` entry encountered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest_text: Option<String>,
    /// Regular-file entries in the archive.
    pub file_count: usize,
    /// Sum of declared entry sizes.
    pub total_declared_bytes: u64,
}

impl InspectionEvidence {
    /// Return true when the captured manifest has non-whitespace content.
    #[must_use]
    pub fn has_usable_manifest(&self) -> bool {
        self.manifest_text
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

/// Inspect the archive at `path`.
///
/// # Errors
///
/// Returns the first safety-policy violation, or [`ArchiveError::Format`]
/// when the container is corrupt. No partial evidence is returned.
pub fn inspect(path: &Path, limits: &ArchiveLimits) -> Result<InspectionEvidence, ArchiveError> {
    let mut archive = open_archive(path)?;
    let mut scan = ArchiveScan::new(limits);
    let mut evidence = InspectionEvidence::default();

    for entry_result in archive.entries().map_err(ArchiveError::format)? {
        let mut entry = entry_result.map_err(ArchiveError::format)?;
        let meta = ArchiveEntry::from_tar(&entry)?;
        scan.observe(&meta)?;

        if !meta.kind.is_file() {
            continue;
        }

        let lowered = meta.path.to_lowercase();
        if is_license_path(&lowered) {
            evidence.has_license_file = true;
        }
        if is_manifest_path(&lowered) {
            evidence.has_manifest_file = true;
            if evidence.manifest_text.is_none() {
                evidence.manifest_text = Some(read_text(&mut entry, limits.max_total_bytes)?);
                debug!(target: LOG_TARGET, "captured manifest from {}", meta.path);
            }
        }
    }

    let summary = scan.summary();
    evidence.file_count = summary.file_count;
    evidence.total_declared_bytes = summary.total_declared_bytes;
    Ok(evidence)
}

fn is_license_path(lowered: &str) -> bool {
    let mut segments = lowered.split('/').filter(|s| !s.is_empty());
    let (first, second, rest) = (segments.next(), segments.next(), segments.next());
    let name = match (first, second, rest) {
        (Some(name), None, None) | (Some(_), Some(name), None) => name,
        _ => return false,
    };
    LICENSE_NAMES.contains(&name)
}

fn is_manifest_path(lowered: &str) -> bool {
    lowered == MANIFEST_FILE_NAME || lowered.ends_with("/skill.md")
}

fn read_text(entry: &mut impl Read, limit: u64) -> Result<String, ArchiveError> {
    let mut buffer = Vec::new();
    entry
        .take(limit)
        .read_to_end(&mut buffer)
        .map_err(ArchiveError::format)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
