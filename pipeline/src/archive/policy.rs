//! Archive safety policy.
//!
//! The path rule in [`validate_path`] is the single implementation used by
//! the publish-side inspector, the install-side validator, and the
//! extractor. Whole-archive limits are enforced incrementally by
//! [`ArchiveScan`] as entries stream past, so a hostile archive is rejected
//! at its first violating header rather than after full decompression.

use super::codec::open_archive;
use super::entry::ArchiveEntry;
use super::error::{ArchiveError, PathError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum number of regular-file entries per archive.
pub const MAX_ARCHIVE_FILES: usize = 1000;

/// Maximum cumulative declared (uncompressed) size per archive.
pub const MAX_ARCHIVE_TOTAL_BYTES: u64 = 50 * 1024 * 1024;

/// Maximum normalised entry path length, in characters.
pub const MAX_ARCHIVE_PATH_LENGTH: usize = 240;

/// Maximum number of non-empty segments in an entry path.
pub const MAX_ARCHIVE_PATH_DEPTH: usize = 16;

const LOG_TARGET: &str = "skillpack::archive";

/// Ceilings for the archive safety policy.
///
/// Deserialised values may tighten the defaults but never raise them; a
/// configured value above its `MAX_ARCHIVE_*` constant is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LimitOverrides")]
pub struct ArchiveLimits {
    /// Maximum number of regular-file entries.
    pub max_files: usize,
    /// Maximum cumulative declared size in bytes.
    pub max_total_bytes: u64,
    /// Maximum normalised path length in characters.
    pub max_path_len: usize,
    /// Maximum number of non-empty path segments.
    pub max_path_depth: usize,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_files: MAX_ARCHIVE_FILES,
            max_total_bytes: MAX_ARCHIVE_TOTAL_BYTES,
            max_path_len: MAX_ARCHIVE_PATH_LENGTH,
            max_path_depth: MAX_ARCHIVE_PATH_DEPTH,
        }
    }
}

/// Limits as written in configuration, before the ceilings are checked.
#[derive(Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LimitOverrides {
    max_files: usize,
    max_total_bytes: u64,
    max_path_len: usize,
    max_path_depth: usize,
}

impl Default for LimitOverrides {
    fn default() -> Self {
        let limits = ArchiveLimits::default();
        Self {
            max_files: limits.max_files,
            max_total_bytes: limits.max_total_bytes,
            max_path_len: limits.max_path_len,
            max_path_depth: limits.max_path_depth,
        }
    }
}

impl TryFrom<LimitOverrides> for ArchiveLimits {
    type Error = String;

    fn try_from(raw: LimitOverrides) -> Result<Self, Self::Error> {
        let ceiling = |name: &str, value: u64, max: u64| {
            if value > max {
                Err(format!("limits.{name} may not exceed {max} (got {value})"))
            } else {
                Ok(())
            }
        };
        ceiling("max_files", raw.max_files as u64, MAX_ARCHIVE_FILES as u64)?;
        ceiling("max_total_bytes", raw.max_total_bytes, MAX_ARCHIVE_TOTAL_BYTES)?;
        ceiling("max_path_len", raw.max_path_len as u64, MAX_ARCHIVE_PATH_LENGTH as u64)?;
        ceiling("max_path_depth", raw.max_path_depth as u64, MAX_ARCHIVE_PATH_DEPTH as u64)?;
        Ok(Self {
            max_files: raw.max_files,
            max_total_bytes: raw.max_total_bytes,
            max_path_len: raw.max_path_len,
            max_path_depth: raw.max_path_depth,
        })
    }
}

/// Counters accumulated while scanning an archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveSummary {
    /// Regular-file entries seen.
    pub file_count: usize,
    /// Directory entries seen.
    pub directory_count: usize,
    /// Sum of declared entry sizes.
    pub total_declared_bytes: u64,
}

/// Validate one entry path against the default limits.
///
/// # Errors
///
/// Returns a [`PathError`] describing the first rule the path breaks.
///
/// # Examples
///
/// ```
/// use skillpack::archive::policy::validate_path;
///
/// assert!(validate_path("docs/SKILL.md").is_ok());
/// assert!(validate_path("docs\\..\\..\\etc\\passwd").is_err());
/// assert!(validate_path("/etc/passwd").is_err());
/// ```
pub fn validate_path(path: &str) -> Result<(), PathError> {
    validate_path_with(path, &ArchiveLimits::default())
}

/// Validate one entry path against explicit limits.
///
/// Backslashes are treated as separators. An empty path or `.` denotes the
/// archive root and is accepted.
///
/// # Errors
///
/// Returns a [`PathError`] describing the first rule the path breaks.
pub fn validate_path_with(path: &str, limits: &ArchiveLimits) -> Result<(), PathError> {
    let normalised = path.replace('\\', "/");
    if normalised.is_empty() || normalised == "." {
        return Ok(());
    }
    if normalised.starts_with('/') || has_drive_prefix(&normalised) {
        return Err(PathError::Absolute {
            path: path.to_owned(),
        });
    }
    if normalised.split('/').any(|segment| segment == "..") {
        return Err(PathError::Traversal {
            path: path.to_owned(),
        });
    }
    let len = normalised.chars().count();
    if len > limits.max_path_len {
        return Err(PathError::TooLong {
            path: path.to_owned(),
            len,
            max: limits.max_path_len,
        });
    }
    let depth = normalised.split('/').filter(|s| !s.is_empty()).count();
    if depth > limits.max_path_depth {
        return Err(PathError::TooDeep {
            path: path.to_owned(),
            depth,
            max: limits.max_path_depth,
        });
    }
    Ok(())
}

/// Detect Windows drive prefixes such as `C:` or `c:/`.
fn has_drive_prefix(path: &str) -> bool {
    let mut chars = path.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

/// Incremental whole-archive policy check.
///
/// Feed every entry header to [`ArchiveScan::observe`] in archive order; the
/// first violation is returned and the caller must stop reading.
#[derive(Debug)]
pub struct ArchiveScan<'a> {
    limits: &'a ArchiveLimits,
    summary: ArchiveSummary,
}

impl<'a> ArchiveScan<'a> {
    /// Start a scan with the given limits.
    #[must_use]
    pub fn new(limits: &'a ArchiveLimits) -> Self {
        Self {
            limits,
            summary: ArchiveSummary::default(),
        }
    }

    /// Apply the path rule, the entry-type allow-list, the file-count
    /// ceiling and the cumulative size ceiling to one entry.
    ///
    /// # Errors
    ///
    /// Returns the first policy violation for this entry.
    pub fn observe(&mut self, entry: &ArchiveEntry) -> Result<(), ArchiveError> {
        validate_path_with(&entry.path, self.limits)?;

        if !entry.kind.is_allowed() {
            return Err(ArchiveError::UnsupportedEntryType {
                path: entry.path.clone(),
                kind: entry.kind,
            });
        }

        if entry.kind.is_file() {
            self.summary.file_count += 1;
            if self.summary.file_count > self.limits.max_files {
                return Err(ArchiveError::TooManyFiles {
                    count: self.summary.file_count,
                    max: self.limits.max_files,
                    path: entry.path.clone(),
                });
            }
        } else {
            self.summary.directory_count += 1;
        }

        self.summary.total_declared_bytes = self
            .summary
            .total_declared_bytes
            .saturating_add(entry.declared_size);
        if self.summary.total_declared_bytes > self.limits.max_total_bytes {
            return Err(ArchiveError::ArchiveTooLarge {
                total: self.summary.total_declared_bytes,
                max: self.limits.max_total_bytes,
                path: entry.path.clone(),
            });
        }
        Ok(())
    }

    /// Counters accumulated so far.
    #[must_use]
    pub fn summary(&self) -> ArchiveSummary {
        self.summary
    }
}

/// Stream the archive at `path` once through the safety policy.
///
/// Nothing is written to disk; entry data is skipped, not decompressed
/// into memory.
///
/// # Errors
///
/// Returns the first policy violation, or [`ArchiveError::Format`] if the
/// container cannot be decoded.
pub fn validate_archive(path: &Path, limits: &ArchiveLimits) -> Result<ArchiveSummary, ArchiveError> {
    let mut archive = open_archive(path)?;
    let mut scan = ArchiveScan::new(limits);

    for entry_result in archive.entries().map_err(ArchiveError::format)? {
        let entry = entry_result.map_err(ArchiveError::format)?;
        let meta = ArchiveEntry::from_tar(&entry)?;
        if let Err(err) = scan.observe(&meta) {
            warn!(target: LOG_TARGET, "archive rejected by safety policy: {err}");
            return Err(err);
        }
    }

    let summary = scan.summary();
    debug!(
        target: LOG_TARGET,
        "archive passed safety policy: {} files, {} directories, {} bytes declared",
        summary.file_count,
        summary.directory_count,
        summary.total_declared_bytes,
    );
    Ok(summary)
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
