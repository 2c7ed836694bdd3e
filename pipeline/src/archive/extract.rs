//! Safe archive extraction.
//!
//! Extracts gzip or zstd tarballs into a destination directory. Every entry
//! path is re-validated with the shared path rule before anything is
//! written, only regular files and directories are materialised, and no
//! write ever passes through a symlink that already exists under the
//! destination. File bodies are written up to their declared size and the
//! running total is held to the archive size ceiling.

use super::codec::open_archive;
use super::entry::{ArchiveEntry, EntryKind};
use super::error::{ArchiveError, PathError};
use super::policy::{ArchiveLimits, validate_path_with};
use log::debug;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "skillpack::archive";

/// What an extraction wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    /// Regular files written.
    pub files_written: usize,
    /// Directory entries materialised.
    pub directories_created: usize,
    /// Entries skipped because their type is not extracted.
    pub skipped: Vec<String>,
}

/// Trait for extracting skill archives, enabling test mocking.
///
/// # Examples
///
/// ```
/// use skillpack::archive::extract::TarballExtractor;
///
/// let extractor = TarballExtractor::default();
/// // Use extractor.extract(archive_path, dest_dir) in production
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor {
    /// Extract the archive at `archive_path` into the existing directory
    /// `dest_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::UnsafePath`] and stops at the first entry
    /// whose path fails the path rule or would be written through a
    /// symlink. Returns [`ArchiveError::ArchiveTooLarge`] once the declared
    /// file sizes pass the size ceiling, [`ArchiveError::Format`] for
    /// corrupt containers and [`ArchiveError::Io`] for filesystem failures.
    fn extract(&self, archive_path: &Path, dest_dir: &Path)
    -> Result<ExtractionReport, ArchiveError>;
}

/// Default extractor using the `tar`, `flate2` and `zstd` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TarballExtractor {
    limits: ArchiveLimits,
}

impl TarballExtractor {
    /// Create an extractor applying `limits` to entry paths and sizes.
    #[must_use]
    pub const fn new(limits: ArchiveLimits) -> Self {
        Self { limits }
    }
}

impl ArchiveExtractor for TarballExtractor {
    fn extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<ExtractionReport, ArchiveError> {
        let mut archive = open_archive(archive_path)?;
        let mut report = ExtractionReport::default();
        let mut written_bytes: u64 = 0;

        for entry_result in archive.entries().map_err(ArchiveError::format)? {
            let mut entry = entry_result.map_err(ArchiveError::format)?;
            let meta = ArchiveEntry::from_tar(&entry)?;
            validate_path_with(&meta.path, &self.limits)?;

            if meta.is_root() {
                continue;
            }

            match meta.kind {
                EntryKind::Directory => {
                    let target = resolve_target(dest_dir, &meta.path)?;
                    fs::create_dir_all(&target)?;
                    report.directories_created += 1;
                }
                kind if kind.is_file() => {
                    written_bytes = written_bytes.saturating_add(meta.declared_size);
                    if written_bytes > self.limits.max_total_bytes {
                        return Err(ArchiveError::ArchiveTooLarge {
                            total: written_bytes,
                            max: self.limits.max_total_bytes,
                            path: meta.path,
                        });
                    }
                    let target = resolve_target(dest_dir, &meta.path)?;
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    write_file(&mut entry, &target, &meta)?;
                    report.files_written += 1;
                }
                kind => {
                    debug!(
                        target: LOG_TARGET,
                        "skipping {kind} entry during extraction: {}",
                        meta.path
                    );
                    report.skipped.push(meta.path);
                }
            }
        }

        Ok(report)
    }
}

/// Copy at most the declared size of an entry body into `target`.
fn write_file(body: &mut impl Read, target: &Path, meta: &ArchiveEntry) -> Result<(), ArchiveError> {
    let mut file = File::create(target)?;
    io::copy(&mut body.by_ref().take(meta.declared_size), &mut file)
        .map_err(classify_copy_error)?;
    let mut overflow = [0_u8; 1];
    if body.read(&mut overflow).map_err(classify_copy_error)? != 0 {
        return Err(ArchiveError::format(format!(
            "entry {} holds more than its declared {} bytes",
            meta.path, meta.declared_size
        )));
    }
    Ok(())
}

/// Join a validated entry path onto `dest_dir`, refusing to descend through
/// any symlink that already exists below it.
fn resolve_target(dest_dir: &Path, entry_path: &str) -> Result<PathBuf, ArchiveError> {
    let mut target = dest_dir.to_path_buf();
    for segment in entry_path.split('/').filter(|s| !s.is_empty() && *s != ".") {
        target.push(segment);
        match fs::symlink_metadata(&target) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                return Err(PathError::ThroughSymlink {
                    path: entry_path.to_owned(),
                }
                .into());
            }
            Ok(_) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(target)
}

/// Decoder failures surface as `InvalidData` or `UnexpectedEof`; anything
/// else came from the destination filesystem.
fn classify_copy_error(err: io::Error) -> ArchiveError {
    match err.kind() {
        ErrorKind::InvalidData | ErrorKind::UnexpectedEof => ArchiveError::format(err),
        _ => ArchiveError::Io(err),
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
