//! Install pipeline.
//!
//! Resolves a release, downloads it to a scratch directory, verifies it
//! byte-for-byte against the recorded digest, re-runs the archive safety
//! policy and only then extracts into the destination.
//!
//! When `overwrite` is set, an existing destination is removed only after
//! the download has been verified and validated, so an integrity or policy
//! failure leaves it exactly as it was. Any failure after the destination
//! has been created removes it again.

use crate::archive::error::ArchiveError;
use crate::archive::extract::ArchiveExtractor;
use crate::archive::policy::{ArchiveLimits, validate_archive};
use crate::error::FailureDisposition;
use crate::fetch::{ArchiveFetcher, FetchError};
use crate::package::{PackageSlug, ReleaseVersion};
use crate::registry::{RegistryError, ReleaseRecord, ReleaseRegistry};
use log::{debug, info, warn};
use serde::Serialize;
use skillpack_common::{Sha256Digest, digest_file};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LOG_TARGET: &str = "skillpack::install";

/// Errors arising from the install pipeline.
#[derive(Debug, Error)]
pub enum InstallError {
    /// No matching release is recorded.
    #[error("{}", version_not_found_message(.package, .version.as_ref()))]
    VersionNotFound {
        /// Requested package.
        package: PackageSlug,
        /// Requested version, if one was pinned.
        version: Option<ReleaseVersion>,
    },

    /// The destination exists and overwrite was not requested.
    #[error("destination exists: {} (pass --force to overwrite)", .path.display())]
    DestinationExists {
        /// The existing destination.
        path: PathBuf,
    },

    /// The archive could not be downloaded.
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),

    /// The downloaded bytes do not match the recorded digest.
    #[error("sha256 mismatch: expected {expected} got {actual}")]
    Integrity {
        /// Digest recorded at publish time.
        expected: Sha256Digest,
        /// Digest of the downloaded bytes.
        actual: Sha256Digest,
    },

    /// The archive failed validation or extraction.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The registry could not be queried.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A local filesystem operation failed.
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

fn version_not_found_message(package: &PackageSlug, version: Option<&ReleaseVersion>) -> String {
    match version {
        Some(version) => format!("version not found: {package}@{version}"),
        None => format!("no releases available for {package}"),
    }
}

impl InstallError {
    /// How a caller should react to this error.
    #[must_use]
    pub fn disposition(&self) -> FailureDisposition {
        match self {
            Self::VersionNotFound { .. } | Self::DestinationExists { .. } => {
                FailureDisposition::CallerChoice
            }
            Self::Integrity { .. } => FailureDisposition::PossibleTampering,
            Self::Archive(err) => err.disposition(),
            Self::Fetch(_) | Self::Registry(_) | Self::Io { .. } => FailureDisposition::Transient,
        }
    }

    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Inputs for one install.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Package to install.
    pub package: PackageSlug,
    /// Pinned version; the latest recorded release when `None`.
    pub version: Option<ReleaseVersion>,
    /// Directory the package is extracted into.
    pub destination: PathBuf,
    /// Replace an existing destination.
    pub overwrite: bool,
}

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallOutcome {
    /// Where the package was extracted.
    pub installed_path: PathBuf,
    /// Installed version.
    pub version: ReleaseVersion,
    /// Verified digest.
    pub digest: Sha256Digest,
    /// Regular files written.
    pub files_written: usize,
}

/// Collaborators used by the install pipeline.
#[derive(Clone, Copy)]
pub struct InstallContext<'a> {
    /// Source of archive bytes.
    pub fetcher: &'a dyn ArchiveFetcher,
    /// Extractor for verified archives.
    pub extractor: &'a dyn ArchiveExtractor,
    /// Safety policy ceilings.
    pub limits: &'a ArchiveLimits,
}

/// Resolve and install a package.
///
/// # Errors
///
/// Returns [`InstallError::VersionNotFound`] when nothing matches, and
/// otherwise whatever [`install_release`] returns.
pub fn install(
    request: &InstallRequest,
    registry: &dyn ReleaseRegistry,
    ctx: InstallContext<'_>,
) -> Result<InstallOutcome, InstallError> {
    let release = registry
        .find_release(&request.package, request.version.as_ref())?
        .ok_or_else(|| InstallError::VersionNotFound {
            package: request.package.clone(),
            version: request.version.clone(),
        })?;
    info!(
        target: LOG_TARGET,
        "installing {}@{} into {}",
        release.package,
        release.version,
        request.destination.display()
    );
    install_release(&release, &request.destination, request.overwrite, ctx)
}

/// Install one resolved release into `destination`.
///
/// # Errors
///
/// Returns [`InstallError::DestinationExists`] if the destination exists and
/// `overwrite` is false, [`InstallError::Integrity`] on digest mismatch,
/// [`InstallError::Archive`] on policy or extraction failure, and
/// [`InstallError::Fetch`] or [`InstallError::Io`] for collaborator and
/// filesystem failures.
pub fn install_release(
    release: &ReleaseRecord,
    destination: &Path,
    overwrite: bool,
    ctx: InstallContext<'_>,
) -> Result<InstallOutcome, InstallError> {
    let existing = match fs::symlink_metadata(destination) {
        Ok(metadata) => Some(metadata),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => return Err(InstallError::io(destination)(err)),
    };
    if existing.is_some() && !overwrite {
        return Err(InstallError::DestinationExists {
            path: destination.to_path_buf(),
        });
    }

    let scratch = tempfile::tempdir().map_err(InstallError::io(Path::new("scratch directory")))?;
    let archive_path = scratch
        .path()
        .join(format!("{}-{}.tgz", release.package, release.version));
    let downloaded = ctx.fetcher.fetch_to(&release.locator, &archive_path)?;
    debug!(target: LOG_TARGET, "downloaded {downloaded} bytes from {}", release.locator);

    let actual = digest_file(&archive_path).map_err(InstallError::io(&archive_path))?;
    if !actual.matches(&release.digest) {
        warn!(
            target: LOG_TARGET,
            "sha256 mismatch for {}@{}: expected {}, got {actual}",
            release.package,
            release.version,
            release.digest
        );
        return Err(InstallError::Integrity {
            expected: release.digest.clone(),
            actual,
        });
    }

    validate_archive(&archive_path, ctx.limits)?;

    if let Some(metadata) = existing {
        remove_existing(destination, &metadata)?;
    }
    fs::create_dir_all(destination).map_err(InstallError::io(destination))?;
    let guard = DestinationGuard::new(destination);

    let report = ctx.extractor.extract(&archive_path, destination)?;
    guard.disarm();

    info!(
        target: LOG_TARGET,
        "installed {}@{} ({} files)",
        release.package,
        release.version,
        report.files_written
    );
    Ok(InstallOutcome {
        installed_path: destination.to_path_buf(),
        version: release.version.clone(),
        digest: actual,
        files_written: report.files_written,
    })
}

fn remove_existing(destination: &Path, metadata: &fs::Metadata) -> Result<(), InstallError> {
    debug!(target: LOG_TARGET, "removing existing {}", destination.display());
    let result = if metadata.is_dir() {
        fs::remove_dir_all(destination)
    } else {
        fs::remove_file(destination)
    };
    result.map_err(InstallError::io(destination))
}

/// Removes a freshly created destination unless disarmed.
struct DestinationGuard<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> DestinationGuard<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for DestinationGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = fs::remove_dir_all(self.path) {
            warn!(
                target: LOG_TARGET,
                "failed to remove partial install at {}: {err}",
                self.path.display()
            );
        }
    }
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
