//! Publish pipeline.
//!
//! Turns an untrusted archive plus a validated manifest into a recorded
//! release. The gates run in a fixed order and the first failure wins:
//! size, inspection (which applies the full safety policy), manifest
//! presence, duplicate check, storage, scoring, and finally recording.

use crate::archive::error::ArchiveError;
use crate::archive::inspect::{InspectionEvidence, inspect};
use crate::archive::policy::ArchiveLimits;
use crate::error::FailureDisposition;
use crate::manifest::PublishManifest;
use crate::package::{PackageSlug, ReleaseVersion};
use crate::registry::{RegistryError, ReleaseRecord, ReleaseRegistry};
use crate::storage::{PackageKey, PackageStore, StorageError, StorageLocator};
use log::{info, warn};
use serde::Serialize;
use skillpack_common::{Sha256Digest, TrustComputation, TrustSignals, compute_trust_score, digest_bytes};
use std::io::Write;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Largest archive accepted for publication.
pub const MAX_ARCHIVE_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const LOG_TARGET: &str = "skillpack::publish";

/// Errors arising from the publish pipeline.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The uploaded archive has no bytes.
    #[error("tarball is empty")]
    EmptyArchive,

    /// The uploaded archive exceeds the upload ceiling.
    #[error("tarball is too large ({size} bytes, max {max})")]
    ArchiveTooLarge {
        /// Uploaded size.
        size: usize,
        /// Upload ceiling.
        max: usize,
    },

    /// Inspection rejected the archive.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// No non-empty `SKILL.md` was found.
    #[error("tarball must include a non-empty SKILL.md")]
    MissingManifest,

    /// This version has already been published.
    #[error("version already exists for this skill: {package}@{version}")]
    DuplicateVersion {
        /// Package slug.
        package: PackageSlug,
        /// Duplicate version.
        version: ReleaseVersion,
    },

    /// The storage collaborator failed.
    #[error("failed to store archive: {0}")]
    Storage(#[from] StorageError),

    /// The registry collaborator failed.
    #[error("failed to record release: {0}")]
    Registry(#[from] RegistryError),

    /// The scratch file could not be written.
    #[error("failed to stage archive for inspection: {0}")]
    Scratch(#[from] std::io::Error),
}

impl PublishError {
    /// How a caller should react to this error.
    #[must_use]
    pub fn disposition(&self) -> FailureDisposition {
        match self {
            Self::EmptyArchive | Self::ArchiveTooLarge { .. } | Self::MissingManifest => {
                FailureDisposition::FixInput
            }
            Self::Archive(err) => err.disposition(),
            Self::DuplicateVersion { .. } | Self::Registry(RegistryError::DuplicateVersion { .. }) => {
                FailureDisposition::CallerChoice
            }
            Self::Storage(_) | Self::Registry(_) | Self::Scratch(_) => FailureDisposition::Transient,
        }
    }
}

/// Inputs for one publish attempt.
#[derive(Debug, Clone, Copy)]
pub struct PublishRequest<'a> {
    /// Raw archive bytes as uploaded.
    pub archive: &'a [u8],
    /// Validated manifest.
    pub manifest: &'a PublishManifest,
    /// Whether the publisher is verified.
    pub publisher_verified: bool,
    /// Whether the release carries a signature.
    pub signed_release: bool,
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutcome {
    /// Package slug.
    pub package: PackageSlug,
    /// Published version.
    pub version: ReleaseVersion,
    /// SHA-256 of the archive bytes.
    pub digest: Sha256Digest,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Trust score with breakdown.
    pub trust: TrustComputation,
    /// Where the archive was stored.
    pub locator: StorageLocator,
    /// Inspection evidence.
    pub evidence: InspectionEvidence,
}

/// Publish an archive.
///
/// If recording fails after the bytes were stored, the stored object is
/// left in place and the error is returned; the release does not exist.
///
/// # Errors
///
/// Returns [`PublishError`] for the first gate that fails.
pub fn publish(
    request: &PublishRequest<'_>,
    store: &dyn PackageStore,
    registry: &dyn ReleaseRegistry,
    limits: &ArchiveLimits,
) -> Result<PublishOutcome, PublishError> {
    let manifest = request.manifest;
    let size = request.archive.len();
    if size == 0 {
        return Err(PublishError::EmptyArchive);
    }
    if size > MAX_ARCHIVE_UPLOAD_BYTES {
        return Err(PublishError::ArchiveTooLarge {
            size,
            max: MAX_ARCHIVE_UPLOAD_BYTES,
        });
    }

    let evidence = inspect_bytes(request.archive, limits).inspect_err(|err| {
        warn!(target: LOG_TARGET, "rejected {}@{}: {err}", manifest.slug, manifest.version);
    })?;
    if !evidence.has_usable_manifest() {
        return Err(PublishError::MissingManifest);
    }

    let digest = digest_bytes(request.archive);

    if registry
        .find_release(&manifest.slug, Some(&manifest.version))?
        .is_some()
    {
        return Err(PublishError::DuplicateVersion {
            package: manifest.slug.clone(),
            version: manifest.version.clone(),
        });
    }

    let key = PackageKey::new(manifest.slug.clone(), manifest.version.clone());
    let locator = store.store(&key, request.archive)?;

    let trust = compute_trust_score(&TrustSignals {
        license_spdx: manifest.license_spdx.clone(),
        repo_url: manifest.repo_url.clone(),
        homepage_url: manifest.homepage_url.clone(),
        publisher_verified: request.publisher_verified,
        has_manifest_file: evidence.has_manifest_file,
        has_license_file: evidence.has_license_file,
        signed_release: request.signed_release,
    });

    let size_bytes = size as u64;
    registry.record_release(ReleaseRecord {
        package: manifest.slug.clone(),
        version: manifest.version.clone(),
        digest: digest.clone(),
        size_bytes,
        locator: locator.clone(),
        trust_score: trust.score,
        trust_tier: trust.tier,
    })?;

    info!(
        target: LOG_TARGET,
        "published {}@{} ({size_bytes} bytes, sha256 {digest}, trust {} {})",
        manifest.slug,
        manifest.version,
        trust.score,
        trust.tier,
    );

    Ok(PublishOutcome {
        package: manifest.slug.clone(),
        version: manifest.version.clone(),
        digest,
        size_bytes,
        trust,
        locator,
        evidence,
    })
}

/// Stage `bytes` in a scratch file and inspect it. The scratch file is
/// removed when this returns, whatever the outcome.
fn inspect_bytes(bytes: &[u8], limits: &ArchiveLimits) -> Result<InspectionEvidence, PublishError> {
    let mut scratch = NamedTempFile::new()?;
    scratch.write_all(bytes)?;
    scratch.flush()?;
    Ok(inspect(scratch.path(), limits)?)
}

#[cfg(test)]
#[path = "publish_tests.rs"]
mod tests;
