//! Release metadata registry.
//!
//! [`ReleaseRegistry`] records published releases and resolves them for
//! install. Two implementations are provided: [`InMemoryRegistry`] for
//! embedding and tests, and [`FileRegistry`], which keeps a JSON index on
//! disk next to the package store.

use crate::package::{PackageSlug, ReleaseVersion};
use crate::storage::StorageLocator;
use log::debug;
use serde::{Deserialize, Serialize};
use skillpack_common::{Sha256Digest, TrustTier};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use thiserror::Error;

const LOG_TARGET: &str = "skillpack::registry";
const INDEX_FILE: &str = "index.json";

/// One published version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    /// Package slug.
    pub package: PackageSlug,
    /// Release version.
    pub version: ReleaseVersion,
    /// SHA-256 of the exact archive bytes.
    pub digest: Sha256Digest,
    /// Archive size in bytes.
    pub size_bytes: u64,
    /// Where the archive is stored.
    pub locator: StorageLocator,
    /// Trust score at publish time.
    pub trust_score: u8,
    /// Trust tier at publish time.
    pub trust_tier: TrustTier,
}

/// Errors from the registry collaborator.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The `(package, version)` pair is already recorded.
    #[error("version already exists for this skill: {package}@{version}")]
    DuplicateVersion {
        /// Package slug.
        package: PackageSlug,
        /// Duplicate version.
        version: ReleaseVersion,
    },

    /// Reading or writing the index failed.
    #[error("registry I/O error at {}: {source}", .path.display())]
    Io {
        /// Index path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The on-disk index could not be parsed.
    #[error("registry index is corrupt at {}: {source}", .path.display())]
    Corrupt {
        /// Index path.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

/// Records and resolves releases.
pub trait ReleaseRegistry {
    /// Find a release of `package`. With no version, the most recently
    /// recorded release is returned.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if the backing index cannot be read.
    fn find_release(
        &self,
        package: &PackageSlug,
        version: Option<&ReleaseVersion>,
    ) -> Result<Option<ReleaseRecord>, RegistryError>;

    /// Record a new release.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateVersion`] if the pair already
    /// exists.
    fn record_release(&self, record: ReleaseRecord) -> Result<(), RegistryError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReleaseIndex {
    releases: Vec<ReleaseRecord>,
}

impl ReleaseIndex {
    fn find(&self, package: &PackageSlug, version: Option<&ReleaseVersion>) -> Option<ReleaseRecord> {
        let mut matching = self.releases.iter().filter(|r| &r.package == package);
        match version {
            Some(wanted) => matching.find(|r| &r.version == wanted).cloned(),
            None => matching.last().cloned(),
        }
    }

    fn insert(&mut self, record: ReleaseRecord) -> Result<(), RegistryError> {
        if self.find(&record.package, Some(&record.version)).is_some() {
            return Err(RegistryError::DuplicateVersion {
                package: record.package,
                version: record.version,
            });
        }
        self.releases.push(record);
        Ok(())
    }
}

/// Registry held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    index: Mutex<ReleaseIndex>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReleaseRegistry for InMemoryRegistry {
    fn find_release(
        &self,
        package: &PackageSlug,
        version: Option<&ReleaseVersion>,
    ) -> Result<Option<ReleaseRecord>, RegistryError> {
        let index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(index.find(package, version))
    }

    fn record_release(&self, record: ReleaseRecord) -> Result<(), RegistryError> {
        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        index.insert(record)
    }
}

/// Registry persisted as `<root>/index.json`.
///
/// Every write rewrites the whole index through a temporary file, so a
/// crash never leaves a truncated index behind.
#[derive(Debug, Clone)]
pub struct FileRegistry {
    index_path: PathBuf,
}

impl FileRegistry {
    /// Open (or lazily create) the registry rooted at `root`.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            index_path: root.join(INDEX_FILE),
        }
    }

    fn io_error(&self, source: std::io::Error) -> RegistryError {
        RegistryError::Io {
            path: self.index_path.clone(),
            source,
        }
    }

    fn load(&self) -> Result<ReleaseIndex, RegistryError> {
        let text = match fs::read_to_string(&self.index_path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ReleaseIndex::default()),
            Err(err) => return Err(self.io_error(err)),
        };
        serde_json::from_str(&text).map_err(|source| RegistryError::Corrupt {
            path: self.index_path.clone(),
            source,
        })
    }

    fn save(&self, index: &ReleaseIndex) -> Result<(), RegistryError> {
        let parent = self
            .index_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        let json = serde_json::to_vec_pretty(index).map_err(|source| RegistryError::Corrupt {
            path: self.index_path.clone(),
            source,
        })?;
        let mut temp = NamedTempFile::new_in(parent).map_err(|err| self.io_error(err))?;
        temp.write_all(&json).map_err(|err| self.io_error(err))?;
        temp.persist(&self.index_path)
            .map_err(|err| self.io_error(err.error))?;
        Ok(())
    }
}

impl ReleaseRegistry for FileRegistry {
    fn find_release(
        &self,
        package: &PackageSlug,
        version: Option<&ReleaseVersion>,
    ) -> Result<Option<ReleaseRecord>, RegistryError> {
        Ok(self.load()?.find(package, version))
    }

    fn record_release(&self, record: ReleaseRecord) -> Result<(), RegistryError> {
        let mut index = self.load()?;
        debug!(
            target: LOG_TARGET,
            "recording {}@{} in {}",
            record.package,
            record.version,
            self.index_path.display()
        );
        index.insert(record)?;
        self.save(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillpack_common::digest_bytes;

    fn record(package: &str, version: &str) -> ReleaseRecord {
        ReleaseRecord {
            package: PackageSlug::try_from(package).expect("slug"),
            version: ReleaseVersion::try_from(version).expect("version"),
            digest: digest_bytes(version.as_bytes()),
            size_bytes: 10,
            locator: StorageLocator::new(format!("skills/{package}/{version}.tgz")),
            trust_score: 15,
            trust_tier: TrustTier::Community,
        }
    }

    fn slug(value: &str) -> PackageSlug {
        PackageSlug::try_from(value).expect("slug")
    }

    fn exercise(registry: &dyn ReleaseRegistry) {
        registry.record_release(record("demo", "1.0.0")).expect("record");
        registry.record_release(record("demo", "1.1.0")).expect("record");
        registry.record_release(record("other", "9.0.0")).expect("record");

        let latest = registry
            .find_release(&slug("demo"), None)
            .expect("find")
            .expect("present");
        assert_eq!(latest.version.as_str(), "1.1.0");

        let pinned = ReleaseVersion::try_from("1.0.0").expect("version");
        let found = registry
            .find_release(&slug("demo"), Some(&pinned))
            .expect("find")
            .expect("present");
        assert_eq!(found.version, pinned);

        let missing = ReleaseVersion::try_from("2.0.0").expect("version");
        assert!(registry
            .find_release(&slug("demo"), Some(&missing))
            .expect("find")
            .is_none());
        assert!(registry.find_release(&slug("absent"), None).expect("find").is_none());

        let err = registry
            .record_release(record("demo", "1.0.0"))
            .expect_err("duplicate");
        assert!(matches!(err, RegistryError::DuplicateVersion { .. }));
    }

    #[test]
    fn in_memory_registry_resolves_releases() {
        exercise(&InMemoryRegistry::new());
    }

    #[test]
    fn file_registry_resolves_releases() {
        let temp = tempfile::tempdir().expect("temp dir");
        exercise(&FileRegistry::new(temp.path()));
    }

    #[test]
    fn file_registry_persists_between_instances() {
        let temp = tempfile::tempdir().expect("temp dir");
        FileRegistry::new(temp.path())
            .record_release(record("demo", "1.0.0"))
            .expect("record");
        let reopened = FileRegistry::new(temp.path());
        assert!(reopened.find_release(&slug("demo"), None).expect("find").is_some());
    }

    #[test]
    fn corrupt_index_is_reported() {
        let temp = tempfile::tempdir().expect("temp dir");
        fs::write(temp.path().join(INDEX_FILE), "{ not json").expect("write");
        let err = FileRegistry::new(temp.path())
            .find_release(&slug("demo"), None)
            .expect_err("corrupt");
        assert!(matches!(err, RegistryError::Corrupt { .. }));
    }
}
