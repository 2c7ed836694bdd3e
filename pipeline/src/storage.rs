//! Package byte storage.
//!
//! [`PackageStore`] is the seam between the pipelines and wherever release
//! archives live. [`LocalPackageStore`] keeps them on the local filesystem
//! under `skills/<slug>/<version>.tgz`.

use crate::archive::policy::validate_path;
use crate::package::{PackageSlug, ReleaseVersion};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

const LOG_TARGET: &str = "skillpack::storage";

/// Identifies one stored release archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageKey {
    /// Package slug.
    pub package: PackageSlug,
    /// Release version.
    pub version: ReleaseVersion,
}

impl PackageKey {
    /// Create a key for `package` at `version`.
    #[must_use]
    pub fn new(package: PackageSlug, version: ReleaseVersion) -> Self {
        Self { package, version }
    }

    /// Storage-relative object path, e.g. `skills/demo/1.0.0.tgz`.
    #[must_use]
    pub fn object_path(&self) -> String {
        format!("skills/{}/{}.tgz", self.package, self.version)
    }
}

/// Opaque reference to stored bytes: a store-relative path or an absolute
/// URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageLocator(String);

impl StorageLocator {
    /// Wrap a locator string.
    #[must_use]
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Get the locator as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return true when the locator is an absolute `http(s)` URL.
    #[must_use]
    pub fn is_url(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl fmt::Display for StorageLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from the storage collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing store failed.
    #[error("storage I/O error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The locator is not one this store can resolve.
    #[error("invalid storage locator: {locator}")]
    InvalidLocator {
        /// The rejected locator.
        locator: String,
    },

    /// No object exists at the locator.
    #[error("stored object not found: {locator}")]
    NotFound {
        /// The missing locator.
        locator: String,
    },
}

/// Persists and retrieves release archive bytes.
#[cfg_attr(test, mockall::automock)]
pub trait PackageStore {
    /// Persist `bytes` under `key` and return a locator for them.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the bytes cannot be persisted.
    fn store(&self, key: &PackageKey, bytes: &[u8]) -> Result<StorageLocator, StorageError>;

    /// Open the bytes behind `locator` for streaming.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if nothing is stored there.
    fn open(&self, locator: &StorageLocator) -> Result<Box<dyn Read>, StorageError>;
}

/// Filesystem-backed [`PackageStore`].
#[derive(Debug, Clone)]
pub struct LocalPackageStore {
    root: PathBuf,
}

impl LocalPackageStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, locator: &StorageLocator) -> Result<PathBuf, StorageError> {
        let invalid = || StorageError::InvalidLocator {
            locator: locator.as_str().to_owned(),
        };
        if locator.as_str().is_empty() || locator.is_url() {
            return Err(invalid());
        }
        validate_path(locator.as_str()).map_err(|_| invalid())?;
        Ok(self.root.join(locator.as_str()))
    }
}

impl PackageStore for LocalPackageStore {
    fn store(&self, key: &PackageKey, bytes: &[u8]) -> Result<StorageLocator, StorageError> {
        let locator = StorageLocator::new(key.object_path());
        let path = self.resolve(&locator)?;
        let io_err = |source: std::io::Error| StorageError::Io {
            path: path.clone(),
            source,
        };

        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent).map_err(io_err)?;
        let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
        temp.write_all(bytes).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&path).map_err(|err| io_err(err.error))?;

        debug!(target: LOG_TARGET, "stored {} bytes at {}", bytes.len(), path.display());
        Ok(locator)
    }

    fn open(&self, locator: &StorageLocator) -> Result<Box<dyn Read>, StorageError> {
        let path = self.resolve(locator)?;
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StorageError::NotFound {
                locator: locator.as_str().to_owned(),
            }),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn key() -> PackageKey {
        PackageKey::new(
            PackageSlug::try_from("demo").expect("slug"),
            ReleaseVersion::try_from("1.2.3").expect("version"),
        )
    }

    #[test]
    fn object_path_follows_layout() {
        assert_eq!(key().object_path(), "skills/demo/1.2.3.tgz");
    }

    #[test]
    fn stores_and_reopens_bytes() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = LocalPackageStore::new(temp.path());
        let locator = store.store(&key(), b"archive bytes").expect("store");
        assert_eq!(locator.as_str(), "skills/demo/1.2.3.tgz");

        let mut contents = Vec::new();
        store
            .open(&locator)
            .expect("open")
            .read_to_end(&mut contents)
            .expect("read");
        assert_eq!(contents, b"archive bytes");
    }

    #[test]
    fn missing_object_is_not_found() {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = LocalPackageStore::new(temp.path());
        let result = store.open(&StorageLocator::new("skills/none/0.0.1.tgz"));
        assert!(matches!(result, Err(StorageError::NotFound { .. })));
    }

    #[rstest]
    #[case::traversal("../outside.tgz")]
    #[case::absolute("/etc/passwd")]
    #[case::url("https://example.com/a.tgz")]
    #[case::empty("")]
    fn rejects_locators_outside_the_root(#[case] locator: &str) {
        let temp = tempfile::tempdir().expect("temp dir");
        let store = LocalPackageStore::new(temp.path());
        let result = store.open(&StorageLocator::new(locator));
        assert!(matches!(result, Err(StorageError::InvalidLocator { .. })));
    }
}
