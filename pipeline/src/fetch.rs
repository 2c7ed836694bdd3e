//! Download of release archives for the install pipeline.
//!
//! [`ArchiveFetcher`] streams the bytes behind a [`StorageLocator`] into a
//! local file. [`StoreFetcher`] reads straight from a [`PackageStore`];
//! [`HttpFetcher`] resolves locators against a registry base URL with an
//! explicitly configured `ureq` agent.

use crate::storage::{PackageStore, StorageError, StorageLocator};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

/// Largest archive the fetchers will write to disk.
pub const MAX_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Trait for fetching archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveFetcher {
    /// Stream the archive at `locator` into a new file at `dest`, returning
    /// the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] if the source is unavailable, the body is
    /// larger than [`MAX_DOWNLOAD_BYTES`], or the file cannot be written.
    fn fetch_to(&self, locator: &StorageLocator, dest: &Path) -> Result<u64, FetchError>;
}

/// Errors arising from archive download.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The requested archive was not found (HTTP 404).
    #[error("archive not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// The body exceeded [`MAX_DOWNLOAD_BYTES`].
    #[error("download exceeds {max} bytes")]
    TooLarge {
        /// Configured ceiling.
        max: u64,
    },

    /// The storage collaborator failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] io::Error),
}

/// Fetcher reading from a [`PackageStore`].
pub struct StoreFetcher<'a> {
    store: &'a dyn PackageStore,
}

impl<'a> StoreFetcher<'a> {
    /// Wrap `store`.
    #[must_use]
    pub fn new(store: &'a dyn PackageStore) -> Self {
        Self { store }
    }
}

impl ArchiveFetcher for StoreFetcher<'_> {
    fn fetch_to(&self, locator: &StorageLocator, dest: &Path) -> Result<u64, FetchError> {
        let reader = self.store.open(locator)?;
        copy_bounded(reader, dest)
    }
}

/// HTTP fetcher using `ureq`.
pub struct HttpFetcher {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpFetcher {
    /// Build a fetcher for `base_url` whose requests time out after
    /// `timeout`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self::with_agent(ureq::Agent::new_with_config(config), base_url)
    }

    /// Build a fetcher around an existing agent.
    #[must_use]
    pub fn with_agent(agent: ureq::Agent, base_url: impl Into<String>) -> Self {
        Self {
            agent,
            base_url: base_url.into(),
        }
    }

    /// Resolve `locator` to a full URL. Absolute `http(s)` locators are
    /// used as-is.
    ///
    /// # Examples
    ///
    /// ```
    /// use skillpack::fetch::HttpFetcher;
    /// use skillpack::storage::StorageLocator;
    /// use std::time::Duration;
    ///
    /// let fetcher = HttpFetcher::new("https://registry.example/tarballs/", Duration::from_secs(5));
    /// let url = fetcher.url_for(&StorageLocator::new("skills/demo/1.0.0.tgz"));
    /// assert_eq!(url, "https://registry.example/tarballs/skills/demo/1.0.0.tgz");
    /// ```
    #[must_use]
    pub fn url_for(&self, locator: &StorageLocator) -> String {
        if locator.is_url() {
            return locator.as_str().to_owned();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            locator.as_str().trim_start_matches('/')
        )
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch_to(&self, locator: &StorageLocator, dest: &Path) -> Result<u64, FetchError> {
        let url = self.url_for(locator);
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| map_ureq_error(&url, &e))?;
        copy_bounded(response.into_body().as_reader(), dest)
    }
}

/// Copy at most [`MAX_DOWNLOAD_BYTES`] from `reader` into a new file.
fn copy_bounded(reader: impl Read, dest: &Path) -> Result<u64, FetchError> {
    let mut file = File::create(dest)?;
    let mut limited = reader.take(MAX_DOWNLOAD_BYTES + 1);
    let copied = io::copy(&mut limited, &mut file)?;
    if copied > MAX_DOWNLOAD_BYTES {
        return Err(FetchError::TooLarge {
            max: MAX_DOWNLOAD_BYTES,
        });
    }
    Ok(copied)
}

/// Map a ureq error to a [`FetchError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> FetchError {
    match err {
        ureq::Error::StatusCode(404) => FetchError::NotFound {
            url: url.to_owned(),
        },
        other => FetchError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
