//! Publish manifest parsing and normalisation.
//!
//! The manifest travels alongside the archive as camelCase JSON. Raw input
//! is deserialised leniently into [`RawManifest`] and then validated into a
//! [`PublishManifest`] whose identifiers are already typed.

use crate::package::{MetadataError, PackageSlug, PublisherHandle, ReleaseVersion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum number of entries kept in each list field.
pub const MAX_LIST_ENTRIES: usize = 30;

/// Errors from manifest parsing and validation.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest is not valid JSON for the expected shape.
    #[error("manifest is invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// An identifier failed validation.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A required free-text field is blank.
    #[error("{field} is required")]
    MissingField {
        /// Manifest key of the missing field.
        field: &'static str,
    },
}

/// The manifest exactly as supplied, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawManifest {
    /// Package slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// One-line summary.
    pub summary: String,
    /// Semantic version.
    pub version: String,
    /// Publisher handle.
    pub publisher_handle: String,
    /// Category labels.
    pub categories: Vec<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Compatible agent runtimes.
    pub compatibility: Vec<String>,
    /// Declared SPDX licence identifier.
    pub license_spdx: Option<String>,
    /// Project homepage.
    pub homepage_url: Option<String>,
    /// Source repository.
    pub repo_url: Option<String>,
}

/// A validated publish manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishManifest {
    /// Package slug.
    pub slug: PackageSlug,
    /// Display name, trimmed and non-empty.
    pub name: String,
    /// Summary, trimmed and non-empty.
    pub summary: String,
    /// Semantic version.
    pub version: ReleaseVersion,
    /// Publisher handle.
    pub publisher_handle: PublisherHandle,
    /// Category labels.
    pub categories: Vec<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Compatible agent runtimes.
    pub compatibility: Vec<String>,
    /// Declared SPDX licence identifier.
    pub license_spdx: Option<String>,
    /// Project homepage.
    pub homepage_url: Option<String>,
    /// Source repository.
    pub repo_url: Option<String>,
}

impl TryFrom<RawManifest> for PublishManifest {
    type Error = ManifestError;

    fn try_from(raw: RawManifest) -> Result<Self, Self::Error> {
        let slug = PackageSlug::try_from(raw.slug.as_str())?;
        let name = required(&raw.name, "name")?;
        let summary = required(&raw.summary, "summary")?;
        let publisher_handle = PublisherHandle::try_from(raw.publisher_handle.as_str())?;
        let version = ReleaseVersion::try_from(raw.version.as_str())?;

        Ok(Self {
            slug,
            name,
            summary,
            version,
            publisher_handle,
            categories: clean_list(raw.categories),
            tags: clean_list(raw.tags),
            compatibility: clean_list(raw.compatibility),
            license_spdx: raw.license_spdx,
            homepage_url: raw.homepage_url,
            repo_url: raw.repo_url,
        })
    }
}

/// Parse and validate a JSON manifest.
///
/// # Errors
///
/// Returns [`ManifestError`] for malformed JSON, invalid identifiers, or a
/// blank name or summary.
///
/// # Examples
///
/// ```
/// use skillpack::manifest::parse_manifest;
///
/// let manifest = parse_manifest(r#"{
///     "slug": "demo", "name": "Demo", "summary": "A demo",
///     "version": "1.0.0", "publisherHandle": "acme"
/// }"#).expect("valid manifest");
/// assert_eq!(manifest.slug.as_str(), "demo");
/// ```
pub fn parse_manifest(json: &str) -> Result<PublishManifest, ManifestError> {
    let raw: RawManifest = serde_json::from_str(json)?;
    PublishManifest::try_from(raw)
}

fn required(value: &str, field: &'static str) -> Result<String, ManifestError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ManifestError::MissingField { field });
    }
    Ok(trimmed.to_owned())
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .take(MAX_LIST_ENTRIES)
        .collect()
}
