//! Validated identifiers for packages, versions, and publishers.
//!
//! Each newtype trims and validates its input at construction so the rest
//! of the pipeline never handles a malformed identifier. Slugs and handles
//! are lower-cased before validation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_SLUG_LEN: usize = 64;
const MIN_HANDLE_LEN: usize = 2;
const MAX_HANDLE_LEN: usize = 40;

/// Errors from identifier validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The package slug is malformed.
    #[error("invalid slug: {value:?}")]
    InvalidSlug {
        /// The rejected input.
        value: String,
    },

    /// The version is not a semantic version.
    #[error("invalid semver version: {value:?}")]
    InvalidVersion {
        /// The rejected input.
        value: String,
    },

    /// The publisher handle is malformed.
    #[error("invalid publisher handle: {value:?}")]
    InvalidHandle {
        /// The rejected input.
        value: String,
    },
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

/// A package slug: 1 to 64 characters of `[a-z0-9-]`, starting and ending
/// with an alphanumeric character.
///
/// # Examples
///
/// ```
/// use skillpack::package::PackageSlug;
///
/// let slug = PackageSlug::try_from(" PDF-Tools ").expect("valid slug");
/// assert_eq!(slug.as_str(), "pdf-tools");
/// assert!(PackageSlug::try_from("-leading").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageSlug(String);

impl PackageSlug {
    /// Get the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PackageSlug {
    type Error = MetadataError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let slug = value.trim().to_lowercase();
        let edges_ok = slug.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && slug.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
        if slug.len() > MAX_SLUG_LEN || !edges_ok || !slug.chars().all(is_slug_char) {
            return Err(MetadataError::InvalidSlug {
                value: value.to_owned(),
            });
        }
        Ok(Self(slug))
    }
}

impl TryFrom<String> for PackageSlug {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<PackageSlug> for String {
    fn from(value: PackageSlug) -> Self {
        value.0
    }
}

impl fmt::Display for PackageSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A semantic version: `MAJOR.MINOR.PATCH[-prerelease][+build]`.
///
/// Versions compare by their exact text; the registry looks them up by
/// equality, never by precedence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Get the version as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_numeric(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())
}

fn is_identifier(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

fn is_semver(value: &str) -> bool {
    let (rest, build) = match value.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (value, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };
    let parts: Vec<&str> = core.split('.').collect();
    parts.len() == 3
        && parts.iter().all(|part| is_numeric(part))
        && pre.is_none_or(is_identifier)
        && build.is_none_or(is_identifier)
}

impl TryFrom<&str> for ReleaseVersion {
    type Error = MetadataError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let version = value.trim();
        if !is_semver(version) {
            return Err(MetadataError::InvalidVersion {
                value: value.to_owned(),
            });
        }
        Ok(Self(version.to_owned()))
    }
}

impl TryFrom<String> for ReleaseVersion {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<ReleaseVersion> for String {
    fn from(value: ReleaseVersion) -> Self {
        value.0
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A publisher handle: 2 to 40 characters of `[a-z0-9-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublisherHandle(String);

impl PublisherHandle {
    /// Get the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for PublisherHandle {
    type Error = MetadataError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let handle = value.trim().to_lowercase();
        if !(MIN_HANDLE_LEN..=MAX_HANDLE_LEN).contains(&handle.len())
            || !handle.chars().all(is_slug_char)
        {
            return Err(MetadataError::InvalidHandle {
                value: value.to_owned(),
            });
        }
        Ok(Self(handle))
    }
}

impl TryFrom<String> for PublisherHandle {
    type Error = MetadataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<PublisherHandle> for String {
    fn from(value: PublisherHandle) -> Self {
        value.0
    }
}

impl fmt::Display for PublisherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::single_char("a", "a")]
    #[case::hyphenated("pdf-tools", "pdf-tools")]
    #[case::normalised("  Web-Search2 ", "web-search2")]
    fn accepts_valid_slugs(#[case] input: &str, #[case] expected: &str) {
        let slug = PackageSlug::try_from(input).expect("valid slug");
        assert_eq!(slug.as_str(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::leading_hyphen("-abc")]
    #[case::trailing_hyphen("abc-")]
    #[case::underscore("a_b")]
    #[case::slash("a/b")]
    #[case::too_long(&"a".repeat(65))]
    fn rejects_invalid_slugs(#[case] input: &str) {
        assert!(matches!(
            PackageSlug::try_from(input),
            Err(MetadataError::InvalidSlug { .. })
        ));
    }

    #[test]
    fn slug_at_length_ceiling_is_valid() {
        assert!(PackageSlug::try_from("a".repeat(64).as_str()).is_ok());
    }

    #[rstest]
    #[case("1.0.0")]
    #[case("0.12.3-beta.1")]
    #[case("2.0.0+build.5")]
    #[case("2.0.0-rc-1+sha.abc")]
    fn accepts_semver(#[case] input: &str) {
        assert!(ReleaseVersion::try_from(input).is_ok());
    }

    #[rstest]
    #[case("1.0")]
    #[case("v1.0.0")]
    #[case("1.0.0-")]
    #[case("1.0.0+")]
    #[case("1.0.0-beta_1")]
    #[case("1..0")]
    fn rejects_non_semver(#[case] input: &str) {
        assert!(matches!(
            ReleaseVersion::try_from(input),
            Err(MetadataError::InvalidVersion { .. })
        ));
    }

    #[rstest]
    #[case("ab", true)]
    #[case("Acme-Labs", true)]
    #[case("a", false)]
    #[case("has space", false)]
    fn validates_handles(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(PublisherHandle::try_from(input).is_ok(), valid);
    }

    #[test]
    fn identifiers_deserialise_through_validation() {
        let slug: PackageSlug = serde_json::from_str("\"My-Skill\"").expect("deserialise");
        assert_eq!(slug.as_str(), "my-skill");
        assert!(serde_json::from_str::<ReleaseVersion>("\"nope\"").is_err());
    }
}
