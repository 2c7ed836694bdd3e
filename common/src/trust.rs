//! Trust scoring engine.
//!
//! Maps verifiable provenance signals to a bounded score, a tier label and
//! a per-rule breakdown. The computation is pure and order-independent: each
//! rule contributes a fixed number of points when its signal is present, the
//! sum is clamped to `0..=100`, and the tier is derived from the clamped
//! score.
//!
//! A declared licence identifier only counts as "present". It is never
//! checked against the SPDX licence list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Upper bound of the trust score.
const MAX_SCORE: u8 = 100;

/// Minimum score at which a package is considered trusted.
pub const TRUSTED_THRESHOLD: u8 = 50;

/// Provenance signals fed to [`compute_trust_score`].
///
/// String signals count as present when they are set and not blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustSignals {
    /// Licence identifier declared by the package manifest.
    pub license_spdx: Option<String>,
    /// Source repository URL declared by the package manifest.
    pub repo_url: Option<String>,
    /// Homepage URL declared by the package manifest.
    pub homepage_url: Option<String>,
    /// Whether the registry has verified the publisher.
    pub publisher_verified: bool,
    /// Whether the archive carries a `SKILL.md` manifest.
    #[serde(rename = "hasSkillMd")]
    pub has_manifest_file: bool,
    /// Whether the archive carries a `LICENSE` or `LICENSE.md` file.
    pub has_license_file: bool,
    /// Whether the release is cryptographically signed.
    pub signed_release: bool,
}

/// One row of the scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrustRule {
    /// A licence identifier is declared.
    #[serde(rename = "hasLicenseSpdx")]
    HasLicenseSpdx,
    /// A repository URL is declared.
    #[serde(rename = "hasRepoUrl")]
    HasRepoUrl,
    /// A homepage URL is declared.
    #[serde(rename = "hasHomepageUrl")]
    HasHomepageUrl,
    /// The publisher is verified.
    #[serde(rename = "publisherVerified")]
    PublisherVerified,
    /// The archive contains `SKILL.md`.
    #[serde(rename = "hasSkillMd")]
    HasSkillMd,
    /// The archive contains a licence file.
    #[serde(rename = "hasLicenseFile")]
    HasLicenseFile,
    /// The release is signed.
    #[serde(rename = "signedRelease")]
    SignedRelease,
}

impl TrustRule {
    /// Every rule, in breakdown order.
    pub const ALL: [Self; 7] = [
        Self::HasLicenseSpdx,
        Self::HasRepoUrl,
        Self::HasHomepageUrl,
        Self::PublisherVerified,
        Self::HasSkillMd,
        Self::HasLicenseFile,
        Self::SignedRelease,
    ];

    /// Points awarded when the rule's signal is present.
    #[must_use]
    pub const fn points(self) -> u8 {
        match self {
            Self::HasLicenseSpdx | Self::HasRepoUrl | Self::HasHomepageUrl => 10,
            Self::HasSkillMd | Self::HasLicenseFile => 15,
            Self::PublisherVerified | Self::SignedRelease => 20,
        }
    }

    /// The stable rule name used in serialised breakdowns.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HasLicenseSpdx => "hasLicenseSpdx",
            Self::HasRepoUrl => "hasRepoUrl",
            Self::HasHomepageUrl => "hasHomepageUrl",
            Self::PublisherVerified => "publisherVerified",
            Self::HasSkillMd => "hasSkillMd",
            Self::HasLicenseFile => "hasLicenseFile",
            Self::SignedRelease => "signedRelease",
        }
    }

    fn is_satisfied(self, signals: &TrustSignals) -> bool {
        match self {
            Self::HasLicenseSpdx => is_present(signals.license_spdx.as_deref()),
            Self::HasRepoUrl => is_present(signals.repo_url.as_deref()),
            Self::HasHomepageUrl => is_present(signals.homepage_url.as_deref()),
            Self::PublisherVerified => signals.publisher_verified,
            Self::HasSkillMd => signals.has_manifest_file,
            Self::HasLicenseFile => signals.has_license_file,
            Self::SignedRelease => signals.signed_release,
        }
    }
}

impl fmt::Display for TrustRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Coarse bucketing of the trust score.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TrustTier {
    /// Below the trusted threshold.
    #[default]
    Community,
    /// Score of at least 50.
    Bronze,
    /// Score of at least 65.
    Silver,
    /// Score of at least 80.
    Gold,
}

impl TrustTier {
    /// Derive the tier for a score.
    ///
    /// # Examples
    ///
    /// ```
    /// use skillpack_common::trust::TrustTier;
    ///
    /// assert_eq!(TrustTier::from_score(49), TrustTier::Community);
    /// assert_eq!(TrustTier::from_score(65), TrustTier::Silver);
    /// ```
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            80.. => Self::Gold,
            65.. => Self::Silver,
            50.. => Self::Bronze,
            _ => Self::Community,
        }
    }

    /// The lowercase tier label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Community => "community",
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
        }
    }
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auditable record of how a score was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustBreakdown {
    /// Points awarded per rule, zero for unmet rules.
    pub rules: BTreeMap<TrustRule, u8>,
    /// The clamped score.
    pub total: u8,
    /// The tier derived from `total`.
    pub tier: TrustTier,
    /// Whether `total` reaches [`TRUSTED_THRESHOLD`].
    pub trusted: bool,
}

/// Result of scoring one set of signals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustComputation {
    /// Score in `0..=100`.
    pub score: u8,
    /// Tier derived from the score.
    pub tier: TrustTier,
    /// Whether the score reaches [`TRUSTED_THRESHOLD`].
    pub trusted: bool,
    /// Per-rule breakdown.
    pub breakdown: TrustBreakdown,
}

/// Score a set of provenance signals.
///
/// # Examples
///
/// ```
/// use skillpack_common::trust::{TrustSignals, TrustTier, compute_trust_score};
///
/// let signals = TrustSignals {
///     license_spdx: Some("MIT".to_owned()),
///     has_manifest_file: true,
///     ..TrustSignals::default()
/// };
/// let computation = compute_trust_score(&signals);
/// assert_eq!(computation.score, 25);
/// assert_eq!(computation.tier, TrustTier::Community);
/// assert!(!computation.trusted);
/// ```
#[must_use]
pub fn compute_trust_score(signals: &TrustSignals) -> TrustComputation {
    let rules: BTreeMap<TrustRule, u8> = TrustRule::ALL
        .iter()
        .map(|rule| {
            let points = if rule.is_satisfied(signals) {
                rule.points()
            } else {
                0
            };
            (*rule, points)
        })
        .collect();

    let raw: u16 = rules.values().map(|points| u16::from(*points)).sum();
    let score = u8::try_from(raw.min(u16::from(MAX_SCORE))).unwrap_or(MAX_SCORE);
    let tier = TrustTier::from_score(score);
    let trusted = score >= TRUSTED_THRESHOLD;

    TrustComputation {
        score,
        tier,
        trusted,
        breakdown: TrustBreakdown {
            rules,
            total: score,
            tier,
            trusted,
        },
    }
}

#[cfg(test)]
#[path = "trust_tests.rs"]
mod tests;
