//! Unit tests for the trust scoring engine.

use super::*;
use rstest::rstest;

fn all_signals() -> TrustSignals {
    TrustSignals {
        license_spdx: Some("MIT".to_owned()),
        repo_url: Some("https://example.test/repo".to_owned()),
        homepage_url: Some("https://example.test".to_owned()),
        publisher_verified: true,
        has_manifest_file: true,
        has_license_file: true,
        signed_release: true,
    }
}

/// Clear exactly one signal identified by its rule.
fn without(rule: TrustRule) -> TrustSignals {
    let mut signals = all_signals();
    match rule {
        TrustRule::HasLicenseSpdx => signals.license_spdx = None,
        TrustRule::HasRepoUrl => signals.repo_url = None,
        TrustRule::HasHomepageUrl => signals.homepage_url = None,
        TrustRule::PublisherVerified => signals.publisher_verified = false,
        TrustRule::HasSkillMd => signals.has_manifest_file = false,
        TrustRule::HasLicenseFile => signals.has_license_file = false,
        TrustRule::SignedRelease => signals.signed_release = false,
    }
    signals
}

#[test]
fn no_signals_scores_zero() {
    let computation = compute_trust_score(&TrustSignals::default());
    assert_eq!(computation.score, 0);
    assert_eq!(computation.tier, TrustTier::Community);
    assert!(!computation.trusted);
    assert!(computation.breakdown.rules.values().all(|points| *points == 0));
}

#[test]
fn every_signal_scores_the_ceiling() {
    // Raw sum is exactly 100.
    let computation = compute_trust_score(&all_signals());
    assert_eq!(computation.score, 100);
    assert_eq!(computation.tier, TrustTier::Gold);
    assert!(computation.trusted);
}

#[test]
fn partial_provenance_reaches_silver() {
    let signals = TrustSignals {
        license_spdx: Some("MIT".to_owned()),
        repo_url: Some("https://example.test/repo".to_owned()),
        homepage_url: Some("https://example.test".to_owned()),
        publisher_verified: true,
        has_manifest_file: true,
        has_license_file: false,
        signed_release: false,
    };
    let computation = compute_trust_score(&signals);
    assert_eq!(computation.score, 65);
    assert_eq!(computation.tier, TrustTier::Silver);
    assert!(computation.trusted);
}

#[rstest]
#[case(0, TrustTier::Community)]
#[case(49, TrustTier::Community)]
#[case(50, TrustTier::Bronze)]
#[case(64, TrustTier::Bronze)]
#[case(65, TrustTier::Silver)]
#[case(79, TrustTier::Silver)]
#[case(80, TrustTier::Gold)]
#[case(100, TrustTier::Gold)]
fn tier_boundaries_are_exact(#[case] score: u8, #[case] expected: TrustTier) {
    assert_eq!(TrustTier::from_score(score), expected);
}

#[test]
fn score_equals_sum_of_breakdown() {
    let computation = compute_trust_score(&without(TrustRule::SignedRelease));
    let sum: u16 = computation
        .breakdown
        .rules
        .values()
        .map(|p| u16::from(*p))
        .sum();
    assert_eq!(u16::from(computation.score), sum);
    assert_eq!(computation.breakdown.total, computation.score);
    assert_eq!(computation.breakdown.tier, computation.tier);
}

#[test]
fn each_signal_strictly_increases_the_score() {
    let full = compute_trust_score(&all_signals()).score;
    for rule in TrustRule::ALL {
        let reduced = compute_trust_score(&without(rule)).score;
        assert_eq!(
            full - reduced,
            rule.points(),
            "rule {rule} should contribute {} points",
            rule.points()
        );
    }
}

#[test]
fn blank_strings_do_not_count_as_present() {
    let signals = TrustSignals {
        license_spdx: Some("   ".to_owned()),
        repo_url: Some(String::new()),
        ..TrustSignals::default()
    };
    assert_eq!(compute_trust_score(&signals).score, 0);
}

#[test]
fn computation_is_deterministic() {
    let signals = without(TrustRule::HasHomepageUrl);
    assert_eq!(compute_trust_score(&signals), compute_trust_score(&signals));
}

#[test]
fn breakdown_serialises_with_rule_names() {
    let computation = compute_trust_score(&without(TrustRule::PublisherVerified));
    let json = serde_json::to_value(&computation).expect("serialise computation");
    assert_eq!(json["tier"], "gold");
    assert_eq!(json["breakdown"]["rules"]["hasSkillMd"], 15);
    assert_eq!(json["breakdown"]["rules"]["publisherVerified"], 0);
    assert_eq!(json["breakdown"]["total"], 80);
}
