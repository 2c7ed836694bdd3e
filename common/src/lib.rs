//! Shared primitives for the skillpack registry: content digests and the
//! trust scoring engine.
//!
//! Both the publish pipeline and the offline manifest review tooling score
//! packages through [`trust::compute_trust_score`], so the rule table lives
//! here exactly once.

pub mod digest;
pub mod trust;

pub use digest::{DigestError, Sha256Digest, digest_bytes, digest_file, digest_reader};
pub use trust::{
    TRUSTED_THRESHOLD, TrustBreakdown, TrustComputation, TrustRule, TrustSignals, TrustTier,
    compute_trust_score,
};
