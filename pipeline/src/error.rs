//! Failure classification shared by the publish and install pipelines.
//!
//! Every pipeline error maps onto a [`FailureDisposition`] so callers can
//! decide whether to fix their input, retry later, report a tampering
//! incident, or simply make a different choice (another path, a force
//! flag).

use std::fmt;

/// What a caller should do about a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureDisposition {
    /// The input violates policy or is malformed; fix it and retry.
    FixInput,
    /// A collaborator (storage, network, disk) failed; retrying may help.
    Transient,
    /// Downloaded bytes do not match the recorded digest.
    PossibleTampering,
    /// The request conflicts with existing state; the caller may choose
    /// differently (overwrite, another version, another path).
    CallerChoice,
}

impl FailureDisposition {
    /// Process exit code used by the CLI for this disposition.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::FixInput => 2,
            Self::Transient => 3,
            Self::PossibleTampering => 4,
            Self::CallerChoice => 5,
        }
    }
}

impl fmt::Display for FailureDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hint = match self {
            Self::FixInput => "fix the input and retry",
            Self::Transient => "transient failure; retry later",
            Self::PossibleTampering => "possible tampering; report this release",
            Self::CallerChoice => "choose a different option and retry",
        };
        f.write_str(hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FailureDisposition::FixInput, 2)]
    #[case(FailureDisposition::Transient, 3)]
    #[case(FailureDisposition::PossibleTampering, 4)]
    #[case(FailureDisposition::CallerChoice, 5)]
    fn exit_codes_are_distinct(#[case] disposition: FailureDisposition, #[case] code: i32) {
        assert_eq!(disposition.exit_code(), code);
    }

    #[test]
    fn tampering_hint_mentions_reporting() {
        let hint = FailureDisposition::PossibleTampering.to_string();
        assert!(hint.contains("report"));
    }
}
