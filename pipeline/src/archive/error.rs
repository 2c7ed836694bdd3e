//! Error types for archive inspection, validation, and extraction.
//!
//! Policy violations always name the offending entry so the publisher can
//! fix the archive.

use super::entry::EntryKind;
use crate::error::FailureDisposition;
use thiserror::Error;

/// A rejected archive entry path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path is absolute (leading `/` or a drive prefix).
    #[error("absolute archive entry path: {path}")]
    Absolute {
        /// The offending entry path.
        path: String,
    },

    /// A segment of the path is `..`.
    #[error("archive entry path traversal: {path}")]
    Traversal {
        /// The offending entry path.
        path: String,
    },

    /// The normalised path is longer than the policy allows.
    #[error("archive entry path too long ({len} > {max}): {path}")]
    TooLong {
        /// The offending entry path.
        path: String,
        /// Length of the normalised path in characters.
        len: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// The path has more segments than the policy allows.
    #[error("archive entry path too deep ({depth} > {max}): {path}")]
    TooDeep {
        /// The offending entry path.
        path: String,
        /// Number of non-empty segments.
        depth: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// Writing the entry would pass through a symlink inside the
    /// destination directory.
    #[error("archive entry would be written through a symlink: {path}")]
    ThroughSymlink {
        /// The offending entry path.
        path: String,
    },
}

impl PathError {
    /// The entry path that was rejected.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Absolute { path }
            | Self::Traversal { path }
            | Self::TooLong { path, .. }
            | Self::TooDeep { path, .. }
            | Self::ThroughSymlink { path } => path,
        }
    }
}

/// Errors arising while reading or extracting an archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The container could not be opened or decoded.
    #[error("archive could not be decoded: {reason}")]
    Format {
        /// Description of the decoding failure.
        reason: String,
    },

    /// An entry path violates the path rule.
    #[error("unsafe archive entry path: {0}")]
    UnsafePath(#[from] PathError),

    /// An entry type outside the allow-list was found.
    #[error("unsupported archive entry type {kind} ({path})")]
    UnsupportedEntryType {
        /// The offending entry path.
        path: String,
        /// The rejected entry type.
        kind: EntryKind,
    },

    /// The archive holds more regular files than the policy allows.
    #[error("archive has too many files: {count} > {max} (at {path})")]
    TooManyFiles {
        /// Running file count when the ceiling was crossed.
        count: usize,
        /// Configured ceiling.
        max: usize,
        /// The entry that crossed the ceiling.
        path: String,
    },

    /// The cumulative declared size exceeds the policy ceiling.
    #[error("archive uncompressed size exceeds limit: {total} > {max} bytes (at {path})")]
    ArchiveTooLarge {
        /// Running declared size when the ceiling was crossed.
        total: u64,
        /// Configured ceiling in bytes.
        max: u64,
        /// The entry that crossed the ceiling.
        path: String,
    },

    /// A filesystem operation outside the archive stream failed.
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// The entry responsible for a policy violation, when known.
    #[must_use]
    pub fn offending_entry(&self) -> Option<&str> {
        match self {
            Self::UnsafePath(err) => Some(err.path()),
            Self::UnsupportedEntryType { path, .. }
            | Self::TooManyFiles { path, .. }
            | Self::ArchiveTooLarge { path, .. } => Some(path),
            Self::Format { .. } | Self::Io(_) => None,
        }
    }

    /// Return true for violations of the archive safety policy.
    #[must_use]
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Self::UnsafePath(_)
                | Self::UnsupportedEntryType { .. }
                | Self::TooManyFiles { .. }
                | Self::ArchiveTooLarge { .. }
        )
    }

    /// How a caller should react to this error.
    #[must_use]
    pub fn disposition(&self) -> FailureDisposition {
        match self {
            Self::Io(_) => FailureDisposition::Transient,
            _ => FailureDisposition::FixInput,
        }
    }

    pub(crate) fn format(err: impl std::fmt::Display) -> Self {
        Self::Format {
            reason: err.to_string(),
        }
    }
}
