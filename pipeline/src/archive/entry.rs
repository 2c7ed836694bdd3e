//! Archive entry metadata as seen by the safety policy.

use super::error::ArchiveError;
use serde::Serialize;
use std::fmt;
use std::io::Read;

/// Classification of a tar entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    /// A regular file (including the pre-POSIX "old file" type).
    File,
    /// A directory.
    Directory,
    /// A hard link to another entry.
    HardLink,
    /// A symbolic link.
    Symlink,
    /// A contiguous file, treated as a regular file.
    Contiguous,
    /// Anything else: devices, FIFOs, global headers, sparse files.
    Other(u8),
}

impl EntryKind {
    /// Classify a tar header entry type.
    #[must_use]
    pub fn from_tar(entry_type: tar::EntryType) -> Self {
        if entry_type.is_file() {
            Self::File
        } else if entry_type.is_dir() {
            Self::Directory
        } else if entry_type.is_hard_link() {
            Self::HardLink
        } else if entry_type.is_symlink() {
            Self::Symlink
        } else if entry_type.is_contiguous() {
            Self::Contiguous
        } else {
            Self::Other(entry_type.as_byte())
        }
    }

    /// Return true for entries whose content is written as a regular file.
    #[must_use]
    pub const fn is_file(self) -> bool {
        matches!(self, Self::File | Self::Contiguous)
    }

    /// Return true for entry types in the extraction allow-list.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::File | Self::Contiguous | Self::Directory)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Directory => f.write_str("directory"),
            Self::HardLink => f.write_str("hard link"),
            Self::Symlink => f.write_str("symlink"),
            Self::Contiguous => f.write_str("contiguous file"),
            Self::Other(byte) => write!(f, "type {:?}", char::from(*byte)),
        }
    }
}

/// One logical record inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Normalised entry path: forward slashes, no leading `./`.
    pub path: String,
    /// Entry type.
    pub kind: EntryKind,
    /// Size of the entry body, after any PAX `size` override.
    pub declared_size: u64,
}

impl ArchiveEntry {
    /// Build an entry from a raw header path.
    ///
    /// # Examples
    ///
    /// ```
    /// use skillpack::archive::entry::{ArchiveEntry, EntryKind};
    ///
    /// let entry = ArchiveEntry::new(".\\docs\\SKILL.md", EntryKind::File, 5);
    /// assert_eq!(entry.path, "docs/SKILL.md");
    /// ```
    #[must_use]
    pub fn new(raw_path: &str, kind: EntryKind, declared_size: u64) -> Self {
        Self {
            path: normalise_path(raw_path),
            kind,
            declared_size,
        }
    }

    /// Read the metadata of a streamed tar entry without touching its data.
    ///
    /// The declared size is the one `tar` reads the entry body with, so a
    /// PAX `size` record overrides the ustar header field.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Format`] when the header size field cannot be
    /// parsed.
    pub(crate) fn from_tar<R: Read>(entry: &tar::Entry<'_, R>) -> Result<Self, ArchiveError> {
        let raw = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
        let header = entry.header();
        header.size().map_err(ArchiveError::format)?;
        Ok(Self::new(
            &raw,
            EntryKind::from_tar(header.entry_type()),
            entry.size(),
        ))
    }

    /// Return true when the path denotes the archive root (`./` or empty).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.path.is_empty() || self.path == "." || self.path == "/"
    }
}

/// Convert backslashes to forward slashes and strip leading `./`.
#[must_use]
pub fn normalise_path(raw: &str) -> String {
    let converted = raw.replace('\\', "/");
    let mut rest = converted.as_str();
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    rest.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("SKILL.md", "SKILL.md")]
    #[case::dot_slash("./SKILL.md", "SKILL.md")]
    #[case::repeated_dot_slash("././docs/a.md", "docs/a.md")]
    #[case::backslashes("docs\\nested\\a.md", "docs/nested/a.md")]
    #[case::dot_backslash(".\\LICENSE", "LICENSE")]
    #[case::root("./", "")]
    fn normalises_paths(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalise_path(raw), expected);
    }

    #[test]
    fn absolute_paths_keep_their_leading_slash() {
        assert_eq!(normalise_path("/etc/passwd"), "/etc/passwd");
        assert_eq!(normalise_path("\\etc\\passwd"), "/etc/passwd");
    }

    #[rstest]
    #[case(tar::EntryType::Regular, EntryKind::File)]
    #[case(tar::EntryType::Directory, EntryKind::Directory)]
    #[case(tar::EntryType::Link, EntryKind::HardLink)]
    #[case(tar::EntryType::Symlink, EntryKind::Symlink)]
    #[case(tar::EntryType::Continuous, EntryKind::Contiguous)]
    #[case(tar::EntryType::Fifo, EntryKind::Other(b'6'))]
    #[case(tar::EntryType::Char, EntryKind::Other(b'3'))]
    fn classifies_tar_entry_types(#[case] entry_type: tar::EntryType, #[case] expected: EntryKind) {
        assert_eq!(EntryKind::from_tar(entry_type), expected);
    }

    #[test]
    fn old_style_regular_files_are_files() {
        assert_eq!(EntryKind::from_tar(tar::EntryType::new(0)), EntryKind::File);
    }

    #[test]
    fn only_files_and_directories_are_allowed() {
        assert!(EntryKind::File.is_allowed());
        assert!(EntryKind::Contiguous.is_allowed());
        assert!(EntryKind::Directory.is_allowed());
        assert!(!EntryKind::Symlink.is_allowed());
        assert!(!EntryKind::HardLink.is_allowed());
        assert!(!EntryKind::Other(b'3').is_allowed());
    }
}
