//! Packaging of a local skill directory into a publishable tarball.
//!
//! Produces a gzip-compressed tar whose entries are rooted at `./`, in
//! sorted order with zeroed timestamps, so packing the same tree twice
//! yields identical bytes and therefore the same digest.

use super::inspect::MANIFEST_FILE_NAME;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors arising from packing a skill directory.
#[derive(Debug, Error)]
pub enum PackError {
    /// An I/O operation failed while walking or reading the directory.
    #[error("I/O error during packing: {0}")]
    Io(#[from] std::io::Error),

    /// The directory does not exist or is not a directory.
    #[error("publish directory does not exist: {}", .dir.display())]
    NotADirectory {
        /// The rejected directory.
        dir: PathBuf,
    },

    /// `SKILL.md` is missing from the directory root.
    #[error("SKILL.md not found in {}", .dir.display())]
    MissingManifest {
        /// The directory that was searched.
        dir: PathBuf,
    },
}

/// Pack `dir` into an in-memory `.tgz`.
///
/// Symlinks are skipped; only regular files and directories are packed.
///
/// # Errors
///
/// Returns [`PackError::NotADirectory`] if `dir` is not a directory,
/// [`PackError::MissingManifest`] if it has no top-level `SKILL.md`, or
/// [`PackError::Io`] on read failures.
pub fn pack_directory(dir: &Path) -> Result<Vec<u8>, PackError> {
    if !dir.is_dir() {
        return Err(PackError::NotADirectory {
            dir: dir.to_path_buf(),
        });
    }
    if !has_root_manifest(dir)? {
        return Err(PackError::MissingManifest {
            dir: dir.to_path_buf(),
        });
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    append_dir_header(&mut builder, "./")?;
    append_tree(&mut builder, dir, "./")?;
    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

fn has_root_manifest(dir: &Path) -> Result<bool, PackError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if name.to_string_lossy().eq_ignore_ascii_case(MANIFEST_FILE_NAME)
            && entry.file_type()?.is_file()
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn append_tree(
    builder: &mut tar::Builder<GzEncoder<Vec<u8>>>,
    dir: &Path,
    prefix: &str,
) -> Result<(), PackError> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let file_type = entry.file_type()?;
        let name = format!("{prefix}{}", entry.file_name().to_string_lossy());
        if file_type.is_dir() {
            let dir_name = format!("{name}/");
            append_dir_header(builder, &dir_name)?;
            append_tree(builder, &entry.path(), &dir_name)?;
        } else if file_type.is_file() {
            let data = fs::read(entry.path())?;
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(0);
            builder.append_data(&mut header, &name, data.as_slice())?;
        }
    }
    Ok(())
}

fn append_dir_header(
    builder: &mut tar::Builder<GzEncoder<Vec<u8>>>,
    name: &str,
) -> Result<(), PackError> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_size(0);
    header.set_mode(0o755);
    header.set_mtime(0);
    builder.append_data(&mut header, name, std::io::empty())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::inspect::inspect;
    use crate::archive::policy::ArchiveLimits;

    fn skill_dir() -> tempfile::TempDir {
        let temp = tempfile::tempdir().expect("temp dir");
        fs::write(temp.path().join("SKILL.md"), "# Demo").expect("write manifest");
        fs::write(temp.path().join("LICENSE"), "MIT").expect("write licence");
        fs::create_dir_all(temp.path().join("scripts")).expect("mkdir");
        fs::write(temp.path().join("scripts/run.sh"), "echo hi").expect("write script");
        temp
    }

    #[test]
    fn packed_directory_inspects_cleanly() {
        let dir = skill_dir();
        let bytes = pack_directory(dir.path()).expect("pack");

        let out = tempfile::tempdir().expect("temp dir");
        let archive = out.path().join("skill.tgz");
        fs::write(&archive, bytes).expect("write archive");
        let evidence = inspect(&archive, &ArchiveLimits::default()).expect("inspect");

        assert_eq!(evidence.manifest_text.as_deref(), Some("# Demo"));
        assert!(evidence.has_license_file);
        assert_eq!(evidence.file_count, 3);
    }

    #[test]
    fn packing_is_deterministic() {
        let dir = skill_dir();
        let first = pack_directory(dir.path()).expect("pack");
        let second = pack_directory(dir.path()).expect("pack");
        assert_eq!(first, second);
    }

    #[test]
    fn missing_manifest_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir");
        fs::write(temp.path().join("README.md"), "no manifest").expect("write");
        assert!(matches!(
            pack_directory(temp.path()),
            Err(PackError::MissingManifest { .. })
        ));
    }

    #[test]
    fn missing_directory_is_rejected() {
        let temp = tempfile::tempdir().expect("temp dir");
        assert!(matches!(
            pack_directory(&temp.path().join("absent")),
            Err(PackError::NotADirectory { .. })
        ));
    }
}
