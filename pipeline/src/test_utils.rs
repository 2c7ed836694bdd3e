//! Shared test utilities for the skillpack crate.
//!
//! [`TarballBuilder`] writes tar headers byte-for-byte, so tests can produce
//! the hostile archives (`../` paths, absolute paths, symlinks, devices) that
//! `tar::Builder`'s own path helpers refuse to emit.

use crate::archive::codec::ArchiveCodec;
use crate::storage::{PackageKey, PackageStore, StorageError, StorageLocator};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

const OLD_HEADER_NAME_LEN: usize = 100;

#[derive(Debug, Clone)]
struct RawEntry {
    path: String,
    entry_type: tar::EntryType,
    data: Vec<u8>,
    link: Option<String>,
    pax_sized: bool,
}

/// Builder for in-memory compressed tarballs with arbitrary header paths.
///
/// # Examples
///
/// ```
/// use skillpack::test_utils::TarballBuilder;
///
/// let bytes = TarballBuilder::gzip()
///     .file("SKILL.md", "hello")
///     .file("../../etc/passwd", "root")
///     .build();
/// assert!(!bytes.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct TarballBuilder {
    codec: ArchiveCodec,
    entries: Vec<RawEntry>,
}

impl TarballBuilder {
    /// Start a gzip-compressed tarball.
    #[must_use]
    pub fn gzip() -> Self {
        Self {
            codec: ArchiveCodec::Gzip,
            entries: Vec::new(),
        }
    }

    /// Start a zstd-compressed tarball.
    #[must_use]
    pub fn zstd() -> Self {
        Self {
            codec: ArchiveCodec::Zstd,
            entries: Vec::new(),
        }
    }

    /// Append a regular file.
    #[must_use]
    pub fn file(self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.entry(path, tar::EntryType::Regular, data.as_ref())
    }

    /// Append a directory entry.
    #[must_use]
    pub fn dir(self, path: &str) -> Self {
        self.entry(path, tar::EntryType::Directory, &[])
    }

    /// Append a symbolic link to `target`.
    #[must_use]
    pub fn symlink(self, path: &str, target: &str) -> Self {
        self.link(path, tar::EntryType::Symlink, target)
    }

    /// Append a hard link to `target`.
    #[must_use]
    pub fn hard_link(self, path: &str, target: &str) -> Self {
        self.link(path, tar::EntryType::Link, target)
    }

    /// Append a regular file whose ustar size field is zero and whose real
    /// size is carried by a preceding PAX `size` record.
    #[must_use]
    pub fn pax_sized_file(mut self, path: &str, data: impl AsRef<[u8]>) -> Self {
        self.entries.push(RawEntry {
            path: path.to_owned(),
            entry_type: tar::EntryType::Regular,
            data: data.as_ref().to_vec(),
            link: None,
            pax_sized: true,
        });
        self
    }

    /// Append an entry of any type with raw data.
    #[must_use]
    pub fn entry(mut self, path: &str, entry_type: tar::EntryType, data: &[u8]) -> Self {
        self.entries.push(RawEntry {
            path: path.to_owned(),
            entry_type,
            data: data.to_vec(),
            link: None,
            pax_sized: false,
        });
        self
    }

    fn link(mut self, path: &str, entry_type: tar::EntryType, target: &str) -> Self {
        self.entries.push(RawEntry {
            path: path.to_owned(),
            entry_type,
            data: Vec::new(),
            link: Some(target.to_owned()),
            pax_sized: false,
        });
        self
    }

    /// Encode the archive.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory encoders fail.
    #[must_use]
    #[expect(clippy::expect_used, reason = "test helper; encoding into memory cannot fail")]
    pub fn build(self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for raw in &self.entries {
            append_raw(&mut builder, raw).expect("append tar entry");
        }
        let tar_bytes = builder.into_inner().expect("finish tar stream");

        match self.codec {
            ArchiveCodec::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
                encoder.write_all(&tar_bytes).expect("gzip encode");
                encoder.finish().expect("gzip finish")
            }
            ArchiveCodec::Zstd => zstd::encode_all(tar_bytes.as_slice(), 0).expect("zstd encode"),
        }
    }

    /// Encode the archive and write it to `path`.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[expect(clippy::expect_used, reason = "test helper")]
    pub fn write_to(self, path: &Path) {
        std::fs::write(path, self.build()).expect("write tarball");
    }
}

fn append_raw(builder: &mut tar::Builder<Vec<u8>>, raw: &RawEntry) -> std::io::Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(raw.entry_type);
    if raw.pax_sized {
        append_pax_size(builder, raw.data.len())?;
        header.set_size(0);
    } else {
        header.set_size(raw.data.len() as u64);
    }
    header.set_mtime(0);
    header.set_mode(if raw.entry_type.is_dir() { 0o755 } else { 0o644 });

    if raw.path.len() > OLD_HEADER_NAME_LEN {
        // Long names need the GNU extension record, which only the checked
        // path helper emits.
        header.set_cksum();
        return builder.append_data(&mut header, &raw.path, raw.data.as_slice());
    }

    copy_into(&mut header.as_old_mut().name, &raw.path);
    if let Some(target) = &raw.link {
        copy_into(&mut header.as_old_mut().linkname, target);
    }
    header.set_cksum();
    builder.append(&header, raw.data.as_slice())
}

/// Emit a PAX extended header overriding the next entry's size.
fn append_pax_size(builder: &mut tar::Builder<Vec<u8>>, size: usize) -> std::io::Result<()> {
    let record = pax_record("size", &size.to_string());
    let mut header = tar::Header::new_ustar();
    header.set_entry_type(tar::EntryType::XHeader);
    header.set_size(record.len() as u64);
    header.set_mtime(0);
    header.set_mode(0o644);
    copy_into(&mut header.as_old_mut().name, "PaxHeaders/entry");
    header.set_cksum();
    builder.append(&header, record.as_bytes())
}

/// Format one `"<len> key=value\n"` record; `len` counts its own digits.
fn pax_record(key: &str, value: &str) -> String {
    let body = key.len() + value.len() + 3;
    let mut len = body + 1;
    while len != body + len.to_string().len() {
        len = body + len.to_string().len();
    }
    format!("{len} {key}={value}\n")
}

fn copy_into(field: &mut [u8], value: &str) {
    for (slot, byte) in field.iter_mut().zip(value.as_bytes()) {
        *slot = *byte;
    }
}

/// In-memory [`PackageStore`] keyed by locator.
#[derive(Debug, Default)]
pub struct MemoryPackageStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryPackageStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the bytes behind `locator`, simulating storage tampering.
    pub fn overwrite(&self, locator: &StorageLocator, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locator.as_str().to_owned(), bytes.to_vec());
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Return true when nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PackageStore for MemoryPackageStore {
    fn store(&self, key: &PackageKey, bytes: &[u8]) -> Result<StorageLocator, StorageError> {
        let locator = StorageLocator::new(key.object_path());
        self.overwrite(&locator, bytes);
        Ok(locator)
    }

    fn open(&self, locator: &StorageLocator) -> Result<Box<dyn Read>, StorageError> {
        let objects = self.objects.lock().unwrap_or_else(PoisonError::into_inner);
        let bytes = objects
            .get(locator.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                locator: locator.as_str().to_owned(),
            })?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}
