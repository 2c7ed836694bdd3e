//! Compression detection for skill archives.
//!
//! Archives are tarballs compressed with gzip (the default produced by the
//! publish command) or zstd. The codec is chosen from the leading magic
//! bytes, never from the file name.

use super::error::ArchiveError;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Supported archive compression formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveCodec {
    /// gzip-compressed tar (`.tgz`).
    Gzip,
    /// zstd-compressed tar (`.tar.zst`).
    Zstd,
}

impl ArchiveCodec {
    /// Identify the codec from the first bytes of an archive.
    ///
    /// # Examples
    ///
    /// ```
    /// use skillpack::archive::codec::ArchiveCodec;
    ///
    /// assert_eq!(ArchiveCodec::detect(&[0x1f, 0x8b, 0x08]), Some(ArchiveCodec::Gzip));
    /// assert_eq!(ArchiveCodec::detect(b"plain text"), None);
    /// ```
    #[must_use]
    pub fn detect(prefix: &[u8]) -> Option<Self> {
        if prefix.starts_with(&GZIP_MAGIC) {
            Some(Self::Gzip)
        } else if prefix.starts_with(&ZSTD_MAGIC) {
            Some(Self::Zstd)
        } else {
            None
        }
    }
}

/// Open `path` as a streaming tar archive, decompressing on the fly.
///
/// # Errors
///
/// Returns [`ArchiveError::Io`] if the file cannot be opened and
/// [`ArchiveError::Format`] if the compression format is not recognised.
pub(crate) fn open_archive(path: &Path) -> Result<tar::Archive<Box<dyn Read>>, ArchiveError> {
    let mut file = File::open(path)?;
    let mut prefix = [0u8; 4];
    let read = read_prefix(&mut file, &mut prefix)?;
    file.seek(SeekFrom::Start(0))?;

    let codec = ArchiveCodec::detect(prefix.get(..read).unwrap_or_default())
        .ok_or_else(|| ArchiveError::format("unrecognised compression (expected gzip or zstd)"))?;

    let reader: Box<dyn Read> = match codec {
        ArchiveCodec::Gzip => Box::new(flate2::read::GzDecoder::new(BufReader::new(file))),
        ArchiveCodec::Zstd => Box::new(zstd::Decoder::new(file).map_err(ArchiveError::format)?),
    };
    Ok(tar::Archive::new(reader))
}

/// Fill as much of `buf` as the file allows.
fn read_prefix(file: &mut File, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let Some(rest) = buf.get_mut(filled..) else {
            break;
        };
        match file.read(rest)? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
