//! Skill archive handling.
//!
//! Everything that touches the bytes of an untrusted tarball lives here:
//! codec detection, the shared safety policy, read-only inspection, safe
//! extraction, and packing a local directory for publication.

pub mod codec;
pub mod entry;
pub mod error;
pub mod extract;
pub mod inspect;
pub mod pack;
pub mod policy;

pub use entry::{ArchiveEntry, EntryKind};
pub use error::{ArchiveError, PathError};
pub use extract::{ArchiveExtractor, ExtractionReport, TarballExtractor};
pub use inspect::{InspectionEvidence, inspect};
pub use pack::{PackError, pack_directory};
pub use policy::{ArchiveLimits, ArchiveScan, ArchiveSummary, validate_archive, validate_path};
