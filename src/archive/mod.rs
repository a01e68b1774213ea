//! Archive access for EPUB containers.
//!
//! The extractor only needs four things from an archive: does an entry
//! exist, read it as bytes, read it as text, and list entry names. The
//! [`Archive`] trait captures that, and [`ArchiveReader`] turns raw bytes
//! into an archive so callers can inject their own backend.

mod memory;
mod zip_archive;

pub use memory::MemoryArchive;
pub use zip_archive::{ZipArchiveReader, ZipReader};

use crate::error::Result;
use crate::util::decode_document;

/// Read-only, thread-safe view of an archive's entries.
///
/// Paths are archive-relative, `/`-separated, without a leading separator.
pub trait Archive: Send + Sync {
    /// Whether an entry with this exact path exists.
    fn has_entry(&self, path: &str) -> bool;

    /// Read an entry's raw bytes.
    ///
    /// Returns [`Error::EntryNotFound`](crate::Error::EntryNotFound) for
    /// missing entries.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>>;

    /// Read an entry as text, detecting its encoding.
    fn read_text(&self, path: &str) -> Result<String> {
        let bytes = self.read_bytes(path)?;
        Ok(decode_document(&bytes).into_owned())
    }

    /// All entry names, in archive order.
    fn entry_names(&self) -> Vec<String>;
}

/// Opens archive bytes into an [`Archive`].
pub trait ArchiveReader: Send + Sync {
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn Archive>>;
}
