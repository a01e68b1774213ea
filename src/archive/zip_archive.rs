//! ZIP-backed archive.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use zip::ZipArchive;

use super::{Archive, ArchiveReader};
use crate::error::{Error, Result};

/// Upper bound on the buffer reserved from an entry's declared size.
const MAX_PREALLOC: u64 = 1 << 20;

/// Opens EPUB bytes with the `zip` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipReader;

impl ArchiveReader for ZipReader {
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn Archive>> {
        Ok(Box::new(ZipArchiveReader::from_bytes(bytes)?))
    }
}

/// A ZIP archive held in memory.
///
/// The central directory is scanned once on open. Each read works on a
/// clone of the archive handle (shared metadata, shared bytes, private
/// cursor), so reads from several threads never contend.
pub struct ZipArchiveReader {
    zip: ZipArchive<Cursor<Arc<[u8]>>>,

    /// Normalized entry path -> index in the central directory.
    index: HashMap<String, usize>,

    /// Entry paths in central directory order.
    names: Vec<String>,
}

impl ZipArchiveReader {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let data: Arc<[u8]> = Arc::from(bytes);
        let mut zip = ZipArchive::new(Cursor::new(data))?;

        let mut index = HashMap::with_capacity(zip.len());
        let mut names = Vec::with_capacity(zip.len());

        for i in 0..zip.len() {
            let file = zip.by_index_raw(i)?;
            if file.is_dir() {
                continue;
            }
            // Some tools write Windows separators
            let name = file.name().replace('\\', "/");
            if index.insert(name.clone(), i).is_none() {
                names.push(name);
            }
        }

        let archive = Self { zip, index, names };
        tracing::debug!(entries = archive.len(), "opened zip archive");
        Ok(archive)
    }

    /// Number of file entries.
    pub(crate) fn len(&self) -> usize {
        self.names.len()
    }
}

impl Archive for ZipArchiveReader {
    fn has_entry(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let idx = *self
            .index
            .get(path)
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))?;

        let mut zip = self.zip.clone();
        let mut file = zip.by_index(idx)?;
        // The declared size comes from the archive and may be forged
        let mut out = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut out)?;
        Ok(out)
    }

    fn entry_names(&self) -> Vec<String> {
        self.names.clone()
    }
}
