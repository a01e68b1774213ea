use std::collections::BTreeMap;

use super::Archive;
use crate::error::{Error, Result};

/// An archive whose entries live in a map.
///
/// Handy for tests and for callers that already unpacked an EPUB.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any existing one at the same path.
    pub fn insert(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), data.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_entry(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.entries.remove(path)
    }
}

impl Archive for MemoryArchive {
    fn has_entry(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| Error::EntryNotFound(path.to_string()))
    }

    fn entry_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries() {
        let mut archive = MemoryArchive::new()
            .with_entry("b.xhtml", "<p>b</p>")
            .with_entry("a.xhtml", "<p>a</p>");

        assert!(archive.has_entry("a.xhtml"));
        assert_eq!(archive.read_text("b.xhtml").unwrap(), "<p>b</p>");
        assert_eq!(archive.entry_names(), vec!["a.xhtml", "b.xhtml"]);

        assert!(archive.remove("a.xhtml").is_some());
        assert!(matches!(
            archive.read_bytes("a.xhtml"),
            Err(Error::EntryNotFound(_))
        ));
    }
}
