//! Shared helpers: in-memory EPUB construction and an archive that records reads.

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::sync::Arc;

use epub_chapters::{Archive, ArchiveReader, Error, Result, ZipReader};
use parking_lot::Mutex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const CONTAINER_XML_PATH: &str = "META-INF/container.xml";

/// Builds EPUB bytes entry by entry.
pub struct EpubBuilder {
    entries: Vec<(String, Vec<u8>)>,
}

impl EpubBuilder {
    /// A builder holding only the `mimetype` entry.
    pub fn new() -> Self {
        Self {
            entries: vec![("mimetype".into(), b"application/epub+zip".to_vec())],
        }
    }

    /// Add a container descriptor pointing at `rootfile`.
    pub fn container(self, rootfile: &str) -> Self {
        self.file(CONTAINER_XML_PATH, container_xml(rootfile))
    }

    pub fn file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.entries.push((path.to_string(), content.into()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in &self.entries {
            let method = if name == "mimetype" {
                CompressionMethod::Stored
            } else {
                CompressionMethod::Deflated
            };
            let options = SimpleFileOptions::default().compression_method(method);
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }
}

pub fn container_xml(rootfile: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{rootfile}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
    )
}

/// A manifest entry: id, href, and extra attributes written verbatim.
pub struct Item<'a> {
    pub id: &'a str,
    pub href: &'a str,
    pub media_type: &'a str,
    pub extra: &'a str,
}

pub fn xhtml_item<'a>(id: &'a str, href: &'a str) -> Item<'a> {
    Item {
        id,
        href,
        media_type: "application/xhtml+xml",
        extra: "",
    }
}

pub fn ncx_item<'a>(id: &'a str, href: &'a str) -> Item<'a> {
    Item {
        id,
        href,
        media_type: "application/x-dtbncx+xml",
        extra: "",
    }
}

/// An OPF package with the given manifest and spine.
pub fn package_opf(title: &str, items: &[Item<'_>], spine: &[&str], toc: Option<&str>) -> String {
    let manifest: String = items
        .iter()
        .map(|i| {
            format!(
                "    <item id=\"{}\" href=\"{}\" media-type=\"{}\" {}/>\n",
                i.id, i.href, i.media_type, i.extra
            )
        })
        .collect();
    let itemrefs: String = spine
        .iter()
        .map(|id| format!("    <itemref idref=\"{id}\"/>\n"))
        .collect();
    let toc_attr = toc.map(|t| format!(" toc=\"{t}\"")).unwrap_or_default();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:test</dc:identifier>
    <dc:title>{title}</dc:title>
  </metadata>
  <manifest>
{manifest}  </manifest>
  <spine{toc_attr}>
{itemrefs}  </spine>
</package>"#
    )
}

/// An NCX with one flat navPoint per (label, src).
pub fn ncx(points: &[(&str, &str)]) -> String {
    let nav_points: String = points
        .iter()
        .enumerate()
        .map(|(i, (label, src))| {
            format!(
                "    <navPoint id=\"np{i}\" playOrder=\"{}\">\n      <navLabel><text>{label}</text></navLabel>\n      <content src=\"{src}\"/>\n    </navPoint>\n",
                i + 1
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:test"/></head>
  <docTitle><text>Test Book</text></docTitle>
  <navMap>
{nav_points}  </navMap>
</ncx>"#
    )
}

/// An EPUB 3 navigation document with a `toc` nav.
pub fn nav_xhtml(links: &[(&str, &str)]) -> String {
    let items: String = links
        .iter()
        .map(|(label, href)| format!("      <li><a href=\"{href}\">{label}</a></li>\n"))
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<head><title>Contents</title></head>
<body>
  <nav epub:type="toc" id="toc">
    <ol>
{items}    </ol>
  </nav>
</body>
</html>"#
    )
}

/// An XHTML chapter document with the given body markup.
pub fn chapter_xhtml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Document title</title></head>
<body>
{body}
</body>
</html>"#
    )
}

/// Read log shared between a [`SpyReader`] and the test.
#[derive(Clone, Default)]
pub struct ReadLog {
    reads: Arc<Mutex<Vec<String>>>,
    hidden: Arc<Mutex<HashSet<String>>>,
}

impl ReadLog {
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().clone()
    }

    pub fn was_read(&self, path: &str) -> bool {
        self.reads.lock().iter().any(|p| p == path)
    }

    pub fn clear(&self) {
        self.reads.lock().clear();
    }

    /// Make `path` disappear from the archive from now on.
    pub fn hide(&self, path: &str) {
        self.hidden.lock().insert(path.to_string());
    }
}

/// Opens archives with the ZIP backend and records every entry read.
pub struct SpyReader {
    pub log: ReadLog,
}

impl ArchiveReader for SpyReader {
    fn open(&self, bytes: Vec<u8>) -> Result<Box<dyn Archive>> {
        Ok(Box::new(SpyArchive {
            inner: ZipReader.open(bytes)?,
            log: self.log.clone(),
        }))
    }
}

struct SpyArchive {
    inner: Box<dyn Archive>,
    log: ReadLog,
}

impl Archive for SpyArchive {
    fn has_entry(&self, path: &str) -> bool {
        !self.log.hidden.lock().contains(path) && self.inner.has_entry(path)
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>> {
        if self.log.hidden.lock().contains(path) {
            return Err(Error::EntryNotFound(path.to_string()));
        }
        self.log.reads.lock().push(path.to_string());
        self.inner.read_bytes(path)
    }

    fn entry_names(&self) -> Vec<String> {
        let hidden = self.log.hidden.lock();
        self.inner
            .entry_names()
            .into_iter()
            .filter(|name| !hidden.contains(name))
            .collect()
    }
}

/// Install a test subscriber so `RUST_LOG` shows pipeline logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
