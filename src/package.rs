//! Package document (OPF) parsing: manifest, spine and navigation reference.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::archive::Archive;
use crate::chapter::{Chapter, TitleSource};
use crate::error::{Diagnostic, Error, Result};
use crate::options::ExtractorOptions;
use crate::path::{parent_dir, percent_decode, resolve};
use crate::util::{attr_value, local_name, normalize_whitespace, resolve_entity};

const NCX_MEDIA_TYPE: &str = "application/x-dtbncx+xml";

/// One `<item>` of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    /// The href exactly as declared, relative to the package document.
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
    pub title: Option<String>,
}

impl ManifestItem {
    fn has_property(&self, property: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == property))
    }
}

/// Raw contents of a package document.
#[derive(Debug, Clone, Default)]
pub struct PackageDocument {
    /// `dc:title` from the metadata section.
    pub title: Option<String>,
    /// Manifest items in document order.
    pub items: Vec<ManifestItem>,
    /// `idref`s of the spine, in reading order.
    pub spine_ids: Vec<String>,
    /// `toc` attribute of the spine (id of the NCX item).
    pub spine_toc: Option<String>,
}

impl PackageDocument {
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// Flavour of navigation document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// EPUB 2 NCX (DAISY navMap).
    Ncx,
    /// EPUB 3 XHTML navigation document.
    Xhtml,
}

/// Where the navigation document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRef {
    pub path: String,
    pub kind: NavigationKind,
}

/// Result of parsing the package: chapters in spine order plus the
/// navigation document to consult for titles.
#[derive(Debug, Clone)]
pub struct PackageInfo {
    pub chapters: Vec<Chapter>,
    pub navigation: Option<NavigationRef>,
    pub title: Option<String>,
}

/// Parse the package document at `package_path` into the chapter list.
///
/// Spine entries whose manifest item is unknown, or whose document is not
/// in the archive, are dropped and reported through `diagnostics`.
pub fn parse(
    archive: &dyn Archive,
    package_path: &str,
    options: &ExtractorOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<PackageInfo> {
    let content = archive.read_text(package_path)?;
    let package = parse_opf(&content)?;
    let base = parent_dir(package_path);

    let navigation = find_navigation(&package, &options.ncx_id).map(|(item, kind)| NavigationRef {
        path: resolve_href(archive, base, &item.href),
        kind,
    });

    let mut chapters: Vec<Chapter> = Vec::with_capacity(package.spine_ids.len());
    let mut by_id: HashMap<&str, &ManifestItem> = HashMap::with_capacity(package.items.len());
    for item in &package.items {
        by_id.entry(item.id.as_str()).or_insert(item);
    }

    for idref in &package.spine_ids {
        let Some(item) = by_id.get(idref.as_str()) else {
            let diagnostic = Diagnostic::MissingManifestItem {
                idref: idref.clone(),
            };
            diagnostic.emit();
            diagnostics.push(diagnostic);
            continue;
        };

        let archive_path = resolve_href(archive, base, &item.href);
        if !archive.has_entry(&archive_path) {
            let diagnostic = Diagnostic::MissingChapterEntry {
                id: item.id.clone(),
                path: archive_path,
            };
            diagnostic.emit();
            diagnostics.push(diagnostic);
            continue;
        }

        let mut chapter = Chapter::new(
            &item.id,
            archive_path,
            &item.href,
            &item.media_type,
            chapters.len(),
        );
        if let Some(title) = &item.title {
            chapter.offer_title(title, TitleSource::Manifest);
        }
        chapters.push(chapter);
    }

    tracing::debug!(
        package = package_path,
        spine = package.spine_ids.len(),
        chapters = chapters.len(),
        navigation = ?navigation.as_ref().map(|n| n.path.as_str()),
        "parsed package document"
    );

    Ok(PackageInfo {
        chapters,
        navigation,
        title: package.title,
    })
}

/// Resolve a manifest href to an archive path.
///
/// Hrefs are URL-encoded; the decoded path is preferred, but a literal path
/// that exists in the archive wins over a decoded one that does not.
fn resolve_href(archive: &dyn Archive, base: &str, href: &str) -> String {
    let decoded = resolve(base, &percent_decode(href));
    if archive.has_entry(&decoded) {
        return decoded;
    }
    let literal = resolve(base, href);
    if archive.has_entry(&literal) {
        literal
    } else {
        decoded
    }
}

/// Pick the navigation document: NCX by conventional id, by `spine@toc`,
/// by media type, then the EPUB 3 `nav` item.
fn find_navigation<'a>(
    package: &'a PackageDocument,
    ncx_id: &str,
) -> Option<(&'a ManifestItem, NavigationKind)> {
    let ncx = package
        .item(ncx_id)
        .or_else(|| package.spine_toc.as_deref().and_then(|id| package.item(id)))
        .or_else(|| package.items.iter().find(|i| i.media_type == NCX_MEDIA_TYPE));
    if let Some(item) = ncx {
        return Some((item, NavigationKind::Ncx));
    }

    package
        .items
        .iter()
        .find(|i| i.has_property("nav"))
        .map(|item| (item, NavigationKind::Xhtml))
}

/// Parse an OPF package document.
pub fn parse_opf(content: &str) -> Result<PackageDocument> {
    let mut reader = Reader::from_str(content);

    let mut package = PackageDocument::default();
    let mut saw_package = false;
    let mut in_metadata = false;
    let mut in_manifest = false;
    let mut in_spine = false;
    let mut title_text: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                match local_name(e.name().as_ref()) {
                    b"package" => saw_package = true,
                    b"metadata" => in_metadata = true,
                    b"manifest" => in_manifest = true,
                    b"spine" => {
                        in_spine = true;
                        package.spine_toc = attr(&e, b"toc");
                    }
                    b"title" if in_metadata && package.title.is_none() => {
                        title_text = Some(String::new());
                    }
                    b"item" if in_manifest => package.items.extend(manifest_item(&e)),
                    b"itemref" if in_spine => package.spine_ids.extend(attr(&e, b"idref")),
                    _ => {}
                }
            }
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"package" => saw_package = true,
                b"spine" => package.spine_toc = attr(&e, b"toc"),
                b"item" if in_manifest => package.items.extend(manifest_item(&e)),
                b"itemref" if in_spine => package.spine_ids.extend(attr(&e, b"idref")),
                _ => {}
            },
            Event::Text(e) => {
                if let Some(text) = title_text.as_mut() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if let Some(text) = title_text.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::GeneralRef(e) => {
                if let Some(text) = title_text.as_mut()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    text.push_str(&resolved);
                }
            }
            Event::End(e) => match local_name(e.name().as_ref()) {
                b"metadata" => in_metadata = false,
                b"manifest" => in_manifest = false,
                b"spine" => in_spine = false,
                b"title" => {
                    if let Some(text) = title_text.take() {
                        let text = normalize_whitespace(&text);
                        if !text.is_empty() {
                            package.title = Some(text);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_package {
        return Err(Error::InvalidPackage("missing <package> root element".into()));
    }

    Ok(package)
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .map(|a| attr_value(&a))
}

fn manifest_item(e: &BytesStart<'_>) -> Option<ManifestItem> {
    let mut item = ManifestItem::default();
    for a in e.attributes().flatten() {
        let value = attr_value(&a);
        match a.key.as_ref() {
            b"id" => item.id = value,
            b"href" => item.href = value,
            b"media-type" => item.media_type = value,
            b"properties" => item.properties = Some(value),
            b"title" => {
                let title = normalize_whitespace(&value);
                if !title.is_empty() {
                    item.title = Some(title);
                }
            }
            _ => {}
        }
    }
    (!item.id.is_empty() && !item.href.is_empty()).then_some(item)
}
