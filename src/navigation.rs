//! Chapter titles from the navigation document.
//!
//! Both the EPUB 2 NCX and the EPUB 3 XHTML navigation document are reduced
//! to a flat list of (referenced path, label) pairs. Titles are matched to
//! chapters by path, never by position: navigation documents routinely
//! skip spine items (cover, copyright page) or list them out of order.

use std::collections::HashMap;

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};

use crate::archive::Archive;
use crate::chapter::{Chapter, TitleSource};
use crate::dom::{Selector, parse_html};
use crate::error::{Diagnostic, Result};
use crate::package::{NavigationKind, NavigationRef};
use crate::path::{parent_dir, percent_decode, resolve as resolve_path, strip_fragment};
use crate::util::{attr_value, normalize_whitespace, resolve_entity};

const NCX_NAMESPACE: &[u8] = b"http://www.daisy.org/z3986/2005/ncx/";

/// One labelled pointer from a navigation document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEntry {
    /// The reference as written in the navigation document.
    pub referenced_path: String,
    /// Label text, whitespace collapsed.
    pub title: String,
}

/// Lookup from referenced document to title.
///
/// Each entry is keyed twice: by its href as declared (fragment removed),
/// and by the archive path it resolves to from the navigation document's
/// directory. When several entries point at one document, the first wins.
#[derive(Debug, Clone, Default)]
pub struct NavigationTitles {
    by_href: HashMap<String, String>,
    by_path: HashMap<String, String>,
}

impl NavigationTitles {
    /// Build the lookup from entries of the navigation document at `nav_path`.
    pub fn from_entries(nav_path: &str, entries: Vec<NavigationEntry>) -> Self {
        let nav_dir = parent_dir(nav_path);
        let mut titles = Self::default();

        for entry in entries {
            let href = strip_fragment(&entry.referenced_path);
            if href.is_empty() {
                continue;
            }
            let path = resolve_path(nav_dir, &percent_decode(href));
            titles
                .by_path
                .entry(path)
                .or_insert_with(|| entry.title.clone());
            titles.by_href.entry(href.to_string()).or_insert(entry.title);
        }

        titles
    }

    /// Title for a chapter, matched by declared href first, then by
    /// resolved archive path.
    pub fn lookup(&self, chapter: &Chapter) -> Option<&str> {
        self.by_href
            .get(strip_fragment(&chapter.source_href))
            .or_else(|| self.by_path.get(chapter.archive_path()))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_href.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_href.is_empty()
    }

    /// Give every matching chapter its navigation title.
    ///
    /// Returns the number of chapters whose title changed.
    pub fn apply(&self, chapters: &mut [Chapter]) -> usize {
        let mut applied = 0;
        for chapter in chapters.iter_mut() {
            if let Some(title) = self.lookup(chapter).map(str::to_owned)
                && chapter.offer_title(&title, TitleSource::Navigation)
            {
                applied += 1;
            }
        }
        applied
    }
}

/// Read the navigation document and build its title lookup.
///
/// Never fails: a missing or unparsable document yields an empty lookup and
/// a diagnostic.
pub fn resolve(
    archive: &dyn Archive,
    nav: &NavigationRef,
    diagnostics: &mut Vec<Diagnostic>,
) -> NavigationTitles {
    if !archive.has_entry(&nav.path) {
        let diagnostic = Diagnostic::NavigationMissing {
            path: nav.path.clone(),
        };
        diagnostic.emit();
        diagnostics.push(diagnostic);
        return NavigationTitles::default();
    }

    let entries = archive.read_text(&nav.path).and_then(|content| match nav.kind {
        NavigationKind::Ncx => parse_ncx(&content),
        NavigationKind::Xhtml => parse_nav_document(&content),
    });

    match entries {
        Ok(entries) => {
            tracing::debug!(path = %nav.path, entries = entries.len(), "parsed navigation document");
            NavigationTitles::from_entries(&nav.path, entries)
        }
        Err(e) => {
            let diagnostic = Diagnostic::NavigationUnreadable {
                path: nav.path.clone(),
                reason: e.to_string(),
            };
            diagnostic.emit();
            diagnostics.push(diagnostic);
            NavigationTitles::default()
        }
    }
}

fn is_ncx_namespace(ns: &ResolveResult<'_>) -> bool {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => *uri == NCX_NAMESPACE,
        ResolveResult::Unbound => true,
        ResolveResult::Unknown(_) => false,
    }
}

#[derive(Default)]
struct PendingPoint {
    label: String,
    src: Option<String>,
}

/// Parse an NCX document into its navigation points, in document order.
///
/// Nested points are flattened; points without a label or a `content@src`
/// are skipped.
pub fn parse_ncx(content: &str) -> Result<Vec<NavigationEntry>> {
    let mut reader = NsReader::from_str(content);

    // Points are recorded when opened so nesting keeps document order
    let mut points: Vec<PendingPoint> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut label_depth = 0usize;
    let mut in_text = false;

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let in_ncx = is_ncx_namespace(&ns);

        match event {
            Event::Start(e) if in_ncx => match e.local_name().as_ref() {
                b"navPoint" => {
                    open.push(points.len());
                    points.push(PendingPoint::default());
                }
                b"navLabel" if !open.is_empty() => label_depth += 1,
                b"text" if label_depth > 0 => in_text = true,
                b"content" => set_src(&mut points, &open, &e),
                _ => {}
            },
            Event::Empty(e) if in_ncx && e.local_name().as_ref() == b"content" => {
                set_src(&mut points, &open, &e);
            }
            Event::Text(e) if in_text => {
                push_label(&mut points, &open, &String::from_utf8_lossy(e.as_ref()));
            }
            Event::CData(e) if in_text => {
                push_label(&mut points, &open, &String::from_utf8_lossy(&e));
            }
            Event::GeneralRef(e) if in_text => {
                if let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref())) {
                    push_label(&mut points, &open, &resolved);
                }
            }
            Event::End(e) if in_ncx => match e.local_name().as_ref() {
                b"navPoint" => {
                    open.pop();
                }
                b"navLabel" => label_depth = label_depth.saturating_sub(1),
                b"text" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(points
        .into_iter()
        .filter_map(|point| {
            let title = normalize_whitespace(&point.label);
            let src = point.src?.trim().to_string();
            (!title.is_empty() && !src.is_empty()).then_some(NavigationEntry {
                referenced_path: src,
                title,
            })
        })
        .collect())
}

fn set_src(points: &mut [PendingPoint], open: &[usize], e: &BytesStart<'_>) {
    let Some(point) = open.last().and_then(|&idx| points.get_mut(idx)) else {
        return;
    };
    if point.src.is_some() {
        return;
    }
    point.src = e
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"src")
        .map(|a| attr_value(&a));
}

fn push_label(points: &mut [PendingPoint], open: &[usize], text: &str) {
    if let Some(point) = open.last().and_then(|&idx| points.get_mut(idx)) {
        point.label.push_str(text);
    }
}

/// Parse an EPUB 3 navigation document.
///
/// Links inside the `toc` nav are used; when no nav is typed `toc`, links
/// in the first nav are used instead. The document is parsed leniently as
/// HTML, so this only fails on an invalid built-in selector.
pub fn parse_nav_document(content: &str) -> Result<Vec<NavigationEntry>> {
    let dom = parse_html(content);
    let toc_links = Selector::parse(r#"nav[epub\:type~="toc"] a[href]"#)?;
    let any_nav = Selector::parse("nav")?;
    let links = Selector::parse("a[href]")?;

    let mut anchors: Vec<_> = dom.select_all(&toc_links).collect();
    if anchors.is_empty()
        && let Some(nav) = dom.select_first(&any_nav)
    {
        anchors = dom
            .select_all(&links)
            .filter(|&a| dom.ancestors(a).any(|id| id == nav))
            .collect();
    }

    Ok(anchors
        .into_iter()
        .filter_map(|a| {
            let href = dom.get_attr(a, "href")?.trim().to_string();
            let title = normalize_whitespace(&dom.text_content(a));
            (!href.is_empty() && !title.is_empty()).then_some(NavigationEntry {
                referenced_path: href,
                title,
            })
        })
        .collect())
}
