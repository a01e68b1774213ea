//! Archive-internal path resolution.
//!
//! Paths inside an EPUB are `/`-separated and relative to the archive root.
//! References found in documents (manifest hrefs, NCX `src`, links) are
//! relative to the directory of the document that contains them.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Combine a base directory with a reference and normalize the result.
///
/// A reference starting with `/` is archive-absolute and the base is
/// ignored. Otherwise each reference segment is applied to the base: `..`
/// pops a segment (never below the root), `.` is skipped, anything else is
/// appended. The base is normalized the same way.
///
/// ```
/// use epub_chapters::path::resolve;
///
/// assert_eq!(resolve("OEBPS/text/", "../images/cover.jpg"), "OEBPS/images/cover.jpg");
/// assert_eq!(resolve("OEBPS", "/toc.ncx"), "toc.ncx");
/// ```
pub fn resolve(base: &str, reference: &str) -> String {
    if let Some(absolute) = reference.strip_prefix('/') {
        return resolve("", absolute);
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(reference.split('/')) {
        match segment {
            ".." => {
                segments.pop();
            }
            "." | "" => {}
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Directory part of an archive path ("OEBPS/content.opf" -> "OEBPS").
///
/// Top-level files have an empty parent.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Drop a `#fragment` or `?query` suffix from an href.
pub fn strip_fragment(href: &str) -> &str {
    match href.find(['#', '?']) {
        Some(idx) => &href[..idx],
        None => href,
    }
}

/// Percent-decode an href ("chapter%201.xhtml" -> "chapter 1.xhtml").
///
/// Invalid UTF-8 after decoding leaves the input untouched.
pub fn percent_decode(href: &str) -> Cow<'_, str> {
    if !href.contains('%') {
        return Cow::Borrowed(href);
    }
    match percent_decode_str(href).decode_utf8() {
        Ok(decoded) => decoded,
        Err(_) => Cow::Borrowed(href),
    }
}
