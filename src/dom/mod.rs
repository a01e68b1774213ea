//! HTML parsing and CSS selector queries for chapter documents.
//!
//! Chapter documents are parsed with html5ever into an arena [`Dom`], which
//! the `selectors` crate can match against through [`MatchTarget`].
//!
//! ```
//! use epub_chapters::dom::{parse_html, Selector};
//!
//! let dom = parse_html("<body><p class='chapter-title'>One</p></body>");
//! let selector = Selector::parse(r#"[class*="title"]"#).unwrap();
//! let p = dom.select_first(&selector).unwrap();
//! assert_eq!(dom.text_content(p), "One");
//! ```

mod arena;
mod matching;
mod tree_sink;

pub use arena::{Attribute, Dom, Node, NodeData, NodeId};
pub use matching::{HeadingSelectors, MatchTarget};

use std::borrow::Cow;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use selectors::context::{MatchingContext, SelectorCaches};
use selectors::matching::{MatchingForInvalidation, MatchingMode, NeedsSelectorFlags};

use crate::error::{Error, Result};
use tree_sink::DomSink;

/// Elements the HTML tree builder closes on its own.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Parse markup leniently into a [`Dom`].
///
/// XHTML `<name/>` tags are honored even for non-void elements, so an
/// empty `<title/>` or `<script src=".."/>` does not swallow the body.
pub fn parse_html(html: &str) -> Dom {
    let html = expand_self_closing(html);
    parse_document(DomSink::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_dom()
}

/// Rewrite `<name .../>` as `<name ...></name>` unless `name` is void.
///
/// The HTML tree builder ignores the trailing slash, which leaves raw-text
/// elements like `title` and `script` open to the end of the document.
fn expand_self_closing(markup: &str) -> Cow<'_, str> {
    if !markup.contains("/>") {
        return Cow::Borrowed(markup);
    }

    let bytes = markup.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut pos = 0;

    while let Some(offset) = markup[pos..].find('<') {
        let start = pos + offset;
        let rest = &markup[start..];
        if rest.starts_with("<!--") {
            pos = rest.find("-->").map_or(markup.len(), |end| start + end + 3);
            continue;
        }
        if !rest.as_bytes().get(1).is_some_and(u8::is_ascii_alphabetic) {
            pos = start + 1;
            continue;
        }

        let name_len = rest[1..]
            .bytes()
            .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.'))
            .count();
        let Some(end) = tag_end(bytes, start + 1 + name_len) else {
            break;
        };
        pos = end + 1;

        let name = &rest[1..1 + name_len];
        if bytes[end - 1] != b'/' || VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name)) {
            continue;
        }
        if out.is_empty() {
            out.reserve(markup.len() + 64);
        }
        out.push_str(&markup[copied..end - 1]);
        out.push_str("></");
        out.push_str(name);
        out.push('>');
        copied = end + 1;
    }

    if copied == 0 {
        return Cow::Borrowed(markup);
    }
    out.push_str(&markup[copied..]);
    Cow::Owned(out)
}

/// Index of the `>` ending a tag whose attributes start at `from`.
/// Quoted attribute values may contain `>`.
fn tag_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i),
            None => {}
        }
    }
    None
}

/// A compiled CSS selector.
#[derive(Debug, Clone)]
pub struct Selector {
    inner: selectors::parser::Selector<HeadingSelectors>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let mut input = cssparser::ParserInput::new(source);
        let mut parser = cssparser::Parser::new(&mut input);
        let inner = selectors::parser::Selector::parse(&HeadingSelectors, &mut parser)
            .map_err(|e| Error::InvalidSelector(format!("{source}: {:?}", e.kind)))?;
        Ok(Self { inner })
    }

    pub fn matches(&self, element: MatchTarget<'_>) -> bool {
        let mut caches = SelectorCaches::default();
        let mut context = MatchingContext::new(
            MatchingMode::Normal,
            None,
            &mut caches,
            selectors::context::QuirksMode::NoQuirks,
            NeedsSelectorFlags::No,
            MatchingForInvalidation::No,
        );
        selectors::matching::matches_selector(&self.inner, 0, None, &element, &mut context)
    }
}

impl Dom {
    /// First element matching `selector`, in document order.
    pub fn select_first(&self, selector: &Selector) -> Option<NodeId> {
        self.elements()
            .find(|&id| selector.matches(MatchTarget::new(self, id)))
    }

    /// All elements matching `selector`, in document order.
    pub fn select_all<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = NodeId> + 'a {
        self.elements()
            .filter(move |&id| selector.matches(MatchTarget::new(self, id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(s: &str) -> Selector {
        Selector::parse(s).unwrap()
    }

    fn matches(dom: &Dom, tag: &str, selector: &str) -> bool {
        let id = dom.find_by_tag(tag).unwrap();
        sel(selector).matches(MatchTarget::new(dom, id))
    }

    #[test]
    fn test_tag_selector() {
        let dom = parse_html("<div><p>Hello</p></div>");
        assert!(matches(&dom, "p", "p"));
        assert!(!matches(&dom, "p", "div"));
    }

    #[test]
    fn test_class_selector() {
        let dom = parse_html(r#"<p class="intro highlight">Hello</p>"#);
        assert!(matches(&dom, "p", ".intro"));
        assert!(matches(&dom, "p", "p.highlight"));
        assert!(!matches(&dom, "p", ".missing"));
    }

    #[test]
    fn test_attribute_substring_selector_is_case_sensitive() {
        let dom = parse_html(r#"<div class="ChapterTitle">One</div>"#);
        assert!(!matches(&dom, "div", r#"[class*="title"]"#));
        assert!(matches(&dom, "div", r#"[class*="Title"]"#));
    }

    #[test]
    fn test_id_and_descendant_selectors() {
        let dom = parse_html(r#"<div><span><p id="main">Hello</p></span></div>"#);
        assert!(matches(&dom, "p", "#main"));
        assert!(matches(&dom, "p", "div p"));
        assert!(matches(&dom, "p", "span > p"));
        assert!(!matches(&dom, "p", "div > p"));
    }

    #[test]
    fn test_select_first_uses_document_order() {
        let dom = parse_html("<h2>Second level</h2><section><h2>Nested</h2></section>");
        let first = dom.select_first(&sel("h2")).unwrap();
        assert_eq!(dom.text_content(first), "Second level");
        assert_eq!(dom.select_all(&sel("h2")).count(), 2);
        assert!(dom.select_first(&sel("h1")).is_none());
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            Selector::parse("h1["),
            Err(Error::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_expand_self_closing() {
        assert_eq!(
            expand_self_closing(r#"<title/><script src="a.js" /><p>x</p>"#),
            r#"<title></title><script src="a.js" ></script><p>x</p>"#
        );
        assert_eq!(
            expand_self_closing(r#"<p>a<br/>b<img src="i.png"/></p>"#),
            r#"<p>a<br/>b<img src="i.png"/></p>"#
        );
        assert_eq!(
            expand_self_closing(r#"<a title="1/>2"/><!-- <b/> -->"#),
            r#"<a title="1/>2"></a><!-- <b/> -->"#
        );
        assert!(matches!(expand_self_closing("<p>plain</p>"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_self_closing_raw_text_elements_keep_body() {
        for head in [
            "<title/>",
            r#"<script type="text/javascript" src="a.js"/>"#,
            "<style/>",
            "<textarea/>",
        ] {
            let dom = parse_html(&format!(
                "<html><head>{head}</head><body><h1>Real Heading</h1></body></html>"
            ));
            let h1 = dom.select_first(&sel("h1")).unwrap();
            assert_eq!(dom.text_content(h1), "Real Heading", "after {head}");
        }
    }

    #[test]
    fn test_self_closing_non_void_is_empty() {
        let dom = parse_html(r#"<body><div class="a"/><p>After</p></body>"#);
        let div = dom.find_by_tag("div").unwrap();
        assert_eq!(dom.children(div).count(), 0);
        assert!(matches(&dom, "p", "div + p"));
    }
}
