//! Text helpers shared by the XML and HTML readers.

use std::borrow::Cow;

use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::attributes::Attribute;

/// Decode document bytes to text.
///
/// Valid UTF-8 (with or without BOM) is borrowed as is. Anything else is
/// decoded with the `declared` encoding when it is a known, non-UTF-8
/// label, and as Windows-1252 otherwise.
pub fn decode_text<'a>(bytes: &'a [u8], declared: Option<&str>) -> Cow<'a, str> {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text;
    }

    let fallback = declared
        .and_then(|label| encoding_rs::Encoding::for_label(label.trim().as_bytes()))
        .filter(|encoding| *encoding != encoding_rs::UTF_8)
        .unwrap_or(encoding_rs::WINDOWS_1252);
    tracing::trace!(encoding = fallback.name(), "decoding non-UTF-8 document");
    fallback.decode(bytes).0
}

/// Decode a markup document, falling back to the encoding its XML
/// declaration names.
pub fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// The `encoding` pseudo-attribute of a leading XML declaration.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let head = strip_bom(&bytes[..bytes.len().min(256)]);
    let decl = head.strip_prefix(b"<?xml")?;
    let decl = &decl[..decl.windows(2).position(|w| w == b"?>")?];

    let at = decl.windows(8).position(|w| w == b"encoding")?;
    let value = decl[at + 8..]
        .trim_ascii_start()
        .strip_prefix(b"=")?
        .trim_ascii_start();
    let (&quote, value) = value.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = value.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&value[..end]).ok()
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Collapse every whitespace run to a single space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
pub fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Text of a named entity: the XML predefined set plus `nbsp`, which
/// XHTML content uses without declaring it.
pub fn named_entity(name: &str) -> Option<&'static str> {
    match name {
        "nbsp" => Some("\u{a0}"),
        _ => resolve_xml_entity(name),
    }
}

/// Resolve an XML entity reference name ("amp", "#8217", "#x2019").
pub fn resolve_entity(entity: &str) -> Option<String> {
    if let Some(text) = named_entity(entity) {
        return Some(text.to_string());
    }

    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}

/// Attribute value with entity references expanded.
///
/// A value quick-xml refuses to unescape (a bare `&`, an unknown entity) is
/// returned as written.
pub fn attr_value(attr: &Attribute<'_>) -> String {
    attr.unescape_value_with(named_entity)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned())
}
