//! Locating the package document.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::archive::Archive;
use crate::error::{Diagnostic, Error, Result};
use crate::util::{attr_value, decode_document, local_name, strip_bom};

/// Path of the OCF container descriptor.
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Parse `META-INF/container.xml` and return the first root file path.
///
/// Returns `Ok(None)` for a well-formed container that declares no root file.
pub fn parse_container_xml(bytes: &[u8]) -> Result<Option<String>> {
    let content = decode_document(strip_bom(bytes));
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                let full_path = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref() == b"full-path")
                    .map(|attr| attr_value(&attr));
                if let Some(path) = full_path.filter(|p| !p.trim().is_empty()) {
                    return Ok(Some(path.trim().to_string()));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Find the package document's path inside `archive`.
///
/// The container descriptor is authoritative when it names an existing
/// entry. Otherwise each of `fallbacks` is tried in order. Problems with
/// the descriptor itself are pushed onto `diagnostics`.
pub fn locate(
    archive: &dyn Archive,
    fallbacks: &[String],
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<String> {
    if archive.has_entry(CONTAINER_PATH) {
        let declared = archive
            .read_bytes(CONTAINER_PATH)
            .and_then(|bytes| parse_container_xml(&bytes));

        let reason = match declared {
            Ok(Some(path)) => {
                let path = path.trim_start_matches('/').to_string();
                if archive.has_entry(&path) {
                    tracing::debug!(%path, "package located via container.xml");
                    return Ok(path);
                }
                format!("declared root file {path} is not in the archive")
            }
            Ok(None) => "no rootfile declared".to_string(),
            Err(e) => e.to_string(),
        };

        let diagnostic = Diagnostic::ContainerUnreadable { reason };
        diagnostic.emit();
        diagnostics.push(diagnostic);
    }

    fallbacks
        .iter()
        .find(|path| archive.has_entry(path))
        .map(|path| {
            tracing::debug!(%path, "package located via fallback path");
            path.clone()
        })
        .ok_or(Error::PackageNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::options::DEFAULT_PACKAGE_FALLBACKS;

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

    fn fallbacks() -> Vec<String> {
        DEFAULT_PACKAGE_FALLBACKS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_container_xml() {
        let result = parse_container_xml(CONTAINER.as_bytes()).unwrap();
        assert_eq!(result.as_deref(), Some("OEBPS/content.opf"));
    }

    #[test]
    fn test_parse_container_xml_with_bom_and_prefix() {
        let mut container = vec![0xEF, 0xBB, 0xBF];
        container.extend_from_slice(
            br#"<?xml version="1.0"?>
<ocf:container xmlns:ocf="urn:oasis:names:tc:opendocument:xmlns:container">
  <ocf:rootfiles>
    <ocf:rootfile full-path="content.opf"/>
    <ocf:rootfile full-path="second.opf"/>
  </ocf:rootfiles>
</ocf:container>"#,
        );

        let result = parse_container_xml(&container).unwrap();
        assert_eq!(result.as_deref(), Some("content.opf"));
    }

    #[test]
    fn test_parse_container_without_rootfile() {
        let result = parse_container_xml(b"<container><rootfiles/></container>").unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn test_locate_via_container() {
        let archive = MemoryArchive::new()
            .with_entry(CONTAINER_PATH, CONTAINER)
            .with_entry("OEBPS/content.opf", "<package/>")
            .with_entry("content.opf", "<package/>");
        let mut diagnostics = Vec::new();

        let path = locate(&archive, &fallbacks(), &mut diagnostics).unwrap();
        assert_eq!(path, "OEBPS/content.opf");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_locate_fallback_order() {
        let archive = MemoryArchive::new()
            .with_entry("EPUB/content.opf", "<package/>")
            .with_entry("content.opf", "<package/>");
        let mut diagnostics = Vec::new();

        let path = locate(&archive, &fallbacks(), &mut diagnostics).unwrap();
        assert_eq!(path, "content.opf");
    }

    #[test]
    fn test_locate_falls_back_when_declared_root_missing() {
        let archive = MemoryArchive::new()
            .with_entry(CONTAINER_PATH, CONTAINER)
            .with_entry("EPUB/content.opf", "<package/>");
        let mut diagnostics = Vec::new();

        let path = locate(&archive, &fallbacks(), &mut diagnostics).unwrap();
        assert_eq!(path, "EPUB/content.opf");
        assert!(matches!(
            diagnostics.as_slice(),
            [Diagnostic::ContainerUnreadable { .. }]
        ));
    }

    #[test]
    fn test_locate_falls_back_on_malformed_container() {
        let archive = MemoryArchive::new()
            .with_entry(CONTAINER_PATH, "<container><rootfiles></container>")
            .with_entry("OEBPS/content.opf", "<package/>");
        let mut diagnostics = Vec::new();

        let path = locate(&archive, &fallbacks(), &mut diagnostics).unwrap();
        assert_eq!(path, "OEBPS/content.opf");
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_locate_not_found() {
        let archive = MemoryArchive::new().with_entry("mimetype", "application/epub+zip");
        let mut diagnostics = Vec::new();

        assert!(matches!(
            locate(&archive, &fallbacks(), &mut diagnostics),
            Err(Error::PackageNotFound)
        ));
    }
}
