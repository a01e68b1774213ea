//! The chapter model.

/// Media type reported for chapter documents.
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// Which resolution tier produced a chapter's title.
///
/// Variants are ordered by precedence: a title from a higher tier is never
/// replaced by one from a lower tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TitleSource {
    /// Synthesized `"Chapter N"`.
    Placeholder,
    /// Heading found in the chapter document itself.
    Document,
    /// `title` attribute on the manifest item.
    Manifest,
    /// Label of a navigation document entry.
    Navigation,
}

/// One spine-ordered reading unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    id: String,
    archive_path: String,
    pub(crate) source_href: String,
    media_type: String,
    title: String,
    title_source: TitleSource,
}

impl Chapter {
    /// A chapter titled with the placeholder for `index` (0-based).
    pub(crate) fn new(
        id: impl Into<String>,
        archive_path: impl Into<String>,
        source_href: impl Into<String>,
        media_type: impl Into<String>,
        index: usize,
    ) -> Self {
        Self {
            id: id.into(),
            archive_path: archive_path.into(),
            source_href: source_href.into(),
            media_type: media_type.into(),
            title: placeholder_title(index),
            title_source: TitleSource::Placeholder,
        }
    }

    /// Manifest identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Normalized path of the chapter document inside the archive.
    pub fn archive_path(&self) -> &str {
        &self.archive_path
    }

    /// Media type declared in the manifest (may be empty).
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn title_source(&self) -> TitleSource {
        self.title_source
    }

    pub fn has_placeholder_title(&self) -> bool {
        self.title_source == TitleSource::Placeholder
    }

    /// Set the title if `source` outranks the current one.
    ///
    /// Blank titles are ignored. Returns whether the title changed.
    pub(crate) fn offer_title(&mut self, title: &str, source: TitleSource) -> bool {
        let title = title.trim();
        if title.is_empty() || source <= self.title_source {
            return false;
        }
        self.title = title.to_string();
        self.title_source = source;
        true
    }
}

/// Title used when no tier produced one: `"Chapter <index + 1>"`.
pub fn placeholder_title(index: usize) -> String {
    format!("Chapter {}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter() -> Chapter {
        Chapter::new("c1", "OEBPS/c1.xhtml", "c1.xhtml", XHTML_MEDIA_TYPE, 0)
    }

    #[test]
    fn test_placeholder() {
        let ch = chapter();
        assert_eq!(ch.title(), "Chapter 1");
        assert!(ch.has_placeholder_title());
        assert_eq!(placeholder_title(9), "Chapter 10");
    }

    #[test]
    fn test_higher_tier_replaces_lower() {
        let mut ch = chapter();
        assert!(ch.offer_title("From Manifest", TitleSource::Manifest));
        assert!(ch.offer_title("From Nav", TitleSource::Navigation));
        assert_eq!(ch.title(), "From Nav");
        assert_eq!(ch.title_source(), TitleSource::Navigation);
    }

    #[test]
    fn test_lower_tier_never_replaces_higher() {
        let mut ch = chapter();
        ch.offer_title("From Nav", TitleSource::Navigation);
        assert!(!ch.offer_title("Heading", TitleSource::Document));
        assert!(!ch.offer_title("Manifest", TitleSource::Manifest));
        assert!(!ch.offer_title("Second nav", TitleSource::Navigation));
        assert_eq!(ch.title(), "From Nav");
    }

    #[test]
    fn test_blank_titles_ignored() {
        let mut ch = chapter();
        assert!(!ch.offer_title("   ", TitleSource::Navigation));
        assert_eq!(ch.title(), "Chapter 1");
    }
}
