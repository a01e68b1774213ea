//! Extractor configuration.

/// Package paths tried when `META-INF/container.xml` is missing or unusable.
pub const DEFAULT_PACKAGE_FALLBACKS: &[&str] = &[
    "OEBPS/content.opf",
    "content.opf",
    "EPUB/content.opf",
    "OPS/content.opf",
];

/// Manifest id conventionally given to the NCX document.
pub const DEFAULT_NCX_ID: &str = "ncx";

/// Selectors tried, in order, to find a heading in a chapter document.
pub const DEFAULT_TITLE_SELECTORS: &[&str] =
    &["h1", "h2", r#"[class*="title"]"#, r#"[class*="Title"]"#, "h3"];

/// Headings shorter than this (in characters) are treated as noise.
pub const DEFAULT_MIN_TITLE_CHARS: usize = 2;

/// Options controlling how chapters and titles are resolved.
///
/// ```
/// use epub_chapters::ExtractorOptions;
///
/// let options = ExtractorOptions::default()
///     .with_package_fallback("book/package.opf")
///     .with_title_parallelism(2);
/// assert_eq!(options.title_parallelism, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorOptions {
    /// Package paths tried, in order, when the container descriptor fails.
    pub package_fallbacks: Vec<String>,
    /// Manifest id of the NCX document.
    pub ncx_id: String,
    /// Heading selectors, highest priority first.
    pub title_selectors: Vec<String>,
    /// Minimum character count for an extracted heading.
    pub min_title_chars: usize,
    /// Upper bound on concurrent heading extractions.
    pub title_parallelism: usize,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            package_fallbacks: DEFAULT_PACKAGE_FALLBACKS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ncx_id: DEFAULT_NCX_ID.to_string(),
            title_selectors: DEFAULT_TITLE_SELECTORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_title_chars: DEFAULT_MIN_TITLE_CHARS,
            title_parallelism: default_parallelism(),
        }
    }
}

impl ExtractorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a package path to try after the existing fallbacks.
    pub fn with_package_fallback(mut self, path: impl Into<String>) -> Self {
        self.package_fallbacks.push(path.into());
        self
    }

    pub fn with_package_fallbacks<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.package_fallbacks = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ncx_id(mut self, id: impl Into<String>) -> Self {
        self.ncx_id = id.into();
        self
    }

    pub fn with_title_selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.title_selectors = selectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_min_title_chars(mut self, chars: usize) -> Self {
        self.min_title_chars = chars;
        self
    }

    /// Zero is treated as one.
    pub fn with_title_parallelism(mut self, threads: usize) -> Self {
        self.title_parallelism = threads.max(1);
        self
    }
}

// Cap the pool: chapter documents are small and parsing is quick
fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ExtractorOptions::default();
        assert_eq!(options.package_fallbacks[0], "OEBPS/content.opf");
        assert_eq!(options.package_fallbacks[1], "content.opf");
        assert_eq!(options.package_fallbacks[2], "EPUB/content.opf");
        assert_eq!(options.ncx_id, "ncx");
        assert_eq!(options.title_selectors.first().map(String::as_str), Some("h1"));
        assert_eq!(options.title_selectors.last().map(String::as_str), Some("h3"));
        assert_eq!(options.min_title_chars, 2);
        assert!(options.title_parallelism >= 1);
    }

    #[test]
    fn test_builders() {
        let options = ExtractorOptions::new()
            .with_package_fallbacks(["book.opf"])
            .with_package_fallback("alt/book.opf")
            .with_ncx_id("toc")
            .with_min_title_chars(4)
            .with_title_parallelism(0);

        assert_eq!(options.package_fallbacks, vec!["book.opf", "alt/book.opf"]);
        assert_eq!(options.ncx_id, "toc");
        assert_eq!(options.min_title_chars, 4);
        assert_eq!(options.title_parallelism, 1);
    }
}
