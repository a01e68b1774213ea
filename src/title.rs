//! Heading extraction for chapters the package and navigation left untitled.

use rayon::prelude::*;

use crate::archive::Archive;
use crate::chapter::{Chapter, TitleSource};
use crate::dom::{Selector, parse_html};
use crate::error::{Diagnostic, Result};
use crate::options::ExtractorOptions;
use crate::util::normalize_whitespace;

/// Ordered heading selectors with a minimum accepted length.
#[derive(Debug, Clone)]
pub struct TitleSelectors {
    selectors: Vec<Selector>,
    min_chars: usize,
}

impl TitleSelectors {
    /// Compile the selectors named in `options`.
    ///
    /// Fails with [`Error::InvalidSelector`](crate::Error::InvalidSelector)
    /// on the first selector that does not parse.
    pub fn from_options(options: &ExtractorOptions) -> Result<Self> {
        let selectors = options
            .title_selectors
            .iter()
            .map(|s| Selector::parse(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            selectors,
            min_chars: options.min_title_chars,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// First acceptable heading in `html`.
    ///
    /// Selectors are tried in order. A selector whose first match is shorter
    /// than the minimum does not end the search; the next selector is tried.
    pub fn find_title(&self, html: &str) -> Option<String> {
        let dom = parse_html(html);
        self.selectors.iter().find_map(|selector| {
            let node = dom.select_first(selector)?;
            let text = normalize_whitespace(&dom.text_content(node));
            (text.chars().count() >= self.min_chars).then_some(text)
        })
    }
}

/// Read the chapter document at `path` and look for a heading.
pub fn extract_title(
    archive: &dyn Archive,
    path: &str,
    selectors: &TitleSelectors,
) -> Result<Option<String>> {
    let html = archive.read_text(path)?;
    Ok(selectors.find_title(&html))
}

/// Give placeholder-titled chapters a heading from their own document.
///
/// Only chapters still carrying a placeholder are read. Documents are
/// processed concurrently on a pool of at most
/// `options.title_parallelism` threads; a document that cannot be read
/// keeps its placeholder and yields a diagnostic.
pub fn resolve_fallback_titles(
    archive: &dyn Archive,
    chapters: &mut [Chapter],
    selectors: &TitleSelectors,
    options: &ExtractorOptions,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut pending: Vec<&mut Chapter> = chapters
        .iter_mut()
        .filter(|c| c.has_placeholder_title())
        .collect();
    if pending.is_empty() || selectors.is_empty() {
        return;
    }

    tracing::debug!(
        chapters = pending.len(),
        threads = options.title_parallelism,
        "extracting headings from chapter documents"
    );

    let run = |pending: &mut Vec<&mut Chapter>| -> Vec<Diagnostic> {
        pending
            .par_iter_mut()
            .filter_map(|chapter| apply_heading(archive, chapter, selectors))
            .collect()
    };

    let failures = match rayon::ThreadPoolBuilder::new()
        .num_threads(options.title_parallelism.max(1))
        .build()
    {
        Ok(pool) => pool.install(|| run(&mut pending)),
        Err(e) => {
            tracing::debug!(error = %e, "thread pool unavailable, extracting sequentially");
            pending
                .iter_mut()
                .filter_map(|chapter| apply_heading(archive, chapter, selectors))
                .collect()
        }
    };

    for diagnostic in failures {
        diagnostic.emit();
        diagnostics.push(diagnostic);
    }
}

fn apply_heading(
    archive: &dyn Archive,
    chapter: &mut Chapter,
    selectors: &TitleSelectors,
) -> Option<Diagnostic> {
    match extract_title(archive, chapter.archive_path(), selectors) {
        Ok(Some(title)) => {
            chapter.offer_title(&title, TitleSource::Document);
            None
        }
        Ok(None) => None,
        Err(e) => Some(Diagnostic::TitleExtractionFailed {
            path: chapter.archive_path().to_string(),
            reason: e.to_string(),
        }),
    }
}
