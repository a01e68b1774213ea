//! The extractor facade.
//!
//! A [`ChapterExtractor`] owns the EPUB bytes until [`initialize`] runs the
//! resolution pipeline, after which it answers chapter queries from the
//! loaded state. It is `Sync`: one thread may initialize while others query
//! (and are told it is not ready yet).
//!
//! [`initialize`]: ChapterExtractor::initialize

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::archive::{Archive, ArchiveReader, ZipReader};
use crate::chapter::{Chapter, XHTML_MEDIA_TYPE};
use crate::error::{Diagnostic, Error, Result};
use crate::options::ExtractorOptions;
use crate::title::TitleSelectors;
use crate::{container, navigation, package, title};

/// Lifecycle of a [`ChapterExtractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorState {
    Uninitialized,
    Initializing,
    Ready,
    Failed,
}

impl ExtractorState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExtractorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chapter document's raw content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterDocument {
    pub bytes: Vec<u8>,
    pub media_type: &'static str,
}

struct Loaded {
    archive: Box<dyn Archive>,
    chapters: Vec<Chapter>,
    title: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

enum State {
    Uninitialized(Vec<u8>),
    Initializing,
    Ready(Arc<Loaded>),
    Failed(String),
}

impl State {
    fn kind(&self) -> ExtractorState {
        match self {
            Self::Uninitialized(_) => ExtractorState::Uninitialized,
            Self::Initializing => ExtractorState::Initializing,
            Self::Ready(_) => ExtractorState::Ready,
            Self::Failed(_) => ExtractorState::Failed,
        }
    }
}

/// Extracts the ordered chapter list and chapter titles from an EPUB.
///
/// ```no_run
/// use epub_chapters::ChapterExtractor;
///
/// let bytes = std::fs::read("book.epub")?;
/// let extractor = ChapterExtractor::new(bytes);
/// extractor.initialize()?;
/// for (i, title) in extractor.chapter_titles()?.iter().enumerate() {
///     println!("{i}: {title}");
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct ChapterExtractor {
    state: Mutex<State>,
    reader: Box<dyn ArchiveReader>,
    options: ExtractorOptions,
}

/// Configures a [`ChapterExtractor`] before construction.
pub struct ChapterExtractorBuilder {
    bytes: Vec<u8>,
    reader: Box<dyn ArchiveReader>,
    options: ExtractorOptions,
}

impl ChapterExtractorBuilder {
    /// Use a custom archive backend instead of the ZIP reader.
    pub fn reader(mut self, reader: impl ArchiveReader + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    pub fn options(mut self, options: ExtractorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> ChapterExtractor {
        ChapterExtractor {
            state: Mutex::new(State::Uninitialized(self.bytes)),
            reader: self.reader,
            options: self.options,
        }
    }
}

impl ChapterExtractor {
    /// Extractor over EPUB bytes with the ZIP backend and default options.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self::builder(bytes).build()
    }

    pub fn builder(bytes: impl Into<Vec<u8>>) -> ChapterExtractorBuilder {
        ChapterExtractorBuilder {
            bytes: bytes.into(),
            reader: Box::new(ZipReader),
            options: ExtractorOptions::default(),
        }
    }

    /// Run the resolution pipeline.
    ///
    /// Returns immediately when already ready. A second caller arriving
    /// while the pipeline runs gets
    /// [`Error::InitializationInProgress`]; once initialization has failed,
    /// every call reports [`Error::InitializationFailed`].
    pub fn initialize(&self) -> Result<()> {
        let bytes = {
            let mut state = self.state.lock();
            match std::mem::replace(&mut *state, State::Initializing) {
                State::Uninitialized(bytes) => bytes,
                State::Ready(loaded) => {
                    *state = State::Ready(loaded);
                    return Ok(());
                }
                State::Initializing => return Err(Error::InitializationInProgress),
                State::Failed(reason) => {
                    let error = Error::InitializationFailed(reason.clone());
                    *state = State::Failed(reason);
                    return Err(error);
                }
            }
        };

        // The lock is released while the pipeline runs
        let result = self.load(bytes);

        let mut state = self.state.lock();
        match result {
            Ok(loaded) => {
                tracing::info!(
                    chapters = loaded.chapters.len(),
                    diagnostics = loaded.diagnostics.len(),
                    "extractor ready"
                );
                *state = State::Ready(Arc::new(loaded));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "extractor initialization failed");
                *state = State::Failed(e.to_string());
                Err(e)
            }
        }
    }

    fn load(&self, bytes: Vec<u8>) -> Result<Loaded> {
        let selectors = TitleSelectors::from_options(&self.options)?;
        let archive = self.reader.open(bytes)?;
        let mut diagnostics = Vec::new();

        let package_path =
            container::locate(archive.as_ref(), &self.options.package_fallbacks, &mut diagnostics)?;
        let info = package::parse(archive.as_ref(), &package_path, &self.options, &mut diagnostics)?;
        let mut chapters = info.chapters;

        if let Some(nav) = &info.navigation {
            let titles = navigation::resolve(archive.as_ref(), nav, &mut diagnostics);
            let applied = titles.apply(&mut chapters);
            tracing::debug!(path = %nav.path, applied, "applied navigation titles");
        }

        title::resolve_fallback_titles(
            archive.as_ref(),
            &mut chapters,
            &selectors,
            &self.options,
            &mut diagnostics,
        );

        Ok(Loaded {
            archive,
            chapters,
            title: info.title,
            diagnostics,
        })
    }

    pub fn state(&self) -> ExtractorState {
        self.state.lock().kind()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ExtractorState::Ready
    }

    fn loaded(&self) -> Result<Arc<Loaded>> {
        match &*self.state.lock() {
            State::Ready(loaded) => Ok(Arc::clone(loaded)),
            other => Err(Error::NotReady {
                state: other.kind().as_str(),
            }),
        }
    }

    pub fn chapter_count(&self) -> Result<usize> {
        Ok(self.loaded()?.chapters.len())
    }

    /// Titles of all chapters, in reading order.
    pub fn chapter_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .loaded()?
            .chapters
            .iter()
            .map(|c| c.title().to_string())
            .collect())
    }

    pub fn chapter_title(&self, index: usize) -> Result<String> {
        let loaded = self.loaded()?;
        chapter_at(&loaded, index).map(|c| c.title().to_string())
    }

    /// Raw bytes of the chapter's document.
    ///
    /// The archive is read on every call; nothing is cached.
    pub fn chapter_document(&self, index: usize) -> Result<ChapterDocument> {
        let loaded = self.loaded()?;
        let chapter = chapter_at(&loaded, index)?;
        let path = chapter.archive_path();
        if !loaded.archive.has_entry(path) {
            return Err(Error::EntryNotFound(path.to_string()));
        }
        Ok(ChapterDocument {
            bytes: loaded.archive.read_bytes(path)?,
            media_type: XHTML_MEDIA_TYPE,
        })
    }

    /// Snapshot of the chapter list.
    pub fn chapters(&self) -> Result<Vec<Chapter>> {
        Ok(self.loaded()?.chapters.clone())
    }

    /// The package's `dc:title`, if declared.
    pub fn book_title(&self) -> Result<Option<String>> {
        Ok(self.loaded()?.title.clone())
    }

    /// Degraded conditions met during initialization.
    pub fn diagnostics(&self) -> Result<Vec<Diagnostic>> {
        Ok(self.loaded()?.diagnostics.clone())
    }
}

impl fmt::Debug for ChapterExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChapterExtractor")
            .field("state", &self.state())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn chapter_at(loaded: &Loaded, index: usize) -> Result<&Chapter> {
    loaded.chapters.get(index).ok_or(Error::ChapterOutOfRange {
        index,
        count: loaded.chapters.len(),
    })
}
