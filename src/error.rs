//! Error types for chapter extraction.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while initializing an extractor or querying it.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("No package document found in archive")]
    PackageNotFound,

    #[error("Invalid package document: {0}")]
    InvalidPackage(String),

    #[error("Entry not found in archive: {0}")]
    EntryNotFound(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Extractor is not ready (state: {state})")]
    NotReady { state: &'static str },

    #[error("Chapter index {index} out of range (chapter count: {count})")]
    ChapterOutOfRange { index: usize, count: usize },

    #[error("Initialization already in progress")]
    InitializationInProgress,

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A degraded condition met during initialization.
///
/// None of these stop the pipeline. They are logged when recorded and kept
/// on the extractor so callers can see what was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `META-INF/container.xml` existed but could not be used.
    ContainerUnreadable { reason: String },
    /// A spine `itemref` names an id the manifest does not declare.
    MissingManifestItem { idref: String },
    /// A manifest item's document is not present in the archive.
    MissingChapterEntry { id: String, path: String },
    /// The package declares a navigation document that is not in the archive.
    NavigationMissing { path: String },
    /// The navigation document could not be read or parsed.
    NavigationUnreadable { path: String, reason: String },
    /// Heading extraction failed for one chapter document.
    TitleExtractionFailed { path: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContainerUnreadable { reason } => {
                write!(f, "container.xml unusable: {reason}")
            }
            Self::MissingManifestItem { idref } => {
                write!(f, "spine references unknown manifest item '{idref}'")
            }
            Self::MissingChapterEntry { id, path } => {
                write!(f, "manifest item '{id}' points to missing entry {path}")
            }
            Self::NavigationMissing { path } => {
                write!(f, "navigation document not found: {path}")
            }
            Self::NavigationUnreadable { path, reason } => {
                write!(f, "navigation document {path} unreadable: {reason}")
            }
            Self::TitleExtractionFailed { path, reason } => {
                write!(f, "title extraction failed for {path}: {reason}")
            }
        }
    }
}

impl Diagnostic {
    /// Log this diagnostic at warn level.
    pub(crate) fn emit(&self) {
        tracing::warn!(diagnostic = %self, "degraded EPUB structure");
    }
}
