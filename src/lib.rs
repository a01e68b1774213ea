//! # epub-chapters
//!
//! Extracts the reading-order chapter list of an EPUB and a title for every
//! chapter.
//!
//! ## Features
//!
//! - Locates the package document through `META-INF/container.xml`, with
//!   fallbacks for broken containers
//! - Reads chapters in spine order, skipping entries that are not in the archive
//! - Titles chapters from the NCX or EPUB 3 navigation document, the
//!   manifest, or headings in the chapter documents themselves
//! - Reports degraded structure as [`Diagnostic`]s instead of failing
//!
//! ## Quick Start
//!
//! ```no_run
//! use epub_chapters::ChapterExtractor;
//!
//! let extractor = ChapterExtractor::new(std::fs::read("book.epub").unwrap());
//! extractor.initialize().unwrap();
//!
//! for i in 0..extractor.chapter_count().unwrap() {
//!     println!("{}", extractor.chapter_title(i).unwrap());
//! }
//! let first = extractor.chapter_document(0).unwrap();
//! assert_eq!(first.media_type, "application/xhtml+xml");
//! ```
//!
//! ## Title resolution
//!
//! Each chapter's title comes from the highest tier that provides one:
//!
//! 1. the navigation document entry pointing at the chapter
//! 2. the manifest item's `title` attribute
//! 3. the first heading in the chapter document
//! 4. `"Chapter N"`, where N is the chapter's 1-based position
//!
//! ## Custom archives
//!
//! The ZIP backend can be swapped for any [`ArchiveReader`]:
//!
//! ```
//! use epub_chapters::{Archive, ArchiveReader, ChapterExtractor, MemoryArchive, Result};
//!
//! struct Unpacked(MemoryArchive);
//!
//! impl ArchiveReader for Unpacked {
//!     fn open(&self, _bytes: Vec<u8>) -> Result<Box<dyn Archive>> {
//!         Ok(Box::new(self.0.clone()))
//!     }
//! }
//!
//! let files = MemoryArchive::new()
//!     .with_entry("content.opf", r#"<package><manifest>
//!         <item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/>
//!         </manifest><spine><itemref idref="c1"/></spine></package>"#)
//!     .with_entry("c1.xhtml", "<html><body><h1>Opening</h1></body></html>");
//!
//! let extractor = ChapterExtractor::builder(Vec::new()).reader(Unpacked(files)).build();
//! extractor.initialize()?;
//! assert_eq!(extractor.chapter_titles()?, vec!["Opening"]);
//! # Ok::<(), epub_chapters::Error>(())
//! ```

pub mod archive;
pub mod chapter;
pub mod container;
pub mod dom;
pub mod error;
pub mod extractor;
pub mod navigation;
pub mod options;
pub mod package;
pub mod path;
pub mod title;
pub(crate) mod util;

pub use archive::{Archive, ArchiveReader, MemoryArchive, ZipArchiveReader, ZipReader};
pub use chapter::{Chapter, TitleSource};
pub use error::{Diagnostic, Error, Result};
pub use extractor::{ChapterDocument, ChapterExtractor, ChapterExtractorBuilder, ExtractorState};
pub use options::ExtractorOptions;
