//! NovelStore - plain-text novel reader core
//!
//! Opens text documents, splits them into chapters by heading heuristics and
//! answers keyword searches over a whole document or a single chapter.
//!
//! # Flow
//!
//! ```text
//! Library::open(path)
//!   ├── cache hit  → same Arc<Document>
//!   └── cache miss → ContentStore::load
//!                      ├── Format::from_path → ParserRegistry
//!                      ├── decode_text (UTF-8, GB18030 fallback)
//!                      └── Segmenter::segment → Vec<Chapter>
//! ```
//!
//! # Example
//!
//! ```ignore
//! use novelstore::Library;
//!
//! let library = Library::default();
//! let doc = library.open("books/novel.txt")?;
//! let text = library.chapter_text("books/novel.txt", 1)?;
//! let hits = library.search_in_chapter("books/novel.txt", 1, "dragon", false)?;
//! ```

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod library;
pub mod search;
pub mod segmenter;

pub use config::Config;
pub use document::{Chapter, Document, DocumentSummary, ReadingState};
pub use error::{ErrorKind, NovelError};
pub use format::{ContentStore, Format, FormatParser, ParsedContent, ParserRegistry, PlainTextParser};
pub use library::Library;
pub use search::{SearchEngine, SearchResult, SearchStatistics, highlight, line_number, search};
pub use segmenter::{HeadingRecognizer, Segmenter};
