//! Format detection and content loading
//!
//! Each format is served by a [`FormatParser`] registered in a
//! [`ParserRegistry`]. Only plain text ships with a parser; every other
//! format fails with `UnsupportedFormat` until a caller registers one.

use encoding_rs::Encoding;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::document::{Chapter, Document};
use crate::error::{NovelError, Result};
use crate::segmenter::Segmenter;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Document format, detected from the file extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Format {
    PlainText,
    Epub,
    Pdf,
    Mobi,
    Azw3,
    /// Any other extension, lower-cased
    Other(String),
}

impl Format {
    /// Detect the format of `path` (case-insensitive extension match)
    ///
    /// Files without an extension are read as plain text.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "" | "txt" | "text" => Format::PlainText,
            "epub" => Format::Epub,
            "pdf" => Format::Pdf,
            "mobi" => Format::Mobi,
            "azw3" => Format::Azw3,
            other => Format::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::PlainText => write!(f, "txt"),
            Format::Epub => write!(f, "epub"),
            Format::Pdf => write!(f, "pdf"),
            Format::Mobi => write!(f, "mobi"),
            Format::Azw3 => write!(f, "azw3"),
            Format::Other(ext) => write!(f, "{}", ext),
        }
    }
}

impl Serialize for Format {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Output of a format parser
#[derive(Debug, Clone)]
pub struct ParsedContent {
    pub content: String,
    pub chapters: Vec<Chapter>,
    /// Author, for formats that carry metadata
    pub author: Option<String>,
}

/// Turns raw file bytes into text and chapters
pub trait FormatParser: Send + Sync {
    /// Format this parser handles
    fn format(&self) -> Format;

    /// Parse file bytes, using `segmenter` where the format has no native chapter structure
    fn parse(&self, bytes: &[u8], segmenter: &Segmenter) -> Result<ParsedContent>;
}

/// Plain text parser: decode, then segment heuristically
#[derive(Debug, Clone)]
pub struct PlainTextParser {
    fallback: &'static Encoding,
}

impl Default for PlainTextParser {
    fn default() -> Self {
        Self {
            fallback: encoding_rs::GB18030,
        }
    }
}

impl PlainTextParser {
    /// Use `label` (e.g. "gbk", "big5") for files that are not valid UTF-8
    ///
    /// Unknown labels keep the GB18030 default.
    pub fn with_fallback_encoding(label: &str) -> Self {
        let fallback = Encoding::for_label(label.as_bytes()).unwrap_or(encoding_rs::GB18030);
        Self { fallback }
    }
}

impl FormatParser for PlainTextParser {
    fn format(&self) -> Format {
        Format::PlainText
    }

    fn parse(&self, bytes: &[u8], segmenter: &Segmenter) -> Result<ParsedContent> {
        let content = decode_text(bytes, self.fallback);
        let chapters = segmenter.segment(&content);
        Ok(ParsedContent {
            content,
            chapters,
            author: None,
        })
    }
}

/// Decode bytes as UTF-8 (BOM stripped), falling back to `fallback` when invalid
pub fn decode_text(bytes: &[u8], fallback: &'static Encoding) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            debug!(encoding = fallback.name(), "decode_text: not UTF-8, using fallback");
            let (decoded, _, _) = fallback.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Parsers by format
pub struct ParserRegistry {
    parsers: HashMap<Format, Box<dyn FormatParser>>,
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl ParserRegistry {
    /// Registry with the plain text parser
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PlainTextParser::default()));
        registry
    }

    /// Registry with no parsers (for testing)
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Add or replace the parser for its format
    pub fn register(&mut self, parser: Box<dyn FormatParser>) {
        self.parsers.insert(parser.format(), parser);
    }

    pub fn get(&self, format: &Format) -> Option<&dyn FormatParser> {
        self.parsers.get(format).map(|p| p.as_ref())
    }

    pub fn supports(&self, format: &Format) -> bool {
        self.parsers.contains_key(format)
    }
}

/// Reads files from disk into documents
pub struct ContentStore {
    registry: ParserRegistry,
    segmenter: Segmenter,
    /// Maximum file size in bytes, 0 for no limit
    max_file_size: u64,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new(ParserRegistry::standard(), Segmenter::default())
    }
}

impl ContentStore {
    pub fn new(registry: ParserRegistry, segmenter: Segmenter) -> Self {
        Self {
            registry,
            segmenter,
            max_file_size: 0,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn registry_mut(&mut self) -> &mut ParserRegistry {
        &mut self.registry
    }

    /// Read, decode and segment the file at `path`
    pub fn load(&self, path: &Path) -> Result<Document> {
        debug!(path = %path.display(), "ContentStore::load: called");
        let meta = fs::metadata(path).map_err(|e| NovelError::from_io(path, e))?;
        if !meta.is_file() {
            return Err(NovelError::ReadFailure {
                path: path.to_path_buf(),
                source: std::io::Error::other("not a regular file"),
            });
        }

        let size = meta.len();
        if self.max_file_size > 0 && size > self.max_file_size {
            return Err(NovelError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_file_size,
            });
        }

        let format = Format::from_path(path);
        let parser = self
            .registry
            .get(&format)
            .ok_or_else(|| NovelError::UnsupportedFormat {
                format: format.to_string(),
            })?;

        let bytes = fs::read(path).map_err(|e| NovelError::from_io(path, e))?;
        let parsed = parser.parse(&bytes, &self.segmenter)?;

        info!(path = %path.display(), %format, size, chapters = parsed.chapters.len(), "Loaded document");
        Ok(Document::new(path, format, size, parsed.content, parsed.chapters).with_author(parsed.author))
    }
}
