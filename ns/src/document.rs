//! Document and chapter model

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;

use crate::error::{NovelError, Result};
use crate::format::Format;

/// A contiguous span of a document's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Position in the owning document's chapter list
    pub index: usize,
    /// Heading line, or the body title for text before the first heading
    pub title: String,
    /// Byte offset into the document content (inclusive)
    pub start_offset: usize,
    /// Byte offset into the document content (exclusive)
    pub end_offset: usize,
    /// Words in the chapter slice, CJK ideographs counted individually
    pub word_count: usize,
}

impl Chapter {
    /// True if `offset` falls inside this chapter
    pub fn contains(&self, offset: usize) -> bool {
        self.start_offset <= offset && offset < self.end_offset
    }
}

/// Caller-mutable reading state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingState {
    pub current_chapter: usize,
    /// Percent read, 0-100
    pub progress_percent: f64,
    /// Unix ms of the last progress update, 0 if never read
    pub last_read_ms: i64,
}

/// An opened text source with its derived chapters
///
/// Content and chapters are fixed at open time. Only the reading state can
/// change afterwards, and it sits behind its own lock so a shared
/// `Arc<Document>` can be updated in place.
#[derive(Debug)]
pub struct Document {
    title: String,
    author: Option<String>,
    source_path: PathBuf,
    format: Format,
    size_bytes: u64,
    content: String,
    chapters: Vec<Chapter>,
    reading: RwLock<ReadingState>,
}

impl Document {
    pub(crate) fn new(
        source_path: impl Into<PathBuf>,
        format: Format,
        size_bytes: u64,
        content: String,
        chapters: Vec<Chapter>,
    ) -> Self {
        let source_path = source_path.into();
        let title = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            title,
            author: None,
            source_path,
            format,
            size_bytes,
            content,
            chapters,
            reading: RwLock::new(ReadingState::default()),
        }
    }

    pub(crate) fn with_author(mut self, author: Option<String>) -> Self {
        self.author = author;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn format(&self) -> &Format {
        &self.format
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Get a chapter by index
    pub fn chapter(&self, index: usize) -> Result<&Chapter> {
        self.chapters.get(index).ok_or(NovelError::IndexOutOfRange {
            index,
            len: self.chapters.len(),
        })
    }

    /// Get the text of a chapter
    pub fn chapter_text(&self, index: usize) -> Result<&str> {
        let chapter = self.chapter(index)?;
        Ok(&self.content[chapter.start_offset..chapter.end_offset])
    }

    /// Find the chapter containing a content offset
    pub fn chapter_at(&self, offset: usize) -> Option<&Chapter> {
        let idx = self.chapters.partition_point(|c| c.end_offset <= offset);
        self.chapters.get(idx).filter(|c| c.contains(offset))
    }

    /// Snapshot of the reading state
    pub fn reading_state(&self) -> ReadingState {
        match self.reading.read() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn current_chapter(&self) -> usize {
        self.reading_state().current_chapter
    }

    pub fn progress_percent(&self) -> f64 {
        self.reading_state().progress_percent
    }

    /// Move the reading position to another chapter
    pub fn set_current_chapter(&self, index: usize) -> Result<()> {
        debug!(path = %self.source_path.display(), index, "Document::set_current_chapter: called");
        if index >= self.chapters.len() {
            return Err(NovelError::IndexOutOfRange {
                index,
                len: self.chapters.len(),
            });
        }
        self.update_reading(|state| state.current_chapter = index);
        Ok(())
    }

    /// Record read progress and stamp the last-read time
    pub fn set_progress(&self, percent: f64) -> Result<()> {
        debug!(path = %self.source_path.display(), percent, "Document::set_progress: called");
        if !(0.0..=100.0).contains(&percent) {
            return Err(NovelError::InvalidProgress(percent));
        }
        let now = chrono::Utc::now().timestamp_millis();
        self.update_reading(|state| {
            state.progress_percent = percent;
            state.last_read_ms = now;
        });
        Ok(())
    }

    fn update_reading(&self, f: impl FnOnce(&mut ReadingState)) {
        match self.reading.write() {
            Ok(mut state) => f(&mut state),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    /// Serializable view of the document without its content
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            title: self.title.clone(),
            author: self.author.clone(),
            source_path: self.source_path.clone(),
            format: self.format.to_string(),
            size_bytes: self.size_bytes,
            chapter_count: self.chapters.len(),
            word_count: self.chapters.iter().map(|c| c.word_count).sum(),
            reading: self.reading_state(),
        }
    }
}

/// Document metadata for display and JSON output
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub title: String,
    pub author: Option<String>,
    pub source_path: PathBuf,
    pub format: String,
    pub size_bytes: u64,
    pub chapter_count: usize,
    pub word_count: usize,
    pub reading: ReadingState,
}
