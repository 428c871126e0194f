//! Library - cache of open documents
//!
//! All cache state (the path map and the current-document pointer) sits
//! behind one mutex. Documents are shared as `Arc<Document>`, so a repeated
//! open of the same path hands back the same object with its reading state.

use eyre::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::config::Config;
use crate::document::{Chapter, Document};
use crate::error::{NovelError, Result};
use crate::format::{ContentStore, ParserRegistry, PlainTextParser};
use crate::search::{SearchEngine, SearchResult};
use crate::segmenter::Segmenter;

#[derive(Debug, Default)]
struct LibraryInner {
    documents: HashMap<PathBuf, Arc<Document>>,
    current: Option<PathBuf>,
}

/// Open documents keyed by path, plus the search service over them
pub struct Library {
    store: ContentStore,
    search: SearchEngine,
    inner: Mutex<LibraryInner>,
}

impl Default for Library {
    fn default() -> Self {
        Self::new(ContentStore::default(), SearchEngine::default())
    }
}

impl Library {
    pub fn new(store: ContentStore, search: SearchEngine) -> Self {
        Self {
            store,
            search,
            inner: Mutex::new(LibraryInner::default()),
        }
    }

    /// Build a library from configuration
    pub fn from_config(config: &Config) -> eyre::Result<Self> {
        let segmenter = Segmenter::from_config(&config.segmenter).context("Invalid heading pattern")?;

        let mut registry = ParserRegistry::empty();
        registry.register(Box::new(PlainTextParser::with_fallback_encoding(
            &config.library.fallback_encoding,
        )));

        let store = ContentStore::new(registry, segmenter).with_max_file_size(config.library.max_file_size_bytes());
        Ok(Self::new(store, SearchEngine::from_config(&config.search)))
    }

    pub fn search_engine(&self) -> &SearchEngine {
        &self.search
    }

    /// Open a document, or return the cached one, and make it current
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Arc<Document>> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Library::open: called");

        {
            let mut inner = self.lock();
            if let Some(doc) = inner.documents.get(path).cloned() {
                debug!(path = %path.display(), "Library::open: cache hit");
                inner.current = Some(path.to_path_buf());
                return Ok(doc);
            }
        }

        let loaded = Arc::new(self.store.load(path)?);

        let mut inner = self.lock();
        // Another caller may have opened the same path while we were loading
        let doc = inner
            .documents
            .entry(path.to_path_buf())
            .or_insert(loaded)
            .clone();
        inner.current = Some(path.to_path_buf());
        info!(path = %path.display(), chapters = doc.chapters().len(), "Opened document");
        Ok(doc)
    }

    /// Evict a document; clears the current pointer if it was current
    pub fn close(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        debug!(path = %path.display(), "Library::close: called");
        let mut inner = self.lock();
        let removed = inner.documents.remove(path).is_some();
        if inner.current.as_deref() == Some(path) {
            inner.current = None;
        }
        if removed {
            info!(path = %path.display(), "Closed document");
        }
        removed
    }

    /// Close every document
    pub fn clear(&self) {
        debug!("Library::clear: called");
        let mut inner = self.lock();
        inner.documents.clear();
        inner.current = None;
    }

    /// The most recently opened document, if still open
    pub fn current(&self) -> Option<Arc<Document>> {
        let inner = self.lock();
        inner.current.as_ref().and_then(|p| inner.documents.get(p).cloned())
    }

    /// Paths of all open documents, sorted
    pub fn open_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.lock().documents.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get an open document
    pub fn get(&self, path: impl AsRef<Path>) -> Result<Arc<Document>> {
        let path = path.as_ref();
        self.lock()
            .documents
            .get(path)
            .cloned()
            .ok_or_else(|| NovelError::NotOpen {
                path: path.to_path_buf(),
            })
    }

    pub fn chapters(&self, path: impl AsRef<Path>) -> Result<Vec<Chapter>> {
        Ok(self.get(path)?.chapters().to_vec())
    }

    pub fn chapter_text(&self, path: impl AsRef<Path>, index: usize) -> Result<String> {
        debug!(index, "Library::chapter_text: called");
        Ok(self.get(path)?.chapter_text(index)?.to_string())
    }

    pub fn set_current_chapter(&self, path: impl AsRef<Path>, index: usize) -> Result<()> {
        self.get(path)?.set_current_chapter(index)
    }

    pub fn set_progress(&self, path: impl AsRef<Path>, percent: f64) -> Result<()> {
        self.get(path)?.set_progress(percent)
    }

    /// Search a whole open document
    pub fn search(&self, path: impl AsRef<Path>, keyword: &str, case_sensitive: bool) -> Result<Vec<SearchResult>> {
        let doc = self.get(path)?;
        Ok(self.search.search_document(&doc, keyword, case_sensitive))
    }

    /// Search one chapter of an open document
    pub fn search_in_chapter(
        &self,
        path: impl AsRef<Path>,
        chapter_index: usize,
        keyword: &str,
        case_sensitive: bool,
    ) -> Result<Vec<SearchResult>> {
        let doc = self.get(path)?;
        self.search.search_in_chapter(&doc, chapter_index, keyword, case_sensitive)
    }

    fn lock(&self) -> MutexGuard<'_, LibraryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
