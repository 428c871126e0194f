//! Integration tests for novelstore
//!
//! These tests open real files through the Library and check the document,
//! chapter and search behaviour end to end.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use novelstore::{ErrorKind, Format, Library, highlight, search};
use tempfile::TempDir;

const NOVEL: &str = "\u{feff}书名：山河\n作者：佚名\n\n第一章 出山\n少年背着剑走出了山门。\n山下的风很大。\n\n第二章 入城\n城门口，少年遇见了一位老人。\n老人说：山外有山。\n\n第三节 尾声\n少年回头望山。\n";

fn write_file(temp: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = temp.path().join(name);
    fs::write(&path, content).expect("Failed to write test file");
    path
}

// =============================================================================
// Opening and chapters
// =============================================================================

#[test]
fn test_open_segments_novel() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&temp, "shanhe.txt", NOVEL.as_bytes());
    let library = Library::default();

    let doc = library.open(&path).expect("Failed to open novel");
    assert_eq!(doc.title(), "shanhe.txt");
    assert_eq!(doc.format(), &Format::PlainText);
    assert_eq!(doc.size_bytes(), NOVEL.len() as u64);
    // BOM is not part of the content
    assert!(doc.content().starts_with("书名"));

    let titles: Vec<&str> = doc.chapters().iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["正文", "第一章 出山", "第二章 入城", "第三节 尾声"]);

    let joined: String = (0..doc.chapters().len())
        .map(|i| doc.chapter_text(i).unwrap())
        .collect();
    assert_eq!(joined, doc.content());
    assert!(doc.chapters().iter().all(|c| c.word_count > 0));
}

#[test]
fn test_open_gbk_novel() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let (gbk, _, _) = encoding_rs::GBK.encode("第一章 开端\n天色已晚。\n");
    let path = write_file(&temp, "gbk.TXT", &gbk);

    let doc = Library::default().open(&path).expect("Failed to open GBK novel");
    assert_eq!(doc.chapters().len(), 1);
    assert_eq!(doc.chapters()[0].title, "第一章 开端");
}

#[test]
fn test_empty_file_has_no_chapters() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&temp, "empty.txt", b"");
    let library = Library::default();

    let doc = library.open(&path).unwrap();
    assert!(doc.chapters().is_empty());
    assert_eq!(library.chapter_text(&path, 0).unwrap_err().kind(), ErrorKind::IndexOutOfRange);
}

#[test]
fn test_unsupported_formats_fail_explicitly() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let library = Library::default();

    for name in ["a.epub", "b.pdf", "c.mobi", "d.azw3", "e.docx"] {
        let path = write_file(&temp, name, b"binary");
        let err = library.open(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormat, "{}", name);
    }
    assert!(library.is_empty());
}

// =============================================================================
// Cache behaviour
// =============================================================================

#[test]
fn test_reopen_preserves_progress() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&temp, "shanhe.txt", NOVEL.as_bytes());
    let library = Library::default();

    let first = library.open(&path).unwrap();
    library.set_progress(&path, 55.5).unwrap();
    library.set_current_chapter(&path, 2).unwrap();

    let second = library.open(&path).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.reading_state().progress_percent, 55.5);
    assert_eq!(second.reading_state().current_chapter, 2);
    assert!(second.reading_state().last_read_ms > 0);

    assert_eq!(
        library.set_current_chapter(&path, 99).unwrap_err().kind(),
        ErrorKind::IndexOutOfRange
    );
    assert_eq!(library.set_progress(&path, -1.0).unwrap_err().kind(), ErrorKind::InvalidProgress);
}

#[test]
fn test_not_open_errors() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&temp, "shanhe.txt", NOVEL.as_bytes());
    let library = Library::default();

    assert_eq!(library.chapter_text(&path, 0).unwrap_err().kind(), ErrorKind::NotOpen);
    assert_eq!(library.chapters(&path).unwrap_err().kind(), ErrorKind::NotOpen);
    assert_eq!(library.get(&path).unwrap_err().kind(), ErrorKind::NotOpen);

    library.open(&path).unwrap();
    library.close(&path);
    assert_eq!(library.chapters(&path).unwrap_err().kind(), ErrorKind::NotOpen);
}

#[test]
fn test_open_paths_and_clear() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let a = write_file(&temp, "a.txt", b"aaa");
    let b = write_file(&temp, "b.txt", b"bbb");
    let library = Library::default();

    library.open(&b).unwrap();
    library.open(&a).unwrap();
    assert_eq!(library.open_paths(), vec![a.clone(), b.clone()]);
    assert_eq!(library.current().unwrap().source_path(), a.as_path());

    library.clear();
    assert!(library.open_paths().is_empty());
    assert!(library.current().is_none());
}

// =============================================================================
// Search
// =============================================================================

#[test]
fn test_search_document_and_chapter_share_frame() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&temp, "shanhe.txt", NOVEL.as_bytes());
    let library = Library::default();
    let doc = library.open(&path).unwrap();

    let all = library.search(&path, "少年", true).unwrap();
    assert_eq!(all.len(), 3);

    let in_second = library.search_in_chapter(&path, 2, "少年", true).unwrap();
    assert_eq!(in_second.len(), 1);
    // Same hit, same coordinates, whichever span was searched
    assert_eq!(in_second[0], all[1]);

    let chapter = doc.chapter_at(in_second[0].position).unwrap();
    assert_eq!(chapter.index, 2);
    assert_eq!(in_second[0].line, novelstore::line_number(doc.content(), in_second[0].position));

    assert_eq!(
        library.search_in_chapter(&path, 4, "少年", true).unwrap_err().kind(),
        ErrorKind::IndexOutOfRange
    );
}

#[test]
fn test_search_results_cache() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let path = write_file(&temp, "shanhe.txt", NOVEL.as_bytes());
    let library = Library::default();
    library.open(&path).unwrap();

    library.search(&path, "山", true).unwrap();
    let engine = library.search_engine();
    let stats = engine.statistics();
    assert_eq!(stats.match_count, engine.results().len());
    assert!(stats.line_count <= stats.match_count);

    library.search(&path, "", true).unwrap();
    assert!(engine.results().is_empty());

    engine.clear_results();
    assert_eq!(engine.statistics().match_count, 0);
    assert!(engine.statistics().keyword.is_none());
}

#[test]
fn test_free_functions() {
    let results = search("AbC abc ABC", "abc", false);
    assert_eq!(results.iter().map(|r| r.position).collect::<Vec<_>>(), vec![0, 4, 8]);

    let results = search("match at start", "match", true);
    assert!(results[0].context.starts_with("match"));

    assert_eq!(highlight("a<b>c", "b", ""), "a<<mark>b</mark>>c");
}
