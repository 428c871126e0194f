//! Full-text keyword search
//!
//! Positions and line numbers in results are always measured against the
//! full document content, including when the search is scoped to a chapter.

use regex::RegexBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::config::SearchConfig;
use crate::document::Document;
use crate::error::Result;

/// Characters of context kept on each side of a match
pub const DEFAULT_CONTEXT_RADIUS: usize = 50;

/// Tag used by `highlight` when none is given
pub const DEFAULT_HIGHLIGHT_TAG: &str = "<mark>";

/// A single keyword match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Byte offset of the match in the document content
    pub position: usize,
    /// 1-based line of the match in the document content
    pub line: usize,
    /// Text around the match, in its original casing
    pub context: String,
    /// The keyword as supplied
    pub keyword: String,
}

/// Summary of the last search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchStatistics {
    pub keyword: Option<String>,
    pub match_count: usize,
    /// Distinct lines containing at least one match
    pub line_count: usize,
}

/// Search the whole of `content` for `keyword`
pub fn search(content: &str, keyword: &str, case_sensitive: bool) -> Vec<SearchResult> {
    find_matches(content, 0..content.len(), keyword, case_sensitive, DEFAULT_CONTEXT_RADIUS)
}

/// Search `content[span]` for non-overlapping occurrences of `keyword`
///
/// Result positions, lines and context windows are in `content` coordinates;
/// context is clipped only at the edges of `content`.
pub fn find_matches(
    content: &str,
    span: Range<usize>,
    keyword: &str,
    case_sensitive: bool,
    radius: usize,
) -> Vec<SearchResult> {
    if keyword.is_empty() {
        return Vec::new();
    }
    let end = floor_char_boundary(content, span.end);
    let start = floor_char_boundary(content, span.start.min(end));
    let haystack = &content[start..end];

    let ranges: Vec<Range<usize>> = if case_sensitive {
        haystack.match_indices(keyword).map(|(i, m)| i..i + m.len()).collect()
    } else {
        match RegexBuilder::new(&regex::escape(keyword)).case_insensitive(true).build() {
            Ok(re) => re.find_iter(haystack).map(|m| m.range()).collect(),
            Err(e) => {
                debug!(error = %e, "find_matches: regex unavailable, scanning with case folding");
                fold_match_indices(haystack, keyword)
            }
        }
    };

    // Case folding can match text shorter than the keyword; keep hits a keyword apart
    let mut next_allowed = 0;
    let ranges: Vec<Range<usize>> = ranges
        .into_iter()
        .map(|r| start + r.start..start + r.end)
        .filter(|r| {
            if r.start < next_allowed {
                return false;
            }
            next_allowed = r.start + keyword.len();
            true
        })
        .collect();

    let mut results = Vec::with_capacity(ranges.len());
    let mut counted_to = 0;
    let mut line = 1;
    for range in ranges {
        line += count_newlines(&content.as_bytes()[counted_to..range.start]);
        counted_to = range.start;

        let ctx_start = back_chars(content, range.start, radius);
        let ctx_end = forward_chars(content, range.end, radius);
        results.push(SearchResult {
            position: range.start,
            line,
            context: content[ctx_start..ctx_end].to_string(),
            keyword: keyword.to_string(),
        });
    }
    results
}

/// 1-based line number of a byte position
pub fn line_number(content: &str, position: usize) -> usize {
    let position = position.min(content.len());
    1 + count_newlines(&content.as_bytes()[..position])
}

/// Wrap every case-sensitive occurrence of `keyword` in `tag`
///
/// The closing tag is `tag` with its first `<` turned into `</`. An empty tag
/// means `<mark>`. Existing markup is left as is.
pub fn highlight(content: &str, keyword: &str, tag: &str) -> String {
    if keyword.is_empty() {
        return content.to_string();
    }
    let open = if tag.is_empty() { DEFAULT_HIGHLIGHT_TAG } else { tag };
    let close = open.replacen('<', "</", 1);
    content.replace(keyword, &format!("{}{}{}", open, keyword, close))
}

/// Non-overlapping case-insensitive matches without a compiled regex
fn fold_match_indices(haystack: &str, keyword: &str) -> Vec<Range<usize>> {
    let needle: Vec<char> = keyword.chars().collect();
    let mut found = Vec::new();
    let mut from = 0;
    while from < haystack.len() {
        match fold_prefix_len(&haystack[from..], &needle) {
            Some(len) => {
                found.push(from..from + len);
                from += len;
            }
            None => from += haystack[from..].chars().next().map_or(1, char::len_utf8),
        }
    }
    found
}

/// Byte length of the prefix of `text` matching `needle` ignoring case
fn fold_prefix_len(text: &str, needle: &[char]) -> Option<usize> {
    let mut chars = text.char_indices();
    for &n in needle {
        let (_, c) = chars.next()?;
        if !fold_eq(c, n) {
            return None;
        }
    }
    Some(chars.next().map_or(text.len(), |(i, _)| i))
}

fn fold_eq(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase()) || a.to_uppercase().eq(b.to_uppercase())
}

fn floor_char_boundary(content: &str, index: usize) -> usize {
    let mut index = index.min(content.len());
    while !content.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

/// Byte index `n` characters before `from`, or 0
fn back_chars(content: &str, from: usize, n: usize) -> usize {
    if n == 0 {
        return from;
    }
    content[..from]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(from)
}

/// Byte index `n` characters after `from`, or the end of content
fn forward_chars(content: &str, from: usize, n: usize) -> usize {
    content[from..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| from + i)
        .unwrap_or(content.len())
}

#[derive(Debug, Default)]
struct LastSearch {
    keyword: Option<String>,
    results: Vec<SearchResult>,
}

/// Search service that keeps the results of the latest search
#[derive(Debug)]
pub struct SearchEngine {
    context_radius: usize,
    highlight_tag: String,
    last: Mutex<LastSearch>,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_RADIUS)
    }
}

impl SearchEngine {
    pub fn new(context_radius: usize) -> Self {
        Self {
            context_radius,
            highlight_tag: DEFAULT_HIGHLIGHT_TAG.to_string(),
            last: Mutex::new(LastSearch::default()),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        let mut engine = Self::new(config.context_radius);
        if !config.highlight_tag.is_empty() {
            engine.highlight_tag = config.highlight_tag.clone();
        }
        engine
    }

    pub fn context_radius(&self) -> usize {
        self.context_radius
    }

    /// Search raw content and remember the results
    pub fn search(&self, content: &str, keyword: &str, case_sensitive: bool) -> Vec<SearchResult> {
        debug!(%keyword, case_sensitive, "SearchEngine::search: called");
        let results = find_matches(content, 0..content.len(), keyword, case_sensitive, self.context_radius);
        self.remember(keyword, &results);
        results
    }

    /// Search a whole document
    pub fn search_document(&self, doc: &Document, keyword: &str, case_sensitive: bool) -> Vec<SearchResult> {
        self.search(doc.content(), keyword, case_sensitive)
    }

    /// Search within one chapter of a document
    pub fn search_in_chapter(
        &self,
        doc: &Document,
        chapter_index: usize,
        keyword: &str,
        case_sensitive: bool,
    ) -> Result<Vec<SearchResult>> {
        debug!(%keyword, chapter_index, case_sensitive, "SearchEngine::search_in_chapter: called");
        let chapter = doc.chapter(chapter_index)?;
        let results = find_matches(
            doc.content(),
            chapter.start_offset..chapter.end_offset,
            keyword,
            case_sensitive,
            self.context_radius,
        );
        self.remember(keyword, &results);
        Ok(results)
    }

    /// Highlight with `tag`, or the configured tag when `None`
    pub fn highlight(&self, content: &str, keyword: &str, tag: Option<&str>) -> String {
        highlight(content, keyword, tag.unwrap_or(&self.highlight_tag))
    }

    pub fn line_number(&self, content: &str, position: usize) -> usize {
        line_number(content, position)
    }

    /// Results of the latest search
    pub fn results(&self) -> Vec<SearchResult> {
        self.lock().results.clone()
    }

    pub fn clear_results(&self) {
        debug!("SearchEngine::clear_results: called");
        *self.lock() = LastSearch::default();
    }

    pub fn statistics(&self) -> SearchStatistics {
        let last = self.lock();
        let lines: BTreeSet<usize> = last.results.iter().map(|r| r.line).collect();
        SearchStatistics {
            keyword: last.keyword.clone(),
            match_count: last.results.len(),
            line_count: lines.len(),
        }
    }

    fn remember(&self, keyword: &str, results: &[SearchResult]) {
        let mut last = self.lock();
        last.keyword = Some(keyword.to_string());
        last.results = results.to_vec();
    }

    fn lock(&self) -> MutexGuard<'_, LastSearch> {
        self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Format;
    use crate::segmenter::Segmenter;
    use proptest::prelude::*;

    fn doc(content: &str) -> Document {
        let chapters = Segmenter::default().segment(content);
        Document::new("/books/t.txt", Format::PlainText, content.len() as u64, content.to_string(), chapters)
    }

    #[test]
    fn test_empty_keyword() {
        assert!(search("anything", "", true).is_empty());
        assert!(search("anything", "", false).is_empty());
        assert!(search("", "", false).is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        let results = search("AbC abc ABC", "abc", false);
        let positions: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 4, 8]);
        assert!(results.iter().all(|r| r.keyword == "abc"));
        assert!(results[0].context.starts_with("AbC"));

        let results = search("AbC abc ABC", "abc", true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].position, 4);
    }

    #[test]
    fn test_non_overlapping() {
        let results = search("aaaa", "aa", true);
        let positions: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 2]);
    }

    #[test]
    fn test_keyword_is_literal() {
        let results = search("a.b axb", "a.b", false);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].position, 0);
    }

    #[test]
    fn test_context_clipped_at_edges() {
        let content = format!("needle{}", "x".repeat(100));
        let results = search(&content, "needle", true);
        assert_eq!(results[0].context, format!("needle{}", "x".repeat(50)));

        let content = format!("{}needle", "y".repeat(80));
        let results = search(&content, "needle", true);
        assert_eq!(results[0].context, format!("{}needle", "y".repeat(50)));
    }

    #[test]
    fn test_context_counts_characters() {
        let content = format!("{}关键{}", "字".repeat(60), "词".repeat(60));
        let results = search(&content, "关键", true);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].context.chars().count(), 50 + 2 + 50);
    }

    #[test]
    fn test_case_folded_matches_stay_a_keyword_apart() {
        // U+017F LONG S folds to 's' but is two bytes long
        let results = search("ss", "\u{17f}", false);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].position, 0);

        // U+212A KELVIN SIGN is three bytes, 'k' is one
        let results = search("kkkk", "\u{212a}", false);
        let positions: Vec<usize> = results.iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![0, 3]);
    }

    #[test]
    fn test_case_insensitive_huge_keyword() {
        let keyword = "ab".repeat(200_000);
        let content = format!("x{}y", keyword.to_uppercase());
        let results = search(&content, &keyword, false);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].position, 1);
        assert_eq!(results[0].keyword, keyword);
    }

    #[test]
    fn test_fold_scan() {
        assert_eq!(fold_match_indices("xAbCabc", "abc"), vec![1..4, 4..7]);
        assert_eq!(fold_match_indices("\u{212a}elvin", "kel"), vec![0..5]);
        assert!(fold_match_indices("ab", "abc").is_empty());
        assert!(fold_eq('\u{17f}', 's'));
    }

    #[test]
    fn test_span_snaps_to_char_boundaries() {
        let content = "林中林";
        // 1 and 8 fall inside multi-byte characters
        let results = find_matches(content, 1..8, "中", true, 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].position, 3);
        assert!(find_matches(content, 0..100, "林", true, 5).len() == 2);
    }

    #[test]
    fn test_line_numbers() {
        let content = "one\ntwo\nthree two\n";
        assert_eq!(line_number(content, 0), 1);
        assert_eq!(line_number(content, 4), 2);
        assert_eq!(line_number(content, 1000), 4);

        let lines: Vec<usize> = search(content, "two", true).iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![2, 3]);
    }

    #[test]
    fn test_highlight() {
        assert_eq!(highlight("a<b>c", "b", ""), "a<<mark>b</mark>>c");
        assert_eq!(highlight("cat Cat", "Cat", "<em>"), "cat <em>Cat</em>");
        assert_eq!(
            highlight("x y x", "x", "<span class=\"hl\">"),
            "<span class=\"hl\">x</span class=\"hl\"> y <span class=\"hl\">x</span class=\"hl\">"
        );
        assert_eq!(highlight("unchanged", "", "<mark>"), "unchanged");
    }

    #[test]
    fn test_search_in_chapter_is_document_absolute() {
        let content = "前言 林\n第一章\n林中小屋\n第二章\n走出林子\n";
        let doc = doc(content);
        assert_eq!(doc.chapters().len(), 3);

        let engine = SearchEngine::default();
        let results = engine.search_in_chapter(&doc, 2, "林", true).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].position, content.rfind('林').unwrap());
        assert_eq!(results[0].line, 5);
        assert_eq!(&content[results[0].position..results[0].position + "林".len()], "林");

        assert!(engine.search_in_chapter(&doc, 3, "林", true).is_err());
    }

    #[test]
    fn test_engine_keeps_last_results() {
        let engine = SearchEngine::default();
        engine.search("x\nx x\n", "x", true);

        assert_eq!(engine.results().len(), 3);
        let stats = engine.statistics();
        assert_eq!(stats.match_count, 3);
        assert_eq!(stats.line_count, 2);
        assert_eq!(stats.keyword.as_deref(), Some("x"));

        engine.search("abc", "zzz", true);
        assert!(engine.results().is_empty());
        assert_eq!(engine.statistics().keyword.as_deref(), Some("zzz"));

        engine.search("abc", "a", true);
        engine.clear_results();
        assert_eq!(engine.statistics(), SearchStatistics::default());
    }

    #[test]
    fn test_engine_highlight_uses_configured_tag() {
        let config = SearchConfig {
            context_radius: 10,
            highlight_tag: "<b>".to_string(),
        };
        let engine = SearchEngine::from_config(&config);
        assert_eq!(engine.context_radius(), 10);
        assert_eq!(engine.highlight("ab", "a", None), "<b>a</b>b");
        assert_eq!(engine.highlight("ab", "a", Some("<i>")), "<i>a</i>b");
    }

    proptest! {
        #[test]
        fn prop_results_ordered_and_disjoint(
            content in "[abAB \n]{0,60}",
            keyword in "[abAB]{1,3}",
            case_sensitive in any::<bool>(),
        ) {
            let results = search(&content, &keyword, case_sensitive);
            for pair in results.windows(2) {
                prop_assert!(pair[0].position + keyword.len() <= pair[1].position);
            }
            for r in &results {
                prop_assert_eq!(r.line, line_number(&content, r.position));
                prop_assert!(content.contains(&r.context));
                let found = &content[r.position..r.position + keyword.len()];
                if case_sensitive {
                    prop_assert_eq!(found, keyword.as_str());
                } else {
                    prop_assert_eq!(found.to_lowercase(), keyword.to_lowercase());
                }
            }
        }
    }
}
