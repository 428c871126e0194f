//! Heuristic chapter segmentation
//!
//! Scans content line by line, tracking the byte offset each line starts at,
//! and cuts a new chapter at every heading line. Text before the first
//! heading becomes the body chapter. Chapter slices always tile the content
//! exactly: joining them in order gives back the input.

use regex::Regex;
use tracing::debug;

use crate::config::SegmenterConfig;
use crate::document::Chapter;

/// Title used for text before the first heading
pub const DEFAULT_BODY_TITLE: &str = "正文";

/// Decides whether a trimmed line introduces a chapter
#[derive(Debug, Clone)]
pub enum HeadingRecognizer {
    /// Line starts with `prefix` and contains at least one of `markers`
    Markers { prefix: String, markers: Vec<String> },
    /// Line matches a regular expression
    Pattern(Regex),
}

impl Default for HeadingRecognizer {
    fn default() -> Self {
        Self::Markers {
            prefix: "第".to_string(),
            markers: vec!["章".to_string(), "节".to_string()],
        }
    }
}

impl HeadingRecognizer {
    pub fn is_heading(&self, line: &str) -> bool {
        match self {
            Self::Markers { prefix, markers } => {
                !line.is_empty()
                    && line.starts_with(prefix.as_str())
                    && markers.iter().any(|m| line.contains(m.as_str()))
            }
            Self::Pattern(re) => !line.is_empty() && re.is_match(line),
        }
    }
}

/// Splits content into chapters
#[derive(Debug, Clone)]
pub struct Segmenter {
    recognizer: HeadingRecognizer,
    body_title: String,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(HeadingRecognizer::default())
    }
}

/// Chapter being accumulated during the scan
struct OpenChapter {
    title: String,
    start: usize,
}

impl Segmenter {
    pub fn new(recognizer: HeadingRecognizer) -> Self {
        Self {
            recognizer,
            body_title: DEFAULT_BODY_TITLE.to_string(),
        }
    }

    /// Build a segmenter from configuration
    pub fn from_config(config: &SegmenterConfig) -> Result<Self, regex::Error> {
        let recognizer = match &config.heading_pattern {
            Some(pattern) => HeadingRecognizer::Pattern(Regex::new(pattern)?),
            None => HeadingRecognizer::Markers {
                prefix: config.heading_prefix.clone(),
                markers: config.heading_markers.clone(),
            },
        };
        Ok(Self::new(recognizer).with_body_title(&config.body_title))
    }

    /// Override the body chapter title; blank titles are ignored
    pub fn with_body_title(mut self, title: &str) -> Self {
        let title = title.trim();
        if !title.is_empty() {
            self.body_title = title.to_string();
        }
        self
    }

    /// Split `content` into ordered, contiguous chapters
    pub fn segment(&self, content: &str) -> Vec<Chapter> {
        debug!(len = content.len(), "Segmenter::segment: called");
        let mut chapters = Vec::new();
        let mut open = OpenChapter {
            title: self.body_title.clone(),
            start: 0,
        };

        let mut offset = 0;
        for line in content.split_inclusive('\n') {
            let trimmed = line.trim();
            if self.recognizer.is_heading(trimmed) {
                let next = OpenChapter {
                    title: trimmed.to_string(),
                    start: offset,
                };
                close(&mut chapters, std::mem::replace(&mut open, next), offset);
            }
            offset += line.len();
        }
        close(&mut chapters, open, content.len());

        // Boundaries are final only now
        for chapter in &mut chapters {
            chapter.word_count = count_words(&content[chapter.start_offset..chapter.end_offset]);
        }

        debug!(chapters = chapters.len(), "Segmenter::segment: done");
        chapters
    }
}

/// Append the chapter unless its span is empty
fn close(chapters: &mut Vec<Chapter>, open: OpenChapter, end: usize) {
    if end <= open.start {
        return;
    }
    chapters.push(Chapter {
        index: chapters.len(),
        title: open.title,
        start_offset: open.start,
        end_offset: end,
        word_count: 0,
    });
}

/// Count words, treating each CJK character as a word of its own
pub fn count_words(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    for c in text.chars() {
        if is_cjk(c) {
            count += 1;
            in_word = false;
        } else if c.is_alphanumeric() {
            if !in_word {
                count += 1;
                in_word = true;
            }
        } else {
            in_word = false;
        }
    }
    count
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF     // hiragana, katakana
        | 0x3400..=0x4DBF   // extension A
        | 0x4E00..=0x9FFF   // unified ideographs
        | 0xAC00..=0xD7AF   // hangul syllables
        | 0xF900..=0xFAFF   // compatibility ideographs
        | 0x20000..=0x2FA1F)
}
