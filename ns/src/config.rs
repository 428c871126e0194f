//! Configuration for novelstore

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::search::{DEFAULT_CONTEXT_RADIUS, DEFAULT_HIGHLIGHT_TAG};
use crate::segmenter::DEFAULT_BODY_TITLE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chapter detection
    pub segmenter: SegmenterConfig,

    /// Search defaults
    pub search: SearchConfig,

    /// File loading limits
    pub library: LibraryConfig,
}

/// Chapter heading recognition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// A heading line starts with this text
    #[serde(rename = "heading-prefix")]
    pub heading_prefix: String,

    /// ...and contains at least one of these
    #[serde(rename = "heading-markers")]
    pub heading_markers: Vec<String>,

    /// Regex that replaces the prefix/markers rule when set
    #[serde(rename = "heading-pattern", skip_serializing_if = "Option::is_none")]
    pub heading_pattern: Option<String>,

    /// Title of the text before the first heading
    #[serde(rename = "body-title")]
    pub body_title: String,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            heading_prefix: "第".to_string(),
            heading_markers: vec!["章".to_string(), "节".to_string()],
            heading_pattern: None,
            body_title: DEFAULT_BODY_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Characters of context on each side of a match
    #[serde(rename = "context-radius")]
    pub context_radius: usize,

    /// Default highlight tag
    #[serde(rename = "highlight-tag")]
    pub highlight_tag: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            context_radius: DEFAULT_CONTEXT_RADIUS,
            highlight_tag: DEFAULT_HIGHLIGHT_TAG.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Largest file that will be opened, in MB (0 = no limit)
    #[serde(rename = "max-file-size-mb")]
    pub max_file_size_mb: u64,

    /// Encoding label tried when a text file is not valid UTF-8
    #[serde(rename = "fallback-encoding")]
    pub fallback_encoding: String,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            fallback_encoding: "gb18030".to_string(),
        }
    }
}

impl LibraryConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Config {
    /// Load `config_path`, else the first readable of `.novelstore.yml` and
    /// the user config, else defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::load_first(&Self::candidate_paths())),
        }
    }

    fn candidate_paths() -> Vec<PathBuf> {
        std::iter::once(PathBuf::from(".novelstore.yml"))
            .chain(dirs::config_dir().map(|dir| dir.join("novelstore").join("novelstore.yml")))
            .collect()
    }

    /// Files that exist but fail to parse are skipped with a warning
    fn load_first(candidates: &[PathBuf]) -> Self {
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Config::load: skipping config file"),
            }
        }
        tracing::debug!("Config::load: no config file found, using defaults");
        Self::default()
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context(format!("Failed to read config {}", path.display()))?;
        let config = serde_yaml::from_str(&content).context(format!("Failed to parse config {}", path.display()))?;
        tracing::info!(path = %path.display(), "Config::load: loaded");
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
