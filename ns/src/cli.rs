//! CLI argument parsing for novelstore

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ns")]
#[command(author, version, about = "Read and search plain-text novels", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show document metadata
    Info {
        /// Novel file
        #[arg(required = true)]
        path: PathBuf,
    },

    /// List detected chapters
    Chapters {
        /// Novel file
        #[arg(required = true)]
        path: PathBuf,
    },

    /// Print one chapter
    Read {
        /// Novel file
        #[arg(required = true)]
        path: PathBuf,

        /// Chapter index (0-based)
        #[arg(required = true)]
        index: usize,
    },

    /// Search for a keyword
    Search {
        /// Novel file
        #[arg(required = true)]
        path: PathBuf,

        /// Keyword (matched literally)
        #[arg(required = true)]
        keyword: String,

        /// Only search this chapter
        #[arg(long)]
        chapter: Option<usize>,

        /// Match regardless of case
        #[arg(short, long)]
        ignore_case: bool,

        /// Maximum results to print
        #[arg(short, long)]
        max_results: Option<usize>,
    },

    /// Print text with every occurrence of a keyword wrapped in a tag
    Highlight {
        /// Novel file
        #[arg(required = true)]
        path: PathBuf,

        /// Keyword (case-sensitive)
        #[arg(required = true)]
        keyword: String,

        /// Opening tag (default from config, normally <mark>)
        #[arg(short, long)]
        tag: Option<String>,

        /// Only highlight this chapter
        #[arg(long)]
        chapter: Option<usize>,
    },
}
