use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use serde::Serialize;
use tracing::info;

use novelstore::Library;
use novelstore::cli::{Cli, Command, OutputFormat};
use novelstore::config::Config;

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };

    // Logs go to stderr so stdout stays clean for output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let library = Library::from_config(&config)?;

    info!("novelstore starting");

    match cli.command {
        Command::Info { path } => {
            let doc = library.open(&path)?;
            let summary = doc.summary();
            if cli.format == OutputFormat::Json {
                return print_json(&summary);
            }
            println!("{}", summary.title.cyan());
            println!("  Format: {}", summary.format);
            println!("  Size: {} bytes", summary.size_bytes);
            println!("  Chapters: {}", summary.chapter_count);
            println!("  Words: {}", summary.word_count);
        }
        Command::Chapters { path } => {
            let doc = library.open(&path)?;
            if cli.format == OutputFormat::Json {
                return print_json(&doc.chapters());
            }
            for chapter in doc.chapters() {
                println!(
                    "{:>4} {} {}",
                    chapter.index.to_string().yellow(),
                    chapter.title,
                    format!("({} words)", chapter.word_count).dimmed()
                );
            }
        }
        Command::Read { path, index } => {
            library.open(&path)?;
            let text = library.chapter_text(&path, index)?;
            if cli.format == OutputFormat::Json {
                return print_json(&serde_json::json!({ "index": index, "text": text }));
            }
            print!("{}", text);
        }
        Command::Search {
            path,
            keyword,
            chapter,
            ignore_case,
            max_results,
        } => {
            library.open(&path)?;
            let mut results = match chapter {
                Some(index) => library.search_in_chapter(&path, index, &keyword, !ignore_case)?,
                None => library.search(&path, &keyword, !ignore_case)?,
            };
            if let Some(max) = max_results {
                results.truncate(max);
            }

            if cli.format == OutputFormat::Json {
                return print_json(&results);
            }
            let doc = library.get(&path)?;
            for r in &results {
                let chapter_title = doc.chapter_at(r.position).map(|c| c.title.as_str()).unwrap_or("");
                println!(
                    "{}:{} {} {}",
                    r.line.to_string().yellow(),
                    r.position.to_string().dimmed(),
                    chapter_title.cyan(),
                    r.context.replace('\n', " ")
                );
            }
            let stats = library.search_engine().statistics();
            println!(
                "{} {} matches on {} lines",
                "✓".green(),
                stats.match_count,
                stats.line_count
            );
        }
        Command::Highlight {
            path,
            keyword,
            tag,
            chapter,
        } => {
            let doc = library.open(&path)?;
            let text = match chapter {
                Some(index) => doc.chapter_text(index)?,
                None => doc.content(),
            };
            let highlighted = library.search_engine().highlight(text, &keyword, tag.as_deref());
            if cli.format == OutputFormat::Json {
                return print_json(&serde_json::json!({ "keyword": keyword, "text": highlighted }));
            }
            print!("{}", highlighted);
        }
    }

    Ok(())
}
