use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use story_core::{NewStory, StoryStore, Theme};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "story-indexer")]
#[command(about = "Load stories from JSON/JSONL and query the keyword index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a ranked search over the loaded stories
    Search {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Free-text query
        #[arg(long, short)]
        query: String,
        /// Maximum number of results
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Keep only results with this theme
        #[arg(long)]
        theme: Option<Theme>,
    },
    /// Print corpus and index statistics
    Stats {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
    },
}

#[derive(Serialize)]
struct Stats {
    stories: usize,
    words: usize,
    by_theme: Vec<(Theme, usize)>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { input, query, limit, theme } => {
            let store = load_store(Path::new(&input))?;
            let mut hits = store.search(&query, limit);
            if let Some(theme) = theme {
                hits.retain(|h| h.story.theme == theme);
            }
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Commands::Stats { input } => {
            let store = load_store(Path::new(&input))?;
            let stats = stats(&store);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

fn stats(store: &StoryStore) -> Stats {
    let by_theme = Theme::ALL
        .into_iter()
        .map(|t| (t, store.stories().iter().filter(|s| s.theme == t).count()))
        .filter(|(_, n)| *n > 0)
        .collect();
    Stats { stories: store.len(), words: store.index().num_words(), by_theme }
}

/// Collects `.json` / `.jsonl` files under `input` (or `input` itself) in path order.
fn input_files(input: &Path) -> Result<Vec<PathBuf>> {
    if !input.exists() {
        bail!("input path {} does not exist", input.display());
    }
    if !input.is_dir() {
        return Ok(vec![input.to_path_buf()]);
    }
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        let p = entry.path();
        if p.is_file() {
            if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                if matches!(ext, "json" | "jsonl") {
                    files.push(p.to_path_buf());
                }
            }
        }
    }
    Ok(files)
}

fn load_store(input: &Path) -> Result<StoryStore> {
    let mut store = StoryStore::new();
    for file in input_files(input)? {
        let stories = if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file)?
        } else {
            read_json(&file)?
        };
        tracing::debug!(file = %file.display(), count = stories.len(), "read stories");
        for story in stories {
            store.insert(story);
        }
    }
    tracing::info!(stories = store.len(), words = store.index().num_words(), "stories indexed");
    Ok(store)
}

fn read_jsonl(file: &Path) -> Result<Vec<NewStory>> {
    let reader = BufReader::new(File::open(file)?);
    let mut stories = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let story: NewStory = serde_json::from_str(&line).with_context(|| format!("{}:{}", file.display(), n + 1))?;
        stories.push(story);
    }
    Ok(stories)
}

fn read_json(file: &Path) -> Result<Vec<NewStory>> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let stories = match json {
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<NewStory>, _>>()
            .with_context(|| file.display().to_string())?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json).with_context(|| file.display().to_string())?],
        _ => Vec::new(),
    };
    Ok(stories)
}
