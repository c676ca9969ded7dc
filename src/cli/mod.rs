//! Command-line interface for quizharvest.
//!
//! Each pipeline stage is a separate command, meant to be run in order:
//! `fetch` → `sync` → `analyze` → `push`. Every command can be re-run safely.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::adapters::{GeminiExtractor, HfDataset, PlaylistSource, RemoteDataset, YtDlpPlaylist};
use crate::config::{self, ResolvedConfig};
use crate::core::{
    sync_link_snapshot, ExtractionRunner, LinkLedger, PublishMode, PublishReconciler, ResultsLog,
    VideoCatalog,
};
use crate::domain::{require_env, Conversation, HarvestError, ItemStatus};
use crate::storage::{CsvFileStore, TableStore};

/// quizharvest - Idempotent playlist-to-dataset quiz extraction
#[derive(Parser, Debug)]
#[command(name = "quizharvest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enumerate the playlist and append new videos to the catalog
    Fetch {
        /// Playlist URL (defaults to playlist.url from the config file)
        #[arg(short, long)]
        playlist: Option<String>,

        /// Maximum number of playlist entries to read
        #[arg(short, long)]
        count: Option<usize>,
    },

    /// Refresh the processed-link snapshot from the remote dataset
    Sync,

    /// Extract questions for every catalog video not processed yet
    Analyze,

    /// Publish local results to the remote dataset
    Push {
        /// merge: append to the remote rows; replace: upload local rows only
        #[arg(short, long, value_enum, default_value = "merge")]
        mode: ModeArg,

        /// Local results file (defaults to the configured results path)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Show remote dataset columns and a conversation sample
    Inspect,

    /// Show catalog, ledger and pending counts
    Status,

    /// Show resolved configuration (debug)
    Config,
}

/// Publish mode for CLI (maps to PublishMode)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Append local rows after the remote rows
    #[value(alias = "append")]
    Merge,

    /// Replace the remote rows with local rows
    #[value(alias = "overwrite")]
    Replace,
}

impl From<ModeArg> for PublishMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Merge => PublishMode::Merge,
            ModeArg::Replace => PublishMode::Replace,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = config::load_config()?;

        match self.command {
            Commands::Fetch { playlist, count } => fetch(&config, playlist, count).await,
            Commands::Sync => sync(&config).await,
            Commands::Analyze => analyze(&config).await,
            Commands::Push { mode, csv } => push(&config, mode.into(), csv).await,
            Commands::Inspect => inspect(&config).await,
            Commands::Status => status(&config).await,
            Commands::Config => show_config(&config),
        }
    }
}

fn remote_dataset(config: &ResolvedConfig, token: Option<String>) -> Result<HfDataset> {
    let repo = config.require_dataset()?;
    Ok(HfDataset::new(repo, token).with_data_file(config.data_file.clone()))
}

fn optional_token() -> Option<String> {
    std::env::var(config::ENV_HF_TOKEN).ok().filter(|t| !t.is_empty())
}

/// Enumerate the playlist and grow the catalog
async fn fetch(
    config: &ResolvedConfig,
    playlist: Option<String>,
    count: Option<usize>,
) -> Result<()> {
    let playlist = match playlist {
        Some(url) => url,
        None => config.require_playlist()?.to_string(),
    };
    let count = count.unwrap_or(config.max_items);

    let source = YtDlpPlaylist::new();
    let entries = source
        .entries(&playlist, count)
        .await
        .map_err(|e| HarvestError::external("playlist", e))?;

    if entries.is_empty() {
        println!("No videos found in playlist");
        return Ok(());
    }

    let store = CsvFileStore::new(&config.catalog_path);
    let appended = VideoCatalog::new(&store)
        .discover(entries)
        .await
        .with_context(|| format!("Failed to update catalog {}", config.catalog_path.display()))?;

    if appended.is_empty() {
        println!("All videos are already in the catalog");
    } else {
        println!(
            "Added {} new videos to {}",
            appended.len(),
            config.catalog_path.display()
        );
    }

    Ok(())
}

/// Rewrite the processed-link snapshot from the remote dataset
async fn sync(config: &ResolvedConfig) -> Result<()> {
    let remote = remote_dataset(config, optional_token())?;
    let summary = sync_link_snapshot(&remote, &config.snapshot_path, &config.link_column).await?;

    println!(
        "Remote dataset has {} rows covering {} videos; snapshot written to {}",
        summary.rows,
        summary.links,
        config.snapshot_path.display()
    );
    Ok(())
}

/// Run extraction over the catalog
async fn analyze(config: &ResolvedConfig) -> Result<()> {
    let api_key = require_env(config::ENV_GEMINI_KEY)?;

    let catalog_store = CsvFileStore::new(&config.catalog_path);
    let items = match VideoCatalog::new(&catalog_store).items().await {
        Ok(items) => items,
        Err(e) if e.is_noop() => {
            println!("No video catalog found; run `quizharvest fetch` first");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    println!("Videos in catalog: {}", items.len());
    if items.is_empty() {
        println!("Catalog has no videos; nothing to analyze");
        return Ok(());
    }

    let results_store = CsvFileStore::new(&config.results_path);
    let ledger = LinkLedger::new(&results_store, &config.snapshot_path)
        .with_scan(config.scan.clone())
        .build()
        .await;

    let extractor = GeminiExtractor::new(api_key, config.model.clone());
    let results = ResultsLog::new(&results_store);
    let report = ExtractionRunner::new(&extractor, &results)
        .with_timeout(config.item_timeout)
        .run(&items, &ledger)
        .await;

    if report.is_noop() {
        println!("Nothing to analyze: every video is already processed");
        return Ok(());
    }

    println!(
        "Run {}: {} videos processed ({} records), {} skipped, {} without data, {} failed",
        report.run_id,
        report.processed(),
        report.records_appended(),
        report.skipped(),
        report.no_data(),
        report.failed()
    );
    for outcome in report.failures() {
        if let ItemStatus::Failed { error } = &outcome.status {
            println!("  #{} {}: {}", outcome.index, outcome.url, error);
        }
    }

    Ok(())
}

/// Publish local results
async fn push(config: &ResolvedConfig, mode: PublishMode, csv: Option<PathBuf>) -> Result<()> {
    let token = require_env(config::ENV_HF_TOKEN)?;
    let remote = remote_dataset(config, Some(token))?;

    let path = csv.unwrap_or_else(|| config.results_path.clone());
    let store = CsvFileStore::new(&path);
    let local = store
        .read_all()
        .await
        .with_context(|| format!("Failed to read local results {}", path.display()))?
        .with_context(|| format!("Local results file not found: {}", path.display()))?;

    match PublishReconciler::new(&remote).publish(&local, mode).await {
        Ok(summary) => {
            if summary.applied != summary.requested {
                println!("Remote dataset unavailable; published local rows as a new dataset");
            }
            println!(
                "Published {} rows to {} ({} mode: {} remote + {} local)",
                summary.total_rows,
                remote.id(),
                summary.applied,
                summary.remote_rows,
                summary.local_rows
            );
            Ok(())
        }
        Err(e) if e.is_noop() => {
            println!("Local results are empty; nothing to publish");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Print remote columns and a conversation sample
async fn inspect(config: &ResolvedConfig) -> Result<()> {
    let remote = remote_dataset(config, optional_token())?;
    let table = remote
        .fetch()
        .await
        .map_err(|e| HarvestError::external("fetch", e))?;

    println!("Dataset: {} ({} rows)", remote.id(), table.len());
    println!("Columns: {}", table.headers.join(", "));

    if let Some(sample) = table.column("conversation").next() {
        println!("Conversation sample: {}", sample);
        match Conversation::parse(sample) {
            Ok(conv) => println!("Conversation turns: {}", conv.0.len()),
            Err(e) => println!("Conversation is not a turn list: {}", e),
        }
    }

    Ok(())
}

/// Print pipeline counts
async fn status(config: &ResolvedConfig) -> Result<()> {
    let catalog_store = CsvFileStore::new(&config.catalog_path);
    let items = match VideoCatalog::new(&catalog_store).items().await {
        Ok(items) => items,
        Err(e) if e.is_noop() => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let results_store = CsvFileStore::new(&config.results_path);
    let ledger = LinkLedger::new(&results_store, &config.snapshot_path)
        .with_scan(config.scan.clone())
        .build()
        .await;
    let pending = items.iter().filter(|i| !ledger.contains(&i.url)).count();

    println!("Catalog videos:  {}", items.len());
    println!("Known links:     {}", ledger.len());
    println!("Pending videos:  {}", pending);

    Ok(())
}

/// Print the resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    println!("quizharvest configuration");
    println!("=========================");
    match &config.config_file {
        Some(path) => println!("Config file:   {}", path.display()),
        None => println!("Config file:   (none, using defaults)"),
    }
    println!("Home:          {}", config.home.display());
    println!("Catalog:       {}", config.catalog_path.display());
    println!("Results:       {}", config.results_path.display());
    println!("Link snapshot: {}", config.snapshot_path.display());
    println!("Playlist:      {}", config.playlist_url.as_deref().unwrap_or("(not set)"));
    println!("Max items:     {}", config.max_items);
    println!("Model:         {}", config.model);
    println!("Item timeout:  {:?}", config.item_timeout);
    println!("Dataset:       {}", config.dataset_repo.as_deref().unwrap_or("(not set)"));
    println!("Data file:     {}", config.data_file);
    println!("Link column:   {}", config.link_column);
    println!("Ledger scan:   {:?}", config.scan);
    Ok(())
}
