//! Configuration for quizharvest.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (QUIZHARVEST_HOME, QUIZHARVEST_DATASET)
//! 2. Config file (.quizharvest/config.yaml)
//! 3. Defaults (data files in the current directory)
//!
//! Config file discovery:
//! - Searches the current directory and parents for .quizharvest/config.yaml
//! - Falls back to <config dir>/quizharvest/config.yaml
//! - Paths in a project config file are relative to the project root
//!   (the directory containing .quizharvest/)
//!
//! Credentials are never read from the config file. They come from the
//! environment, which `main` first populates from a `.env` file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::gemini::DEFAULT_MODEL;
use crate::adapters::huggingface::DEFAULT_DATA_FILE;
use crate::core::LinkScan;
use crate::domain::HarvestError;

pub const CONFIG_DIR: &str = ".quizharvest";
pub const CONFIG_FILE: &str = "config.yaml";

pub const ENV_HOME: &str = "QUIZHARVEST_HOME";
pub const ENV_DATASET: &str = "QUIZHARVEST_DATASET";
pub const ENV_GEMINI_KEY: &str = "GEMINI_API_KEY";
pub const ENV_HF_TOKEN: &str = "HF_TOKEN";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub playlist: PlaylistConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Data directory (relative to the project root)
    pub home: Option<String>,
    pub catalog: Option<String>,
    pub results: Option<String>,
    pub link_snapshot: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistConfig {
    pub url: Option<String>,
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractorConfig {
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatasetConfig {
    pub repo_id: Option<String>,
    pub data_file: Option<String>,
    pub link_column: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Columns scanned for processed links; empty scans every column
    #[serde(default)]
    pub scan_columns: Vec<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Directory holding the data files
    pub home: PathBuf,
    pub catalog_path: PathBuf,
    pub results_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub playlist_url: Option<String>,
    pub max_items: usize,
    pub model: String,
    pub item_timeout: Duration,
    pub dataset_repo: Option<String>,
    pub data_file: String,
    pub link_column: String,
    pub scan: LinkScan,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Environment overrides, read once by `load_config`
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub dataset: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            home: std::env::var(ENV_HOME).ok().filter(|v| !v.is_empty()),
            dataset: std::env::var(ENV_DATASET).ok().filter(|v| !v.is_empty()),
        }
    }
}

impl ResolvedConfig {
    /// Playlist url, or `MissingConfiguration`
    pub fn require_playlist(&self) -> Result<&str, HarvestError> {
        self.playlist_url
            .as_deref()
            .ok_or_else(|| HarvestError::MissingConfiguration("playlist.url".to_string()))
    }

    /// Dataset repo id, or `MissingConfiguration`
    pub fn require_dataset(&self) -> Result<&str, HarvestError> {
        self.dataset_repo
            .as_deref()
            .ok_or_else(|| {
                HarvestError::MissingConfiguration(format!("dataset.repo_id ({})", ENV_DATASET))
            })
    }
}

/// Find config file by searching `start` and its parents
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    let global = dirs::config_dir()?.join("quizharvest").join(CONFIG_FILE);
    global.exists().then_some(global)
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Combine a parsed config file with overrides and defaults
pub fn resolve_config(
    config_path: Option<&Path>,
    config: ConfigFile,
    cwd: &Path,
    env: EnvOverrides,
) -> ResolvedConfig {
    // Project configs live in <root>/.quizharvest/; the global one has no root
    let base_dir = config_path
        .filter(|p| {
            p.parent()
                .and_then(Path::file_name)
                .is_some_and(|name| name == CONFIG_DIR)
        })
        .and_then(|p| p.parent())
        .and_then(|p| p.parent())
        .unwrap_or(cwd)
        .to_path_buf();

    let home = match (env.home, &config.paths.home) {
        (Some(env_home), _) => PathBuf::from(env_home),
        (None, Some(home)) => resolve_path(&base_dir, home),
        (None, None) => base_dir,
    };

    let file = |configured: &Option<String>, default: &str| {
        resolve_path(&home, configured.as_deref().unwrap_or(default))
    };

    ResolvedConfig {
        catalog_path: file(&config.paths.catalog, "latest_videos.csv"),
        results_path: file(&config.paths.results, "competition_results.csv"),
        snapshot_path: file(&config.paths.link_snapshot, "processed_links.txt"),
        home: home.clone(),
        playlist_url: config.playlist.url,
        max_items: config.playlist.max_items.unwrap_or(750),
        model: config
            .extractor
            .model
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        item_timeout: Duration::from_secs(config.extractor.timeout_seconds.unwrap_or(600)),
        dataset_repo: env.dataset.or(config.dataset.repo_id),
        data_file: config
            .dataset
            .data_file
            .unwrap_or_else(|| DEFAULT_DATA_FILE.to_string()),
        link_column: config
            .dataset
            .link_column
            .unwrap_or_else(|| "youtube_link".to_string()),
        scan: LinkScan::from_columns(&config.ledger.scan_columns),
        config_file: config_path.map(Path::to_path_buf),
    }
}

/// Load configuration from all sources
pub fn load_config() -> Result<ResolvedConfig> {
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    load_config_from(&cwd, EnvOverrides::from_env())
}

/// Load configuration as if started in `cwd`
pub fn load_config_from(cwd: &Path, env: EnvOverrides) -> Result<ResolvedConfig> {
    let config_path = find_config_file(cwd);
    let config = match &config_path {
        Some(path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    Ok(resolve_config(config_path.as_deref(), config, cwd, env))
}
