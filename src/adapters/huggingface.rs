//! Hugging Face Hub adapter for the shared dataset.
//!
//! A dataset repository holds its rows either as the CSV data file this tool
//! commits, or as the parquet shards written by the `datasets` library
//! (`data/train-00000-of-00001.parquet`). Fetching lists the repository
//! first. A missing repository is an error. The CSV file wins when present;
//! otherwise the split's parquet shards are downloaded and concatenated, and
//! a repository with neither holds an empty dataset.
//!
//! Publishing uploads the whole table as the CSV file and deletes the
//! split's parquet shards in the same commit, so readers see either the old
//! rows or the new ones.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use parquet::file::reader::{ChunkReader, FileReader, SerializedFileReader};
use parquet::record::Field;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::RemoteDataset;
use crate::storage::csv_file::{encode_csv, parse_csv};
use crate::storage::Table;

pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
pub const DEFAULT_DATA_FILE: &str = "data/train.csv";

/// Days from 0001-01-01 to 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Dataset repository on the Hugging Face Hub
pub struct HfDataset {
    repo_id: String,
    data_file: String,
    revision: String,
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    #[serde(default)]
    siblings: Vec<Sibling>,
}

#[derive(Debug, Deserialize)]
struct Sibling {
    rfilename: String,
}

impl HfDataset {
    pub fn new(repo_id: impl Into<String>, token: Option<String>) -> Self {
        Self {
            repo_id: repo_id.into(),
            data_file: DEFAULT_DATA_FILE.to_string(),
            revision: "main".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    /// Path of the CSV file inside the repository
    pub fn with_data_file(mut self, data_file: impl Into<String>) -> Self {
        self.data_file = data_file.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    fn info_url(&self) -> String {
        format!(
            "{}/api/datasets/{}/revision/{}",
            self.endpoint, self.repo_id, self.revision
        )
    }

    fn file_url(&self, path: &str) -> String {
        format!(
            "{}/datasets/{}/resolve/{}/{}",
            self.endpoint, self.repo_id, self.revision, path
        )
    }

    fn commit_url(&self) -> String {
        format!(
            "{}/api/datasets/{}/commit/{}",
            self.endpoint, self.repo_id, self.revision
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .context("A Hugging Face token is required to publish")
    }

    /// Every file path in the repository at `revision`
    async fn repo_files(&self) -> Result<Vec<String>> {
        let response = self
            .authorized(self.client.get(self.info_url()))
            .send()
            .await
            .with_context(|| format!("Failed to list dataset {}", self.repo_id))?;

        match response.status() {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => anyhow::bail!("Dataset {} not found", self.repo_id),
            s => anyhow::bail!("Listing dataset {} failed ({})", self.repo_id, s),
        }

        let info: RepoInfo = response
            .json()
            .await
            .context("Failed to decode repository info")?;
        Ok(info.siblings.into_iter().map(|s| s.rfilename).collect())
    }

    /// Download one repository file
    async fn download(&self, path: &str) -> Result<reqwest::Response> {
        let response = self
            .authorized(self.client.get(self.file_url(path)))
            .send()
            .await
            .with_context(|| format!("Failed to download {} from {}", path, self.repo_id))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("{} in dataset {} not available ({})", path, self.repo_id, status);
        }
        Ok(response)
    }

    /// Create the dataset repository; an existing repository is fine
    async fn ensure_repo(&self) -> Result<()> {
        let token = self.require_token()?;
        let (organization, name) = match self.repo_id.split_once('/') {
            Some((org, name)) => (Some(org), name),
            None => (None, self.repo_id.as_str()),
        };

        let response = self
            .client
            .post(format!("{}/api/repos/create", self.endpoint))
            .bearer_auth(token)
            .json(&json!({
                "type": "dataset",
                "name": name,
                "organization": organization,
            }))
            .send()
            .await
            .context("Failed to reach the Hub")?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT => {
                debug!(repo = %self.repo_id, "Dataset repository already exists");
                Ok(())
            }
            s => {
                let body = response.text().await.unwrap_or_default();
                anyhow::bail!("Creating dataset {} failed ({}): {}", self.repo_id, s, body.trim())
            }
        }
    }

    /// Newline-delimited commit payload writing the data file and deleting
    /// `stale` files
    fn commit_payload(&self, table: &Table, message: &str, stale: &[String]) -> Result<String> {
        let csv = encode_csv(table).context("Failed to encode dataset as CSV")?;

        let mut lines: Vec<Value> = vec![
            json!({
                "key": "header",
                "value": { "summary": message, "description": "" },
            }),
            json!({
                "key": "file",
                "value": {
                    "path": self.data_file,
                    "encoding": "base64",
                    "content": STANDARD.encode(csv),
                },
            }),
        ];
        lines.extend(stale.iter().map(|path| {
            json!({
                "key": "deletedFile",
                "value": { "path": path },
            })
        }));

        let mut payload = String::new();
        for line in lines {
            payload.push_str(&line.to_string());
            payload.push('\n');
        }
        Ok(payload)
    }
}

/// Parquet shards of the split named by `data_file`, sorted.
///
/// `data/train.csv` selects `data/train-*.parquet`.
fn split_shards(data_file: &str, files: &[String]) -> Vec<String> {
    let data_path = Path::new(data_file);
    let dir = data_path.parent().unwrap_or(Path::new(""));
    let Some(split) = data_path.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let prefix = format!("{}-", split);

    let mut shards: Vec<String> = files
        .iter()
        .filter(|f| {
            let p = Path::new(f.as_str());
            p.parent().unwrap_or(Path::new("")) == dir
                && p.extension().is_some_and(|e| e == "parquet")
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(&prefix))
        })
        .cloned()
        .collect();
    shards.sort();
    shards
}

/// Decode one parquet shard; every top-level field becomes a column of text
pub fn parse_parquet<R: ChunkReader + 'static>(source: R) -> Result<Table> {
    let reader = SerializedFileReader::new(source).context("Invalid parquet file")?;
    let headers: Vec<String> = reader
        .metadata()
        .file_metadata()
        .schema()
        .get_fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect();

    let mut rows = Vec::new();
    for row in reader.get_row_iter(None).context("Failed to read parquet rows")? {
        let row = row.context("Corrupt parquet row")?;
        let mut cells = vec![String::new(); headers.len()];
        for (name, field) in row.get_column_iter() {
            if let Some(i) = headers.iter().position(|h| h == name) {
                cells[i] = cell_text(field);
            }
        }
        rows.push(cells);
    }

    Ok(Table { headers, rows })
}

fn cell_text(field: &Field) -> String {
    match field {
        Field::Null => String::new(),
        Field::Str(s) => s.clone(),
        Field::Date(days) => days
            .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
            .and_then(NaiveDate::from_num_days_from_ce_opt)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RemoteDataset for HfDataset {
    fn id(&self) -> &str {
        &self.repo_id
    }

    async fn fetch(&self) -> Result<Table> {
        let files = self.repo_files().await?;

        if files.iter().any(|f| *f == self.data_file) {
            let bytes = self
                .download(&self.data_file)
                .await?
                .bytes()
                .await
                .context("Failed to read dataset body")?;
            return parse_csv(&bytes)
                .with_context(|| format!("Dataset {} is not valid CSV", self.repo_id));
        }

        let shards = split_shards(&self.data_file, &files);
        if shards.is_empty() {
            info!(repo = %self.repo_id, "Dataset has no data files yet");
            return Ok(Table::default());
        }

        let mut table = Table::default();
        for shard in &shards {
            let bytes = self
                .download(shard)
                .await?
                .bytes()
                .await
                .with_context(|| format!("Failed to read {}", shard))?;
            let part = parse_parquet(bytes)
                .with_context(|| format!("Shard {} of {} is unreadable", shard, self.repo_id))?;
            debug!(%shard, rows = part.len(), "Read parquet shard");
            table.extend_aligned(&part);
        }

        info!(
            repo = %self.repo_id,
            shards = shards.len(),
            rows = table.len(),
            "Read dataset from parquet shards"
        );
        Ok(table)
    }

    async fn publish(&self, table: &Table, message: &str) -> Result<()> {
        self.ensure_repo().await?;
        let token = self.require_token()?;

        let files = self
            .repo_files()
            .await
            .context("Failed to list dataset before commit")?;
        let stale = split_shards(&self.data_file, &files);
        if !stale.is_empty() {
            info!(
                repo = %self.repo_id,
                shards = stale.len(),
                data_file = %self.data_file,
                "Replacing parquet shards with the CSV data file"
            );
        }
        let payload = self.commit_payload(table, message, &stale)?;

        let response = self
            .client
            .post(self.commit_url())
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(payload)
            .send()
            .await
            .context("Failed to send commit to the Hub")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Commit to {} failed ({}): {}", self.repo_id, status, body.trim());
        }

        Ok(())
    }
}
