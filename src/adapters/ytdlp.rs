//! yt-dlp adapter for playlist enumeration.
//!
//! Lists the playlist with `--flat-playlist`, then asks for full metadata of
//! each video so the upload date and uploader are available. A video whose
//! metadata call fails is left out; the listing call failing fails the whole
//! enumeration.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::PlaylistSource;
use crate::domain::item::{watch_url, RawEntry};

/// Playlist enumeration through the `yt-dlp` binary
pub struct YtDlpPlaylist {
    binary_path: String,
    call_timeout: Duration,
}

impl Default for YtDlpPlaylist {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct FlatPlaylist {
    #[serde(default)]
    entries: Vec<Option<FlatEntry>>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: Option<String>,
    title: Option<String>,
    upload_date: Option<String>,
    uploader: Option<String>,
}

impl YtDlpPlaylist {
    pub fn new() -> Self {
        Self::with_binary_path("yt-dlp")
    }

    pub fn with_binary_path(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            call_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Run yt-dlp with `args` and return its stdout
    async fn run_json(&self, args: &[&str]) -> Result<String> {
        let child = Command::new(&self.binary_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.binary_path))?;

        let output = timeout(self.call_timeout, child.wait_with_output())
            .await
            .with_context(|| format!("yt-dlp timed out after {:?}", self.call_timeout))?
            .context("Failed to wait for yt-dlp")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "yt-dlp failed with exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        String::from_utf8(output.stdout).context("yt-dlp output is not valid UTF-8")
    }

    async fn video_info(&self, id: &str) -> Result<VideoInfo> {
        let url = watch_url(id);
        let json = self
            .run_json(&["-J", "--no-warnings", "--skip-download", &url])
            .await?;
        serde_json::from_str(&json).context("Failed to parse yt-dlp video JSON")
    }
}

#[async_trait]
impl PlaylistSource for YtDlpPlaylist {
    async fn entries(&self, playlist_url: &str, max_items: usize) -> Result<Vec<RawEntry>> {
        info!(%playlist_url, max_items, "Reading playlist");
        let items = format!("1-{}", max_items);
        let json = self
            .run_json(&["--flat-playlist", "-J", "--playlist-items", &items, playlist_url])
            .await?;
        let playlist: FlatPlaylist =
            serde_json::from_str(&json).context("Failed to parse yt-dlp playlist JSON")?;

        let ids: Vec<String> = playlist
            .entries
            .into_iter()
            .flatten()
            .filter_map(|e| e.id)
            .collect();
        let total = ids.len();
        info!(total, "Playlist listed; fetching video details");

        let mut entries = Vec::with_capacity(total);
        for (i, id) in ids.into_iter().enumerate() {
            if (i + 1) % 10 == 0 {
                info!("Progress: {}/{}", i + 1, total);
            }

            match self.video_info(&id).await {
                Ok(info) => entries.push(RawEntry {
                    id: info.id.or(Some(id.clone())),
                    title: info.title,
                    upload_date: info.upload_date,
                    uploader: info.uploader,
                    url: Some(watch_url(&id)),
                }),
                Err(e) => debug!(%id, error = %format!("{:#}", e), "Skipping unavailable video"),
            }
        }

        Ok(entries)
    }
}
