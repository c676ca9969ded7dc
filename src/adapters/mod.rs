//! Adapter interfaces for external systems.
//!
//! The pipeline core only sees these traits. Concrete adapters:
//! - `YtDlpPlaylist`: playlist enumeration through the `yt-dlp` CLI
//! - `GeminiExtractor`: question/answer extraction through the Gemini API
//! - `HfDataset`: remote dataset on the Hugging Face Hub

pub mod gemini;
pub mod huggingface;
pub mod ytdlp;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{QaTriple, RawEntry, SourceItem};
use crate::storage::Table;

pub use gemini::GeminiExtractor;
pub use huggingface::HfDataset;
pub use ytdlp::YtDlpPlaylist;

/// Enumerates the entries of a remote playlist
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Up to `max_items` raw entries, in playlist order
    async fn entries(&self, playlist_url: &str, max_items: usize) -> Result<Vec<RawEntry>>;
}

/// Turns a video into question/answer triples
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Human-readable extractor name
    fn name(&self) -> &str;

    /// Triples in the order the service returned them; empty means no data
    async fn extract(&self, item: &SourceItem) -> Result<Vec<QaTriple>>;
}

/// The shared remote dataset
#[async_trait]
pub trait RemoteDataset: Send + Sync {
    /// Dataset identifier for logs
    fn id(&self) -> &str;

    /// Every row currently published
    async fn fetch(&self) -> Result<Table>;

    /// Replace the published rows with `table` in one atomic write
    async fn publish(&self, table: &Table, message: &str) -> Result<()>;
}
