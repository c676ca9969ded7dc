//! quizharvest - Idempotent playlist-to-dataset quiz extraction
//!
//! Turns a video playlist into a published question/answer dataset in
//! four re-runnable stages: enumerate the playlist into a catalog, sync the
//! set of already-processed links from the remote dataset, extract
//! questions for every unprocessed video, and publish the results.
//!
//! # Architecture
//!
//! Every stage is idempotent:
//! - The catalog only ever gains videos whose id it has not seen
//! - Extraction skips any video whose url the link ledger already holds
//! - Results are append-only; a failed video leaves no rows behind
//! - Publishing merges local rows after the remote rows in one commit
//!
//! # Modules
//!
//! - `adapters`: External systems (yt-dlp, Gemini, Hugging Face Hub)
//! - `core`: Catalog, ledger, runner, results log and publish reconciler
//! - `domain`: Data structures (SourceItem, QaRecord, RunReport)
//! - `storage`: Tabular store port and its CSV and in-memory backends
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! quizharvest fetch --playlist <url>
//! quizharvest sync
//! quizharvest analyze
//! quizharvest push --mode merge
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod storage;

// Re-export main types at crate root for convenience
pub use core::{
    ExtractionRunner, LinkLedger, PublishMode, PublishReconciler, ResultsLog, VideoCatalog,
};
pub use domain::{HarvestError, QaRecord, RunReport, SourceItem};
pub use storage::{CsvFileStore, MemoryStore, Table, TableStore};
