//! Pipeline core: the idempotency and dedup layer.
//!
//! This module contains:
//! - VideoCatalog: append-only, id-deduplicated list of discovered videos
//! - LinkLedger: set of already-processed links, the extraction skip gate
//! - ResultsLog: append-only table of extracted records
//! - ExtractionRunner: per-item extraction with skip-and-continue failures
//! - PublishReconciler: merge/replace publishing to the remote dataset
//! - sync: refresh of the remote link snapshot read by the ledger

pub mod catalog;
pub mod ledger;
pub mod publish;
pub mod results;
pub mod runner;
pub mod sync;

// Re-export commonly used types
pub use catalog::VideoCatalog;
pub use ledger::{read_snapshot, LinkLedger, LinkScan, ProcessedLinkSet};
pub use publish::{merge_tables, PublishMode, PublishReconciler, PublishSummary};
pub use results::ResultsLog;
pub use runner::{ExtractionRunner, DEFAULT_ITEM_TIMEOUT};
pub use sync::{sync_link_snapshot, SyncSummary};
