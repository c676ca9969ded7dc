//! Remote link snapshot sync.
//!
//! Downloads the remote dataset and writes the distinct values of its link
//! column to a plain-text file, one per line. The ledger reads this file so
//! that videos published by any run or contributor are never reprocessed.

use std::collections::BTreeSet;
use std::path::Path;

use tokio::fs;
use tracing::info;

use crate::adapters::RemoteDataset;
use crate::domain::HarvestError;

/// Counts reported by a successful sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub rows: usize,
    pub links: usize,
}

/// Refresh the snapshot at `path` from `remote`.
///
/// The file is only replaced after a successful fetch, and via a temp file
/// plus rename, so a failed or interrupted sync keeps the previous snapshot.
pub async fn sync_link_snapshot(
    remote: &dyn RemoteDataset,
    path: &Path,
    link_column: &str,
) -> Result<SyncSummary, HarvestError> {
    let table = remote
        .fetch()
        .await
        .map_err(|e| HarvestError::external("fetch", e))?;

    // A dataset without data files has no columns and no links yet
    if !table.headers.is_empty() && table.column_index(link_column).is_none() {
        return Err(HarvestError::external(
            "fetch",
            format!("remote dataset has no '{}' column", link_column),
        ));
    }

    let links: BTreeSet<&str> = table
        .column(link_column)
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut content = String::new();
    for link in &links {
        content.push_str(link);
        content.push('\n');
    }

    let local_err = |e: std::io::Error| HarvestError::CorruptLocalState {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(local_err)?;
        }
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, content).await.map_err(local_err)?;
    fs::rename(&tmp, path).await.map_err(local_err)?;

    info!(
        dataset = %remote.id(),
        rows = table.len(),
        links = links.len(),
        path = %path.display(),
        "Link snapshot updated"
    );

    Ok(SyncSummary {
        rows: table.len(),
        links: links.len(),
    })
}
