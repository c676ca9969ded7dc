//! Publish reconciler: pushes the local results to the remote dataset.
//!
//! Records are not deduplicated here. A merge publish of rows that are
//! already remote duplicates them; downstream consumers rely on the
//! append-only behavior, so compaction is left to a separate step.

use std::fmt;
use std::str::FromStr;

use tracing::{info, warn};

use crate::adapters::RemoteDataset;
use crate::domain::HarvestError;
use crate::storage::Table;

/// How local rows combine with the remote dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishMode {
    /// Remote rows first, then all local rows
    #[default]
    Merge,
    /// Local rows only; previous remote content is discarded
    Replace,
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishMode::Merge => write!(f, "merge"),
            PublishMode::Replace => write!(f, "replace"),
        }
    }
}

impl FromStr for PublishMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "merge" | "append" => Ok(PublishMode::Merge),
            "replace" | "overwrite" => Ok(PublishMode::Replace),
            _ => anyhow::bail!("Unknown publish mode: {}", s),
        }
    }
}

/// Result of a publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    /// Mode requested by the caller
    pub requested: PublishMode,
    /// Mode actually applied (merge falls back to replace when the fetch fails)
    pub applied: PublishMode,
    pub remote_rows: usize,
    pub local_rows: usize,
    pub total_rows: usize,
}

pub struct PublishReconciler<'a> {
    remote: &'a dyn RemoteDataset,
}

impl<'a> PublishReconciler<'a> {
    pub fn new(remote: &'a dyn RemoteDataset) -> Self {
        Self { remote }
    }

    /// Combine `local` with the remote dataset according to `mode` and publish.
    ///
    /// A failed remote fetch during merge is not fatal: the remote is treated
    /// as empty. A failed final write is returned as `TransientExternal` and
    /// the remote keeps its previous content.
    pub async fn publish(
        &self,
        local: &Table,
        mode: PublishMode,
    ) -> Result<PublishSummary, HarvestError> {
        if local.is_empty() {
            return Err(HarvestError::EmptyUpstream(
                "local results contain no rows".to_string(),
            ));
        }

        let (combined, applied, remote_rows) = match mode {
            PublishMode::Replace => {
                info!(dataset = %self.remote.id(), "Publishing local rows only (replace)");
                (local.clone(), PublishMode::Replace, 0)
            }
            PublishMode::Merge => match self.remote.fetch().await {
                Ok(remote) => {
                    let remote_rows = remote.len();
                    info!(
                        dataset = %self.remote.id(),
                        remote_rows,
                        local_rows = local.len(),
                        "Merging local rows after remote rows"
                    );
                    (merge_tables(remote, local), PublishMode::Merge, remote_rows)
                }
                Err(e) => {
                    warn!(
                        dataset = %self.remote.id(),
                        error = %format!("{:#}", e),
                        "Remote dataset unavailable; publishing local rows as a new dataset"
                    );
                    (local.clone(), PublishMode::Replace, 0)
                }
            },
        };

        let message = format!(
            "Publish {} rows ({} mode, {} local)",
            combined.len(),
            applied,
            local.len()
        );
        self.remote
            .publish(&combined, &message)
            .await
            .map_err(|e| HarvestError::external("publish", e))?;

        info!(
            dataset = %self.remote.id(),
            total = combined.len(),
            mode = %applied,
            "Dataset published"
        );

        Ok(PublishSummary {
            requested: mode,
            applied,
            remote_rows,
            local_rows: local.len(),
            total_rows: combined.len(),
        })
    }
}

/// Concatenate `remote` then `local`, preserving order within each side.
///
/// Columns are the remote header followed by any local-only columns; cells
/// missing on either side are left empty.
pub fn merge_tables(mut remote: Table, local: &Table) -> Table {
    remote.extend_aligned(local);
    remote
}
