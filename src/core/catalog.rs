//! Video catalog: append-only, deduplicated-by-id list of discovered videos.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::domain::item::{parse_upload_date, RawEntry, SourceItem, CATALOG_COLUMNS};
use crate::domain::HarvestError;
use crate::storage::{StoreError, Table, TableStore};

/// Catalog of discovered videos backed by a table store
pub struct VideoCatalog<'a> {
    store: &'a dyn TableStore,
}

impl<'a> VideoCatalog<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    /// Ids already persisted.
    ///
    /// An unreadable store yields an empty set: everything gets appended
    /// again rather than the stage halting.
    pub async fn known_ids(&self) -> HashSet<String> {
        match self.store.read_all().await {
            Ok(Some(table)) => table.column("id").map(str::to_string).collect(),
            Ok(None) => HashSet::new(),
            Err(e) => {
                warn!(
                    location = %self.store.location(),
                    error = %e,
                    "Catalog unreadable; treating known ids as empty"
                );
                HashSet::new()
            }
        }
    }

    /// Filter, deduplicate and append newly discovered entries.
    ///
    /// Returns the items actually appended, in first-seen order.
    pub async fn discover(
        &self,
        entries: impl IntoIterator<Item = RawEntry>,
    ) -> Result<Vec<SourceItem>, StoreError> {
        let mut seen = self.known_ids().await;
        let mut appended = Vec::new();
        let mut malformed = 0usize;
        let mut duplicates = 0usize;

        for entry in entries {
            let Some(item) = SourceItem::from_raw(entry) else {
                malformed += 1;
                continue;
            };

            if !seen.insert(item.id.clone()) {
                duplicates += 1;
                continue;
            }

            appended.push(item);
        }

        debug!(malformed, duplicates, "Filtered discovered entries");

        if appended.is_empty() {
            info!("All discovered videos are already in the catalog");
            return Ok(appended);
        }

        let rows: Vec<Vec<String>> = appended.iter().map(SourceItem::to_row).collect();
        self.store.append(&CATALOG_COLUMNS, &rows).await?;

        info!(
            count = appended.len(),
            location = %self.store.location(),
            "Appended new videos to catalog"
        );
        Ok(appended)
    }

    /// Load all catalog items in insertion order.
    ///
    /// A missing catalog is `EmptyUpstream`; an unreadable one is
    /// `CorruptLocalState`. Rows without an id or url are skipped.
    pub async fn items(&self) -> Result<Vec<SourceItem>, HarvestError> {
        let table = match self.store.read_all().await {
            Ok(Some(table)) => table,
            Ok(None) => {
                return Err(HarvestError::EmptyUpstream(format!(
                    "no catalog at {}",
                    self.store.location()
                )))
            }
            Err(e) => {
                return Err(HarvestError::CorruptLocalState {
                    path: self.store.location(),
                    message: e.to_string(),
                })
            }
        };

        Ok(items_from_table(&table))
    }
}

fn items_from_table(table: &Table) -> Vec<SourceItem> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            let cell = |name: &str| table.get(row, name).unwrap_or_default().to_string();
            let id = cell("id");
            let url = cell("url");
            if id.is_empty() || url.is_empty() {
                warn!(?row, "Skipping catalog row without id or url");
                return None;
            }

            Some(SourceItem {
                date: parse_upload_date(&cell("date")),
                title: cell("title"),
                uploader: cell("uploader"),
                id,
                url,
            })
        })
        .collect()
}
