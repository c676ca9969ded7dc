//! Link ledger: the set of video links that are already handled.
//!
//! Rebuilt from durable storage at the start of every extraction run:
//! the local results table plus a plain-text snapshot of the remote
//! dataset's link column. Both sources degrade open; anything unreadable
//! contributes nothing and the run processes more, never less.

use std::collections::HashSet;
use std::path::Path;

use tokio::fs;
use tracing::{debug, warn};

use crate::storage::{Table, TableStore};

/// Which cells of the results table count as "processed links".
///
/// `AllColumns` is deliberately over-inclusive: older results files put the
/// link in different columns, and some had no header row at all, so header
/// cells are scanned too. It can produce false-positive skips if an unrelated
/// cell happens to equal a video url. `Columns` pins specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LinkScan {
    #[default]
    AllColumns,
    Columns(Vec<String>),
}

impl LinkScan {
    /// Build from a configured column list; empty means all columns
    pub fn from_columns(columns: &[String]) -> Self {
        if columns.is_empty() {
            Self::AllColumns
        } else {
            Self::Columns(columns.to_vec())
        }
    }

    /// Candidate link strings in `table`
    pub fn candidates(&self, table: &Table) -> HashSet<String> {
        let cells: Box<dyn Iterator<Item = &str> + '_> = match self {
            Self::AllColumns => {
                Box::new(table.headers.iter().map(String::as_str).chain(table.cells()))
            }
            Self::Columns(names) => Box::new(names.iter().flat_map(|n| table.column(n))),
        };

        cells
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Links considered fully handled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedLinkSet {
    links: HashSet<String>,
}

impl ProcessedLinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.links.contains(url)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn is_superset(&self, other: &ProcessedLinkSet) -> bool {
        self.links.is_superset(&other.links)
    }

    /// Union another set in
    pub fn merge(&mut self, other: ProcessedLinkSet) {
        self.links.extend(other.links);
    }
}

impl<S: Into<String>> FromIterator<S> for ProcessedLinkSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for ProcessedLinkSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.links.extend(iter.into_iter().map(Into::into));
    }
}

/// Builds a `ProcessedLinkSet` from its backing stores. Read-only.
pub struct LinkLedger<'a> {
    results: &'a dyn TableStore,
    snapshot_path: &'a Path,
    scan: LinkScan,
}

impl<'a> LinkLedger<'a> {
    pub fn new(results: &'a dyn TableStore, snapshot_path: &'a Path) -> Self {
        Self {
            results,
            snapshot_path,
            scan: LinkScan::default(),
        }
    }

    pub fn with_scan(mut self, scan: LinkScan) -> Self {
        self.scan = scan;
        self
    }

    /// Union of local result links and the remote snapshot
    pub async fn build(&self) -> ProcessedLinkSet {
        let mut set = self.from_results().await;
        let local = set.len();
        set.merge(read_snapshot(self.snapshot_path).await);

        debug!(local, total = set.len(), "Built link ledger");
        set
    }

    async fn from_results(&self) -> ProcessedLinkSet {
        match self.results.read_all().await {
            Ok(Some(table)) => self.scan.candidates(&table).into_iter().collect(),
            Ok(None) => ProcessedLinkSet::new(),
            Err(e) => {
                warn!(
                    location = %self.results.location(),
                    error = %e,
                    "Results unreadable; ledger ignores local results"
                );
                ProcessedLinkSet::new()
            }
        }
    }
}

/// Read a newline-delimited link snapshot; missing or unreadable is empty
pub async fn read_snapshot(path: &Path) -> ProcessedLinkSet {
    if !path.exists() {
        return ProcessedLinkSet::new();
    }

    match fs::read_to_string(path).await {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Link snapshot unreadable; ignoring");
            ProcessedLinkSet::new()
        }
    }
}
