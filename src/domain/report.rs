//! Extraction run report.
//!
//! A run never raises on a single item. Each item ends in an `ItemOutcome`
//! and the runner aggregates them here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to one catalog item during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ItemStatus {
    /// Url already in the ledger; extractor not called
    Skipped,

    /// Extractor returned no questions; nothing appended
    NoData,

    /// Records appended to the results log
    Appended { records: usize },

    /// Extraction or append failed
    Failed { error: String },
}

/// Outcome for a single catalog item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    /// 1-based position in the catalog
    pub index: usize,
    pub id: String,
    pub url: String,
    pub status: ItemStatus,
}

/// Summary of one extraction run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<ItemOutcome>,
}

impl RunReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            completed_at: None,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Skipped))
    }

    pub fn no_data(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::NoData))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failed { .. }))
    }

    /// Items that produced at least one record
    pub fn processed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Appended { .. }))
    }

    /// Total records appended across all items
    pub fn records_appended(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                ItemStatus::Appended { records } => records,
                _ => 0,
            })
            .sum()
    }

    /// Failed items, in catalog order
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, ItemStatus::Failed { .. }))
    }

    /// True when there were items and every one was already in the ledger
    pub fn is_noop(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.len() == self.skipped()
    }

    fn count(&self, pred: impl Fn(&ItemStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}
