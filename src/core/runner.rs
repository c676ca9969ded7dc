//! Extraction runner.
//!
//! Walks the catalog in order and calls the extractor for every item whose
//! link is not in the ledger. The ledger is the only dedup gate and is not
//! refreshed during a run. A failing or stalled item becomes a `Failed`
//! outcome; the run always continues to the next item.

use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::Extractor;
use crate::domain::{ItemOutcome, ItemStatus, QaRecord, RunReport, SourceItem};

use super::ledger::ProcessedLinkSet;
use super::results::ResultsLog;

/// Default per-item extractor timeout
pub const DEFAULT_ITEM_TIMEOUT: Duration = Duration::from_secs(600);

pub struct ExtractionRunner<'a> {
    extractor: &'a dyn Extractor,
    results: &'a ResultsLog<'a>,
    item_timeout: Duration,
}

impl<'a> ExtractionRunner<'a> {
    pub fn new(extractor: &'a dyn Extractor, results: &'a ResultsLog<'a>) -> Self {
        Self {
            extractor,
            results,
            item_timeout: DEFAULT_ITEM_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, item_timeout: Duration) -> Self {
        self.item_timeout = item_timeout;
        self
    }

    /// Process every catalog item not in `ledger`, one at a time
    #[instrument(skip_all, fields(extractor = %self.extractor.name(), items = catalog.len()))]
    pub async fn run(&self, catalog: &[SourceItem], ledger: &ProcessedLinkSet) -> RunReport {
        let run_id = Uuid::new_v4();
        info!(%run_id, ledger = ledger.len(), "Starting extraction run");

        let mut report = RunReport::new(run_id);

        for (idx, item) in catalog.iter().enumerate() {
            let index = idx + 1;

            let status = if ledger.contains(&item.url) {
                debug!(index, url = %item.url, "Already processed; skipping");
                ItemStatus::Skipped
            } else {
                self.process_item(index, item).await
            };

            report.record(ItemOutcome {
                index,
                id: item.id.clone(),
                url: item.url.clone(),
                status,
            });
        }

        report.finish();
        info!(
            %run_id,
            processed = report.processed(),
            records = report.records_appended(),
            skipped = report.skipped(),
            no_data = report.no_data(),
            failed = report.failed(),
            "Extraction run finished"
        );
        report
    }

    async fn process_item(&self, index: usize, item: &SourceItem) -> ItemStatus {
        let title: String = item.title.chars().take(20).collect();
        info!(index, %title, "Analyzing video");
        let started = Instant::now();

        let triples = match timeout(self.item_timeout, self.extractor.extract(item)).await {
            Ok(Ok(triples)) => triples,
            Ok(Err(e)) => {
                error!(index, url = %item.url, error = %format!("{:#}", e), "Extraction failed");
                return ItemStatus::Failed {
                    error: format!("{:#}", e),
                };
            }
            Err(_) => {
                error!(
                    index,
                    url = %item.url,
                    timeout = ?self.item_timeout,
                    "Extraction timed out"
                );
                return ItemStatus::Failed {
                    error: format!("timed out after {:?}", self.item_timeout),
                };
            }
        };

        if triples.is_empty() {
            warn!(index, url = %item.url, "No questions found in video");
            return ItemStatus::NoData;
        }

        let mut records = Vec::with_capacity(triples.len());
        for triple in triples {
            let number = triple.question_number;
            match QaRecord::from_triple(item, triple) {
                Some(record) => records.push(record),
                None => {
                    error!(index, url = %item.url, number, "Invalid question number");
                    return ItemStatus::Failed {
                        error: format!("invalid question_number {}", number),
                    };
                }
            }
        }

        if let Err(e) = self.results.append(&records).await {
            error!(
                index,
                location = %self.results.location(),
                error = %e,
                "Failed to append records"
            );
            return ItemStatus::Failed {
                error: format!("append failed: {}", e),
            };
        }

        info!(
            index,
            records = records.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Video processed"
        );
        ItemStatus::Appended {
            records: records.len(),
        }
    }
}
