//! Extraction Integration Tests
//!
//! Tests for the skip rule, per-item failure isolation and the link ledger
//! built from CSV files on disk.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use quizharvest::adapters::Extractor;
use quizharvest::core::{ExtractionRunner, LinkLedger, ProcessedLinkSet, ResultsLog};
use quizharvest::domain::record::RESULT_COLUMNS;
use quizharvest::domain::{Conversation, ItemStatus, QaTriple, SourceItem, Speaker};
use quizharvest::storage::{CsvFileStore, MemoryStore, TableStore};

/// Extractor with canned answers per url; unknown urls fail
struct ScriptedExtractor {
    answers: HashMap<String, Vec<QaTriple>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    fn new(answers: Vec<(&str, Vec<QaTriple>)>) -> Self {
        Self {
            answers: answers
                .into_iter()
                .map(|(url, triples)| (url.to_string(), triples))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, item: &SourceItem) -> Result<Vec<QaTriple>> {
        self.calls.lock().unwrap().push(item.url.clone());
        match self.answers.get(&item.url) {
            Some(triples) => Ok(triples.clone()),
            None => anyhow::bail!("quota exceeded for {}", item.url),
        }
    }
}

fn item(id: &str, url: &str) -> SourceItem {
    SourceItem {
        id: id.to_string(),
        url: url.to_string(),
        title: format!("Round {}", id),
        date: None,
        uploader: "Quiz Channel".to_string(),
    }
}

#[tokio::test]
async fn test_only_unprocessed_item_is_extracted() {
    let catalog = vec![item("v1", "u1"), item("v2", "u2")];
    let ledger: ProcessedLinkSet = ["u1"].into_iter().collect();
    let extractor = ScriptedExtractor::new(vec![
        ("u1", vec![QaTriple::new(9, "never", "asked")]),
        ("u2", vec![QaTriple::new(1, "Q", "A")]),
    ]);

    let store = MemoryStore::new();
    let results = ResultsLog::new(&store);
    let report = ExtractionRunner::new(&extractor, &results)
        .run(&catalog, &ledger)
        .await;

    assert_eq!(extractor.calls(), vec!["u2"]);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.records_appended(), 1);

    let table = results.read_all().await.unwrap();
    assert_eq!(table.len(), 1);
    let row = &table.rows[0];
    assert_eq!(table.get(row, "youtube_id"), Some("v2"));
    assert_eq!(table.get(row, "youtube_link"), Some("u2"));
    assert_eq!(table.get(row, "question_number"), Some("1"));

    let conversation = Conversation::parse(table.get(row, "conversation").unwrap()).unwrap();
    assert_eq!(conversation.0.len(), 2);
    assert_eq!(conversation.0[0].from, Speaker::Human);
    assert_eq!(conversation.0[0].value, "Q");
    assert_eq!(conversation.0[1].from, Speaker::Gpt);
    assert_eq!(conversation.0[1].value, "A");
}

#[tokio::test]
async fn test_extractor_never_called_for_ledger_urls() {
    let catalog: Vec<SourceItem> = (1..=5)
        .map(|i| item(&format!("v{}", i), &format!("u{}", i)))
        .collect();
    let ledger: ProcessedLinkSet = ["u1", "u3", "u5"].into_iter().collect();
    let extractor = ScriptedExtractor::new(vec![
        ("u2", vec![QaTriple::new(1, "Q2", "A2")]),
        ("u4", vec![QaTriple::new(1, "Q4", "A4")]),
    ]);

    let store = MemoryStore::new();
    let results = ResultsLog::new(&store);
    ExtractionRunner::new(&extractor, &results)
        .run(&catalog, &ledger)
        .await;

    let calls = extractor.calls();
    assert_eq!(calls, vec!["u2", "u4"]);
    assert!(calls.iter().all(|url| !ledger.contains(url)));
}

#[tokio::test]
async fn test_failure_does_not_lose_neighbouring_records() {
    let catalog = vec![item("v1", "u1"), item("v2", "u2"), item("v3", "u3")];
    // u2 has no canned answer and fails
    let extractor = ScriptedExtractor::new(vec![
        ("u1", vec![QaTriple::new(1, "Q1", "A1"), QaTriple::new(2, "Q1b", "A1b")]),
        ("u3", vec![QaTriple::new(1, "Q3", "A3")]),
    ]);

    let store = MemoryStore::new();
    let results = ResultsLog::new(&store);
    let report = ExtractionRunner::new(&extractor, &results)
        .run(&catalog, &ProcessedLinkSet::new())
        .await;

    assert_eq!(report.failed(), 1);
    assert_eq!(report.records_appended(), 3);
    let failure = report.failures().next().unwrap();
    assert_eq!(failure.url, "u2");
    assert!(matches!(&failure.status, ItemStatus::Failed { error } if error.contains("quota")));

    let table = results.read_all().await.unwrap();
    let links: Vec<&str> = table.column("youtube_link").collect();
    assert_eq!(links, vec!["u1", "u1", "u3"]);
}

#[tokio::test]
async fn test_ledger_from_results_file_includes_stray_links() {
    let temp = TempDir::new().unwrap();
    let results_path = temp.path().join("competition_results.csv");
    let snapshot_path = temp.path().join("processed_links.txt");

    let store = CsvFileStore::new(&results_path);
    let mut rows = Vec::new();
    for (i, url) in ["u1", "u2", "u3"].iter().enumerate() {
        let mut row = vec![String::new(); RESULT_COLUMNS.len()];
        row[2] = url.to_string();
        row[3] = format!("v{}", i + 1);
        rows.push(row);
    }
    // u4 shows up in the title column of a legacy row
    rows[1][1] = "u4".to_string();
    store.append(&RESULT_COLUMNS, &rows).await.unwrap();

    let ledger = LinkLedger::new(&store, &snapshot_path).build().await;

    for url in ["u1", "u2", "u3", "u4"] {
        assert!(ledger.contains(url), "ledger should contain {}", url);
    }
}

#[tokio::test]
async fn test_rerun_after_partial_run_resumes() {
    let temp = TempDir::new().unwrap();
    let results_path = temp.path().join("competition_results.csv");
    let snapshot_path = temp.path().join("processed_links.txt");
    let store = CsvFileStore::new(&results_path);
    let results = ResultsLog::new(&store);
    let catalog = vec![item("v1", "u1"), item("v2", "u2")];

    // First run: u2 fails
    let flaky = ScriptedExtractor::new(vec![("u1", vec![QaTriple::new(1, "Q1", "A1")])]);
    let ledger = LinkLedger::new(&store, &snapshot_path).build().await;
    let first = ExtractionRunner::new(&flaky, &results).run(&catalog, &ledger).await;
    assert_eq!(first.failed(), 1);

    // Second run: only u2 is attempted
    let healthy = ScriptedExtractor::new(vec![
        ("u1", vec![QaTriple::new(1, "Q1", "A1")]),
        ("u2", vec![QaTriple::new(1, "Q2", "A2")]),
    ]);
    let ledger = LinkLedger::new(&store, &snapshot_path).build().await;
    let second = ExtractionRunner::new(&healthy, &results).run(&catalog, &ledger).await;

    assert_eq!(healthy.calls(), vec!["u2"]);
    assert_eq!(second.skipped(), 1);

    let table = results.read_all().await.unwrap();
    assert_eq!(table.len(), 2);
}
