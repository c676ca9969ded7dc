//! Idempotency Integration Tests
//!
//! Re-running a stage must not change what an earlier run already recorded.

use std::collections::HashSet;

use tempfile::TempDir;
use tokio::fs;

use quizharvest::core::{read_snapshot, LinkLedger, ResultsLog, VideoCatalog};
use quizharvest::domain::{QaRecord, QaTriple, RawEntry, SourceItem};
use quizharvest::storage::{CsvFileStore, TableStore};

fn entry(id: &str, title: &str) -> RawEntry {
    RawEntry {
        id: Some(id.to_string()),
        title: Some(title.to_string()),
        upload_date: Some("20240301".to_string()),
        uploader: Some("Quiz Channel".to_string()),
        url: None,
    }
}

async fn catalog_ids(store: &CsvFileStore) -> Vec<String> {
    let table = store.read_all().await.unwrap().unwrap();
    table.column("id").map(str::to_string).collect()
}

#[tokio::test]
async fn test_discover_twice_keeps_same_ids() {
    let temp = TempDir::new().unwrap();
    let store = CsvFileStore::new(temp.path().join("latest_videos.csv"));
    let catalog = VideoCatalog::new(&store);

    let entries = vec![
        entry("a", "Round A"),
        entry("b", "Round B"),
        entry("a", "Round A again"),
        entry("c", "[Private video]"),
    ];

    let first = catalog.discover(entries.clone()).await.unwrap();
    assert_eq!(first.len(), 2);
    let after_once = catalog_ids(&store).await;

    let second = catalog.discover(entries).await.unwrap();
    assert!(second.is_empty());
    let after_twice = catalog_ids(&store).await;

    assert_eq!(after_once, after_twice);
    assert_eq!(after_twice, vec!["a", "b"]);
}

#[tokio::test]
async fn test_discover_appends_only_new_ids() {
    let temp = TempDir::new().unwrap();
    let store = CsvFileStore::new(temp.path().join("latest_videos.csv"));
    let catalog = VideoCatalog::new(&store);

    catalog.discover(vec![entry("a", "Round A")]).await.unwrap();
    let added = catalog
        .discover(vec![entry("a", "Round A"), entry("b", "Round B")])
        .await
        .unwrap();

    assert_eq!(added.len(), 1);
    assert_eq!(added[0].id, "b");
    assert_eq!(catalog_ids(&store).await, vec!["a", "b"]);

    let items = catalog.items().await.unwrap();
    assert_eq!(items[1].url, "https://www.youtube.com/watch?v=b");
}

#[tokio::test]
async fn test_ledger_grows_monotonically() {
    let temp = TempDir::new().unwrap();
    let results_store = CsvFileStore::new(temp.path().join("competition_results.csv"));
    let snapshot_path = temp.path().join("processed_links.txt");
    let results = ResultsLog::new(&results_store);
    let ledger = LinkLedger::new(&results_store, &snapshot_path);

    let mut previous = ledger.build().await;
    assert!(previous.is_empty());

    for n in 1..=3 {
        let item = SourceItem {
            id: format!("v{}", n),
            url: format!("https://www.youtube.com/watch?v=v{}", n),
            title: format!("Round {}", n),
            date: None,
            uploader: String::new(),
        };
        let record = QaRecord::from_triple(&item, QaTriple::new(1, "Q", "A")).unwrap();
        results.append(&[record]).await.unwrap();

        // Remote side publishes something on its own as well
        let mut snapshot = fs::read_to_string(&snapshot_path).await.unwrap_or_default();
        snapshot.push_str(&format!("https://www.youtube.com/watch?v=remote{}\n", n));
        fs::write(&snapshot_path, snapshot).await.unwrap();

        let current = ledger.build().await;
        assert!(current.is_superset(&previous));
        assert!(current.contains(&item.url));
        assert!(current.len() > previous.len());
        previous = current;
    }

    let remote = read_snapshot(&snapshot_path).await;
    assert_eq!(remote.len(), 3);
    assert!(previous.is_superset(&remote));
}

#[tokio::test]
async fn test_unreadable_catalog_degrades_to_full_append() {
    let temp = TempDir::new().unwrap();
    // A directory where the catalog file should be cannot be read as CSV
    let path = temp.path().join("latest_videos.csv");
    fs::create_dir_all(&path).await.unwrap();
    let store = CsvFileStore::new(&path);

    let known: HashSet<String> = VideoCatalog::new(&store).known_ids().await;
    assert!(known.is_empty());
}
