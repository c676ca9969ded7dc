//! Results log: append-only table of extracted question/answer records.

use crate::domain::record::{QaRecord, RESULT_COLUMNS};
use crate::storage::{StoreError, Table, TableStore};

/// Append-only results table with the fixed `RESULT_COLUMNS` layout
pub struct ResultsLog<'a> {
    store: &'a dyn TableStore,
}

impl<'a> ResultsLog<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    pub fn location(&self) -> String {
        self.store.location()
    }

    /// Append one item's records as a single batch
    pub async fn append(&self, records: &[QaRecord]) -> Result<(), StoreError> {
        let rows: Vec<Vec<String>> = records.iter().map(QaRecord::to_row).collect();
        self.store.append(&RESULT_COLUMNS, &rows).await
    }

    /// Whole table, or an empty table with the standard header when absent
    pub async fn read_all(&self) -> Result<Table, StoreError> {
        Ok(self
            .store
            .read_all()
            .await?
            .unwrap_or_else(|| Table::new(RESULT_COLUMNS)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::SourceItem;
    use crate::domain::record::QaTriple;
    use crate::storage::MemoryStore;

    fn item() -> SourceItem {
        SourceItem {
            id: "v1".into(),
            url: "u1".into(),
            title: "T".into(),
            date: None,
            uploader: String::new(),
        }
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = MemoryStore::new();
        let log = ResultsLog::new(&store);

        let records: Vec<_> = [2, 1, 3]
            .into_iter()
            .filter_map(|n| QaRecord::from_triple(&item(), QaTriple::new(n, "Q", "A")))
            .collect();
        log.append(&records).await.unwrap();

        let table = log.read_all().await.unwrap();
        assert_eq!(table.headers, RESULT_COLUMNS);
        assert_eq!(
            table.column("question_number").collect::<Vec<_>>(),
            vec!["2", "1", "3"]
        );
    }

    #[tokio::test]
    async fn test_read_missing_is_empty_with_header() {
        let store = MemoryStore::new();
        let table = ResultsLog::new(&store).read_all().await.unwrap();

        assert!(table.is_empty());
        assert_eq!(table.headers.len(), RESULT_COLUMNS.len());
    }
}
