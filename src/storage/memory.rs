//! In-memory table store.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{StoreError, Table, TableStore};

/// Table held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: Mutex<Option<Table>>,
    unreadable: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with existing content
    pub fn with_table(table: Table) -> Self {
        Self {
            table: Mutex::new(Some(table)),
            unreadable: false,
        }
    }

    /// A store whose reads always fail, for exercising degrade paths
    pub fn unreadable() -> Self {
        Self {
            table: Mutex::new(None),
            unreadable: true,
        }
    }

    /// Copy of the current content
    pub fn snapshot(&self) -> Option<Table> {
        self.table.lock().ok().and_then(|t| t.clone())
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn read_all(&self) -> Result<Option<Table>, StoreError> {
        if self.unreadable {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "store marked unreadable",
            )));
        }
        Ok(self.snapshot())
    }

    async fn append(&self, headers: &[&str], rows: &[Vec<String>]) -> Result<(), StoreError> {
        if let Some(bad) = rows.iter().find(|r| r.len() != headers.len()) {
            return Err(StoreError::RowWidth {
                expected: headers.len(),
                found: bad.len(),
            });
        }

        let mut guard = self
            .table
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "store lock poisoned"))?;
        let table = guard.get_or_insert_with(|| Table::new(headers.iter().copied()));
        table.rows.extend(rows.iter().cloned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_then_read() {
        let store = MemoryStore::new();
        assert!(store.read_all().await.unwrap().is_none());

        store
            .append(&["id"], &[vec!["a".to_string()], vec!["b".to_string()]])
            .await
            .unwrap();

        let table = store.read_all().await.unwrap().unwrap();
        assert_eq!(table.headers, vec!["id"]);
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_unreadable_store_errors() {
        assert!(MemoryStore::unreadable().read_all().await.is_err());
    }
}
