//! Storage port for the pipeline's tabular files.
//!
//! The catalog and the results log are both reached through `TableStore`:
//! read everything, or append a batch of rows. Callers hold the store handle
//! explicitly; nothing here is global.
//!
//! - `CsvFileStore`: CSV file on disk (the persisted format)
//! - `MemoryStore`: in-process table, used by tests

pub mod csv_file;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

pub use csv_file::CsvFileStore;
pub use memory::MemoryStore;

/// Errors from a table store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Row has {found} cells, header has {expected}")]
    RowWidth { expected: usize, found: usize },
}

/// An in-memory table: a header row plus data rows of string cells
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a named column
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cells of a named column (empty when the column is absent)
    pub fn column<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        let idx = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| idx.and_then(|i| row.get(i)).map(String::as_str))
    }

    /// Every data cell, row by row
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().flat_map(|row| row.iter().map(String::as_str))
    }

    /// Look up a cell in `row` by column name
    pub fn get<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        self.column_index(name)
            .and_then(|i| row.get(i))
            .map(String::as_str)
    }

    /// Reorder this table's rows to `headers`, filling missing columns with ""
    pub fn aligned_to(&self, headers: &[String]) -> Vec<Vec<String>> {
        let mapping: Vec<Option<usize>> = headers.iter().map(|h| self.column_index(h)).collect();
        self.rows
            .iter()
            .map(|row| {
                mapping
                    .iter()
                    .map(|idx| idx.and_then(|i| row.get(i)).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    /// Append `other`'s rows after this table's rows.
    ///
    /// Columns are this table's header followed by any columns only `other`
    /// has; cells missing on either side are left empty. A table without a
    /// header takes `other` as is.
    pub fn extend_aligned(&mut self, other: &Table) {
        if self.headers.is_empty() {
            self.headers = other.headers.clone();
            self.rows.extend(other.rows.iter().cloned());
            return;
        }

        let mut headers = self.headers.clone();
        for h in &other.headers {
            if !headers.contains(h) {
                headers.push(h.clone());
            }
        }
        if headers.len() != self.headers.len() {
            self.rows = self.aligned_to(&headers);
            self.headers = headers;
        }
        self.rows.extend(other.aligned_to(&self.headers));
    }
}

/// Read-all / append access to one persisted table
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Human-readable location (file path, "memory", ...)
    fn location(&self) -> String;

    /// Read the whole table. `Ok(None)` when the table does not exist yet.
    async fn read_all(&self) -> Result<Option<Table>, StoreError>;

    /// Append `rows` in a single write, creating the table with `headers` if
    /// absent. Existing rows are never rewritten.
    async fn append(&self, headers: &[&str], rows: &[Vec<String>]) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(["a", "b"]).with_rows(vec![
            vec!["1".into(), "x".into()],
            vec!["2".into(), "y".into()],
        ])
    }

    #[test]
    fn test_column_access() {
        let table = sample();

        assert_eq!(table.column("b").collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(table.column("missing").count(), 0);
        assert_eq!(table.cells().count(), 4);
        assert_eq!(table.get(&table.rows[1], "a"), Some("2"));
    }

    #[test]
    fn test_aligned_to_fills_missing() {
        let table = sample();
        let headers = vec!["b".to_string(), "c".to_string(), "a".to_string()];

        let rows = table.aligned_to(&headers);
        assert_eq!(rows[0], vec!["x", "", "1"]);
        assert_eq!(rows[1], vec!["y", "", "2"]);
    }

    #[test]
    fn test_extend_aligned_adds_new_columns() {
        let mut table = sample();
        let other = Table::new(["b", "c"]).with_rows(vec![vec!["z".into(), "new".into()]]);

        table.extend_aligned(&other);
        assert_eq!(table.headers, vec!["a", "b", "c"]);
        assert_eq!(table.rows[0], vec!["1", "x", ""]);
        assert_eq!(table.rows[2], vec!["", "z", "new"]);

        let mut empty = Table::default();
        empty.extend_aligned(&other);
        assert_eq!(empty, other);
    }
}
