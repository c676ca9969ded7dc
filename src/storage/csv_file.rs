//! CSV-backed table store.
//!
//! New files start with a UTF-8 BOM and a header row so spreadsheet tools
//! open them correctly; a leading BOM is stripped on read. Appends are built
//! in memory and written with one `write_all`, so a batch lands as a whole or
//! the error is reported before anything is written.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{StoreError, Table, TableStore};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// A table persisted as a CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvFileStore {
    path: PathBuf,
}

impl CsvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file exists and holds at least one byte
    async fn has_content(&self) -> Result<bool, StoreError> {
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.len() > 0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl TableStore for CsvFileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn read_all(&self) -> Result<Option<Table>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&self.path).await?;
        parse_csv(&bytes).map(Some)
    }

    async fn append(&self, headers: &[&str], rows: &[Vec<String>]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let create = !self.has_content().await?;
        let mut buf = Vec::new();
        if create {
            buf.extend_from_slice(BOM);
        }

        {
            let mut writer = csv::Writer::from_writer(&mut buf);
            if create {
                writer.write_record(headers)?;
            }
            for row in rows {
                if row.len() != headers.len() {
                    return Err(StoreError::RowWidth {
                        expected: headers.len(),
                        found: row.len(),
                    });
                }
                writer.write_record(row)?;
            }
            writer.flush()?;
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;

        Ok(())
    }
}

/// Parse CSV bytes (header row first) into a table.
///
/// Rows may be ragged; historical files were not always rectangular.
pub fn parse_csv(bytes: &[u8]) -> Result<Table, StoreError> {
    let bytes = bytes.strip_prefix(BOM).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { headers, rows })
}

/// Encode a whole table as CSV bytes (no BOM)
pub fn encode_csv(table: &Table) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(&mut buf);
        writer.write_record(&table.headers)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}
