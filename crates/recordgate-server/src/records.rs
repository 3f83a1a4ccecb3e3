//! Record source backing the `get_last_n_records` tool

use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

/// Failure reading or parsing the record source
///
/// Display text is what callers see in tool results, so it names the
/// category of failure and nothing about where the source lives.
#[derive(Debug, Error)]
pub enum RecordStoreError {
    /// The source could not be opened or read
    #[error("record source unreadable")]
    Unreadable(#[source] csv::Error),
    /// The source contents could not be parsed
    #[error("record source malformed")]
    Malformed(#[source] csv::Error),
}

impl From<csv::Error> for RecordStoreError {
    fn from(e: csv::Error) -> Self {
        if e.is_io_error() {
            Self::Unreadable(e)
        } else {
            Self::Malformed(e)
        }
    }
}

/// Source of tabular records
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// The final `n` records in original order
    ///
    /// Returns every record when `n` exceeds the total, and an empty vec
    /// (not an error) for an empty source.
    fn last_n(&self, n: usize) -> Result<Vec<Vec<String>>, RecordStoreError>;
}

/// CSV-file record store
///
/// The file is re-read on every call; freshness over speed for a source that
/// other processes append to. Header rows are not special, the first line is
/// a record like any other.
#[derive(Debug)]
pub struct CsvRecordStore {
    path: PathBuf,
}

impl CsvRecordStore {
    /// Create a store over the given CSV file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordStore for CsvRecordStore {
    fn last_n(&self, n: usize) -> Result<Vec<Vec<String>>, RecordStoreError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        let start = rows.len().saturating_sub(n);
        debug!(total = rows.len(), requested = n, "record source read");
        Ok(rows.split_off(start))
    }
}
