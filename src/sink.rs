//! Persisting result sets as JSON files
//!
//! Writes are not atomic as a batch: if a write fails part-way, records
//! already written stay on disk.

use crate::error::{SearchError, SearchResult};
use crate::types::{ResultRecord, ResultSet};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default name of the aggregate file
pub const DEFAULT_AGGREGATE_FILE: &str = "tweets_premium.json";

/// How a result set is laid out on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistMode {
    /// One `<id>.json` per record
    PerRecord,
    /// A single file holding every record
    Aggregate { file_name: String },
}

impl PersistMode {
    pub fn aggregate(file_name: &str) -> Self {
        PersistMode::Aggregate {
            file_name: file_name.to_string(),
        }
    }
}

/// Writes result sets into a destination directory
#[derive(Debug, Clone)]
pub struct ResultSink {
    directory: PathBuf,
    mode: PersistMode,
}

impl ResultSink {
    pub fn new(directory: impl Into<PathBuf>, mode: PersistMode) -> Self {
        Self {
            directory: directory.into(),
            mode,
        }
    }

    pub fn per_record(directory: impl Into<PathBuf>) -> Self {
        Self::new(directory, PersistMode::PerRecord)
    }

    pub fn aggregate(directory: impl Into<PathBuf>, file_name: &str) -> Self {
        Self::new(directory, PersistMode::aggregate(file_name))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn mode(&self) -> &PersistMode {
        &self.mode
    }

    /// Write the result set and return the paths written, in record order
    ///
    /// Existing files with other names are left alone; same-named files are
    /// overwritten.
    pub async fn persist(&self, results: &ResultSet) -> SearchResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| {
                SearchError::IoError(format!(
                    "Cannot create directory {}: {e}",
                    self.directory.display()
                ))
            })?;

        let written = match &self.mode {
            PersistMode::PerRecord => {
                let mut written = Vec::with_capacity(results.len());
                for record in results {
                    let path = self.directory.join(record_file_name(record)?);
                    write_json(&path, record).await?;
                    written.push(path);
                }
                written
            }
            PersistMode::Aggregate { file_name } => {
                let path = self.directory.join(checked_file_name(file_name)?);
                write_json(&path, &results.records).await?;
                vec![path]
            }
        };

        log::info!(
            "Persisted {} records to {} ({} files)",
            results.len(),
            self.directory.display(),
            written.len()
        );
        Ok(written)
    }
}

fn record_file_name(record: &ResultRecord) -> SearchResult<String> {
    let id = record.id().ok_or_else(|| {
        SearchError::InvalidInput("Result record has no id or id_str field".to_string())
    })?;
    checked_file_name(&format!("{id}.json"))
}

/// Refuse names that would escape the destination directory
fn checked_file_name(name: &str) -> SearchResult<String> {
    let path = Path::new(name);
    let is_plain = path.file_name().map(|f| f == path.as_os_str()).unwrap_or(false);
    if !is_plain || name.starts_with('.') {
        return Err(SearchError::InvalidInput(format!(
            "'{name}' is not a plain file name"
        )));
    }
    Ok(name.to_string())
}

async fn write_json<T>(path: &Path, value: &T) -> SearchResult<()>
where
    T: Serialize + ?Sized,
{
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(path, json).await.map_err(|e| {
        SearchError::IoError(format!("Cannot write {}: {e}", path.display()))
    })
}

/// Read back a record written in per-record mode
pub async fn load_record(path: impl AsRef<Path>) -> SearchResult<ResultRecord> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        SearchError::IoError(format!("Cannot read {}: {e}", path.display()))
    })?;
    ResultRecord::from_value(serde_json::from_str(&contents)?)
}

/// Read back the records of an aggregate file
pub async fn load_aggregate(path: impl AsRef<Path>) -> SearchResult<Vec<ResultRecord>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        SearchError::IoError(format!("Cannot read {}: {e}", path.display()))
    })?;
    Ok(serde_json::from_str(&contents)?)
}
