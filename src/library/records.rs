//! File records: what the library knows about each stored file.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{PdfError, Result};
use crate::io::PdfWriter;

/// One stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Record id, unique within a store.
    pub id: u64,
    /// Name the file was uploaded or created under.
    pub file_name: String,
    /// Storage location of the bytes.
    pub location: String,
    /// When the record was created.
    pub upload_date: DateTime<Utc>,
    /// Whether the file is the output of a merge or split.
    pub merged: bool,
}

/// Persistence for [`FileRecord`]s.
pub trait RecordStore: Send + Sync {
    /// Records with `merged == false`, in id order.
    fn list_pending(&self) -> impl Future<Output = Result<Vec<FileRecord>>> + Send;

    /// Every record, in id order.
    fn list_all(&self) -> impl Future<Output = Result<Vec<FileRecord>>> + Send;

    /// Look a record up by id.
    fn get(&self, id: u64) -> impl Future<Output = Result<Option<FileRecord>>> + Send;

    /// Create a record and assign it the next id.
    fn create(
        &self,
        file_name: &str,
        location: &str,
        merged: bool,
    ) -> impl Future<Output = Result<FileRecord>> + Send;

    /// Delete a record.
    ///
    /// Fails with [`PdfError::RecordNotFound`] when there is no such id.
    fn delete(&self, id: u64) -> impl Future<Output = Result<()>> + Send;
}

/// The serialized form shared by both stores.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordTable {
    next_id: u64,
    records: BTreeMap<u64, FileRecord>,
}

impl RecordTable {
    fn pending(&self) -> Vec<FileRecord> {
        self.records.values().filter(|r| !r.merged).cloned().collect()
    }

    fn insert(&mut self, file_name: &str, location: &str, merged: bool) -> FileRecord {
        self.next_id += 1;
        let record = FileRecord {
            id: self.next_id,
            file_name: file_name.to_string(),
            location: location.to_string(),
            upload_date: Utc::now(),
            merged,
        };
        self.records.insert(record.id, record.clone());
        record
    }

    fn remove(&mut self, id: u64) -> Result<FileRecord> {
        self.records
            .remove(&id)
            .ok_or(PdfError::RecordNotFound { id })
    }
}

/// Records kept in memory only.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    table: Mutex<RecordTable>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    async fn list_pending(&self) -> Result<Vec<FileRecord>> {
        Ok(self.table.lock().await.pending())
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        Ok(self.table.lock().await.records.values().cloned().collect())
    }

    async fn get(&self, id: u64) -> Result<Option<FileRecord>> {
        Ok(self.table.lock().await.records.get(&id).cloned())
    }

    async fn create(&self, file_name: &str, location: &str, merged: bool) -> Result<FileRecord> {
        Ok(self.table.lock().await.insert(file_name, location, merged))
    }

    async fn delete(&self, id: u64) -> Result<()> {
        self.table.lock().await.remove(id).map(|_| ())
    }
}

/// Records persisted as one JSON file.
///
/// The file is read once on open and rewritten in full, atomically, after
/// every change. A failed write rolls the in-memory table back.
#[derive(Debug)]
pub struct JsonRecordStore {
    path: PathBuf,
    writer: PdfWriter,
    table: Mutex<RecordTable>,
}

impl JsonRecordStore {
    /// Open the store at `path`; a missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let table = match tokio::fs::read(&path).await {
            Ok(data) => serde_json::from_slice(&data)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => RecordTable::default(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            writer: PdfWriter::new(),
            table: Mutex::new(table),
        })
    }

    /// Path of the JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, table: &RecordTable) -> Result<()> {
        let data = serde_json::to_vec_pretty(table)?;
        self.writer.write_bytes(&data, &self.path).await
    }
}

impl RecordStore for JsonRecordStore {
    async fn list_pending(&self) -> Result<Vec<FileRecord>> {
        Ok(self.table.lock().await.pending())
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        Ok(self.table.lock().await.records.values().cloned().collect())
    }

    async fn get(&self, id: u64) -> Result<Option<FileRecord>> {
        Ok(self.table.lock().await.records.get(&id).cloned())
    }

    async fn create(&self, file_name: &str, location: &str, merged: bool) -> Result<FileRecord> {
        let mut table = self.table.lock().await;
        let record = table.insert(file_name, location, merged);
        if let Err(err) = self.persist(&table).await {
            table.records.remove(&record.id);
            table.next_id -= 1;
            return Err(err);
        }
        Ok(record)
    }

    async fn delete(&self, id: u64) -> Result<()> {
        let mut table = self.table.lock().await;
        let removed = table.remove(id)?;
        if let Err(err) = self.persist(&table).await {
            table.records.insert(id, removed);
            return Err(err);
        }
        Ok(())
    }
}
