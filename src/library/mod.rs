//! A small document library: upload, merge and split stored PDFs.
//!
//! [`Library`] ties a [`Storage`] for the bytes to a [`RecordStore`] for
//! the bookkeeping. Uploaded files stay pending until they are consumed by
//! a merge; merge and split outputs are stored as `merged` records.
//!
//! # Examples
//!
//! ```no_run
//! use pdfstitch::library::{Library, MemoryRecordStore, MemoryStorage};
//!
//! # async fn example(a: Vec<u8>, b: Vec<u8>) -> pdfstitch::Result<()> {
//! let library = Library::new(MemoryStorage::new(), MemoryRecordStore::new());
//! let first = library.upload("a.pdf", &a).await?;
//! let second = library.upload("b.pdf", &b).await?;
//! let merged = library.merge(&[second.id, first.id]).await?;
//! println!("merged into {}", merged.record.file_name);
//! # Ok(())
//! # }
//! ```

mod records;
mod storage;

pub use records::{FileRecord, JsonRecordStore, MemoryRecordStore, RecordStore};
pub use storage::{FsStorage, MemoryStorage, Storage};

use std::path::Path;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::task;

use crate::error::{PdfError, Result};

/// Name of the record file inside a library directory.
pub const RECORDS_FILE: &str = "records.json";

/// Minimum number of files a library merge accepts.
pub const MIN_MERGE_FILES: usize = 2;

/// What a library merge produced.
#[derive(Debug)]
pub struct MergeOutcome {
    /// Record of the merged file.
    pub record: FileRecord,
    /// Ids that were merged, then removed from the library.
    pub consumed: Vec<u64>,
    /// Requested ids that had no record.
    pub unknown: Vec<u64>,
    /// Records whose file could not be merged; they stay in the library.
    pub skipped: Vec<(u64, PdfError)>,
}

/// Storage plus records, with the merge and split workflows on top.
#[derive(Debug)]
pub struct Library<S, R> {
    storage: S,
    records: R,
    /// Serializes operations that change records.
    write_lock: Mutex<()>,
}

impl Library<FsStorage, JsonRecordStore> {
    /// Open a library kept in `dir`: files under `dir/files`, records in
    /// `dir/records.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the record
    /// file cannot be read.
    pub async fn open_dir(dir: &Path) -> Result<Self> {
        let storage = FsStorage::open(dir.join("files")).await?;
        let records = JsonRecordStore::open(dir.join(RECORDS_FILE)).await?;
        Ok(Self::new(storage, records))
    }
}

impl<S: Storage, R: RecordStore> Library<S, R> {
    /// Create a library from its two collaborators.
    pub fn new(storage: S, records: R) -> Self {
        Self {
            storage,
            records,
            write_lock: Mutex::new(()),
        }
    }

    /// Store a PDF and create a pending record for it.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::Parse`] (or another document error) when `bytes`
    /// is not a readable PDF; nothing is stored in that case.
    pub async fn upload(&self, name: &str, bytes: &[u8]) -> Result<FileRecord> {
        let pages = self.page_count(bytes).await?;
        let _guard = self.write_lock.lock().await;

        let location = self.storage.write_bytes(name, bytes).await?;
        match self.records.create(name, &location, false).await {
            Ok(record) => {
                log::debug!("uploaded {name} as record {} ({pages} pages)", record.id);
                Ok(record)
            }
            Err(err) => {
                self.discard(&location).await;
                Err(err)
            }
        }
    }

    /// Files waiting to be merged.
    pub async fn list_pending(&self) -> Result<Vec<FileRecord>> {
        self.records.list_pending().await
    }

    /// Every record, merged outputs included.
    pub async fn list_all(&self) -> Result<Vec<FileRecord>> {
        self.records.list_all().await
    }

    /// Merge stored files in the order of `ids`.
    ///
    /// Unknown ids are skipped. Source files and records are deleted only
    /// after the merged file and its record have been written. Files that do
    /// not parse or have a broken page tree stay in place and are listed in
    /// the outcome.
    ///
    /// # Errors
    ///
    /// * [`PdfError::NotEnoughFiles`] when fewer than two ids are given.
    /// * [`PdfError::EmptySelection`] when no id yields a usable document.
    /// * Storage and record errors.
    pub async fn merge(&self, ids: &[u64]) -> Result<MergeOutcome> {
        if ids.len() < MIN_MERGE_FILES {
            return Err(PdfError::NotEnoughFiles {
                required: MIN_MERGE_FILES,
                given: ids.len(),
            });
        }
        let _guard = self.write_lock.lock().await;

        let mut found = Vec::with_capacity(ids.len());
        let mut unknown = Vec::new();
        for &id in ids {
            match self.records.get(id).await? {
                Some(record) => found.push(record),
                None => {
                    log::warn!("merge: no record with id {id}, skipping");
                    unknown.push(id);
                }
            }
        }

        let mut sources = Vec::with_capacity(found.len());
        for record in &found {
            sources.push(self.storage.read_bytes(&record.location).await?);
        }

        let (merged, report) = task::spawn_blocking(move || crate::merge_documents(&sources[..]))
            .await
            .map_err(|e| PdfError::other(format!("Merge task failed: {e}")))??;

        let name = format!("merged-{}.pdf", Utc::now().timestamp_millis());
        let location = self.storage.write_bytes(&name, &merged).await?;
        let record = match self.records.create(&name, &location, true).await {
            Ok(record) => record,
            Err(err) => {
                self.discard(&location).await;
                return Err(err);
            }
        };

        let skipped: Vec<(u64, PdfError)> = report
            .skipped
            .into_iter()
            .map(|s| (found[s.index].id, s.error))
            .collect();

        let mut consumed = Vec::with_capacity(found.len());
        for source in &found {
            if consumed.contains(&source.id) || skipped.iter().any(|(id, _)| *id == source.id) {
                continue;
            }
            self.storage.remove(&source.location).await?;
            self.records.delete(source.id).await?;
            consumed.push(source.id);
        }

        log::debug!(
            "merged records {consumed:?} into record {} ({} skipped)",
            record.id,
            skipped.len()
        );
        Ok(MergeOutcome {
            record,
            consumed,
            unknown,
            skipped,
        })
    }

    /// Extract `page_numbers` from `bytes` and store the result.
    ///
    /// # Errors
    ///
    /// Returns the extraction error ([`PdfError::EmptySelection`] when no
    /// number is valid) or a storage error.
    pub async fn split(&self, bytes: &[u8], page_numbers: &[i64]) -> Result<FileRecord> {
        let source = bytes.to_vec();
        let numbers = page_numbers.to_vec();
        let extracted = task::spawn_blocking(move || crate::extract_pages(&source, &numbers))
            .await
            .map_err(|e| PdfError::other(format!("Split task failed: {e}")))??;

        let _guard = self.write_lock.lock().await;
        let name = format!("split-{}.pdf", Utc::now().timestamp_millis());
        let location = self.storage.write_bytes(&name, &extracted).await?;
        match self.records.create(&name, &location, true).await {
            Ok(record) => Ok(record),
            Err(err) => {
                self.discard(&location).await;
                Err(err)
            }
        }
    }

    /// Remove a file whose record could not be written.
    async fn discard(&self, location: &str) {
        if let Err(err) = self.storage.remove(location).await {
            log::warn!("could not remove orphaned file {location}: {err}");
        }
    }

    /// Page count of a PDF held in memory.
    pub async fn page_count(&self, bytes: &[u8]) -> Result<usize> {
        let bytes = bytes.to_vec();
        task::spawn_blocking(move || crate::page_count(&bytes))
            .await
            .map_err(|e| PdfError::other(format!("Count task failed: {e}")))?
    }

    /// Bytes of a stored file.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::RecordNotFound`] for an unknown id.
    pub async fn read(&self, id: u64) -> Result<Vec<u8>> {
        let record = self
            .records
            .get(id)
            .await?
            .ok_or(PdfError::RecordNotFound { id })?;
        self.storage.read_bytes(&record.location).await
    }

    /// Delete a file and its record.
    pub async fn remove(&self, id: u64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let record = self
            .records
            .get(id)
            .await?
            .ok_or(PdfError::RecordNotFound { id })?;
        self.storage.remove(&record.location).await?;
        self.records.delete(id).await
    }
}
