//! Integration tests for the document library.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pdfstitch::library::{
    FileRecord, FsStorage, JsonRecordStore, Library, MemoryRecordStore, MemoryStorage,
    RecordStore, Storage,
};
use pdfstitch::{PdfError, Result};
use tempfile::TempDir;

use crate::common::{labelled_pdf, page_labels};

fn memory_library() -> Library<MemoryStorage, MemoryRecordStore> {
    Library::new(MemoryStorage::new(), MemoryRecordStore::new())
}

#[tokio::test]
async fn test_upload_then_merge_in_requested_order() {
    let library = memory_library();
    let a = library.upload("a.pdf", &labelled_pdf("a", 2)).await.unwrap();
    let b = library.upload("b.pdf", &labelled_pdf("b", 1)).await.unwrap();
    assert_eq!(library.list_pending().await.unwrap().len(), 2);

    let outcome = library.merge(&[b.id, a.id]).await.unwrap();
    assert!(outcome.record.merged);
    assert!(outcome.record.file_name.starts_with("merged-"));
    assert_eq!(outcome.consumed, [b.id, a.id]);
    assert!(outcome.unknown.is_empty());
    assert!(outcome.skipped.is_empty());

    // Sources are gone; only the merged file remains.
    assert!(library.list_pending().await.unwrap().is_empty());
    let all = library.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, outcome.record.id);

    let merged = library.read(outcome.record.id).await.unwrap();
    assert_eq!(page_labels(&merged), ["b-1", "a-1", "a-2"]);
}

#[tokio::test]
async fn test_upload_rejects_non_pdf() {
    let library = memory_library();
    let err = library.upload("notes.txt", b"hello").await.unwrap_err();
    assert!(matches!(err, PdfError::Parse { .. }));
    assert!(library.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_merge_needs_two_ids() {
    let library = memory_library();
    let a = library.upload("a.pdf", &labelled_pdf("a", 1)).await.unwrap();
    assert!(matches!(
        library.merge(&[a.id]).await,
        Err(PdfError::NotEnoughFiles {
            required: 2,
            given: 1
        })
    ));
    assert_eq!(library.list_pending().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_merge_skips_unknown_ids() {
    let library = memory_library();
    let a = library.upload("a.pdf", &labelled_pdf("a", 1)).await.unwrap();
    let b = library.upload("b.pdf", &labelled_pdf("b", 1)).await.unwrap();

    let outcome = library.merge(&[a.id, 999, b.id]).await.unwrap();
    assert_eq!(outcome.unknown, [999]);
    assert_eq!(outcome.consumed, [a.id, b.id]);
    let merged = library.read(outcome.record.id).await.unwrap();
    assert_eq!(page_labels(&merged), ["a-1", "b-1"]);
}

#[tokio::test]
async fn test_unparseable_source_keeps_its_record() {
    // Seed a broken file behind the library's back.
    let storage = MemoryStorage::new();
    let records = MemoryRecordStore::new();
    let location = storage.write_bytes("broken.pdf", b"%PDF-1.4\nbroken").await.unwrap();
    let broken = records.create("broken.pdf", &location, false).await.unwrap();

    let library = Library::new(storage, records);
    let good = library.upload("good.pdf", &labelled_pdf("g", 1)).await.unwrap();

    let outcome = library.merge(&[broken.id, good.id]).await.unwrap();
    assert_eq!(outcome.consumed, [good.id]);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].0, broken.id);

    let pending = library.list_pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, broken.id);
    assert!(library.read(broken.id).await.is_ok());
}

#[tokio::test]
async fn test_merge_with_nothing_usable_changes_nothing() {
    let storage = MemoryStorage::new();
    let records = MemoryRecordStore::new();
    for name in ["x.pdf", "y.pdf"] {
        let location = storage.write_bytes(name, b"junk").await.unwrap();
        records.create(name, &location, false).await.unwrap();
    }
    let library = Library::new(storage, records);

    assert!(matches!(
        library.merge(&[1, 2]).await,
        Err(PdfError::EmptySelection)
    ));
    assert_eq!(library.list_all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_split_stores_selected_pages() {
    let library = memory_library();
    let record = library
        .split(&labelled_pdf("s", 4), &[4, 0, 2])
        .await
        .unwrap();
    assert!(record.merged);
    assert!(record.file_name.starts_with("split-"));
    assert!(library.list_pending().await.unwrap().is_empty());

    let bytes = library.read(record.id).await.unwrap();
    assert_eq!(page_labels(&bytes), ["s-4", "s-2"]);

    assert!(matches!(
        library.split(&labelled_pdf("s", 2), &[5]).await,
        Err(PdfError::EmptySelection)
    ));
}

#[tokio::test]
async fn test_remove_and_missing_records() {
    let library = memory_library();
    let a = library.upload("a.pdf", &labelled_pdf("a", 1)).await.unwrap();
    library.remove(a.id).await.unwrap();

    assert!(library.list_all().await.unwrap().is_empty());
    assert!(matches!(
        library.remove(a.id).await,
        Err(PdfError::RecordNotFound { .. })
    ));
    assert!(matches!(
        library.read(a.id).await,
        Err(PdfError::RecordNotFound { .. })
    ));
}

#[tokio::test]
async fn test_directory_library_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let (first, second) = {
        let library = Library::open_dir(dir.path()).await.unwrap();
        let first = library.upload("a.pdf", &labelled_pdf("a", 1)).await.unwrap();
        let second = library.upload("a.pdf", &labelled_pdf("b", 1)).await.unwrap();
        (first, second)
    };
    // Same upload name, distinct files.
    assert_ne!(first.location, second.location);

    let library = Library::open_dir(dir.path()).await.unwrap();
    assert_eq!(library.list_pending().await.unwrap().len(), 2);

    let outcome = library.merge(&[first.id, second.id]).await.unwrap();
    let files: Vec<_> = std::fs::read_dir(dir.path().join("files"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(files, [outcome.record.location.clone()]);

    let reopened = Library::open_dir(dir.path()).await.unwrap();
    let all = reopened.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].merged);
    let merged = reopened.read(all[0].id).await.unwrap();
    assert_eq!(page_labels(&merged), ["a-1", "b-1"]);
}

#[tokio::test]
async fn test_fs_storage_and_json_records_compose() {
    let dir = TempDir::new().unwrap();
    let storage = FsStorage::open(dir.path().join("blobs")).await.unwrap();
    let records = JsonRecordStore::open(dir.path().join("index.json"))
        .await
        .unwrap();
    let library = Library::new(storage, records);

    let record = library.upload("c.pdf", &labelled_pdf("c", 2)).await.unwrap();
    assert!(dir.path().join("blobs").join(&record.location).is_file());
    assert!(dir.path().join("index.json").is_file());
}

/// Storage that keeps everything it is given and counts failed removals.
struct StickyStorage {
    inner: MemoryStorage,
    removals: Arc<AtomicUsize>,
}

impl Storage for StickyStorage {
    async fn read_bytes(&self, location: &str) -> Result<Vec<u8>> {
        self.inner.read_bytes(location).await
    }

    async fn write_bytes(&self, name: &str, bytes: &[u8]) -> Result<String> {
        self.inner.write_bytes(name, bytes).await
    }

    async fn remove(&self, _location: &str) -> Result<()> {
        self.removals.fetch_add(1, Ordering::SeqCst);
        Err(PdfError::other("storage is append-only"))
    }
}

/// A record store that refuses new records.
struct FullRecords;

impl RecordStore for FullRecords {
    async fn list_pending(&self) -> Result<Vec<FileRecord>> {
        Ok(Vec::new())
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        Ok(Vec::new())
    }

    async fn get(&self, _id: u64) -> Result<Option<FileRecord>> {
        Ok(None)
    }

    async fn create(&self, _file_name: &str, _location: &str, _merged: bool) -> Result<FileRecord> {
        Err(PdfError::invalid_config("record store is full"))
    }

    async fn delete(&self, id: u64) -> Result<()> {
        Err(PdfError::RecordNotFound { id })
    }
}

#[tokio::test]
async fn test_failed_cleanup_keeps_the_record_error() {
    let removals = Arc::new(AtomicUsize::new(0));
    let storage = StickyStorage {
        inner: MemoryStorage::new(),
        removals: Arc::clone(&removals),
    };
    let library = Library::new(storage, FullRecords);

    let err = library.upload("a.pdf", &labelled_pdf("a", 1)).await.unwrap_err();
    assert!(matches!(err, PdfError::InvalidConfig { .. }));
    assert_eq!(removals.load(Ordering::SeqCst), 1);

    let err = library.split(&labelled_pdf("s", 2), &[1]).await.unwrap_err();
    assert!(matches!(err, PdfError::InvalidConfig { .. }));
    assert_eq!(removals.load(Ordering::SeqCst), 2);
}
