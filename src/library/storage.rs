//! Byte storage for library files.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::config::OverwriteMode;
use crate::error::{PdfError, Result};
use crate::io::PdfWriter;

/// Where library files live.
///
/// A location is an opaque string handed out by [`Storage::write_bytes`] and
/// only meaningful to the storage that produced it.
pub trait Storage: Send + Sync {
    /// Read the bytes stored at `location`.
    fn read_bytes(&self, location: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Store `bytes` under a name derived from `name`, returning the location.
    fn write_bytes(&self, name: &str, bytes: &[u8])
    -> impl Future<Output = Result<String>> + Send;

    /// Remove the bytes at `location`. Removing a missing location succeeds.
    fn remove(&self, location: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Files in a directory, named `<millis>-<name>`.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
    writer: PdfWriter,
}

impl FsStorage {
    /// Use `root` as the storage directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            writer: PdfWriter::with_overwrite(OverwriteMode::NoClobber),
        })
    }

    /// The storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, location: &str) -> Result<PathBuf> {
        let relative = Path::new(location);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if location.is_empty() || !plain {
            return Err(PdfError::other(format!(
                "Invalid storage location: {location}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

/// Last path component of `name`, so callers cannot write outside the root.
fn base_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("file.pdf")
}

impl Storage for FsStorage {
    async fn read_bytes(&self, location: &str) -> Result<Vec<u8>> {
        let path = self.resolve(location)?;
        tokio::fs::read(&path).await.map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                PdfError::file_not_found(path)
            } else {
                PdfError::Io(err)
            }
        })
    }

    async fn write_bytes(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let base = base_name(name);
        let millis = Utc::now().timestamp_millis();
        let mut attempt = 0u32;
        loop {
            let location = match attempt {
                0 => format!("{millis}-{base}"),
                n => format!("{millis}-{n}-{base}"),
            };
            match self.writer.write_bytes(bytes, &self.root.join(&location)).await {
                Ok(()) => return Ok(location),
                Err(PdfError::OutputExists { .. }) => attempt += 1,
                Err(err) => return Err(err),
            }
        }
    }

    async fn remove(&self, location: &str) -> Result<()> {
        let path = self.resolve(location)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory storage, mainly for tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    next: AtomicU64,
}

impl MemoryStorage {
    /// Create an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files.
    pub async fn len(&self) -> usize {
        self.files.lock().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.files.lock().await.is_empty()
    }
}

impl Storage for MemoryStorage {
    async fn read_bytes(&self, location: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .await
            .get(location)
            .cloned()
            .ok_or_else(|| PdfError::file_not_found(PathBuf::from(location)))
    }

    async fn write_bytes(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let location = format!("{n}-{}", base_name(name));
        self.files
            .lock()
            .await
            .insert(location.clone(), bytes.to_vec());
        Ok(location)
    }

    async fn remove(&self, location: &str) -> Result<()> {
        self.files.lock().await.remove(location);
        Ok(())
    }
}
