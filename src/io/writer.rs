//! PDF writing to disk.
//!
//! Output is serialized in memory on the blocking pool, written next to the
//! destination under a temporary name and then renamed into place, so a
//! reader never observes a half-written file.
//!
//! # Examples
//!
//! ```no_run
//! use pdfstitch::io::PdfWriter;
//! use pdfstitch::Document;
//! use std::path::Path;
//!
//! # async fn example(doc: Document) -> Result<(), Box<dyn std::error::Error>> {
//! let stats = PdfWriter::new().save_with_stats(&doc, Path::new("out.pdf")).await?;
//! println!("wrote {}", stats.format_file_size());
//! # Ok(())
//! # }
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::task;

use crate::config::OverwriteMode;
use crate::error::{PdfError, Result};
use crate::object::Document;
use crate::serialize::serialize;
use crate::utils::format_file_size;

/// Options for writing PDF files.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Write to a temporary file and rename it over the destination.
    pub atomic: bool,

    /// What to do when the destination already exists.
    pub overwrite: OverwriteMode,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            overwrite: OverwriteMode::Force,
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to serialize and write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Writes documents and raw PDF bytes to disk.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a new PDF writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Create a writer applying the given overwrite policy.
    pub fn with_overwrite(overwrite: OverwriteMode) -> Self {
        Self {
            options: WriteOptions {
                overwrite,
                ..WriteOptions::default()
            },
        }
    }

    /// Serialize `doc` and write it to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::OutputExists`] when `path` exists under
    /// [`OverwriteMode::NoClobber`], or [`PdfError::FailedToWrite`] when the
    /// file cannot be written.
    pub async fn save_with_stats(&self, doc: &Document, path: &Path) -> Result<WriteStatistics> {
        let start = Instant::now();
        let doc = doc.clone();
        let bytes = task::spawn_blocking(move || serialize(&doc))
            .await
            .map_err(|e| PdfError::other(format!("Serialize task failed: {e}")))?;
        self.write_bytes(&bytes, path).await?;

        Ok(WriteStatistics {
            write_time: start.elapsed(),
            file_size: bytes.len() as u64,
            output_path: path.to_path_buf(),
        })
    }

    /// Like [`PdfWriter::save_with_stats`], discarding the statistics.
    pub async fn save(&self, doc: &Document, path: &Path) -> Result<()> {
        self.save_with_stats(doc, path).await.map(|_| ())
    }

    /// Write already serialized PDF bytes to `path`.
    ///
    /// # Errors
    ///
    /// Same as [`PdfWriter::save_with_stats`].
    pub async fn write_bytes(&self, bytes: &[u8], path: &Path) -> Result<()> {
        if self.options.overwrite == OverwriteMode::NoClobber && self.exists(path).await {
            return Err(PdfError::output_exists(path.to_path_buf()));
        }

        let failed = |source: std::io::Error| PdfError::FailedToWrite {
            path: path.to_path_buf(),
            source,
        };

        if !self.options.atomic {
            return tokio::fs::write(path, bytes).await.map_err(failed);
        }

        let temp = temp_path(path);
        if let Err(err) = tokio::fs::write(&temp, bytes).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(failed(err));
        }
        if let Err(err) = tokio::fs::rename(&temp, path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(failed(err));
        }
        log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Check if output file exists.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }
}

/// `out.pdf` becomes `.out.pdf.tmp` in the same directory.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(".tmp");
    path.with_file_name(name)
}
