//! PDF loading from disk.
//!
//! Files are read with `tokio::fs` and parsed on the blocking pool, several
//! at a time. Results always come back in input order, whatever order the
//! parses finish in.
//!
//! # Examples
//!
//! ```no_run
//! use pdfstitch::io::PdfReader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//! let (results, stats) = reader.load_all(&paths, 4).await;
//! println!("{} of {} loaded", stats.success_count, results.len());
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::task;

use crate::error::{PdfError, Result};
use crate::object::Document;
use crate::pages::page_count;
use crate::parser::parse_bytes;
use crate::utils::format_file_size;

/// A parsed PDF together with where it came from.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The parsed document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to read and parse the file.
    pub load_time: Duration,

    /// File size in bytes.
    pub file_size: u64,
}

/// Result of a load operation (success or failure).
pub type LoadResult = Result<LoadedPdf>;

/// Statistics for a batch load operation.
#[derive(Debug, Clone, Default)]
pub struct LoadStatistics {
    /// Number of PDFs successfully loaded.
    pub success_count: usize,

    /// Number of PDFs that failed to load.
    pub failure_count: usize,

    /// Wall-clock time for the whole batch.
    pub total_time: Duration,

    /// Total size of successfully loaded files.
    pub total_size: u64,

    /// Total number of pages loaded.
    pub total_pages: usize,
}

impl LoadStatistics {
    fn from_results(results: &[LoadResult], total_time: Duration) -> Self {
        let mut stats = Self {
            total_time,
            ..Self::default()
        };
        for result in results {
            match result {
                Ok(loaded) => {
                    stats.success_count += 1;
                    stats.total_size += loaded.file_size;
                    stats.total_pages += loaded.page_count;
                }
                Err(_) => stats.failure_count += 1,
            }
        }
        stats
    }

    /// Format total size as human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }
}

/// Loads PDF files into [`Document`]s.
#[derive(Debug, Clone, Default)]
pub struct PdfReader {
    /// Reject documents whose page tree has no leaves.
    require_pages: bool,
}

impl PdfReader {
    /// Create a reader that accepts any parseable document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader that also rejects documents with no pages.
    pub fn requiring_pages() -> Self {
        Self {
            require_pages: true,
        }
    }

    /// Load a single PDF document.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::FileNotFound`] or [`PdfError::NotAFile`] for a bad
    /// path. Read, parse and page tree failures are wrapped in
    /// [`PdfError::FailedToLoad`] carrying the path.
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        let path_buf = path.to_path_buf();
        let start = Instant::now();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| PdfError::file_not_found(path_buf.clone()))?;
        if !metadata.is_file() {
            return Err(PdfError::not_a_file(path_buf));
        }

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| PdfError::failed_to_load(path_buf.clone(), e.into()))?;
        let file_size = data.len() as u64;

        let require_pages = self.require_pages;
        let (document, pages) = task::spawn_blocking(move || {
            let document = parse_bytes(Bytes::from(data))?;
            let pages = page_count(&document)?;
            if require_pages && pages == 0 {
                return Err(PdfError::structure("document has no pages"));
            }
            Ok((document, pages))
        })
        .await
        .map_err(|e| PdfError::other(format!("Load task failed: {e}")))?
        .map_err(|e| PdfError::failed_to_load(path_buf.clone(), e))?;

        let load_time = start.elapsed();
        log::debug!(
            "loaded {} ({pages} pages, {}) in {load_time:?}",
            path_buf.display(),
            format_file_size(file_size)
        );

        Ok(LoadedPdf {
            document,
            path: path_buf,
            page_count: pages,
            load_time,
            file_size,
        })
    }

    /// Load many files, at most `workers` at a time.
    ///
    /// # Returns
    ///
    /// One result per path, in the same order as `paths`, plus aggregate
    /// statistics.
    pub async fn load_all(
        &self,
        paths: &[PathBuf],
        workers: usize,
    ) -> (Vec<LoadResult>, LoadStatistics) {
        self.load_with_progress(paths, workers, |_, _| {}).await
    }

    /// Like [`PdfReader::load_all`], calling `on_loaded` for each result in
    /// input order once the batch is complete.
    pub async fn load_with_progress<F>(
        &self,
        paths: &[PathBuf],
        workers: usize,
        mut on_loaded: F,
    ) -> (Vec<LoadResult>, LoadStatistics)
    where
        F: FnMut(usize, &LoadResult),
    {
        let start = Instant::now();
        let workers = workers.max(1);

        let tasks = paths.iter().enumerate().map(|(idx, path)| {
            let reader = self.clone();
            let path = path.clone();
            async move { (idx, reader.load(&path).await) }
        });

        let mut indexed: Vec<(usize, LoadResult)> = stream::iter(tasks)
            .buffer_unordered(workers)
            .collect()
            .await;
        indexed.sort_by_key(|(idx, _)| *idx);

        let mut results = Vec::with_capacity(indexed.len());
        for (idx, result) in indexed {
            on_loaded(idx, &result);
            results.push(result);
        }

        let stats = LoadStatistics::from_results(&results, start.elapsed());
        (results, stats)
    }
}
