//! pdfstitch - Merge PDF documents and extract pages.
//!
//! The crate reads PDF files into an in-memory object graph, copies pages
//! between graphs without breaking the resources they share, and writes the
//! result back out as a fresh, self-contained file. It provides:
//!
//! - A tolerant parser (classic and stream cross-references, object streams,
//!   incremental updates, recovery by scanning)
//! - Page tree traversal with inherited attributes
//! - Deduplicating, cycle-safe object copying
//! - Page extraction and document merging
//! - A deterministic serializer
//! - Async file loading and atomic saving
//! - A small document library with pluggable storage
//!
//! # Examples
//!
//! ## Working on bytes
//!
//! ```no_run
//! # fn example() -> pdfstitch::Result<()> {
//! let a = std::fs::read("a.pdf")?;
//! let b = std::fs::read("b.pdf")?;
//!
//! println!("a.pdf has {} pages", pdfstitch::page_count(&a)?);
//!
//! let (merged, report) = pdfstitch::merge_documents(&[&a, &b])?;
//! for skipped in &report.skipped {
//!     eprintln!("source {} left out: {}", skipped.index, skipped.error);
//! }
//! let excerpt = pdfstitch::extract_pages(&merged, &[1, 3])?;
//! std::fs::write("excerpt.pdf", excerpt)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using individual components
//!
//! ```no_run
//! use pdfstitch::config::Metadata;
//! use pdfstitch::io::{PdfReader, PdfWriter};
//! use pdfstitch::merge::Assembler;
//! use std::path::Path;
//!
//! # async fn example() -> pdfstitch::Result<()> {
//! let loaded = PdfReader::new().load(Path::new("input.pdf")).await?;
//! let metadata = Metadata::new(Some("Excerpt".to_string()), None, None, None);
//! let assembled = Assembler::with_metadata(metadata).extract_pages(&loaded.document, &[2, 4])?;
//! PdfWriter::new()
//!     .save(&assembled.document, Path::new("excerpt.pdf"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod io;
pub mod library;
pub mod merge;
pub mod object;
pub mod output;
pub mod pages;
pub mod parser;
pub mod serialize;
pub mod utils;

// Re-export commonly used types
pub use error::{PdfError, Result};
pub use merge::{MergeReport, SkippedSource};
pub use object::{Document, Object, ObjectId};
pub use parser::parse;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Number of pages in a PDF.
///
/// # Errors
///
/// Returns [`PdfError::Parse`] for unreadable bytes and
/// [`PdfError::Structure`] for a broken page tree.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    pages::page_count(&parse(bytes)?)
}

/// Build a new PDF from pages of `bytes`, in the order given.
///
/// Page numbers are 1-based. Numbers that do not name a page are dropped;
/// repeated numbers repeat the page.
///
/// # Errors
///
/// * [`PdfError::Parse`] when `bytes` is not a readable PDF.
/// * [`PdfError::EmptySelection`] when no valid page number remains.
/// * [`PdfError::Structure`] when the page tree is broken.
pub fn extract_pages(bytes: &[u8], page_numbers: &[i64]) -> Result<Vec<u8>> {
    let source = parse(bytes)?;
    let document = merge::extract_pages(&source, page_numbers)?;
    Ok(serialize::serialize(&document))
}

/// Concatenate every page of every source, in order.
///
/// A source that cannot be used is left out and listed in the returned
/// [`MergeReport`] under its position in `sources`. That covers bytes that
/// do not parse (including encrypted files) and documents whose page tree
/// cannot be walked.
///
/// # Errors
///
/// [`PdfError::EmptySelection`] when no usable source has a page.
pub fn merge_documents<B: AsRef<[u8]>>(sources: &[B]) -> Result<(Vec<u8>, MergeReport)> {
    let mut documents = Vec::with_capacity(sources.len());
    let mut positions = Vec::with_capacity(sources.len());
    let mut report = MergeReport::default();
    for (index, source) in sources.iter().enumerate() {
        match parse(source.as_ref()) {
            Ok(document) => {
                documents.push(document);
                positions.push(index);
            }
            Err(error) => {
                log::warn!("skipping merge source {index}: {error}");
                report.skipped.push(SkippedSource { index, error });
            }
        }
    }

    let (merged, walk_report) = merge::merge_documents(&documents)?;
    report
        .skipped
        .extend(walk_report.skipped.into_iter().map(|skipped| SkippedSource {
            index: positions[skipped.index],
            error: skipped.error,
        }));
    report.skipped.sort_by_key(|skipped| skipped.index);
    Ok((serialize::serialize(&merged), report))
}

/// Like [`merge_documents`], but the first unusable source fails the merge.
///
/// # Errors
///
/// * [`PdfError::Parse`] or [`PdfError::Encrypted`] for a source that cannot
///   be read.
/// * [`PdfError::Structure`] for a broken page tree.
/// * [`PdfError::EmptySelection`] when the sources hold no pages.
pub fn merge_documents_strict<B: AsRef<[u8]>>(sources: &[B]) -> Result<Vec<u8>> {
    let documents = sources
        .iter()
        .map(|source| parse(source.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let merged = merge::Assembler::new().merge_documents_strict(&documents)?;
    Ok(serialize::serialize(&merged.document))
}
