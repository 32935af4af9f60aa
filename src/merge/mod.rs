//! Document assembly.
//!
//! Extraction and merging are the same operation: build a fresh document
//! holding an ordered list of pages, each taken from some source document.
//! The destination always gets a new catalog and a flat page tree (one
//! `/Pages` node listing every copied leaf), so differing inheritance schemes
//! across sources never have to be reconciled.

pub mod copier;
mod metadata;

pub use copier::{CopyStats, ObjectCopier, SourceKey};
pub use metadata::{PRODUCER, format_pdf_date, info_dictionary};

use crate::config::Metadata;
use crate::error::{PdfError, Result};
use crate::object::{Dictionary, Document, Object, ObjectId};
use crate::pages::{PageTree, walk_page_tree};
use crate::parser::version_key;

/// US Letter, used for pages that resolve no `/MediaBox` at all.
pub const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Statistics about an assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyStatistics {
    /// Number of source documents that contributed pages.
    pub sources: usize,
    /// Pages in the assembled document.
    pub pages: usize,
    /// Requested page numbers that did not exist and were dropped.
    pub dropped: Vec<i64>,
    /// What the copier did.
    pub copy: CopyStats,
}

/// Result of an assembly.
#[derive(Debug, Clone)]
pub struct Assembled {
    /// The new document.
    pub document: Document,
    /// Statistics about the assembly.
    pub statistics: AssemblyStatistics,
}

/// A merge source that was left out, and why.
#[derive(Debug)]
pub struct SkippedSource {
    /// Position of the source in the caller's list.
    pub index: usize,
    /// Why it could not be used.
    pub error: PdfError,
}

/// Sources a lenient merge had to leave out.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Skipped sources in input order.
    pub skipped: Vec<SkippedSource>,
}

impl MergeReport {
    /// Whether every source was used.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Builds new documents from pages of existing ones.
///
/// Each call works on a fresh destination document and a fresh
/// [`ObjectCopier`]; an `Assembler` itself holds only settings and can be
/// shared between threads.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    metadata: Metadata,
}

struct Walked<'a> {
    doc: &'a Document,
    tree: PageTree,
}

impl Assembler {
    /// Create an assembler with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an assembler that writes `metadata` into every `/Info`.
    pub fn with_metadata(metadata: Metadata) -> Self {
        Self { metadata }
    }

    /// Build a document from selected pages of `source`.
    ///
    /// # Arguments
    ///
    /// * `source` - Document to take pages from
    /// * `page_numbers` - 1-based page numbers, in output order
    ///
    /// Numbers outside `1..=page_count` are dropped (and logged). Repeating a
    /// number repeats the page; the copies share their resources.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::EmptySelection`] when no valid number remains, or
    /// a [`PdfError::Structure`] error from walking the page tree.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfstitch::merge::Assembler;
    /// # fn example(doc: pdfstitch::Document) -> pdfstitch::Result<()> {
    /// let assembled = Assembler::new().extract_pages(&doc, &[2, 4])?;
    /// assert_eq!(assembled.statistics.pages, 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn extract_pages(&self, source: &Document, page_numbers: &[i64]) -> Result<Assembled> {
        let walked = Walked {
            doc: source,
            tree: walk_page_tree(source)?,
        };
        let total = walked.tree.pages.len();

        let mut picks = Vec::with_capacity(page_numbers.len());
        let mut dropped = Vec::new();
        for &number in page_numbers {
            match usize::try_from(number) {
                Ok(n) if (1..=total).contains(&n) => picks.push((0, n - 1)),
                _ => dropped.push(number),
            }
        }
        if !dropped.is_empty() {
            log::warn!("ignoring page numbers {dropped:?}: document has {total} pages");
        }

        let mut assembled = self.assemble(&[walked], &picks)?;
        assembled.statistics.dropped = dropped;
        Ok(assembled)
    }

    /// Build a document holding every page of every source, in order.
    ///
    /// Sources whose page tree cannot be walked (a cycle, a missing node,
    /// malformed `/Kids`) are left out and listed in the returned
    /// [`MergeReport`], indexed by their position in `sources`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::EmptySelection`] when no usable source has a page.
    pub fn merge_documents(&self, sources: &[Document]) -> Result<(Assembled, MergeReport)> {
        let mut report = MergeReport::default();
        let mut walked = Vec::with_capacity(sources.len());
        for (index, doc) in sources.iter().enumerate() {
            match walk_page_tree(doc) {
                Ok(tree) => walked.push(Walked { doc, tree }),
                Err(error) => {
                    log::warn!("skipping merge source {index}: {error}");
                    report.skipped.push(SkippedSource { index, error });
                }
            }
        }
        let assembled = self.concatenate(&walked)?;
        Ok((assembled, report))
    }

    /// Like [`Assembler::merge_documents`], but the first broken page tree
    /// fails the whole merge.
    ///
    /// # Errors
    ///
    /// Returns [`PdfError::EmptySelection`] when the sources have no pages
    /// at all, or the first page tree error encountered.
    pub fn merge_documents_strict(&self, sources: &[Document]) -> Result<Assembled> {
        let walked = sources
            .iter()
            .map(|doc| {
                Ok(Walked {
                    doc,
                    tree: walk_page_tree(doc)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.concatenate(&walked)
    }

    fn concatenate(&self, walked: &[Walked<'_>]) -> Result<Assembled> {
        let picks: Vec<(usize, usize)> = walked
            .iter()
            .enumerate()
            .flat_map(|(source, w)| (0..w.tree.pages.len()).map(move |page| (source, page)))
            .collect();
        self.assemble(walked, &picks)
    }

    /// Copy `picks` (source index, page index) into a new document.
    fn assemble(&self, sources: &[Walked<'_>], picks: &[(usize, usize)]) -> Result<Assembled> {
        if picks.is_empty() {
            return Err(PdfError::EmptySelection);
        }

        let version = sources
            .iter()
            .map(|s| s.doc.version.as_str())
            .max_by_key(|v| version_key(v))
            .unwrap_or("1.7");
        let mut dest = Document::with_version(version);
        let catalog_id = dest.new_object_id();
        let pages_id = dest.new_object_id();

        let mut copier = ObjectCopier::new();
        for (key, source) in sources.iter().enumerate() {
            for &node in &source.tree.nodes {
                copier.exclude(key, node);
            }
        }

        let mut kids = Vec::with_capacity(picks.len());
        for &(key, index) in picks {
            let source = &sources[key];
            let page = &source.tree.pages[index];
            let id = copier.copy_page(source.doc, key, page, &mut dest)?;
            attach_page(&mut dest, id, pages_id);
            kids.push(Object::Reference(id));
        }

        let count = kids.len();
        let mut pages = Dictionary::new();
        pages.set("Type", Object::name("Pages"));
        pages.set("Kids", kids);
        pages.set("Count", count as i64);
        dest.insert(pages_id, pages);

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::name("Catalog"));
        catalog.set("Pages", pages_id);
        dest.insert(catalog_id, catalog);

        let info_id = dest.add_object(info_dictionary(&self.metadata));

        dest.trailer.set("Root", catalog_id);
        dest.trailer.set("Info", info_id);
        // A file identifier only carries over when there is a single origin.
        if let [only] = sources
            && let Some(id) = only.doc.trailer.get(b"ID")
            && is_direct(id)
        {
            dest.trailer.set("ID", id.clone());
        }

        let mut used: Vec<usize> = picks.iter().map(|&(key, _)| key).collect();
        used.sort_unstable();
        used.dedup();
        let statistics = AssemblyStatistics {
            sources: used.len(),
            pages: count,
            dropped: Vec::new(),
            copy: copier.stats(),
        };
        log::debug!(
            "assembled {} pages from {} sources ({} objects copied)",
            statistics.pages,
            statistics.sources,
            statistics.copy.objects
        );

        Ok(Assembled {
            document: dest,
            statistics,
        })
    }
}

/// Re-parent a copied page under the destination tree.
fn attach_page(dest: &mut Document, page_id: ObjectId, pages_id: ObjectId) {
    if let Some(page) = dest.get_mut(page_id).and_then(Object::as_dict_mut) {
        page.set("Parent", pages_id);
        let has_media_box = page.get(b"MediaBox").is_some_and(|b| !b.is_null());
        if !has_media_box {
            page.set(
                "MediaBox",
                DEFAULT_MEDIA_BOX
                    .iter()
                    .map(|&v| Object::Integer(v))
                    .collect::<Vec<_>>(),
            );
        }
    }
}

fn is_direct(object: &Object) -> bool {
    match object {
        Object::Reference(_) => false,
        Object::Array(items) => items.iter().all(is_direct),
        _ => true,
    }
}

/// Extract pages of `source` with default settings.
///
/// See [`Assembler::extract_pages`].
pub fn extract_pages(source: &Document, page_numbers: &[i64]) -> Result<Document> {
    Assembler::new()
        .extract_pages(source, page_numbers)
        .map(|a| a.document)
}

/// Merge `sources` in order with default settings, skipping sources whose
/// page tree is broken.
///
/// See [`Assembler::merge_documents`].
pub fn merge_documents(sources: &[Document]) -> Result<(Document, MergeReport)> {
    Assembler::new()
        .merge_documents(sources)
        .map(|(assembled, report)| (assembled.document, report))
}
