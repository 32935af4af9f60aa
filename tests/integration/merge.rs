//! Integration tests for merging documents.

use pdfstitch::merge::Assembler;
use pdfstitch::serialize::serialize;
use pdfstitch::{PdfError, extract_pages, merge_documents, merge_documents_strict, page_count};

use crate::common::{build_pdf, count_typed, labelled_pdf, lopdf_page_count, page_labels};

/// Merge sources that are all expected to be usable.
fn merge_all<B: AsRef<[u8]>>(sources: &[B]) -> Vec<u8> {
    let (output, report) = merge_documents(sources).unwrap();
    assert!(report.is_complete(), "unexpected skips: {:?}", report.skipped);
    output
}

/// A catalog whose page tree root lists itself as its only kid.
fn cyclic_pdf() -> Vec<u8> {
    build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Parent 2 0 R /Kids [2 0 R] /Count 1 >>",
        ],
        "<< /Size 3 /Root 1 0 R >>",
    )
}

#[test]
fn test_merge_keeps_source_order() {
    let a = labelled_pdf("a", 2);
    let b = labelled_pdf("b", 3);

    let output = merge_all(&[&a, &b]);
    assert_eq!(page_labels(&output), ["a-1", "a-2", "b-1", "b-2", "b-3"]);

    let reversed = merge_all(&[&b, &a]);
    assert_eq!(page_labels(&reversed), ["b-1", "b-2", "b-3", "a-1", "a-2"]);
    assert_eq!(lopdf_page_count(&reversed), 5);
}

#[test]
fn test_merge_deduplicates_within_each_source() {
    let a = labelled_pdf("a", 4);
    let output = merge_all(&[&a, &a]);
    assert_eq!(page_count(&output).unwrap(), 8);
    // One font per source, however many pages use it.
    assert_eq!(count_typed(&output, b"Font"), 2);
}

#[test]
fn test_merge_single_source_equals_full_extract() {
    let a = labelled_pdf("a", 3);
    let merged = merge_all(&[&a]);
    let extracted = extract_pages(&a, &[1, 2, 3]).unwrap();
    assert_eq!(merged, extracted);
}

#[test]
fn test_merge_is_deterministic() {
    let a = labelled_pdf("a", 2);
    let b = labelled_pdf("b", 2);
    let first = merge_all(&[&a, &b]);
    let second = merge_all(&[&a, &b]);
    assert_eq!(first, second);
}

#[test]
fn test_remerging_output_is_stable() {
    let a = labelled_pdf("a", 2);
    let b = labelled_pdf("b", 1);
    let once = merge_all(&[&a, &b]);
    let twice = merge_all(&[&once]);
    assert_eq!(page_labels(&twice), page_labels(&once));
    assert_eq!(count_typed(&twice, b"Font"), count_typed(&once, b"Font"));
}

#[test]
fn test_merge_of_nothing_is_empty_selection() {
    let none: [&[u8]; 0] = [];
    assert!(matches!(
        merge_documents(&none),
        Err(PdfError::EmptySelection)
    ));

    let empty = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [] /Count 0 >>",
        ],
        "<< /Size 3 /Root 1 0 R >>",
    );
    assert!(matches!(
        merge_documents(&[&empty, &empty]),
        Err(PdfError::EmptySelection)
    ));
}

#[test]
fn test_strict_merge_fails_on_unreadable_source() {
    let a = labelled_pdf("a", 1);
    let garbage = b"%PDF-1.4\nnothing here".to_vec();
    assert!(matches!(
        merge_documents_strict(&[a.clone(), garbage]),
        Err(PdfError::Parse { .. })
    ));
    assert!(matches!(
        merge_documents_strict(&[a, cyclic_pdf()]),
        Err(PdfError::Structure { .. })
    ));
}

#[test]
fn test_merge_reports_skipped_sources() {
    let a = labelled_pdf("a", 1);
    let b = labelled_pdf("b", 2);
    let sources = [a.as_slice(), b"junk".as_slice(), b.as_slice()];

    let (output, report) = merge_documents(&sources).unwrap();
    assert_eq!(page_labels(&output), ["a-1", "b-1", "b-2"]);
    assert!(!report.is_complete());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 1);
    assert!(matches!(report.skipped[0].error, PdfError::Parse { .. }));
}

#[test]
fn test_merge_skips_encrypted_sources() {
    let a = labelled_pdf("a", 1);
    let locked = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [] /Count 0 >>",
            "<< /Filter /Standard /V 2 /R 3 >>",
        ],
        "<< /Size 4 /Root 1 0 R /Encrypt 3 0 R >>",
    );

    let (output, report) = merge_documents(&[&a, &locked]).unwrap();
    assert_eq!(page_count(&output).unwrap(), 1);
    assert!(matches!(report.skipped[0].error, PdfError::Encrypted));
}

#[test]
fn test_merge_skips_cyclic_page_tree() {
    let a = labelled_pdf("a", 2);
    let b = labelled_pdf("b", 1);
    let cyclic = cyclic_pdf();
    let sources = [
        a.as_slice(),
        cyclic.as_slice(),
        b"junk".as_slice(),
        b.as_slice(),
    ];

    let (output, report) = merge_documents(&sources).unwrap();
    assert_eq!(page_labels(&output), ["a-1", "a-2", "b-1"]);
    assert_eq!(lopdf_page_count(&output), 3);

    // Positions refer to the caller's list, parse and tree failures alike.
    let skipped: Vec<usize> = report.skipped.iter().map(|s| s.index).collect();
    assert_eq!(skipped, [1, 2]);
    assert!(matches!(report.skipped[0].error, PdfError::Structure { .. }));
    assert!(matches!(report.skipped[1].error, PdfError::Parse { .. }));
}

#[test]
fn test_merge_of_only_broken_sources_is_empty_selection() {
    let cyclic = cyclic_pdf();
    assert!(matches!(
        merge_documents(&[cyclic.as_slice(), b"junk".as_slice()]),
        Err(PdfError::EmptySelection)
    ));
}

#[test]
fn test_version_is_highest_of_sources() {
    let a = labelled_pdf("a", 1);
    let old = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R >>",
        ],
        "<< /Size 4 /Root 1 0 R >>",
    );

    let output = merge_all(&[&old, &a]);
    assert!(output.starts_with(b"%PDF-1.5\n"));
}

#[test]
fn test_assembler_statistics_and_metadata() {
    let a = pdfstitch::parse(&labelled_pdf("a", 2)).unwrap();
    let b = pdfstitch::parse(&labelled_pdf("b", 1)).unwrap();
    let metadata = pdfstitch::config::Metadata::new(
        Some("Bundle".to_string()),
        Some("Tests".to_string()),
        None,
        None,
    );

    let assembled = Assembler::with_metadata(metadata)
        .merge_documents_strict(&[a, b])
        .unwrap();
    assert_eq!(assembled.statistics.sources, 2);
    assert_eq!(assembled.statistics.pages, 3);
    assert_eq!(assembled.statistics.copy.dangling, 0);

    let bytes = serialize(&assembled.document);
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("/Title (Bundle)"));
    assert!(text.contains("/Author (Tests)"));
    assert_eq!(lopdf_page_count(&bytes), 3);
}
