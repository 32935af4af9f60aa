//! Integration tests for loading and saving files.

use std::path::PathBuf;

use pdfstitch::PdfError;
use pdfstitch::config::OverwriteMode;
use pdfstitch::io::{PdfReader, PdfWriter};
use pdfstitch::merge::Assembler;
use tempfile::TempDir;

use crate::common::{labelled_pdf, lopdf_page_count, page_labels};

fn write_fixture(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

#[tokio::test]
async fn test_load_merge_save() {
    let dir = TempDir::new().unwrap();
    let a = write_fixture(&dir, "a.pdf", &labelled_pdf("a", 2));
    let b = write_fixture(&dir, "b.pdf", &labelled_pdf("b", 1));
    let output = dir.path().join("out.pdf");

    let (results, stats) = PdfReader::new().load_all(&[a.clone(), b.clone()], 2).await;
    assert_eq!(stats.success_count, 2);
    assert_eq!(stats.total_pages, 3);

    let documents: Vec<_> = results
        .into_iter()
        .map(|result| result.unwrap().document)
        .collect();
    let (assembled, report) = Assembler::new().merge_documents(&documents).unwrap();
    assert!(report.is_complete());
    let written = PdfWriter::new()
        .save_with_stats(&assembled.document, &output)
        .await
        .unwrap();

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(written.file_size, bytes.len() as u64);
    assert_eq!(page_labels(&bytes), ["a-1", "a-2", "b-1"]);
    assert_eq!(lopdf_page_count(&bytes), 3);
}

#[tokio::test]
async fn test_results_keep_input_order() {
    let dir = TempDir::new().unwrap();
    let paths: Vec<PathBuf> = (1..=6)
        .map(|n| write_fixture(&dir, &format!("{n}.pdf"), &labelled_pdf("x", n)))
        .collect();

    let mut seen = Vec::new();
    let (results, _) = PdfReader::new()
        .load_with_progress(&paths, 3, |idx, _| seen.push(idx))
        .await;

    assert_eq!(seen, [0, 1, 2, 3, 4, 5]);
    let counts: Vec<usize> = results.iter().map(|r| r.as_ref().unwrap().page_count).collect();
    assert_eq!(counts, [1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_bad_inputs_are_reported_per_file() {
    let dir = TempDir::new().unwrap();
    let good = write_fixture(&dir, "good.pdf", &labelled_pdf("g", 1));
    let junk = write_fixture(&dir, "junk.pdf", b"plain text");
    let missing = dir.path().join("missing.pdf");

    let (results, stats) = PdfReader::new()
        .load_all(&[good, junk, missing], 2)
        .await;
    assert_eq!(stats.success_count, 1);
    assert_eq!(stats.failure_count, 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(PdfError::FailedToLoad { .. })));
    assert!(matches!(results[2], Err(PdfError::FileNotFound { .. })));
}

#[tokio::test]
async fn test_no_clobber_keeps_existing_output() {
    let dir = TempDir::new().unwrap();
    let output = write_fixture(&dir, "out.pdf", b"keep me");
    let doc = pdfstitch::parse(&labelled_pdf("a", 1)).unwrap();

    let err = PdfWriter::with_overwrite(OverwriteMode::NoClobber)
        .save(&doc, &output)
        .await
        .unwrap_err();
    assert!(matches!(err, PdfError::OutputExists { .. }));
    assert_eq!(std::fs::read(&output).unwrap(), b"keep me");

    PdfWriter::with_overwrite(OverwriteMode::Force)
        .save(&doc, &output)
        .await
        .unwrap();
    assert_eq!(lopdf_page_count(&std::fs::read(&output).unwrap()), 1);

    // Only the output itself is left behind.
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
