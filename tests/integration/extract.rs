//! Integration tests for page extraction.

use pdfstitch::object::Object;
use pdfstitch::pages::enumerate_pages;
use pdfstitch::{PdfError, extract_pages, page_count};
use rstest::rstest;

use crate::common::{build_pdf, count_typed, labelled_pdf, lopdf_page_count, page_labels};

#[rstest]
#[case(&[2, 4], &["doc-2", "doc-4"])]
#[case(&[3, 1], &["doc-3", "doc-1"])]
#[case(&[0, 3, 99], &["doc-3"])]
#[case(&[-1, 5, 5], &["doc-5", "doc-5"])]
fn test_extract_selects_pages_in_request_order(
    #[case] numbers: &[i64],
    #[case] expected: &[&str],
) {
    let source = labelled_pdf("doc", 5);
    let output = extract_pages(&source, numbers).unwrap();
    assert_eq!(page_labels(&output), expected);
}

#[test]
fn test_extract_output_is_readable_elsewhere() {
    let source = labelled_pdf("doc", 4);
    let output = extract_pages(&source, &[2, 4]).unwrap();
    assert_eq!(page_count(&output).unwrap(), 2);
    assert_eq!(lopdf_page_count(&output), 2);
}

#[test]
fn test_extract_materializes_inherited_attributes() {
    let source = labelled_pdf("doc", 3);
    let output = extract_pages(&source, &[2]).unwrap();

    let doc = pdfstitch::parse(&output).unwrap();
    let page = &enumerate_pages(&doc).unwrap()[0];
    let dict = doc.get_dict(page.id).unwrap();
    assert!(dict.has(b"Resources"));
    assert_eq!(
        dict.get(b"MediaBox"),
        Some(&Object::Array(
            [0, 0, 595, 842].into_iter().map(Object::Integer).collect()
        ))
    );
}

#[test]
fn test_repeated_page_shares_one_font() {
    let source = labelled_pdf("doc", 3);
    let output = extract_pages(&source, &[1, 2, 1, 3]).unwrap();
    assert_eq!(page_labels(&output), ["doc-1", "doc-2", "doc-1", "doc-3"]);
    assert_eq!(count_typed(&output, b"Font"), 1);
}

#[test]
fn test_no_valid_page_is_empty_selection() {
    let source = labelled_pdf("doc", 2);
    assert!(matches!(
        extract_pages(&source, &[0, 3, -7]),
        Err(PdfError::EmptySelection)
    ));
    assert!(matches!(
        extract_pages(&source, &[]),
        Err(PdfError::EmptySelection)
    ));
}

#[test]
fn test_garbage_is_parse_error() {
    assert!(matches!(
        extract_pages(b"not a pdf at all", &[1]),
        Err(PdfError::Parse { .. })
    ));
}

#[test]
fn test_cyclic_page_tree_is_structure_error() {
    let source = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Pages /Parent 2 0 R /Kids [2 0 R] /Count 1 >>",
        ],
        "<< /Size 4 /Root 1 0 R >>",
    );
    assert!(matches!(
        extract_pages(&source, &[1]),
        Err(PdfError::Structure { .. })
    ));
    assert!(matches!(page_count(&source), Err(PdfError::Structure { .. })));
}

#[test]
fn test_cyclic_resources_are_copied_once() {
    // The form XObject lists itself among its own resources.
    let form = "<< /Type /XObject /Subtype /Form /BBox [0 0 10 10] \
/Resources << /XObject << /Me 4 0 R >> >> /Length 0 >>\nstream\n\nendstream";
    let source = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 50 50] \
/Resources << /XObject << /X 4 0 R >> >> >>",
            form,
        ],
        "<< /Size 5 /Root 1 0 R >>",
    );

    let output = extract_pages(&source, &[1]).unwrap();
    let doc = pdfstitch::parse(&output).unwrap();
    let forms: Vec<_> = doc
        .objects
        .iter()
        .filter(|(_, object)| object.as_stream().is_some_and(|s| s.dict.has_type(b"XObject")))
        .collect();
    assert_eq!(forms.len(), 1);

    let (form_id, form) = forms[0];
    let own = form
        .as_stream()
        .and_then(|s| s.dict.get(b"Resources"))
        .and_then(Object::as_dict)
        .and_then(|r| r.get(b"XObject"))
        .and_then(Object::as_dict)
        .and_then(|x| x.get(b"Me"))
        .and_then(Object::as_reference);
    assert_eq!(own, Some(*form_id));
}

#[test]
fn test_link_to_unselected_page_keeps_tree_flat() {
    // The annotation on page 1 points back at page 1 and links to page 2,
    // which is not selected. Page 2 is copied as a plain object outside the
    // new tree.
    let source = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 10 10] >>",
            "<< /Type /Page /Parent 2 0 R /Annots [5 0 R] >>",
            "<< /Type /Page /Parent 2 0 R >>",
            "<< /Type /Annot /Subtype /Link /P 3 0 R /Dest [4 0 R /Fit] >>",
        ],
        "<< /Size 6 /Root 1 0 R >>",
    );

    let output = extract_pages(&source, &[1]).unwrap();
    assert_eq!(page_count(&output).unwrap(), 1);
    assert_eq!(count_typed(&output, b"Page"), 2);
    assert_eq!(count_typed(&output, b"Pages"), 1);
    assert_eq!(lopdf_page_count(&output), 1);
}
