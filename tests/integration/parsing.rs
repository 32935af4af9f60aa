//! Integration tests for reading files of different layouts.

use pdfstitch::object::{Object, ObjectId};
use pdfstitch::pages::enumerate_pages;
use pdfstitch::serialize::serialize;
use pdfstitch::{PdfError, extract_pages, merge_documents, page_count, parse};

use crate::common::{
    incrementally_updated_pdf, labelled_pdf, lopdf_page_count, object_stream_pdf, page_labels,
    rfind, startxref_of,
};

/// Catalog 1 and page tree 2 holding one page numbered `page`, written with
/// a two-subsection xref table.
fn numbered_page_pdf(page: u32) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (number, body) in [
        (1, "<< /Type /Catalog /Pages 2 0 R >>".to_string()),
        (2, format!("<< /Type /Pages /Kids [{page} 0 R] /Count 1 >>")),
        (page, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 10 10] >>".to_string()),
    ] {
        offsets.push(out.len());
        out.extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(b"xref\n0 3\n0000000000 65535 f \n");
    out.extend_from_slice(format!("{:010} 00000 n \n", offsets[0]).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", offsets[1]).as_bytes());
    out.extend_from_slice(format!("{page} 1\n{:010} 00000 n \n", offsets[2]).as_bytes());
    out.extend_from_slice(
        format!("trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n").as_bytes(),
    );
    out
}

fn media_box(doc: &pdfstitch::Document, page: ObjectId) -> Option<Vec<i64>> {
    doc.get_dict(page)
        .ok()?
        .get(b"MediaBox")?
        .as_array()
        .map(|items| items.iter().filter_map(Object::as_i64).collect())
}

#[test]
fn test_lopdf_output_roundtrips() {
    let source = labelled_pdf("doc", 3);
    let doc = parse(&source).unwrap();
    assert_eq!(doc.version, "1.5");
    assert_eq!(page_count(&source).unwrap(), 3);

    let rewritten = serialize(&doc);
    assert_eq!(page_labels(&rewritten), ["doc-1", "doc-2", "doc-3"]);
    assert_eq!(lopdf_page_count(&rewritten), 3);
}

#[test]
fn test_incremental_update_uses_newest_revision() {
    let source = incrementally_updated_pdf();
    let doc = parse(&source).unwrap();
    let pages = enumerate_pages(&doc).unwrap();

    assert_eq!(pages.len(), 2);
    assert_eq!(media_box(&doc, pages[0].id), Some(vec![0, 0, 300, 300]));
    assert_eq!(media_box(&doc, pages[1].id), Some(vec![0, 0, 400, 400]));
}

#[test]
fn test_incremental_update_flattens_on_write() {
    let (output, _) = merge_documents(&[incrementally_updated_pdf()]).unwrap();
    let text = String::from_utf8_lossy(&output);
    assert_eq!(text.matches("startxref").count(), 1);
    assert_eq!(text.matches("%%EOF").count(), 1);
    assert!(!text.contains("/Prev"));
    assert_eq!(lopdf_page_count(&output), 2);
}

#[test]
fn test_object_streams_are_unpacked() {
    let source = object_stream_pdf();
    let doc = parse(&source).unwrap();
    assert_eq!(doc.catalog_id().unwrap(), ObjectId::new(1, 0));

    let pages = enumerate_pages(&doc).unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[1].attributes.rotate, Some(Object::Integer(90)));

    // Containers and the xref stream do not survive into the object graph.
    assert!(doc.objects.values().all(|object| {
        object
            .as_stream()
            .is_none_or(|s| !s.dict.has_type(b"ObjStm") && !s.dict.has_type(b"XRef"))
    }));
}

#[test]
fn test_object_stream_pages_extract_with_inherited_box() {
    let output = extract_pages(&object_stream_pdf(), &[2]).unwrap();
    let doc = parse(&output).unwrap();
    let page = &enumerate_pages(&doc).unwrap()[0];
    assert_eq!(media_box(&doc, page.id), Some(vec![0, 0, 200, 200]));
    assert_eq!(
        doc.get_dict(page.id).unwrap().get(b"Rotate"),
        Some(&Object::Integer(90))
    );
}

#[test]
fn test_wrong_startxref_is_recovered() {
    let mut source = labelled_pdf("doc", 2);
    let pos = rfind(&source, b"startxref").unwrap();
    source.truncate(pos);
    source.extend_from_slice(b"startxref\n12\n%%EOF\n");

    assert_eq!(page_count(&source).unwrap(), 2);
    let output = extract_pages(&source, &[2]).unwrap();
    assert_eq!(page_labels(&output), ["doc-2"]);
}

#[test]
fn test_truncated_tail_is_recovered() {
    let mut source = labelled_pdf("doc", 2);
    let xref = startxref_of(&source);
    source.truncate(xref);

    assert_eq!(page_count(&source).unwrap(), 2);
}

#[test]
fn test_written_xref_offsets_point_at_objects() {
    let (output, _) = merge_documents(&[labelled_pdf("a", 2)]).unwrap();
    let xref = startxref_of(&output);
    let table = std::str::from_utf8(&output[xref..]).unwrap();
    assert!(table.starts_with("xref\n"));

    let entries = table
        .lines()
        .skip(2)
        .take_while(|line| !line.starts_with("trailer"));
    for (number, entry) in entries.enumerate() {
        if !entry.ends_with(" n") {
            continue;
        }
        let offset: usize = entry[..10].parse().unwrap();
        assert!(
            output[offset..].starts_with(format!("{number} 0 obj").as_bytes()),
            "entry {number} points at {offset}"
        );
    }
}

#[test]
fn test_sparse_object_numbers_roundtrip() {
    let source = numbered_page_pdf(300_000);
    let doc = parse(&source).unwrap();
    let pages = enumerate_pages(&doc).unwrap();
    assert_eq!(pages[0].id, ObjectId::new(300_000, 0));

    let rewritten = serialize(&doc);
    let reparsed = parse(&rewritten).unwrap();
    assert_eq!(reparsed.objects, doc.objects);
    assert_eq!(lopdf_page_count(&rewritten), 1);

    // Assembly renumbers densely.
    let extracted = extract_pages(&source, &[1]).unwrap();
    assert!(extracted.len() < 2048);
    assert_eq!(page_count(&extracted).unwrap(), 1);
}

#[test]
fn test_object_numbers_past_the_limit_are_damage() {
    let source = numbered_page_pdf(u32::MAX);
    let doc = parse(&source).unwrap();
    assert!(doc.objects.keys().all(|id| id.number <= 2));

    // The page is unreachable, so the tree is broken rather than the writer.
    assert!(matches!(
        page_count(&source),
        Err(PdfError::Structure { .. })
    ));
    assert!(page_count(&serialize(&doc)).is_err());

    let (output, report) = merge_documents(&[source, labelled_pdf("a", 1)]).unwrap();
    assert_eq!(page_labels(&output), ["a-1"]);
    assert_eq!(report.skipped[0].index, 0);
}
