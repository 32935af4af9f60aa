//! Shared fixtures for the integration tests.
//!
//! Well-formed documents are produced with `lopdf`, so the engine is always
//! fed files written by another implementation. Layouts lopdf cannot emit
//! (incremental updates, object streams, broken offsets) are assembled by
//! hand.

#![allow(dead_code)]

use lopdf::{Object as LoObject, Stream as LoStream, dictionary};
use pdfstitch::object::{Document, Object};
use pdfstitch::pages::enumerate_pages;

fn box_of(values: [i64; 4]) -> LoObject {
    LoObject::Array(values.into_iter().map(LoObject::Integer).collect())
}

/// A document whose page `n` draws the text `{label}-{n}`.
///
/// Every page shares one font through resources inherited from the page
/// tree root, and the media box is inherited too.
pub fn labelled_pdf(label: &str, pages: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::with_capacity(pages);
    for n in 1..=pages {
        let text = format!("BT /F1 24 Tf 72 700 Td ({label}-{n}) Tj ET");
        let content_id = doc.add_object(LoStream::new(dictionary! {}, text.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(LoObject::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => LoObject::Integer(pages as i64),
            "Resources" => resources_id,
            "MediaBox" => box_of([0, 0, 595, 842]),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("lopdf fixture");
    out
}

/// Lay out numbered object bodies and a classic xref table.
///
/// Object `i + 1` gets `objects[i]` as its body.
pub fn build_pdf(objects: &[&str], trailer: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{body}\nendobj\n", i + 1).as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(
        format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
    );
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(format!("trailer\n{trailer}\nstartxref\n{xref}\n%%EOF\n").as_bytes());
    out
}

/// A one-page file followed by an update that replaces the page's media
/// box and appends a second page.
pub fn incrementally_updated_pdf() -> Vec<u8> {
    let mut out = build_pdf(
        &[
            "<< /Type /Catalog /Pages 2 0 R >>",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 100] >>",
        ],
        "<< /Size 4 /Root 1 0 R >>",
    );
    let base_xref = startxref_of(&out);

    let mut offsets = Vec::new();
    for (number, body) in [
        (2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>"),
        (3, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 300] >>"),
        (4, "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 400 400] >>"),
    ] {
        offsets.push(out.len());
        out.extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
    }
    let xref = out.len();
    out.extend_from_slice(b"xref\n2 3\n");
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size 5 /Root 1 0 R /Prev {base_xref} >>\nstartxref\n{xref}\n%%EOF\n"
        )
        .as_bytes(),
    );
    out
}

/// Catalog, page tree and two pages packed into an object stream, indexed
/// by an uncompressed cross-reference stream.
pub fn object_stream_pdf() -> Vec<u8> {
    let packed = [
        (1, "<< /Type /Catalog /Pages 2 0 R >>"),
        (2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 200 200] >>"),
        (3, "<< /Type /Page /Parent 2 0 R >>"),
        (4, "<< /Type /Page /Parent 2 0 R /Rotate 90 >>"),
    ];

    let mut header = String::new();
    let mut body = String::new();
    for (number, text) in packed {
        header.push_str(&format!("{number} {} ", body.len()));
        body.push_str(text);
        body.push('\n');
    }
    let content = format!("{header}{body}");

    let mut out = b"%PDF-1.5\n".to_vec();
    let container_offset = out.len();
    out.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /ObjStm /N {} /First {} /Length {} >>\nstream\n{content}\nendstream\nendobj\n",
            packed.len(),
            header.len(),
            content.len()
        )
        .as_bytes(),
    );

    // Rows: type(1) field2(4) field3(2)
    let xref_offset = out.len();
    let mut rows = Vec::new();
    let mut row = |kind: u8, field2: u32, field3: u16| {
        rows.push(kind);
        rows.extend_from_slice(&field2.to_be_bytes());
        rows.extend_from_slice(&field3.to_be_bytes());
    };
    row(0, 0, 65535);
    for index in 0..packed.len() {
        row(2, 5, index as u16);
    }
    row(1, container_offset as u32, 0);
    row(1, xref_offset as u32, 0);

    out.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /XRef /Size 7 /W [1 4 2] /Root 1 0 R /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes());
    out
}

/// Last occurrence of `needle` in `haystack`.
pub fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

/// Offset recorded after the last `startxref`.
pub fn startxref_of(bytes: &[u8]) -> usize {
    let pos = rfind(bytes, b"startxref").expect("startxref");
    String::from_utf8_lossy(&bytes[pos + b"startxref".len()..])
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .expect("startxref offset")
}

/// The text label each page of `bytes` draws, in page order.
pub fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = pdfstitch::parse(bytes).expect("output parses");
    enumerate_pages(&doc)
        .expect("page tree")
        .iter()
        .map(|page| label_of(&doc, page.id))
        .collect()
}

fn label_of(doc: &Document, page: pdfstitch::ObjectId) -> String {
    let contents = doc
        .get_dict(page)
        .ok()
        .and_then(|dict| dict.get(b"Contents"))
        .and_then(Object::as_reference)
        .and_then(|id| doc.get(id))
        .and_then(Object::as_stream)
        .expect("page has a content stream");
    let text = String::from_utf8_lossy(&contents.content);
    let start = text.find('(').expect("label start") + 1;
    let end = text[start..].find(')').expect("label end") + start;
    text[start..end].to_string()
}

/// Number of objects whose `/Type` is `type_name`.
pub fn count_typed(bytes: &[u8], type_name: &[u8]) -> usize {
    let doc = pdfstitch::parse(bytes).expect("output parses");
    doc.objects
        .values()
        .filter(|object| match object {
            Object::Dictionary(dict) => dict.has_type(type_name),
            Object::Stream(stream) => stream.dict.has_type(type_name),
            _ => false,
        })
        .count()
}

/// Page count as seen by an independent reader.
pub fn lopdf_page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes)
        .expect("lopdf loads the output")
        .get_pages()
        .len()
}
