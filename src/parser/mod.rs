//! PDF file parsing.
//!
//! [`parse`] turns the bytes of a PDF file into a [`Document`]. The
//! cross-reference data is used when it is sound; otherwise the file is
//! scanned for `N G obj` headers and the object graph is rebuilt from those.
//! Objects packed into object streams are unpacked, so the resulting document
//! only ever holds plain indirect objects.
//!
//! # Examples
//!
//! ```no_run
//! let bytes = std::fs::read("report.pdf")?;
//! let doc = pdfstitch::parse(&bytes)?;
//! println!("PDF {} with {} objects", doc.version, doc.objects.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod filters;
pub mod lexer;
mod objects;
mod recovery;
mod xref;

use std::collections::BTreeSet;

use bytes::Bytes;

use crate::error::{PdfError, Result};
use crate::object::{Dictionary, Document, Object, ObjectId, Stream};
use lexer::{Token, token};
use objects::{parse_indirect_object, parse_object};
use xref::XrefEntry;

/// How far into the file the `%PDF-` header may appear.
const HEADER_SEARCH_LIMIT: usize = 1024;

/// Parse a complete PDF file.
///
/// # Errors
///
/// * [`PdfError::Parse`] when there is no `%PDF-` header, or when neither the
///   cross-reference data nor a byte scan yields a catalog with a `/Pages`
///   tree.
/// * [`PdfError::Encrypted`] when the trailer names an `/Encrypt` dictionary.
pub fn parse(bytes: &[u8]) -> Result<Document> {
    parse_bytes(Bytes::copy_from_slice(bytes))
}

/// Parse a PDF held in a shared buffer. Stream contents borrow from `data`.
pub fn parse_bytes(data: Bytes) -> Result<Document> {
    let version = read_header(&data)?;

    let mut doc = match load_with_xref(&data, &version) {
        Ok(doc) => doc,
        Err(PdfError::Encrypted) => return Err(PdfError::Encrypted),
        Err(err) => {
            log::warn!("cross-reference data unusable ({err}); rebuilding from a byte scan");
            load_by_scanning(&data, &version)?
        }
    };

    // An update may raise the version through the catalog instead of the header.
    if let Some(newer) = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Version"))
        .and_then(Object::as_name)
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .filter(|name| version_key(name) > version_key(&doc.version))
    {
        doc.version = newer;
    }

    log::debug!(
        "parsed PDF {} with {} objects",
        doc.version,
        doc.objects.len()
    );
    Ok(doc)
}

fn read_header(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(HEADER_SEARCH_LIMIT)];
    let pos = find(window, b"%PDF-", 0).ok_or_else(|| PdfError::parse("missing %PDF- header"))?;
    let version: String = data[pos + 5..]
        .iter()
        .take_while(|c| c.is_ascii_digit() || **c == b'.')
        .map(|&c| char::from(c))
        .collect();
    if version.is_empty() {
        return Err(PdfError::parse("header has no version number"));
    }
    Ok(version)
}

pub(crate) fn version_key(version: &str) -> (u32, u32) {
    let mut parts = version.split('.').map(|p| p.parse().unwrap_or(0));
    (parts.next().unwrap_or(0), parts.next().unwrap_or(0))
}

fn load_with_xref(data: &Bytes, version: &str) -> Result<Document> {
    let table = xref::read_xref_chain(data)?;
    if table.trailer.has(b"Encrypt") {
        return Err(PdfError::Encrypted);
    }

    let length_of = |id: ObjectId| {
        let offset = table.offset_of(id.number)?;
        let (_, object) = parse_indirect_object(data, offset, &|_| None).ok()?;
        object.as_i64()
    };

    let mut doc = Document::with_version(version);
    let mut failed = BTreeSet::new();
    for (&number, entry) in &table.entries {
        let XrefEntry::InFile { offset, generation } = *entry else {
            continue;
        };
        match parse_indirect_object(data, offset, &length_of) {
            Ok((id, object)) if id.number == number => doc.insert(id, object),
            Ok((id, _)) => {
                log::warn!("xref entry for object {number} points at object {id}");
                failed.insert(number);
            }
            Err(err) => {
                log::warn!("object {number} {generation} at offset {offset} unreadable: {err}");
                failed.insert(number);
            }
        }
    }

    if !failed.is_empty() {
        recover_objects(data, &mut doc, &failed);
    }

    unpack_object_streams(&mut doc, |number, stream| {
        matches!(
            table.entries.get(&number),
            Some(XrefEntry::InStream { stream_number, .. }) if *stream_number == stream
        )
    });
    drop_structural_streams(&mut doc);

    doc.trailer = document_trailer(&table.trailer);
    validate_structure(&doc)?;
    Ok(doc)
}

/// Re-read objects whose xref entries were wrong, from the byte scan.
fn recover_objects(data: &Bytes, doc: &mut Document, wanted: &BTreeSet<u32>) {
    let mut recovered = 0usize;
    for (id, offset) in recovery::scan_object_headers(data) {
        if !wanted.contains(&id.number) {
            continue;
        }
        if let Ok((parsed, object)) = parse_indirect_object(data, offset, &|_| None)
            && parsed == id
        {
            doc.insert(id, object);
            recovered += 1;
        }
    }
    log::info!(
        "recovered {recovered} of {} damaged objects by scanning",
        wanted.len()
    );
}

fn load_by_scanning(data: &Bytes, version: &str) -> Result<Document> {
    let mut doc = Document::with_version(version);
    // Later definitions of the same object win, like an incremental update.
    for (id, offset) in recovery::scan_object_headers(data) {
        match parse_indirect_object(data, offset, &|_| None) {
            Ok((parsed, object)) if parsed == id => doc.insert(id, object),
            Ok(_) => {}
            Err(err) => log::debug!("skipping unparseable object {id}: {err}"),
        }
    }

    let mut trailer = recovery::last_trailer(data)
        .or_else(|| last_xref_stream_dict(&doc))
        .unwrap_or_default();

    unpack_object_streams(&mut doc, |_, _| true);
    drop_structural_streams(&mut doc);

    if trailer.has(b"Encrypt") {
        return Err(PdfError::Encrypted);
    }
    let root_ok = trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .is_some_and(|id| doc.get(id).is_some());
    if !root_ok {
        match find_catalog(&doc) {
            Some(id) => trailer.set("Root", id),
            None => return Err(PdfError::parse("no document catalog could be found")),
        }
    }

    doc.trailer = document_trailer(&trailer);
    validate_structure(&doc)?;
    log::warn!(
        "rebuilt document from byte scan: {} objects",
        doc.objects.len()
    );
    Ok(doc)
}

fn last_xref_stream_dict(doc: &Document) -> Option<Dictionary> {
    doc.objects
        .values()
        .rev()
        .filter_map(Object::as_stream)
        .find(|s| s.dict.has_type(b"XRef"))
        .map(|s| s.dict.clone())
}

fn find_catalog(doc: &Document) -> Option<ObjectId> {
    doc.objects
        .iter()
        .rev()
        .find(|(_, object)| {
            object
                .as_dict()
                .is_some_and(|d| d.has_type(b"Catalog") && d.has(b"Pages"))
        })
        .map(|(id, _)| *id)
}

/// Expand every `/Type /ObjStm` stream. `keep(number, stream)` decides
/// whether the copy of `number` inside `stream` is the current one.
fn unpack_object_streams(doc: &mut Document, keep: impl Fn(u32, u32) -> bool) {
    let containers: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter(|(_, object)| {
            object
                .as_stream()
                .is_some_and(|s| s.dict.has_type(b"ObjStm"))
        })
        .map(|(id, _)| *id)
        .collect();

    for container in containers {
        let members = match doc.get(container).and_then(Object::as_stream) {
            Some(stream) => match read_object_stream(stream) {
                Ok(members) => members,
                Err(err) => {
                    log::warn!("object stream {container} unreadable: {err}");
                    continue;
                }
            },
            None => continue,
        };
        for (number, object) in members {
            let id = ObjectId::new(number, 0);
            // A plain object with the same number comes from a newer revision.
            if keep(number, container.number) && !doc.objects.contains_key(&id) {
                doc.insert(id, object);
            }
        }
    }
}

fn read_object_stream(stream: &Stream) -> Result<Vec<(u32, Object)>> {
    let count = stream.dict.get(b"N").and_then(Object::as_i64).unwrap_or(0);
    let first = stream
        .dict
        .get(b"First")
        .and_then(Object::as_i64)
        .and_then(|f| usize::try_from(f).ok())
        .ok_or_else(|| PdfError::parse("object stream lacks /First"))?;
    let decoded = filters::decode_stream(stream)?;
    let body = decoded
        .get(first..)
        .ok_or_else(|| PdfError::parse("object stream /First is past its data"))?;

    let mut header = &decoded[..first];
    let mut members = Vec::new();
    for _ in 0..count.max(0) {
        let (rest, number) = match token(header) {
            Ok((rest, Token::Integer(n))) => (rest, n),
            _ => break,
        };
        let (rest, offset) = match token(rest) {
            Ok((rest, Token::Integer(o))) => (rest, o),
            _ => break,
        };
        header = rest;

        let (Ok(number), Ok(offset)) = (objects::object_number(number), usize::try_from(offset))
        else {
            log::warn!("skipping compressed object {number} at offset {offset}");
            continue;
        };
        let Some(input) = body.get(offset..) else {
            continue;
        };
        match parse_object(input) {
            Ok((_, object)) => members.push((number, object)),
            Err(err) => log::warn!("compressed object {number} unreadable: {err}"),
        }
    }
    Ok(members)
}

/// Containers and xref streams carry no document content once unpacked.
fn drop_structural_streams(doc: &mut Document) {
    doc.objects.retain(|_, object| {
        !object
            .as_stream()
            .is_some_and(|s| s.dict.has_type(b"ObjStm") || s.dict.has_type(b"XRef"))
    });
}

/// The trailer keys that stay meaningful after parsing.
fn document_trailer(raw: &Dictionary) -> Dictionary {
    [b"Root".as_slice(), b"Info", b"ID"]
        .into_iter()
        .filter_map(|key| raw.get(key).map(|value| (key.to_vec(), value.clone())))
        .collect()
}

fn validate_structure(doc: &Document) -> Result<()> {
    let pages = doc.pages_root_id()?;
    doc.get_dict(pages)
        .map_err(|err| PdfError::parse(format!("page tree root {pages} is unusable: {err}")))?;
    Ok(())
}

/// First occurrence of `needle` in `haystack` at or after `from`.
pub(crate) fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Last occurrence of `needle` in `haystack`.
pub(crate) fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}
