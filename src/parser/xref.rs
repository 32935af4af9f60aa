//! Cross-reference tables and streams.
//!
//! The newest section is read first (the one `startxref` points at) and the
//! `/Prev` chain is followed backwards. Entries already known from a newer
//! section are never overwritten by an older one, which is how incremental
//! updates shadow earlier revisions.

use std::collections::{BTreeMap, HashSet};

use bytes::Bytes;

use super::filters::decode_stream;
use super::lexer::{Token, token};
use super::objects::{parse_indirect_object, parse_object};
use super::rfind;
use crate::error::{PdfError, Result};
use crate::object::{Dictionary, Object};

/// Where an object lives according to the cross-reference data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XrefEntry {
    /// Deleted or never used.
    Free,
    /// Stored at a byte offset in the file.
    InFile { offset: usize, generation: u16 },
    /// Stored inside an object stream.
    InStream { stream_number: u32, index: usize },
}

/// Merged cross-reference data of every revision in the file.
#[derive(Debug, Clone, Default)]
pub(crate) struct XrefTable {
    pub entries: BTreeMap<u32, XrefEntry>,
    pub trailer: Dictionary,
}

impl XrefTable {
    /// Fold an older section into this one. Newer entries and trailer keys win.
    fn merge_older(&mut self, older: XrefTable) {
        for (number, entry) in older.entries {
            self.entries.entry(number).or_insert(entry);
        }
        for (key, value) in older.trailer.iter() {
            if !self.trailer.has(key) {
                self.trailer.set(key.clone(), value.clone());
            }
        }
    }

    /// Byte offset of an object stored directly in the file.
    pub fn offset_of(&self, number: u32) -> Option<usize> {
        match self.entries.get(&number)? {
            XrefEntry::InFile { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

/// Locate the offset written after the last `startxref` keyword.
pub(crate) fn find_startxref(data: &[u8]) -> Result<usize> {
    let pos = rfind(data, b"startxref").ok_or_else(|| PdfError::parse("no startxref keyword"))?;
    match token(&data[pos + b"startxref".len()..]) {
        Ok((_, Token::Integer(offset))) => usize::try_from(offset)
            .map_err(|_| PdfError::parse(format!("negative startxref offset {offset}"))),
        _ => Err(PdfError::parse("startxref is not followed by an offset")),
    }
}

/// Read every cross-reference section reachable from `startxref`.
pub(crate) fn read_xref_chain(data: &Bytes) -> Result<XrefTable> {
    let start = find_startxref(data)?;
    let mut merged = read_section(data, start)?;
    let mut visited = HashSet::from([start]);
    let mut next = prev_offset(&merged.trailer);

    // Hybrid files list their compressed objects in a separate stream.
    if let Some(stm) = merged.trailer.get(b"XRefStm").and_then(Object::as_i64) {
        merge_hybrid_stream(data, &mut merged, stm, &mut visited);
    }

    while let Some(offset) = next {
        if !visited.insert(offset) {
            log::warn!("xref /Prev chain loops back to offset {offset}; stopping");
            break;
        }
        let section = match read_section(data, offset) {
            Ok(section) => section,
            Err(err) => {
                log::warn!("skipping unreadable xref section at {offset}: {err}");
                break;
            }
        };
        next = prev_offset(&section.trailer);
        let hybrid = section.trailer.get(b"XRefStm").and_then(Object::as_i64);
        merged.merge_older(section);
        if let Some(stm) = hybrid {
            merge_hybrid_stream(data, &mut merged, stm, &mut visited);
        }
    }

    merged.trailer.remove(b"Prev");
    merged.trailer.remove(b"XRefStm");
    log::debug!(
        "cross-reference data lists {} objects across {} sections",
        merged.entries.len(),
        visited.len()
    );
    Ok(merged)
}

fn prev_offset(trailer: &Dictionary) -> Option<usize> {
    trailer
        .get(b"Prev")
        .and_then(Object::as_i64)
        .and_then(|prev| usize::try_from(prev).ok())
}

fn merge_hybrid_stream(
    data: &Bytes,
    merged: &mut XrefTable,
    offset: i64,
    visited: &mut HashSet<usize>,
) {
    let Ok(offset) = usize::try_from(offset) else {
        return;
    };
    if !visited.insert(offset) {
        return;
    }
    match parse_xref_stream(data, offset) {
        Ok(mut section) => {
            // Only the entries matter; the owning table's trailer is authoritative.
            section.trailer = Dictionary::new();
            merged.merge_older(section);
        }
        Err(err) => log::warn!("ignoring unreadable /XRefStm at {offset}: {err}"),
    }
}

/// Read one section, classic table or stream.
fn read_section(data: &Bytes, offset: usize) -> Result<XrefTable> {
    let input = data
        .get(offset..)
        .ok_or_else(|| PdfError::parse(format!("xref offset {offset} is past end of file")))?;
    match token(input) {
        Ok((rest, Token::Keyword(b"xref"))) => parse_classic(rest),
        Ok((_, Token::Integer(_))) => parse_xref_stream(data, offset),
        _ => Err(PdfError::parse(format!("no cross-reference data at offset {offset}"))),
    }
}

/// Parse the subsections after the `xref` keyword, then the trailer.
fn parse_classic(mut input: &[u8]) -> Result<XrefTable> {
    let mut table = XrefTable::default();
    loop {
        let (rest, tok) =
            token(input).map_err(|_| PdfError::parse("xref table ends without a trailer"))?;
        match tok {
            Token::Keyword(b"trailer") => {
                let (_, trailer) = parse_object(rest)?;
                table.trailer = match trailer {
                    Object::Dictionary(dict) => dict,
                    other => {
                        return Err(PdfError::parse(format!(
                            "trailer is a {}, not a dictionary",
                            other.type_name()
                        )));
                    }
                };
                return Ok(table);
            }
            Token::Integer(first) => {
                let (rest, count) = match token(rest) {
                    Ok((rest, Token::Integer(count))) => (rest, count),
                    _ => return Err(PdfError::parse("xref subsection header lacks a count")),
                };
                let first = u32::try_from(first)
                    .map_err(|_| PdfError::parse(format!("bad xref subsection start {first}")))?;
                input = parse_subsection(rest, first, count, &mut table)?;
            }
            other => {
                return Err(PdfError::parse(format!(
                    "unexpected {other:?} in xref table"
                )));
            }
        }
    }
}

fn parse_subsection<'a>(
    mut input: &'a [u8],
    first: u32,
    count: i64,
    table: &mut XrefTable,
) -> Result<&'a [u8]> {
    for i in 0..count.max(0) {
        let entry = (|| {
            let (rest, Token::Integer(offset)) = token(input).ok()? else {
                return None;
            };
            let (rest, Token::Integer(generation)) = token(rest).ok()? else {
                return None;
            };
            let (rest, Token::Keyword(kind)) = token(rest).ok()? else {
                return None;
            };
            Some((rest, offset, generation, kind))
        })();

        let Some((rest, offset, generation, kind)) = entry else {
            log::warn!("xref subsection starting at {first} ends after {i} of {count} entries");
            return Ok(input);
        };
        input = rest;

        let number = first.saturating_add(i as u32);
        let entry = match (kind, usize::try_from(offset), u16::try_from(generation)) {
            (b"n", Ok(offset), Ok(generation)) if offset > 0 => {
                XrefEntry::InFile { offset, generation }
            }
            (b"n" | b"f", ..) => XrefEntry::Free,
            _ => {
                return Err(PdfError::parse(format!(
                    "xref entry for object {number} has unknown type {:?}",
                    String::from_utf8_lossy(kind)
                )));
            }
        };
        table.entries.entry(number).or_insert(entry);
    }
    Ok(input)
}

/// Parse a `/Type /XRef` stream object at `offset`.
fn parse_xref_stream(data: &Bytes, offset: usize) -> Result<XrefTable> {
    let (id, object) = parse_indirect_object(data, offset, &|_| None)?;
    let Object::Stream(stream) = object else {
        return Err(PdfError::parse(format!("object {id} is not an xref stream")));
    };
    if !stream.dict.has_type(b"XRef") {
        return Err(PdfError::parse(format!("object {id} is not an xref stream")));
    }

    let widths: Vec<usize> = stream
        .dict
        .get(b"W")
        .and_then(Object::as_array)
        .map(|w| {
            w.iter()
                .filter_map(Object::as_i64)
                .map(|n| n.max(0) as usize)
                .collect()
        })
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|&w| w > 8) {
        return Err(PdfError::parse(format!("xref stream {id} has a bad /W array")));
    }

    let size = stream.dict.get(b"Size").and_then(Object::as_i64).unwrap_or(0);
    let index: Vec<i64> = match stream.dict.get(b"Index").and_then(Object::as_array) {
        Some(items) => items.iter().filter_map(Object::as_i64).collect(),
        None => vec![0, size],
    };

    let decoded = decode_stream(&stream)?;
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(PdfError::parse(format!("xref stream {id} has zero-width rows")));
    }
    let mut rows = decoded.chunks_exact(row_len);

    let mut table = XrefTable::default();
    'sections: for pair in index.chunks_exact(2) {
        let (first, count) = (pair[0].max(0) as u32, pair[1].max(0));
        for i in 0..count {
            let Some(row) = rows.next() else {
                log::warn!("xref stream {id} is shorter than its /Index declares");
                break 'sections;
            };
            let (kind_bytes, rest) = row.split_at(widths[0]);
            let (second, third) = rest.split_at(widths[1]);
            // A zero-width type field defaults to "in file".
            let kind = if widths[0] == 0 { 1 } else { read_be(kind_bytes) };
            let (second, third) = (read_be(second), read_be(third));

            let entry = match kind {
                0 => XrefEntry::Free,
                1 if second > 0 => XrefEntry::InFile {
                    offset: second as usize,
                    generation: third as u16,
                },
                2 => XrefEntry::InStream {
                    stream_number: second as u32,
                    index: third as usize,
                },
                _ => XrefEntry::Free,
            };
            table
                .entries
                .entry(first.saturating_add(i as u32))
                .or_insert(entry);
        }
    }

    let mut trailer = stream.dict;
    for key in [
        b"Type".as_slice(),
        b"Length",
        b"Filter",
        b"DecodeParms",
        b"W",
        b"Index",
    ] {
        trailer.remove(key);
    }
    table.trailer = trailer;
    Ok(table)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| acc << 8 | u64::from(b))
}
