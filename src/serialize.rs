//! PDF file writing.
//!
//! [`serialize`] lays a [`Document`] out as a classic, non-incremental PDF
//! file: header, every object in ascending id order, one cross-reference
//! subsection and a trailer. Nothing depends on hashing or clocks, so the
//! same document always produces the same bytes.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::object::{
    Dictionary, Document, MAX_OBJECT_NUMBER, Object, ObjectId, Stream, StringFormat,
};
use crate::parser::lexer::{is_delimiter, is_whitespace};

/// Second header line; high bytes mark the file as binary for transfer tools.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// Trailer keys carried into the written file, in output order.
const TRAILER_KEYS: [&[u8]; 3] = [b"Root", b"Info", b"ID"];

/// Serialize `doc` into the bytes of a PDF file.
///
/// # Examples
///
/// ```
/// use pdfstitch::object::{Dictionary, Document, Object};
///
/// let mut doc = Document::new();
/// let mut catalog = Dictionary::new();
/// catalog.set("Type", Object::name("Catalog"));
/// let root = doc.add_object(catalog);
/// doc.trailer.set("Root", root);
///
/// let bytes = pdfstitch::serialize::serialize(&doc);
/// assert!(bytes.starts_with(b"%PDF-1.7"));
/// assert!(bytes.ends_with(b"%%EOF\n"));
/// ```
pub fn serialize(doc: &Document) -> Vec<u8> {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_document(doc, &mut out);
    out
}

/// Serialize `doc` into `writer`, returning the number of bytes written.
///
/// # Errors
///
/// Returns any error reported by `writer`.
pub fn write_document<W: Write>(doc: &Document, writer: &mut W) -> io::Result<u64> {
    let mut out = Counting {
        inner: writer,
        written: 0,
    };

    out.write_all(b"%PDF-")?;
    out.write_all(doc.version.as_bytes())?;
    out.write_all(b"\n")?;
    out.write_all(BINARY_MARKER)?;

    // One object per number; a later generation of the same number wins.
    // Number 0 heads the free list and never names an object.
    let mut live: BTreeMap<u32, (u16, &Object)> = BTreeMap::new();
    for (id, object) in &doc.objects {
        if id.number == 0 || id.number > MAX_OBJECT_NUMBER {
            log::warn!("object {id} is outside the writable range and was left out");
            continue;
        }
        live.insert(id.number, (id.generation, object));
    }

    let mut offsets: BTreeMap<u32, (u64, u16)> = BTreeMap::new();
    for (&number, &(generation, object)) in &live {
        offsets.insert(number, (out.written, generation));
        writeln!(out, "{number} {generation} obj")?;
        write_object(&mut out, object)?;
        out.write_all(b"\nendobj\n")?;
    }

    // Bounded by MAX_OBJECT_NUMBER, so this cannot overflow.
    let size = live.keys().next_back().copied().unwrap_or(0) + 1;

    // A free entry links to the next free number, the last one to 0. Each
    // search only crosses the run of live numbers that follows it.
    let next_free_after =
        |number: u32| (number + 1..size).find(|n| !offsets.contains_key(n)).unwrap_or(0);

    let xref_offset = out.written;
    write!(out, "xref\n0 {size}\n")?;
    write_xref_entry(&mut out, u64::from(next_free_after(0)), 65535, b'f')?;
    for number in 1..size {
        match offsets.get(&number) {
            Some(&(offset, generation)) => write_xref_entry(&mut out, offset, generation, b'n')?,
            None => write_xref_entry(&mut out, u64::from(next_free_after(number)), 0, b'f')?,
        }
    }

    let mut trailer = Dictionary::new();
    trailer.set("Size", i64::from(size));
    for key in TRAILER_KEYS {
        if let Some(value) = doc.trailer.get(key) {
            trailer.set(key, value.clone());
        }
    }
    out.write_all(b"trailer\n")?;
    write_dictionary(&mut out, &trailer, None)?;
    write!(out, "\nstartxref\n{xref_offset}\n%%EOF\n")?;

    Ok(out.written)
}

struct Counting<'a, W: Write> {
    inner: &'a mut W,
    written: u64,
}

impl<W: Write> Write for Counting<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_xref_entry<W: Write>(out: &mut W, offset: u64, generation: u16, kind: u8) -> io::Result<()> {
    write!(out, "{offset:010} {generation:05} {}\r\n", kind as char)
}

fn write_object<W: Write>(out: &mut W, object: &Object) -> io::Result<()> {
    match object {
        Object::Null => out.write_all(b"null"),
        Object::Boolean(true) => out.write_all(b"true"),
        Object::Boolean(false) => out.write_all(b"false"),
        Object::Integer(value) => write!(out, "{value}"),
        Object::Real(value) => out.write_all(format_real(*value).as_bytes()),
        Object::String(bytes, StringFormat::Literal) => write_literal(out, bytes),
        Object::String(bytes, StringFormat::Hexadecimal) => {
            out.write_all(b"<")?;
            for byte in bytes {
                write!(out, "{byte:02X}")?;
            }
            out.write_all(b">")
        }
        Object::Name(name) => write_name(out, name),
        Object::Array(items) => {
            out.write_all(b"[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.write_all(b" ")?;
                }
                write_object(out, item)?;
            }
            out.write_all(b"]")
        }
        Object::Dictionary(dict) => write_dictionary(out, dict, None),
        Object::Stream(stream) => write_stream(out, stream),
        Object::Reference(ObjectId { number, generation }) => {
            write!(out, "{number} {generation} R")
        }
    }
}

/// Write a dictionary; when `length` is given, `/Length` is forced to it.
///
/// A `null` value means the key is absent, so such entries are left out.
fn write_dictionary<W: Write>(out: &mut W, dict: &Dictionary, length: Option<usize>) -> io::Result<()> {
    out.write_all(b"<<")?;
    let mut wrote_length = false;
    for (key, value) in dict.iter() {
        if value.is_null() && !(length.is_some() && key.as_slice() == b"Length") {
            continue;
        }
        write_name(out, key)?;
        out.write_all(b" ")?;
        match length {
            Some(len) if key.as_slice() == b"Length" => {
                write!(out, "{len}")?;
                wrote_length = true;
            }
            _ => write_object(out, value)?,
        }
        out.write_all(b" ")?;
    }
    if let (Some(len), false) = (length, wrote_length) {
        write!(out, "/Length {len} ")?;
    }
    out.write_all(b">>")
}

fn write_stream<W: Write>(out: &mut W, stream: &Stream) -> io::Result<()> {
    write_dictionary(out, &stream.dict, Some(stream.content.len()))?;
    out.write_all(b"\nstream\n")?;
    out.write_all(&stream.content)?;
    out.write_all(b"\nendstream")
}

fn write_name<W: Write>(out: &mut W, name: &[u8]) -> io::Result<()> {
    out.write_all(b"/")?;
    for &byte in name {
        let plain = (0x21..=0x7E).contains(&byte)
            && byte != b'#'
            && !is_delimiter(byte)
            && !is_whitespace(byte);
        if plain {
            out.write_all(&[byte])?;
        } else {
            write!(out, "#{byte:02X}")?;
        }
    }
    Ok(())
}

fn write_literal<W: Write>(out: &mut W, bytes: &[u8]) -> io::Result<()> {
    out.write_all(b"(")?;
    for &byte in bytes {
        match byte {
            b'(' | b')' | b'\\' => out.write_all(&[b'\\', byte])?,
            b'\r' => out.write_all(b"\\r")?,
            _ => out.write_all(&[byte])?,
        }
    }
    out.write_all(b")")
}

/// Plain decimal notation; PDF has no exponent syntax and `f64`'s
/// `Display` never produces one.
fn format_real(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        "0".to_string()
    }
}
