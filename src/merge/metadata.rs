//! Document information dictionary.
//!
//! Builds the `/Info` dictionary of an assembled document:
//! - Title, Author, Subject, Keywords
//! - Creator, Producer
//! - Creation and modification dates (only when the caller supplies one)

use chrono::{DateTime, Utc};

use crate::config::Metadata;
use crate::object::{Dictionary, Object, StringFormat};

/// Value written as `/Producer` and `/Creator`.
pub const PRODUCER: &str = "pdfstitch";

/// Build an `/Info` dictionary from caller-supplied metadata.
///
/// Only non-empty fields are set. The result is fully determined by
/// `metadata`, so assembling the same input twice yields identical bytes.
///
/// # Examples
///
/// ```
/// use pdfstitch::config::Metadata;
/// use pdfstitch::merge::info_dictionary;
///
/// let metadata = Metadata::new(Some("Annual report".to_string()), None, None, None);
/// let info = info_dictionary(&metadata);
/// assert!(info.has(b"Title"));
/// assert!(info.has(b"Producer"));
/// assert!(!info.has(b"CreationDate"));
/// ```
pub fn info_dictionary(metadata: &Metadata) -> Dictionary {
    let mut info = Dictionary::new();

    let fields = [
        ("Title", &metadata.title),
        ("Author", &metadata.author),
        ("Subject", &metadata.subject),
        ("Keywords", &metadata.keywords),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            info.set(key, text_string(value));
        }
    }

    info.set("Creator", text_string(PRODUCER));
    info.set("Producer", text_string(PRODUCER));

    if let Some(created) = metadata.created {
        let date = format_pdf_date(created);
        info.set("CreationDate", text_string(&date));
        info.set("ModDate", text_string(&date));
    }

    info
}

/// Format a timestamp as a PDF date string (`D:YYYYMMDDHHmmSSZ`).
pub fn format_pdf_date(time: DateTime<Utc>) -> String {
    time.format("D:%Y%m%d%H%M%SZ").to_string()
}

/// Encode a PDF text string: ASCII stays literal, anything else becomes
/// UTF-16BE with a byte order mark.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
