//! Rebuild an object index by scanning the raw bytes.
//!
//! Used when the cross-reference data is missing or points at garbage.

use bytes::Bytes;

use super::lexer::{Token, is_delimiter, is_whitespace, token};
use super::objects::parse_object;
use super::{find, rfind};
use crate::object::{Dictionary, MAX_OBJECT_NUMBER, ObjectId};

/// Every `N G obj` header in file order, as (id, offset of `N`).
pub(crate) fn scan_object_headers(data: &[u8]) -> Vec<(ObjectId, usize)> {
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(hit) = find(data, b"obj", pos) {
        pos = hit + 3;
        if hit >= 3 && &data[hit - 3..hit] == b"end" {
            continue;
        }
        if data
            .get(hit + 3)
            .is_some_and(|&c| !is_whitespace(c) && !is_delimiter(c))
        {
            continue;
        }
        if let Some(header) = header_before(data, hit) {
            found.push(header);
        }
    }
    log::debug!("byte scan found {} object headers", found.len());
    found
}

/// Back-parse `N G` in front of the `obj` keyword at `keyword`.
fn header_before(data: &[u8], keyword: usize) -> Option<(ObjectId, usize)> {
    let (generation, gen_start) = digits_before(data, keyword)?;
    let (number, num_start) = digits_before(data, gen_start)?;
    if num_start > 0 {
        let prev = data[num_start - 1];
        if !is_whitespace(prev) && !is_delimiter(prev) {
            return None;
        }
    }
    let number = u32::try_from(number)
        .ok()
        .filter(|n| (1..=MAX_OBJECT_NUMBER).contains(n))?;
    let id = ObjectId::new(number, u16::try_from(generation).ok()?);
    Some((id, num_start))
}

/// Skip whitespace backwards from `end`, then read a run of digits.
fn digits_before(data: &[u8], end: usize) -> Option<(u64, usize)> {
    let mut stop = end;
    while stop > 0 && is_whitespace(data[stop - 1]) {
        stop -= 1;
    }
    if stop == end {
        return None;
    }
    let mut start = stop;
    while start > 0 && data[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == stop || stop - start > 10 {
        return None;
    }
    let text = std::str::from_utf8(&data[start..stop]).ok()?;
    Some((text.parse().ok()?, start))
}

/// The dictionary after the last readable `trailer` keyword.
pub(crate) fn last_trailer(data: &Bytes) -> Option<Dictionary> {
    let mut end = data.len();
    while let Some(pos) = rfind(&data[..end], b"trailer") {
        let after = &data[pos + b"trailer".len()..];
        if let Ok((_, Token::DictStart)) = token(after)
            && let Ok((_, object)) = parse_object(after)
            && let Some(dict) = object.as_dict()
        {
            return Some(dict.clone());
        }
        end = pos;
    }
    None
}
