//! Object-level parsing on top of the lexer.

use bytes::Bytes;

use super::find;
use super::lexer::{Token, hex_value, is_whitespace, token};
use crate::error::{PdfError, Result};
use crate::object::{Dictionary, MAX_OBJECT_NUMBER, Object, ObjectId, Stream, StringFormat};

/// Nesting limit for arrays and dictionaries.
const MAX_DEPTH: usize = 256;

/// Lookup used to resolve an indirect stream `/Length`.
pub(crate) type LengthLookup<'a> = dyn Fn(ObjectId) -> Option<i64> + 'a;

/// Parse a direct object from the start of `input`.
pub(crate) fn parse_object(input: &[u8]) -> Result<(&[u8], Object)> {
    parse_nested(input, 0)
}

fn next_token(input: &[u8]) -> Result<(&[u8], Token<'_>)> {
    token(input).map_err(|_| {
        let preview = String::from_utf8_lossy(&input[..input.len().min(24)]).into_owned();
        PdfError::parse(format!("unexpected bytes {preview:?}"))
    })
}

fn parse_nested(input: &[u8], depth: usize) -> Result<(&[u8], Object)> {
    if depth > MAX_DEPTH {
        return Err(PdfError::parse("objects nested too deeply"));
    }

    let (rest, tok) = next_token(input)?;
    let object = match tok {
        Token::Integer(number) => {
            // `N G R` is a reference; otherwise the integer stands alone.
            if let Ok((after_gen, Token::Integer(generation))) = token(rest)
                && let Ok((after_r, Token::R)) = token(after_gen)
                && let (Ok(number), Ok(generation)) =
                    (u32::try_from(number), u16::try_from(generation))
            {
                return Ok((after_r, Object::Reference(ObjectId::new(number, generation))));
            }
            Object::Integer(number)
        }
        Token::Real(real) => Object::Real(real),
        Token::LiteralString(raw) => Object::String(decode_literal(raw), StringFormat::Literal),
        Token::HexString(raw) => Object::String(decode_hex(raw), StringFormat::Hexadecimal),
        Token::Name(name) => Object::Name(name),
        Token::True => Object::Boolean(true),
        Token::False => Object::Boolean(false),
        Token::Null => Object::Null,
        Token::ArrayStart => {
            let mut items = Vec::new();
            let mut cursor = rest;
            loop {
                if let (after, Token::ArrayEnd) = next_token(cursor)? {
                    return Ok((after, Object::Array(items)));
                }
                let (after, item) = parse_nested(cursor, depth + 1)?;
                items.push(item);
                cursor = after;
            }
        }
        Token::DictStart => {
            let (after, dict) = parse_dict_body(rest, depth)?;
            return Ok((after, Object::Dictionary(dict)));
        }
        other => {
            return Err(PdfError::parse(format!(
                "unexpected token {other:?} where an object was expected"
            )));
        }
    };
    Ok((rest, object))
}

fn parse_dict_body(input: &[u8], depth: usize) -> Result<(&[u8], Dictionary)> {
    let mut dict = Dictionary::new();
    let mut cursor = input;
    loop {
        let (after_key, tok) = next_token(cursor)?;
        match tok {
            Token::DictEnd => return Ok((after_key, dict)),
            Token::Name(key) => {
                let (after_value, value) = parse_nested(after_key, depth + 1)?;
                // A null value is equivalent to an absent key.
                if !value.is_null() {
                    dict.set(key, value);
                }
                cursor = after_value;
            }
            other => {
                return Err(PdfError::parse(format!(
                    "dictionary key must be a name, found {other:?}"
                )));
            }
        }
    }
}

/// An object number from a header, within `1..=MAX_OBJECT_NUMBER`.
pub(crate) fn object_number(n: i64) -> Result<u32> {
    u32::try_from(n)
        .ok()
        .filter(|&number| (1..=MAX_OBJECT_NUMBER).contains(&number))
        .ok_or_else(|| PdfError::parse(format!("object number {n} is out of range")))
}

/// Parse the `N G obj ... endobj` object starting at `offset`.
///
/// Stream content is sliced out of `data` without copying. When the declared
/// `/Length` does not end at `endstream` the keyword is searched for instead.
pub(crate) fn parse_indirect_object(
    data: &Bytes,
    offset: usize,
    lengths: &LengthLookup<'_>,
) -> Result<(ObjectId, Object)> {
    let input = data
        .get(offset..)
        .ok_or_else(|| PdfError::parse(format!("object offset {offset} is past end of file")))?;

    let (rest, number) = next_token(input)?;
    let (rest, generation) = next_token(rest)?;
    let (rest, keyword) = next_token(rest)?;
    let id = match (number, generation, keyword) {
        (Token::Integer(n), Token::Integer(g), Token::ObjStart) => ObjectId::new(
            object_number(n)?,
            u16::try_from(g).map_err(|_| PdfError::parse(format!("bad generation {g}")))?,
        ),
        _ => {
            return Err(PdfError::parse(format!(
                "no object header at offset {offset}"
            )));
        }
    };

    let (rest, value) = parse_object(rest)?;
    let Ok((after_keyword, Token::StreamStart)) = token(rest) else {
        return Ok((id, value));
    };

    let Object::Dictionary(dict) = value else {
        return Err(PdfError::parse(format!(
            "stream keyword after a non-dictionary in object {id}"
        )));
    };

    let mut start = data.len() - after_keyword.len();
    if data.get(start..start + 2) == Some(b"\r\n") {
        start += 2;
    } else if matches!(data.get(start), Some(b'\n' | b'\r')) {
        start += 1;
    }

    let declared = match dict.get(b"Length") {
        Some(Object::Integer(len)) => Some(*len),
        Some(Object::Reference(len_id)) => lengths(*len_id),
        _ => None,
    };

    let end = declared
        .and_then(|len| usize::try_from(len).ok())
        .map(|len| start + len)
        .filter(|&end| ends_at_endstream(data, end))
        .or_else(|| {
            log::debug!("object {id}: /Length unusable, searching for endstream");
            find(data, b"endstream", start).map(|pos| trim_eol(data, start, pos))
        })
        .ok_or_else(|| PdfError::parse(format!("stream {id} has no endstream")))?;

    Ok((id, Object::Stream(Stream::new(dict, data.slice(start..end)))))
}

fn ends_at_endstream(data: &[u8], end: usize) -> bool {
    let Some(tail) = data.get(end..) else {
        return false;
    };
    let skip = tail.iter().take_while(|&&c| is_whitespace(c)).count();
    tail[skip..].starts_with(b"endstream")
}

fn trim_eol(data: &[u8], start: usize, mut end: usize) -> usize {
    if end > start && data[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && data[end - 1] == b'\r' {
        end -= 1;
    }
    end
}

/// Decode escape sequences of a literal string body.
pub(crate) fn decode_literal(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let c = raw[i];
        i += 1;
        match c {
            b'\\' => {
                let Some(&next) = raw.get(i) else { break };
                i += 1;
                match next {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'0'..=b'7' => {
                        let mut value = u32::from(next - b'0');
                        for _ in 0..2 {
                            match raw.get(i) {
                                Some(&d @ b'0'..=b'7') => {
                                    value = value * 8 + u32::from(d - b'0');
                                    i += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((value & 0xFF) as u8);
                    }
                    // Line continuation.
                    b'\r' => {
                        if raw.get(i) == Some(&b'\n') {
                            i += 1;
                        }
                    }
                    b'\n' => {}
                    other => out.push(other),
                }
            }
            // Bare end-of-line markers read as a single LF.
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
                out.push(b'\n');
            }
            other => out.push(other),
        }
    }
    out
}

/// Decode a hex string body; an odd trailing digit is padded with `0`.
pub(crate) fn decode_hex(raw: &[u8]) -> Vec<u8> {
    let digits: Vec<u8> = raw.iter().filter_map(|&c| hex_value(c)).collect();
    digits
        .chunks(2)
        .map(|pair| pair[0] << 4 | pair.get(1).copied().unwrap_or(0))
        .collect()
}
