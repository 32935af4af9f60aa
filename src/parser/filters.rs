//! Stream decoding for the structures the parser itself must read.
//!
//! Page content, fonts and images are never decoded; only cross-reference
//! streams and object streams are, and those are FlateDecode (optionally with
//! a PNG predictor) or unfiltered in practice.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{PdfError, Result};
use crate::object::{Object, Stream};

/// Decode a stream's content by applying its filters in order.
pub fn decode_stream(stream: &Stream) -> Result<Vec<u8>> {
    let filters = stream.filters();
    let mut data = stream.content.to_vec();

    for (idx, filter) in filters.iter().enumerate() {
        data = match *filter {
            b"FlateDecode" | b"Fl" => {
                let inflated = inflate(&data)?;
                match decode_parms(stream, idx) {
                    Some(parms) => apply_predictor(inflated, &parms)?,
                    None => inflated,
                }
            }
            other => {
                return Err(PdfError::parse(format!(
                    "unsupported filter /{} on a structural stream",
                    String::from_utf8_lossy(other)
                )));
            }
        };
    }

    Ok(data)
}

/// Inflate zlib data, keeping whatever was decoded before a corrupt tail.
fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(err) if !out.is_empty() => {
            log::warn!("FlateDecode stopped early after {} bytes: {err}", out.len());
            Ok(out)
        }
        Err(err) => Err(PdfError::parse(format!("FlateDecode failed: {err}"))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PredictorParms {
    predictor: i64,
    colors: usize,
    bits_per_component: usize,
    columns: usize,
}

fn decode_parms(stream: &Stream, filter_index: usize) -> Option<PredictorParms> {
    let parms = match stream.dict.get(b"DecodeParms")? {
        Object::Dictionary(dict) => dict,
        Object::Array(items) => items.get(filter_index)?.as_dict()?,
        _ => return None,
    };
    let int = |key: &[u8], default: i64| parms.get(key).and_then(Object::as_i64).unwrap_or(default);

    let predictor = int(b"Predictor", 1);
    if predictor <= 1 {
        return None;
    }
    Some(PredictorParms {
        predictor,
        colors: int(b"Colors", 1).max(1) as usize,
        bits_per_component: int(b"BitsPerComponent", 8).max(1) as usize,
        columns: int(b"Columns", 1).max(1) as usize,
    })
}

/// Undo PNG row filters (predictors 10-15). Every row carries its own
/// filter-type byte, so the declared predictor value only selects "PNG".
fn apply_predictor(data: Vec<u8>, parms: &PredictorParms) -> Result<Vec<u8>> {
    if parms.predictor < 10 {
        return Err(PdfError::parse(format!(
            "unsupported predictor {}",
            parms.predictor
        )));
    }

    let bpp = (parms.colors * parms.bits_per_component).div_ceil(8).max(1);
    let row_len = (parms.colors * parms.bits_per_component * parms.columns).div_ceil(8);
    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        if chunk.len() < 2 {
            break;
        }
        let filter = chunk[0];
        let mut row = chunk[1..].to_vec();
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            row[i] = match filter {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(PdfError::parse(format!("invalid PNG row filter {other}")));
                }
            };
        }

        out.extend_from_slice(&row);
        prev = row;
    }

    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}
