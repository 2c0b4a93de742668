//! Decoding of the encoded polyline format used by most web mapping APIs.
//!
//! Each coordinate is stored as the difference to the previous one, scaled to a fixed number of
//! decimal places. Every signed delta is zig-zag encoded, split into 5-bit chunks (least
//! significant first), and each chunk becomes one ASCII character offset by 63, with 0x20 marking
//! that more chunks follow.

use geo::Coord;

use crate::DecodeError;

const PRECISION: u32 = 5;

/// Decodes a standard (1e-5 degree) polyline. The empty string is an empty path.
pub fn decode(encoded: &str) -> Result<Vec<Coord>, DecodeError> {
    decode_with_precision(encoded, PRECISION)
}

/// Like `decode`, for polylines with a different number of decimal places, like polyline6.
pub fn decode_with_precision(encoded: &str, precision: u32) -> Result<Vec<Coord>, DecodeError> {
    let factor = 10_f64.powi(precision as i32);
    let bytes = encoded.as_bytes();

    let mut pts = Vec::new();
    let mut idx = 0;
    // Accumulate in fixed point, so long paths don't drift
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while idx < bytes.len() {
        lat += next_delta(bytes, &mut idx)?;
        if idx == bytes.len() {
            // A latitude without its longitude
            return Err(DecodeError::Truncated { offset: idx });
        }
        lng += next_delta(bytes, &mut idx)?;

        pts.push(Coord {
            x: lng as f64 / factor,
            y: lat as f64 / factor,
        });
    }

    Ok(pts)
}

fn next_delta(bytes: &[u8], idx: &mut usize) -> Result<i64, DecodeError> {
    let start = *idx;
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(byte) = bytes.get(*idx).copied() else {
            return Err(DecodeError::Truncated { offset: *idx });
        };
        if !(63..=126).contains(&byte) {
            return Err(DecodeError::InvalidCharacter { offset: *idx, byte });
        }
        // 7 chunks already cover the 32 bits any real coordinate needs
        if shift > 30 {
            return Err(DecodeError::Overflow { offset: start });
        }

        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        *idx += 1;

        if chunk < 0x20 {
            break;
        }
    }

    if result & 1 == 1 {
        Ok(!(result >> 1))
    } else {
        Ok(result >> 1)
    }
}
