//! Raw passthrough codec: little-endian element array, no compression.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{CodecError, Result};

/// Encode a slice of `i16` as little-endian bytes.
pub fn encode_i16(elements: &[i16]) -> Vec<u8> {
    let mut out = vec![0u8; elements.len() * 2];
    LittleEndian::write_i16_into(elements, &mut out);
    out
}

/// Decode `count` little-endian `i16` elements from `payload`.
pub fn decode_i16(payload: &[u8], count: u32) -> Result<Vec<i16>> {
    decode_fixed(payload, count as usize, 2, LittleEndian::read_i16)
}

/// Encode a slice of `i32` as little-endian bytes.
pub fn encode_i32(elements: &[i32]) -> Vec<u8> {
    let mut out = vec![0u8; elements.len() * 4];
    LittleEndian::write_i32_into(elements, &mut out);
    out
}

/// Decode `count` little-endian `i32` elements from `payload`.
pub fn decode_i32(payload: &[u8], count: u32) -> Result<Vec<i32>> {
    decode_fixed(payload, count as usize, 4, LittleEndian::read_i32)
}

/// Encode a slice of `i64` as little-endian bytes.
pub fn encode_i64(elements: &[i64]) -> Vec<u8> {
    let mut out = vec![0u8; elements.len() * 8];
    LittleEndian::write_i64_into(elements, &mut out);
    out
}

/// Decode `count` little-endian `i64` elements from `payload`.
pub fn decode_i64(payload: &[u8], count: u32) -> Result<Vec<i64>> {
    decode_fixed(payload, count as usize, 8, LittleEndian::read_i64)
}

/// Encode a slice of `f64` as little-endian bytes.
pub fn encode_f64(elements: &[f64]) -> Vec<u8> {
    let mut out = vec![0u8; elements.len() * 8];
    LittleEndian::write_f64_into(elements, &mut out);
    out
}

/// Decode `count` little-endian `f64` elements from `payload`.
pub fn decode_f64(payload: &[u8], count: u32) -> Result<Vec<f64>> {
    decode_fixed(payload, count as usize, 8, LittleEndian::read_f64)
}

fn decode_fixed<T>(
    payload: &[u8],
    count: usize,
    elem_size: usize,
    read_one: fn(&[u8]) -> T,
) -> Result<Vec<T>> {
    let expected_bytes = count * elem_size;
    if payload.len() < expected_bytes {
        return Err(CodecError::CorruptPayload {
            expected: count,
            got: payload.len() / elem_size,
        });
    }
    let mut out = Vec::with_capacity(count);
    for chunk in payload[..expected_bytes].chunks_exact(elem_size) {
        out.push(read_one(chunk));
    }
    Ok(out)
}
