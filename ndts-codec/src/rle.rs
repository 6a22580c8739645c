//! Run-length codec for `int32` columns: `(value, run_length)` varint pairs.
//!
//! Well suited to dense categorical columns (e.g. a symbol-id column sorted
//! by symbol).

use crate::error::{CodecError, Result};
use crate::varint::{read_varint_u32, read_varint_u64, write_varint_u32, write_varint_u64, zigzag_decode, zigzag_encode};

/// Encode a slice of `i32` as `(value, run_length)` varint pairs.
pub fn encode(elements: &[i32]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut iter = elements.iter();
    let Some(&first) = iter.next() else {
        return out;
    };
    let mut current = first;
    let mut run_len: u32 = 1;
    for &v in iter {
        if v == current {
            run_len += 1;
        } else {
            write_varint_u64(&mut out, zigzag_encode(current as i64));
            write_varint_u32(&mut out, run_len);
            current = v;
            run_len = 1;
        }
    }
    write_varint_u64(&mut out, zigzag_encode(current as i64));
    write_varint_u32(&mut out, run_len);
    out
}

/// Decode a run-length-encoded `i32` buffer, requiring exactly `count` elements.
pub fn decode(payload: &[u8], count: u32) -> Result<Vec<i32>> {
    let count = count as usize;
    let mut out = Vec::with_capacity(count);
    let mut pos = 0usize;
    while pos < payload.len() && out.len() < count {
        let value = zigzag_decode(read_varint_u64(payload, &mut pos)?) as i32;
        let run_len = read_varint_u32(payload, &mut pos)?;
        for _ in 0..run_len {
            out.push(value);
        }
    }
    if out.len() != count {
        return Err(CodecError::CorruptPayload {
            expected: count,
            got: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_ids_round_trip() {
        let data: Vec<i32> = (0..1000).map(|i| i / 100).collect();
        let encoded = encode(&data);
        let decoded = decode(&encoded, data.len() as u32).unwrap();
        assert_eq!(decoded[0], 0);
        assert_eq!(decoded[999], 9);
        assert_eq!(decoded, data);
    }

    #[test]
    fn constant_column_compresses_to_one_pair() {
        let data = vec![7i32; 1_000_000];
        let encoded = encode(&data);
        assert!(encoded.len() < 16, "expected O(1) encoding, got {} bytes", encoded.len());
        let decoded = decode(&encoded, data.len() as u32).unwrap();
        assert_eq!(decoded.len(), data.len());
        assert!(decoded.iter().all(|&v| v == 7));
    }

    #[test]
    fn single_element_round_trips() {
        let data = [-5i32];
        let encoded = encode(&data);
        assert_eq!(decode(&encoded, 1).unwrap(), data);
    }

    #[test]
    fn empty_round_trips() {
        assert_eq!(decode(&encode(&[]), 0).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn truncated_frame_errors() {
        let data = [1i32, 1, 2, 2, 2];
        let encoded = encode(&data);
        let truncated = &encoded[..encoded.len() - 1];
        assert!(decode(truncated, data.len() as u32).is_err());
    }

    proptest::proptest! {
        #[test]
        fn round_trips_any_i32_vec(data: Vec<i32>) {
            let encoded = encode(&data);
            let decoded = decode(&encoded, data.len() as u32).unwrap();
            proptest::prop_assert_eq!(decoded, data);
        }
    }
}
