//! Delta codec for `int64` columns: count + base + zigzag-varint successive differences.
//!
//! Well suited to monotonically increasing timestamps, where the deltas are
//! small and mostly constant.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{CodecError, Result};
use crate::varint::{read_varint_u64, write_varint_u64, zigzag_decode, zigzag_encode};

/// Encode a slice of `i64` as `count (u32) | base (i64) | zigzag-varint diffs`.
pub fn encode(elements: &[i64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(elements.len() * 2 + 12);
    let mut count_buf = [0u8; 4];
    LittleEndian::write_u32(&mut count_buf, elements.len() as u32);
    out.extend_from_slice(&count_buf);

    let base = elements.first().copied().unwrap_or(0);
    let mut base_buf = [0u8; 8];
    LittleEndian::write_i64(&mut base_buf, base);
    out.extend_from_slice(&base_buf);

    let mut prev = base;
    for (i, &v) in elements.iter().enumerate() {
        let diff = if i == 0 { 0 } else { v - prev };
        write_varint_u64(&mut out, zigzag_encode(diff));
        prev = v;
    }
    out
}

/// Decode a delta-encoded `i64` buffer, requiring exactly `count` elements.
pub fn decode(payload: &[u8], count: u32) -> Result<Vec<i64>> {
    let count = count as usize;
    if count == 0 {
        return Ok(Vec::new());
    }
    if payload.len() < 12 {
        return Err(CodecError::CorruptPayload {
            expected: count,
            got: 0,
        });
    }
    let stored_count = LittleEndian::read_u32(&payload[0..4]) as usize;
    let base = LittleEndian::read_i64(&payload[4..12]);

    let mut out = Vec::with_capacity(count);
    let mut pos = 12usize;
    let mut prev = base;
    for i in 0..count {
        let diff = zigzag_decode(read_varint_u64(payload, &mut pos)?);
        let v = if i == 0 { base } else { prev + diff };
        out.push(v);
        prev = v;
    }

    if stored_count != count || out.len() != count {
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
    fn monotonic_timestamps_round_trip() {
        let base = 1_000_000_000_000i64;
        let data: Vec<i64> = (0..100).map(|i| base + i * 1_000_000_000).collect();
        let encoded = encode(&data);
        let decoded = decode(&encoded, data.len() as u32).unwrap();
        assert_eq!(decoded, data);
        assert_eq!(*decoded.last().unwrap(), base + 99 * 1_000_000_000);
    }

    #[test]
    fn single_element_round_trips() {
        let data = [42i64];
        let encoded = encode(&data);
        assert_eq!(decode(&encoded, 1).unwrap(), data);
    }

    #[test]
    fn empty_round_trips() {
        assert_eq!(decode(&encode(&[]), 0).unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn negative_deltas_round_trip() {
        let data = [100i64, 50, 200, -300, 0, i64::MIN + 1, i64::MAX - 1];
        let encoded = encode(&data);
        assert_eq!(decode(&encoded, data.len() as u32).unwrap(), data);
    }

    #[test]
    fn truncated_frame_errors() {
        let data = [1i64, 2, 3];
        let encoded = encode(&data);
        let truncated = &encoded[..encoded.len() - 1];
        assert!(decode(truncated, data.len() as u32).is_err());
    }

    proptest::proptest! {
        #[test]
        fn round_trips_any_i64_vec(data: Vec<i64>) {
            let encoded = encode(&data);
            let decoded = decode(&encoded, data.len() as u32).unwrap();
            proptest::prop_assert_eq!(decoded, data);
        }
    }
}
