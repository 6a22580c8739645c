//! Gorilla XOR codec for `float64` columns.
//!
//! Facebook-Gorilla encoding: the first value is stored verbatim, then each
//! subsequent value is XORed with its predecessor. A zero XOR costs a single
//! bit; a non-zero XOR is bit-packed using either the previous block's
//! leading-zero/length header (a single control bit, the common case for
//! slowly-varying series) or a fresh 5-bit leading-zero-count + 6-bit
//! length-minus-one header.
//!
//! `f64::to_bits`/`from_bits` are exact bitwise reinterpretations (including
//! for NaN payloads), so this codec round-trips every finite value, signed
//! zero, subnormals, and infinities bit-exactly; NaN payload bits round-trip
//! here too, though callers should not rely on NaN bit-patterns surviving
//! arithmetic elsewhere in the pipeline.

use byteorder::{ByteOrder, LittleEndian};

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{CodecError, Result};

const LEADING_ZERO_BITS: u8 = 5;
const LENGTH_BITS: u8 = 6;
const MAX_STORED_LEADING_ZEROS: u32 = (1 << LEADING_ZERO_BITS) - 1; // 31

struct Block {
    leading_zeros: u32,
    trailing_zeros: u32,
    meaningful_len: u32,
}

/// Encode a slice of `f64` into a `u32` element-count prefix followed by the
/// bit-packed Gorilla stream.
pub fn encode(elements: &[f64]) -> Vec<u8> {
    let mut out = vec![0u8; 4];
    LittleEndian::write_u32(&mut out[0..4], elements.len() as u32);

    if elements.is_empty() {
        return out;
    }

    let mut w = BitWriter::new();
    let mut prev_bits = elements[0].to_bits();
    w.write_bits(prev_bits, 64);

    let mut block: Option<Block> = None;

    for &value in &elements[1..] {
        let bits = value.to_bits();
        let xor = prev_bits ^ bits;

        if xor == 0 {
            w.write_bit(false);
        } else {
            w.write_bit(true);

            let actual_clz = xor.leading_zeros();
            let actual_ctz = xor.trailing_zeros();

            let fits_previous = block
                .as_ref()
                .is_some_and(|b| actual_clz >= b.leading_zeros && actual_ctz >= b.trailing_zeros);

            if fits_previous {
                let b = block.as_ref().unwrap();
                w.write_bit(false);
                let shifted = (xor >> b.trailing_zeros) & mask(b.meaningful_len);
                w.write_bits(shifted, b.meaningful_len as u8);
            } else {
                w.write_bit(true);
                let clz_stored = actual_clz.min(MAX_STORED_LEADING_ZEROS);
                let meaningful_len = 64 - clz_stored - actual_ctz;
                w.write_bits(clz_stored as u64, LEADING_ZERO_BITS);
                w.write_bits((meaningful_len - 1) as u64, LENGTH_BITS);
                let shifted = (xor >> actual_ctz) & mask(meaningful_len);
                w.write_bits(shifted, meaningful_len as u8);
                block = Some(Block {
                    leading_zeros: clz_stored,
                    trailing_zeros: actual_ctz,
                    meaningful_len,
                });
            }
        }

        prev_bits = bits;
    }

    out.extend(w.finish());
    out
}

/// Decode a Gorilla-encoded `f64` buffer, requiring exactly `count` elements.
pub fn decode(payload: &[u8], count: u32) -> Result<Vec<f64>> {
    let count = count as usize;
    if count == 0 {
        return Ok(Vec::new());
    }
    if payload.len() < 4 {
        return Err(CodecError::CorruptPayload {
            expected: count,
            got: 0,
        });
    }
    let stored_count = LittleEndian::read_u32(&payload[0..4]) as usize;
    if stored_count != count {
        return Err(CodecError::CorruptPayload {
            expected: count,
            got: stored_count,
        });
    }

    let mut r = BitReader::new(&payload[4..]);
    let mut prev_bits = r.read_bits(64)?;
    let mut out = Vec::with_capacity(count);
    out.push(f64::from_bits(prev_bits));

    let mut block: Option<Block> = None;

    for _ in 1..count {
        let bits = if r.read_bit()? {
            // non-zero XOR
            let (leading_zeros, trailing_zeros, meaningful_len) = if r.read_bit()? {
                let clz = r.read_bits(LEADING_ZERO_BITS)? as u32;
                let len = r.read_bits(LENGTH_BITS)? as u32 + 1;
                let ctz = 64 - clz - len;
                (clz, ctz, len)
            } else {
                let b = block
                    .as_ref()
                    .ok_or(CodecError::TruncatedBitstream(0))?;
                (b.leading_zeros, b.trailing_zeros, b.meaningful_len)
            };
            let raw = r.read_bits(meaningful_len as u8)?;
            let xor = raw << trailing_zeros;
            block = Some(Block {
                leading_zeros,
                trailing_zeros,
                meaningful_len,
            });
            prev_bits ^ xor
        } else {
            prev_bits
        };

        out.push(f64::from_bits(bits));
        prev_bits = bits;
    }

    if out.len() != count {
        return Err(CodecError::CorruptPayload {
            expected: count,
            got: out.len(),
        });
    }
    Ok(out)
}

fn mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_round_trips() {
        let data = [42.5f64];
        assert_eq!(decode(&encode(&data), 1).unwrap(), data);
    }

    #[test]
    fn empty_round_trips() {
        assert_eq!(decode(&encode(&[]), 0).unwrap(), Vec::<f64>::new());
    }

    #[test]
    fn constant_column_compresses_tightly() {
        let data = vec![123.456f64; 10_000];
        let encoded = encode(&data);
        // header (4) + first value (8) + ~1 bit/value rounded to bytes
        assert!(encoded.len() < 4 + 8 + data.len() / 4);
        let decoded = decode(&encoded, data.len() as u32).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn alternating_sign_prices_round_trip() {
        let data: Vec<f64> = (0..1000)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 } * (50_000 + i) as f64)
            .collect();
        let encoded = encode(&data);
        let decoded = decode(&encoded, data.len() as u32).unwrap();
        assert_eq!(decoded[0], 50_000.0);
        assert_eq!(decoded[1], -50_001.0);
        assert_eq!(decoded, data);
    }

    #[test]
    fn special_values_round_trip_bit_exact() {
        let data = [
            0.0f64,
            -0.0,
            f64::MIN_POSITIVE,
            -f64::MIN_POSITIVE,
            5e-324, // smallest subnormal
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::MAX,
            f64::MIN,
        ];
        let encoded = encode(&data);
        let decoded = decode(&encoded, data.len() as u32).unwrap();
        for (a, b) in data.iter().zip(decoded.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn nan_bit_pattern_round_trips() {
        let data = [f64::NAN, -f64::NAN, 1.0];
        let encoded = encode(&data);
        let decoded = decode(&encoded, data.len() as u32).unwrap();
        assert_eq!(data[0].to_bits(), decoded[0].to_bits());
        assert_eq!(data[1].to_bits(), decoded[1].to_bits());
        assert_eq!(data[2], decoded[2]);
    }

    #[test]
    fn truncated_stream_errors() {
        let data = [1.0f64, 2.0, 3.0];
        let encoded = encode(&data);
        let truncated = &encoded[..encoded.len() - 1];
        assert!(decode(truncated, data.len() as u32).is_err());
    }

    #[test]
    fn fresh_and_reused_block_headers_both_exercised() {
        // Values chosen so consecutive XORs have different leading/trailing
        // zero counts, forcing a fresh header, then repeat to hit the fast path.
        let data = [1.0f64, 2.0, 1_000_000.5, 1_000_000.5, 1_000_000.75];
        let encoded = encode(&data);
        let decoded = decode(&encoded, data.len() as u32).unwrap();
        assert_eq!(decoded, data);
    }

    proptest::proptest! {
        #[test]
        fn round_trips_any_finite_f64_vec(data: Vec<f64>) {
            let encoded = encode(&data);
            let decoded = decode(&encoded, data.len() as u32).unwrap();
            for (a, b) in data.iter().zip(decoded.iter()) {
                if a.is_nan() {
                    proptest::prop_assert!(b.is_nan());
                } else {
                    proptest::prop_assert_eq!(a.to_bits(), b.to_bits());
                }
            }
        }
    }
}
