//! WAL entry shape and its CRC-checksummed line encoding.
//!
//! Wire shape: `{"seq","table","row","timestamp"}` one per line. Each line
//! carries an appended `\t<crc32-hex>` over the JSON body so `recover()` has
//! a concrete, testable corruption rule rather than silently skipping lines
//! with no definition of "corrupted". The JSON object itself is unchanged.

use serde::{Deserialize, Serialize};

use crate::error::WalError;

/// One row insert, as appended to the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub table: String,
    pub row: serde_json::Value,
    pub timestamp: u64,
}

/// Encode one line: `<json>\t<crc32-hex>\n`.
pub fn encode_line(entry: &WalEntry) -> String {
    let json = serde_json::to_string(entry).expect("WalEntry always serializes");
    let crc = crc32fast::hash(json.as_bytes());
    format!("{json}\t{crc:08x}\n")
}

/// Decode one line (without its trailing newline), verifying the trailing
/// CRC32 against the JSON body. Any malformed shape — missing separator,
/// non-hex CRC, JSON that doesn't parse, or a mismatched checksum — is
/// reported uniformly as `path`/`line_no`-tagged corruption; callers that
/// want to know *why* can re-run with additional diagnostics, but recovery
/// itself only needs to know whether to keep or drop the line.
pub fn decode_line(line: &str, path: &std::path::Path, line_no: usize) -> Result<WalEntry, WalError> {
    let corrupt = || WalError::CorruptLine {
        path: path.to_path_buf(),
        line_no,
    };
    let (json, crc_hex) = line.trim_end().rsplit_once('\t').ok_or_else(corrupt)?;
    let expected = u32::from_str_radix(crc_hex, 16).map_err(|_| corrupt())?;
    let actual = crc32fast::hash(json.as_bytes());
    if actual != expected {
        return Err(corrupt());
    }
    serde_json::from_str(json).map_err(|_| corrupt())
}
