//! File header: `u32` JSON length prefix + JSON body + zero-padding up to an
//! 8-byte aligned offset, where the first chunk frame begins.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::types::ColumnType;

pub const MAGIC: &[u8; 4] = b"NDTS";
pub const CURRENT_VERSION: u32 = 1;
const ALIGNMENT: usize = 8;

/// The format version a header was written with.
///
/// Version 0 predates the `compression` key; readers treat every column as
/// raw in that case. Version 1 is the current format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderVersion {
    V0,
    V1,
}

impl HeaderVersion {
    pub fn from_u32(v: u32) -> Result<Self> {
        match v {
            0 => Ok(HeaderVersion::V0),
            1 => Ok(HeaderVersion::V1),
            other => Err(FormatError::UnsupportedVersion(other)),
        }
    }

    pub fn as_u32(&self) -> u32 {
        match self {
            HeaderVersion::V0 => 0,
            HeaderVersion::V1 => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: ColumnType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionPolicy {
    pub enabled: bool,
    /// Per-column codec name, as stored in the header (`"none"`, `"delta"`,
    /// `"rle"`, `"gorilla"`); missing columns fall back to raw.
    pub algorithms: HashMap<String, String>,
}

fn default_compression() -> CompressionPolicy {
    CompressionPolicy::default()
}

/// The parsed file header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub magic: String,
    pub version: u32,
    pub columns: Vec<ColumnSchema>,
    #[serde(default = "default_compression")]
    pub compression: CompressionPolicy,
    #[serde(rename = "totalRows")]
    pub total_rows: u64,
    #[serde(rename = "chunkCount")]
    pub chunk_count: u32,
}

impl Header {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Header {
            magic: String::from_utf8_lossy(MAGIC).into_owned(),
            version: CURRENT_VERSION,
            columns,
            compression: CompressionPolicy::default(),
            total_rows: 0,
            chunk_count: 0,
        }
    }

    pub fn version(&self) -> Result<HeaderVersion> {
        HeaderVersion::from_u32(self.version)
    }

    /// Look up a column's declared codec name, defaulting to raw when the
    /// header is version 0, compression is disabled, or the column is
    /// simply absent from the `algorithms` map.
    pub fn codec_name(&self, column: &str) -> &str {
        if !self.compression.enabled {
            return "none";
        }
        self.compression
            .algorithms
            .get(column)
            .map(String::as_str)
            .unwrap_or("none")
    }

    pub fn column(&self, name: &str) -> Result<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| FormatError::ColumnNotFound(name.to_string()))
    }

    /// Serialize to `u32 len | json bytes | zero padding` so the returned
    /// buffer's length is 8-byte aligned; the first chunk frame starts
    /// immediately after.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with_min_json_len(0)
    }

    /// Like [`Header::to_bytes`], but the JSON body is padded with trailing
    /// ASCII spaces (insignificant JSON whitespace, still inside the
    /// declared `headerJsonLen`) up to `min_json_len` bytes if the compact
    /// encoding is shorter. Used to rewrite a header in place on
    /// `AppendWriter::close` without disturbing already-written chunk
    /// offsets: pass the previous on-disk header's JSON length as
    /// `min_json_len` and the result occupies exactly the same header
    /// region, provided the compact encoding still fits.
    pub fn to_bytes_with_min_json_len(&self, min_json_len: usize) -> Result<Vec<u8>> {
        if self.magic.as_bytes() != MAGIC {
            return Err(FormatError::BadMagic(self.magic.as_bytes().to_vec()));
        }
        let mut json = serde_json::to_vec(self).map_err(|e| FormatError::MalformedHeader(e.to_string()))?;
        if json.len() < min_json_len {
            json.extend(std::iter::repeat(b' ').take(min_json_len - json.len()));
        }
        let mut out = Vec::with_capacity(4 + json.len() + ALIGNMENT);
        let mut len_buf = [0u8; 4];
        LittleEndian::write_u32(&mut len_buf, json.len() as u32);
        out.extend_from_slice(&len_buf);
        out.extend_from_slice(&json);
        let pad = (ALIGNMENT - (out.len() % ALIGNMENT)) % ALIGNMENT;
        out.extend(std::iter::repeat(0u8).take(pad));
        Ok(out)
    }

    /// Rewrite this header so it occupies exactly the same header region as
    /// one whose JSON body was `old_json_len` bytes. Returns `None` if the
    /// compact encoding no longer fits (the header "must grow"): the caller
    /// must then write a fresh file and swap it in atomically instead of
    /// rewriting in place.
    pub fn to_bytes_matching(&self, old_json_len: usize) -> Result<Option<Vec<u8>>> {
        let compact = serde_json::to_vec(self).map_err(|e| FormatError::MalformedHeader(e.to_string()))?;
        if compact.len() > old_json_len {
            return Ok(None);
        }
        Ok(Some(self.to_bytes_with_min_json_len(old_json_len)?))
    }

    /// Parse a header from the start of `buf`, returning the header, the
    /// JSON body's declared length, and the (8-byte aligned) byte offset of
    /// the first chunk frame.
    pub fn from_bytes_with_json_len(buf: &[u8]) -> Result<(Header, usize, usize)> {
        if buf.len() < 4 {
            return Err(FormatError::Truncated(0));
        }
        let json_len = LittleEndian::read_u32(&buf[0..4]) as usize;
        let json_end = 4 + json_len;
        if buf.len() < json_end {
            return Err(FormatError::Truncated(buf.len() as u64));
        }
        let header: Header = serde_json::from_slice(&buf[4..json_end])
            .map_err(|e| FormatError::MalformedHeader(e.to_string()))?;
        if header.magic.as_bytes() != MAGIC {
            return Err(FormatError::BadMagic(header.magic.as_bytes().to_vec()));
        }
        header.version()?;
        let pad = (ALIGNMENT - (json_end % ALIGNMENT)) % ALIGNMENT;
        Ok((header, json_len, json_end + pad))
    }

    /// Parse a header from the start of `buf`, returning the header and the
    /// (8-byte aligned) byte offset of the first chunk frame.
    pub fn from_bytes(buf: &[u8]) -> Result<(Header, usize)> {
        let (header, _json_len, chunk_offset) = Header::from_bytes_with_json_len(buf)?;
        Ok((header, chunk_offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        Header::new(vec![
            ColumnSchema {
                name: "ts".to_string(),
                col_type: ColumnType::Int64,
            },
            ColumnSchema {
                name: "price".to_string(),
                col_type: ColumnType::Float64,
            },
        ])
    }

    #[test]
    fn round_trips_through_bytes() {
        let mut header = sample_header();
        header.total_rows = 42;
        header.chunk_count = 3;
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len() % 8, 0);
        let (parsed, chunk_offset) = Header::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(chunk_offset, bytes.len());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut header = sample_header();
        header.magic = "XXXX".to_string();
        let err = header.to_bytes().unwrap_err();
        assert!(matches!(err, FormatError::BadMagic(_)));
    }

    #[test]
    fn rewrite_in_place_preserves_chunk_offset_when_shorter() {
        let mut header = sample_header();
        header.total_rows = 1;
        header.chunk_count = 1;
        let original = header.to_bytes().unwrap();
        let (_, original_json_len, original_chunk_offset) =
            Header::from_bytes_with_json_len(&original).unwrap();

        // totalRows/chunkCount shrink in digit width, so the compact JSON
        // is never longer here, only equal or shorter.
        header.total_rows = 0;
        header.chunk_count = 0;
        let rewritten = header.to_bytes_matching(original_json_len).unwrap().unwrap();
        assert_eq!(rewritten.len(), original.len());
        let (parsed, _, chunk_offset) = Header::from_bytes_with_json_len(&rewritten).unwrap();
        assert_eq!(chunk_offset, original_chunk_offset);
        assert_eq!(parsed.total_rows, 0);
        assert_eq!(parsed.chunk_count, 0);
    }

    #[test]
    fn rewrite_in_place_reports_growth_when_it_no_longer_fits() {
        let header = sample_header();
        let grown = Header {
            columns: {
                let mut cols = header.columns.clone();
                cols.push(ColumnSchema {
                    name: "a_freshly_added_column_with_a_long_name".to_string(),
                    col_type: ColumnType::Int32,
                });
                cols
            },
            ..header.clone()
        };
        assert!(grown.to_bytes_matching(4).unwrap().is_none());
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let mut header = sample_header();
        header.version = 99;
        let bytes_ok_magic_only = {
            // bypass to_bytes's own magic check by serializing manually
            let json = serde_json::to_vec(&header).unwrap();
            let mut out = Vec::new();
            let mut len_buf = [0u8; 4];
            LittleEndian::write_u32(&mut len_buf, json.len() as u32);
            out.extend_from_slice(&len_buf);
            out.extend_from_slice(&json);
            out
        };
        let err = Header::from_bytes(&bytes_ok_magic_only).unwrap_err();
        assert!(matches!(err, FormatError::UnsupportedVersion(99)));
    }

    #[test]
    fn version_0_without_compression_key_defaults_to_raw() {
        let json = r#"{"magic":"NDTS","version":0,"columns":[{"name":"ts","type":"int64"}],"totalRows":5,"chunkCount":1}"#;
        let mut buf = Vec::new();
        let mut len_buf = [0u8; 4];
        LittleEndian::write_u32(&mut len_buf, json.len() as u32);
        buf.extend_from_slice(&len_buf);
        buf.extend_from_slice(json.as_bytes());
        let (header, _) = Header::from_bytes(&buf).unwrap();
        assert_eq!(header.codec_name("ts"), "none");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let json = r#"{"magic":"NDTS","version":1,"columns":[],"compression":{"enabled":false,"algorithms":{}},"totalRows":0,"chunkCount":0,"futureField":123}"#;
        let mut buf = Vec::new();
        let mut len_buf = [0u8; 4];
        LittleEndian::write_u32(&mut len_buf, json.len() as u32);
        buf.extend_from_slice(&len_buf);
        buf.extend_from_slice(json.as_bytes());
        assert!(Header::from_bytes(&buf).is_ok());
    }

    #[test]
    fn truncated_header_errors() {
        let header = sample_header();
        let bytes = header.to_bytes().unwrap();
        assert!(Header::from_bytes(&bytes[..bytes.len() - 2]).is_err());
    }

    #[test]
    fn codec_name_defaults_to_none_for_absent_column() {
        let mut header = sample_header();
        header.compression.enabled = true;
        header
            .compression
            .algorithms
            .insert("ts".to_string(), "delta".to_string());
        assert_eq!(header.codec_name("ts"), "delta");
        assert_eq!(header.codec_name("price"), "none");
    }
}
