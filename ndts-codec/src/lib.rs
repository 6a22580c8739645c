//! Per-column compression codecs for the ndts columnar format.
//!
//! Each codec is a pure `encode`/`decode` pair over a typed slice; none of
//! them touch a file or know about chunk framing. The element count that
//! `decode` needs is always supplied by the caller (it lives in the chunk
//! header, not embedded redundantly in every payload) except where a codec
//! also stores its own count for self-consistency checking, in which case a
//! mismatch is a corruption signal rather than the source of truth.

pub mod bitstream;
pub mod delta;
pub mod error;
pub mod gorilla;
pub mod raw;
pub mod rle;
pub mod varint;

pub use error::{CodecError, Result};

/// The compression algorithm applied to one column's chunk payloads.
///
/// Mirrors the `"codec"` string carried per column in the file header; an
/// absent or unrecognized name falls back to [`CodecKind::Raw`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CodecKind {
    #[default]
    Raw,
    Delta,
    Rle,
    Gorilla,
}

impl CodecKind {
    /// The name stored in the file header's `compression.algorithms` map.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecKind::Raw => "none",
            CodecKind::Delta => "delta",
            CodecKind::Rle => "rle",
            CodecKind::Gorilla => "gorilla",
        }
    }

    /// Parse a header codec name, defaulting unrecognized names to `Raw`
    /// rather than failing: forward compatibility with newer writers takes
    /// priority over catching a typo in a hand-edited header.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "delta" => CodecKind::Delta,
            "rle" => CodecKind::Rle,
            "gorilla" => CodecKind::Gorilla,
            _ => CodecKind::Raw,
        }
    }
}
