//! Error types for the zipscan crate.

use thiserror::Error;

/// Errors that can occur while decoding or extracting an archive.
///
/// Scanning and EOCD location never return these for malformed input; they
/// stop early and keep whatever they already recovered. Errors surface from
/// record decoding called directly and from extraction.
#[derive(Debug, Error)]
pub enum Error {
    /// A schema requested a fixed-width integer field other than 1, 2, 4 or 8 bytes.
    #[error("unsupported field width: {width} bytes")]
    Decode { width: usize },

    /// A text field references a length field that was not decoded before it.
    #[error("text field length refers to unknown field `{field}`")]
    UnknownLengthField { field: &'static str },

    /// A record runs past the end of the byte source.
    #[error("record at offset {offset} needs {needed} bytes past the end of the buffer")]
    Truncated { offset: usize, needed: usize },

    /// A record signature did not match the one expected at that offset.
    #[error("invalid signature at offset {offset}: expected {expected:#010x}, got {actual:#010x}")]
    InvalidSignature {
        expected: u32,
        actual: u32,
        offset: usize,
    },

    /// An entry's payload does not fit inside the byte source.
    #[error("entry data {start}..{start}+{len} exceeds archive length {source_len}")]
    OutOfBounds {
        start: usize,
        len: usize,
        source_len: usize,
    },

    /// No decompression filter is registered for this method code.
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    /// The decompression filter rejected its input.
    #[error("decompression error: {0}")]
    Decompression(String),

    /// I/O error while loading an archive into memory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for zipscan operations.
pub type Result<T> = std::result::Result<T, Error>;
