//! Decode errors for the TLV wire format.

use thiserror::Error;

/// Errors produced while decoding a serialized circuit or module buffer.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The buffer ended before the expected number of bytes could be read.
    #[error("unexpected end of buffer: needed {needed} more bytes at offset {offset}")]
    UnexpectedEof { needed: usize, offset: usize },

    /// The buffer does not open with the expected magic bytes.
    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    /// The buffer was written by a newer format version.
    #[error("unsupported format version {version}")]
    UnsupportedVersion { version: u16 },

    /// A field payload was shorter than its declared length.
    #[error("truncated field: tag {tag} declares {declared} bytes, {available} available")]
    TruncatedField {
        tag: u8,
        declared: usize,
        available: usize,
    },

    /// A string field did not hold valid UTF-8.
    #[error("invalid UTF-8 in string field: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// An enum discriminant was out of range.
    #[error("unknown {what} discriminant: {value}")]
    UnknownDiscriminant { what: &'static str, value: u64 },

    /// A required field was absent from a record.
    #[error("missing required field '{field}' in {record} record")]
    MissingField {
        record: &'static str,
        field: &'static str,
    },

    /// An array payload length was not a multiple of its element width.
    #[error("malformed array payload: {len} bytes is not a whole number of {width}-byte elements")]
    MalformedArray { len: usize, width: usize },
}
