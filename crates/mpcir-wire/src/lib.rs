//! Low-level binary encoding for MPCIR containers.
//!
//! The on-disk and in-memory packed representation of circuits and modules
//! is a tag-length-value (TLV) format:
//!
//! - A buffer starts with a four-byte magic ([`CIRCUIT_MAGIC`] or
//!   [`MODULE_MAGIC`]) followed by a little-endian `u16` format version.
//! - The rest of the buffer is a sequence of fields. Each field is a one-byte
//!   tag, a little-endian `u32` payload length, and the payload bytes.
//! - Field identity is the tag, not the position. Readers skip fields with
//!   tags they do not know, so new optional fields can be added without
//!   breaking older readers.
//! - All integers are little-endian and fixed-width. Strings are the raw
//!   UTF-8 bytes of a field payload (the field length is the prefix).
//! - Repeated fields (e.g. the node records of a circuit) appear once per
//!   element, in element order.
//!
//! This crate only knows about bytes, tags, and primitive values. The
//! mapping between fields and IR entities lives in `mpcir-core`.

pub mod error;
pub mod reader;
pub mod tags;
pub mod writer;

pub use error::DecodeError;
pub use reader::{ByteReader, FieldIter};
pub use writer::FieldWriter;

/// Magic bytes opening a serialized circuit buffer.
pub const CIRCUIT_MAGIC: [u8; 4] = *b"MPCC";

/// Magic bytes opening a serialized module buffer.
pub const MODULE_MAGIC: [u8; 4] = *b"MPCM";

/// Current format version, written after the magic.
pub const FORMAT_VERSION: u16 = 1;

/// Reads and checks a buffer header, returning the body after magic and
/// version.
///
/// Fails with [`DecodeError::BadMagic`] when the buffer does not start with
/// `magic`, and [`DecodeError::UnsupportedVersion`] when the version is
/// newer than this reader understands.
pub fn check_header<'a>(buffer: &'a [u8], magic: &[u8; 4]) -> Result<&'a [u8], DecodeError> {
    let mut reader = ByteReader::new(buffer);
    let found = reader.bytes(4)?;
    if found != magic {
        return Err(DecodeError::BadMagic {
            expected: *magic,
            found: [
                found.first().copied().unwrap_or(0),
                found.get(1).copied().unwrap_or(0),
                found.get(2).copied().unwrap_or(0),
                found.get(3).copied().unwrap_or(0),
            ],
        });
    }
    let version = reader.u16()?;
    if version > FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion { version });
    }
    Ok(reader.rest())
}

/// Writes a buffer header (magic + version) into `out`.
pub fn write_header(out: &mut Vec<u8>, magic: &[u8; 4]) {
    out.extend_from_slice(magic);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
}
