//! Byte cursor and TLV field iteration over a borrowed buffer.
//!
//! [`ByteReader`] reads fixed-width little-endian primitives and counted
//! slices. [`FieldIter`] walks a field region, yielding `(tag, payload)`
//! pairs; callers match on tags they know and skip the rest, which is what
//! makes the format forward-compatible.

use crate::error::DecodeError;

/// A cursor over a borrowed byte slice.
///
/// All reads advance the cursor; all integers are little-endian. Reads past
/// the end fail with [`DecodeError::UnexpectedEof`] rather than panicking.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    /// Returns the number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns `true` when the cursor has consumed the whole buffer.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the unread tail of the buffer without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Reads `len` raw bytes.
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(DecodeError::UnexpectedEof {
                needed: len - self.remaining(),
                offset: self.pos,
            });
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.bytes(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> Result<u64, DecodeError> {
        let b = self.bytes(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn i64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.u64()? as i64)
    }

    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.u32()?))
    }

    pub fn f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.u64()?))
    }

    /// Reads the entire remaining buffer as a UTF-8 string.
    pub fn str_rest(&mut self) -> Result<&'a str, DecodeError> {
        let bytes = self.bytes(self.remaining())?;
        Ok(std::str::from_utf8(bytes)?)
    }
}

/// Decodes a counted `u64` array payload (count-prefixed, little-endian).
pub fn read_u64_array(payload: &[u8]) -> Result<Vec<u64>, DecodeError> {
    read_counted_array(payload, 8, |r| r.u64())
}

/// Decodes a counted `u32` array payload.
pub fn read_u32_array(payload: &[u8]) -> Result<Vec<u32>, DecodeError> {
    read_counted_array(payload, 4, |r| r.u32())
}

/// Decodes a counted `i64` array payload.
pub fn read_i64_array(payload: &[u8]) -> Result<Vec<i64>, DecodeError> {
    read_counted_array(payload, 8, |r| r.i64())
}

fn read_counted_array<T>(
    payload: &[u8],
    width: usize,
    mut read: impl FnMut(&mut ByteReader<'_>) -> Result<T, DecodeError>,
) -> Result<Vec<T>, DecodeError> {
    let mut reader = ByteReader::new(payload);
    let count = reader.u32()? as usize;
    if reader.remaining() != count * width {
        return Err(DecodeError::MalformedArray {
            len: reader.remaining(),
            width,
        });
    }
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read(&mut reader)?);
    }
    Ok(out)
}

/// Iterator over the TLV fields of a buffer region.
///
/// Yields `(tag, payload)` pairs in buffer order. Iteration stops at the end
/// of the region; a field whose declared length overruns the region yields a
/// [`DecodeError::TruncatedField`].
#[derive(Debug, Clone)]
pub struct FieldIter<'a> {
    reader: ByteReader<'a>,
}

impl<'a> FieldIter<'a> {
    /// Creates a field iterator over `region`.
    pub fn new(region: &'a [u8]) -> Self {
        FieldIter {
            reader: ByteReader::new(region),
        }
    }

    /// Finds the first field with `tag`, skipping everything else.
    pub fn find(region: &'a [u8], tag: u8) -> Result<Option<&'a [u8]>, DecodeError> {
        for field in FieldIter::new(region) {
            let (t, payload) = field?;
            if t == tag {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }
}

impl<'a> Iterator for FieldIter<'a> {
    type Item = Result<(u8, &'a [u8]), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.reader.is_empty() {
            return None;
        }
        let tag = match self.reader.u8() {
            Ok(t) => t,
            Err(e) => return Some(Err(e)),
        };
        let len = match self.reader.u32() {
            Ok(l) => l as usize,
            Err(e) => return Some(Err(e)),
        };
        if self.reader.remaining() < len {
            return Some(Err(DecodeError::TruncatedField {
                tag,
                declared: len,
                available: self.reader.remaining(),
            }));
        }
        let payload = match self.reader.bytes(len) {
            Ok(p) => p,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok((tag, payload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::FieldWriter;

    #[test]
    fn primitive_reads_are_little_endian() {
        let bytes = [0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.u32().unwrap(), 1);
        assert_eq!(r.u16().unwrap(), 0xFFFF);
        assert!(r.is_empty());
    }

    #[test]
    fn read_past_end_errors() {
        let mut r = ByteReader::new(&[0x01]);
        let err = r.u64().unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
    }

    #[test]
    fn field_iteration_yields_all_fields_in_order() {
        let mut w = FieldWriter::new();
        w.field_str(1, "main");
        w.field_u64(2, 42);
        w.field_bytes(3, &[0xAB]);

        let buf = w.into_bytes();
        let fields: Vec<(u8, &[u8])> = FieldIter::new(&buf).map(|f| f.unwrap()).collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].0, 1);
        assert_eq!(fields[0].1, b"main");
        assert_eq!(fields[1].0, 2);
        assert_eq!(fields[2].1, &[0xAB]);
    }

    #[test]
    fn unknown_tags_are_skippable() {
        let mut w = FieldWriter::new();
        w.field_u64(200, 7); // unknown to this reader
        w.field_str(1, "known");

        let buf = w.into_bytes();
        let payload = FieldIter::find(&buf, 1).unwrap().unwrap();
        assert_eq!(payload, b"known");
    }

    #[test]
    fn truncated_field_is_reported() {
        // tag 1, declared length 10, only 2 payload bytes present
        let buf = [1u8, 10, 0, 0, 0, 0xAA, 0xBB];
        let mut it = FieldIter::new(&buf);
        let err = it.next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::TruncatedField { tag: 1, .. }));
    }

    #[test]
    fn u64_array_roundtrip() {
        let mut w = FieldWriter::new();
        w.field_u64_array(4, &[3, 1, 4, 1, 5]);
        let buf = w.into_bytes();

        let payload = FieldIter::find(&buf, 4).unwrap().unwrap();
        assert_eq!(read_u64_array(payload).unwrap(), vec![3, 1, 4, 1, 5]);
    }

    #[test]
    fn array_with_bad_length_is_rejected() {
        // count says 2 elements but only one u64 follows
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u32.to_le_bytes());
        payload.extend_from_slice(&7u64.to_le_bytes());
        let err = read_u64_array(&payload).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedArray { .. }));
    }

    #[test]
    fn empty_region_yields_no_fields() {
        assert!(FieldIter::new(&[]).next().is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn u64_arrays_roundtrip(values in prop::collection::vec(any::<u64>(), 1..64)) {
                let mut w = FieldWriter::new();
                w.field_u64_array(7, &values);
                let buf = w.into_bytes();
                let payload = FieldIter::find(&buf, 7).unwrap().unwrap();
                prop_assert_eq!(read_u64_array(payload).unwrap(), values);
            }

            #[test]
            fn string_fields_roundtrip(text in "\\PC{1,64}") {
                let mut w = FieldWriter::new();
                w.field_str(3, &text);
                let buf = w.into_bytes();
                let payload = FieldIter::find(&buf, 3).unwrap().unwrap();
                prop_assert_eq!(std::str::from_utf8(payload).unwrap(), text);
            }

            #[test]
            fn arbitrary_bytes_never_panic_the_field_iterator(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
                // Malformed input must surface as errors, not panics.
                for field in FieldIter::new(&bytes) {
                    if field.is_err() {
                        break;
                    }
                }
            }
        }
    }
}
