//! TLV field writer.

/// Accumulates TLV fields into an owned byte buffer.
///
/// Fields are written in call order. Empty strings, empty arrays, and empty
/// byte payloads are omitted entirely; absence of a tag is the wire
/// representation of "empty", mirroring how readers treat a missing optional
/// field.
#[derive(Debug, Default)]
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        FieldWriter { buf: Vec::new() }
    }

    /// Creates a writer with `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        FieldWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Consumes the writer, returning the accumulated bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Writes a field with an arbitrary payload. Empty payloads are skipped.
    pub fn field_bytes(&mut self, tag: u8, payload: &[u8]) {
        if payload.is_empty() {
            return;
        }
        self.buf.push(tag);
        self.buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(payload);
    }

    /// Writes a field whose payload must appear even when empty.
    ///
    /// Used for records where presence itself is meaningful (e.g. a node
    /// record for an input node has no inputs but must still exist).
    pub fn field_bytes_always(&mut self, tag: u8, payload: &[u8]) {
        self.buf.push(tag);
        self.buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(payload);
    }

    /// Writes a UTF-8 string field. Empty strings are skipped.
    pub fn field_str(&mut self, tag: u8, value: &str) {
        self.field_bytes(tag, value.as_bytes());
    }

    pub fn field_u8(&mut self, tag: u8, value: u8) {
        self.field_bytes_always(tag, &[value]);
    }

    pub fn field_u32(&mut self, tag: u8, value: u32) {
        self.field_bytes_always(tag, &value.to_le_bytes());
    }

    pub fn field_u64(&mut self, tag: u8, value: u64) {
        self.field_bytes_always(tag, &value.to_le_bytes());
    }

    /// Writes a counted `u64` array field. Empty arrays are skipped.
    pub fn field_u64_array(&mut self, tag: u8, values: &[u64]) {
        if values.is_empty() {
            return;
        }
        let mut payload = Vec::with_capacity(4 + values.len() * 8);
        payload.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for v in values {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        self.field_bytes_always(tag, &payload);
    }

    /// Writes a counted `u32` array field. Empty arrays are skipped.
    pub fn field_u32_array(&mut self, tag: u8, values: &[u32]) {
        if values.is_empty() {
            return;
        }
        let mut payload = Vec::with_capacity(4 + values.len() * 4);
        payload.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for v in values {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        self.field_bytes_always(tag, &payload);
    }

    /// Writes a counted `i64` array field. Empty arrays are skipped.
    pub fn field_i64_array(&mut self, tag: u8, values: &[i64]) {
        if values.is_empty() {
            return;
        }
        let mut payload = Vec::with_capacity(4 + values.len() * 8);
        payload.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for v in values {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        self.field_bytes_always(tag, &payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{read_u32_array, FieldIter};

    #[test]
    fn empty_optional_fields_are_omitted() {
        let mut w = FieldWriter::new();
        w.field_str(1, "");
        w.field_bytes(2, &[]);
        w.field_u64_array(3, &[]);
        assert!(w.into_bytes().is_empty());
    }

    #[test]
    fn always_fields_are_written_even_when_empty() {
        let mut w = FieldWriter::new();
        w.field_bytes_always(9, &[]);
        let buf = w.into_bytes();
        let (tag, payload) = FieldIter::new(&buf).next().unwrap().unwrap();
        assert_eq!(tag, 9);
        assert!(payload.is_empty());
    }

    #[test]
    fn u32_array_roundtrip() {
        let mut w = FieldWriter::new();
        w.field_u32_array(5, &[0, 1, 2, 3]);
        let buf = w.into_bytes();
        let payload = FieldIter::find(&buf, 5).unwrap().unwrap();
        assert_eq!(read_u32_array(payload).unwrap(), vec![0, 1, 2, 3]);
    }
}
