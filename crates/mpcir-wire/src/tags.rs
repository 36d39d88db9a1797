//! Field tag assignments for every record kind.
//!
//! Tags are stable: once assigned, a tag keeps its meaning forever. New
//! fields take fresh tags; removed fields leave their tag retired.

/// Fields of a circuit buffer (after magic + version).
pub mod circuit {
    pub const NAME: u8 = 1;
    pub const ANNOTATIONS: u8 = 2;
    pub const INPUT_IDS: u8 = 3;
    pub const OUTPUT_IDS: u8 = 4;
    /// Repeated; each payload is one data-type record.
    pub const INPUT_TYPE: u8 = 5;
    /// Repeated; each payload is one data-type record.
    pub const OUTPUT_TYPE: u8 = 6;
    /// Repeated; each payload is one node record, in topological order.
    pub const NODE: u8 = 7;
}

/// Fields of a node record.
pub mod node {
    pub const ID: u8 = 1;
    pub const OPERATION: u8 = 2;
    pub const INPUT_IDS: u8 = 3;
    pub const INPUT_OFFSETS: u8 = 4;
    pub const NUM_OUTPUTS: u8 = 5;
    /// Repeated; each payload is one data-type record.
    pub const INPUT_TYPE: u8 = 6;
    /// Repeated; each payload is one data-type record.
    pub const OUTPUT_TYPE: u8 = 7;
    pub const CUSTOM_OP_NAME: u8 = 8;
    pub const CALLEE: u8 = 9;
    pub const PAYLOAD: u8 = 10;
    pub const ANNOTATIONS: u8 = 11;
}

/// Fields of a data-type record.
pub mod datatype {
    pub const PRIMITIVE: u8 = 1;
    pub const SECURITY: u8 = 2;
    pub const SHAPE: u8 = 3;
    pub const ANNOTATIONS: u8 = 4;
}

/// Fields of a module buffer (after magic + version).
pub mod module {
    pub const ENTRY: u8 = 1;
    pub const ANNOTATIONS: u8 = 2;
    /// Repeated; each payload is an entire circuit buffer, independently
    /// decodable including its own magic and version.
    pub const CIRCUIT: u8 = 3;
}

/// Fields of a constant payload buffer.
pub mod payload {
    pub const KIND: u8 = 1;
    pub const PRIMITIVE: u8 = 2;
    /// Scalar value or flat vector elements, fixed-width little-endian.
    pub const DATA: u8 = 3;
    /// Matrix row count (u32); rows follow as repeated DATA fields.
    pub const ROWS: u8 = 4;
}

/// Payload kind discriminants for [`payload::KIND`].
pub mod payload_kind {
    pub const SCALAR: u8 = 0;
    pub const VECTOR: u8 = 1;
    pub const MATRIX: u8 = 2;
    pub const BLOB: u8 = 3;
}
