//! Zero-copy readers over serialized buffers.
//!
//! Each reader borrows a buffer region and decodes individual fields on
//! demand. Nothing is materialized up front: iterating the nodes of a
//! [`CircuitReader`] walks the TLV stream, strings are returned as slices
//! into the buffer, and only counted arrays and payloads allocate when
//! accessed.

use mpcir_wire::reader::{read_u32_array, read_u64_array};
use mpcir_wire::{
    check_header, tags, ByteReader, DecodeError, FieldIter, CIRCUIT_MAGIC, MODULE_MAGIC,
};

use crate::annotation;
use crate::codec::decode;
use crate::id::NodeId;
use crate::node::Node;
use crate::ops::Operation;
use crate::payload::ConstantPayload;
use crate::types::{DataType, PrimitiveType, SecurityLevel};

/// Read-only view over one data-type record in a buffer.
#[derive(Debug, Clone, Copy)]
pub struct DataTypeReader<'a> {
    record: &'a [u8],
}

impl<'a> DataTypeReader<'a> {
    pub fn primitive(&self) -> Result<PrimitiveType, DecodeError> {
        match FieldIter::find(self.record, tags::datatype::PRIMITIVE)? {
            Some(payload) => {
                let value = ByteReader::new(payload).u8()?;
                PrimitiveType::from_discriminant(value).ok_or(DecodeError::UnknownDiscriminant {
                    what: "primitive type",
                    value: value as u64,
                })
            }
            None => Err(DecodeError::MissingField {
                record: "datatype",
                field: "primitive",
            }),
        }
    }

    pub fn security(&self) -> Result<SecurityLevel, DecodeError> {
        match FieldIter::find(self.record, tags::datatype::SECURITY)? {
            Some(payload) => {
                let value = ByteReader::new(payload).u8()?;
                SecurityLevel::from_discriminant(value).ok_or(DecodeError::UnknownDiscriminant {
                    what: "security level",
                    value: value as u64,
                })
            }
            None => Ok(SecurityLevel::Secure),
        }
    }

    pub fn annotations(&self) -> Result<&'a str, DecodeError> {
        read_str(self.record, tags::datatype::ANNOTATIONS)
    }

    /// Best-effort attribute lookup; `""` when absent.
    pub fn attribute(&self, key: &str) -> Result<&'a str, DecodeError> {
        Ok(annotation::attribute(self.annotations()?, key))
    }

    /// Materializes the owned descriptor.
    pub fn to_owned(&self) -> Result<DataType, DecodeError> {
        decode::decode_data_type(self.record)
    }
}

/// Read-only view over one node record in a buffer.
#[derive(Debug, Clone, Copy)]
pub struct NodeReader<'a> {
    record: &'a [u8],
}

impl<'a> NodeReader<'a> {
    pub fn id(&self) -> Result<NodeId, DecodeError> {
        match FieldIter::find(self.record, tags::node::ID)? {
            Some(payload) => Ok(NodeId(ByteReader::new(payload).u64()?)),
            None => Err(DecodeError::MissingField {
                record: "node",
                field: "id",
            }),
        }
    }

    pub fn operation(&self) -> Result<Operation, DecodeError> {
        match FieldIter::find(self.record, tags::node::OPERATION)? {
            Some(payload) => {
                let value = ByteReader::new(payload).u8()?;
                Operation::from_discriminant(value).ok_or(DecodeError::UnknownDiscriminant {
                    what: "operation",
                    value: value as u64,
                })
            }
            None => Err(DecodeError::MissingField {
                record: "node",
                field: "operation",
            }),
        }
    }

    pub fn input_node_ids(&self) -> Result<Vec<NodeId>, DecodeError> {
        match FieldIter::find(self.record, tags::node::INPUT_IDS)? {
            Some(payload) => Ok(read_u64_array(payload)?.into_iter().map(NodeId).collect()),
            None => Ok(Vec::new()),
        }
    }

    /// Explicit offset list; empty when the node has none.
    pub fn input_offsets(&self) -> Result<Vec<u32>, DecodeError> {
        match FieldIter::find(self.record, tags::node::INPUT_OFFSETS)? {
            Some(payload) => read_u32_array(payload),
            None => Ok(Vec::new()),
        }
    }

    pub fn uses_input_offsets(&self) -> Result<bool, DecodeError> {
        Ok(FieldIter::find(self.record, tags::node::INPUT_OFFSETS)?.is_some())
    }

    pub fn num_outputs(&self) -> Result<u32, DecodeError> {
        match FieldIter::find(self.record, tags::node::NUM_OUTPUTS)? {
            Some(payload) => ByteReader::new(payload).u32(),
            None => Ok(1),
        }
    }

    pub fn num_inputs(&self) -> Result<usize, DecodeError> {
        Ok(self.input_node_ids()?.len())
    }

    pub fn custom_op_name(&self) -> Result<&'a str, DecodeError> {
        read_str(self.record, tags::node::CUSTOM_OP_NAME)
    }

    pub fn callee(&self) -> Result<&'a str, DecodeError> {
        read_str(self.record, tags::node::CALLEE)
    }

    pub fn annotations(&self) -> Result<&'a str, DecodeError> {
        read_str(self.record, tags::node::ANNOTATIONS)
    }

    pub fn attribute(&self, key: &str) -> Result<&'a str, DecodeError> {
        Ok(annotation::attribute(self.annotations()?, key))
    }

    pub fn input_types(&self) -> Result<Vec<DataTypeReader<'a>>, DecodeError> {
        read_records(self.record, tags::node::INPUT_TYPE)
    }

    pub fn output_types(&self) -> Result<Vec<DataTypeReader<'a>>, DecodeError> {
        read_records(self.record, tags::node::OUTPUT_TYPE)
    }

    /// Raw payload bytes, still in wire form.
    pub fn payload_bytes(&self) -> Result<Option<&'a [u8]>, DecodeError> {
        FieldIter::find(self.record, tags::node::PAYLOAD)
    }

    /// Decoded constant payload, when present.
    pub fn payload(&self) -> Result<Option<ConstantPayload>, DecodeError> {
        match self.payload_bytes()? {
            Some(bytes) => Ok(Some(decode::decode_payload(bytes)?)),
            None => Ok(None),
        }
    }

    /// Materializes the owned node.
    pub fn to_owned(&self) -> Result<Node, DecodeError> {
        decode::decode_node(self.record)
    }
}

/// Read-only view over a serialized circuit buffer.
#[derive(Debug, Clone, Copy)]
pub struct CircuitReader<'a> {
    body: &'a [u8],
}

impl<'a> CircuitReader<'a> {
    /// Checks the header and wraps the buffer. The body is not parsed.
    pub fn new(buffer: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(CircuitReader {
            body: check_header(buffer, &CIRCUIT_MAGIC)?,
        })
    }

    pub fn name(&self) -> Result<&'a str, DecodeError> {
        read_str(self.body, tags::circuit::NAME)
    }

    pub fn annotations(&self) -> Result<&'a str, DecodeError> {
        read_str(self.body, tags::circuit::ANNOTATIONS)
    }

    pub fn attribute(&self, key: &str) -> Result<&'a str, DecodeError> {
        Ok(annotation::attribute(self.annotations()?, key))
    }

    pub fn input_node_ids(&self) -> Result<Vec<NodeId>, DecodeError> {
        match FieldIter::find(self.body, tags::circuit::INPUT_IDS)? {
            Some(payload) => Ok(read_u64_array(payload)?.into_iter().map(NodeId).collect()),
            None => Ok(Vec::new()),
        }
    }

    pub fn output_node_ids(&self) -> Result<Vec<NodeId>, DecodeError> {
        match FieldIter::find(self.body, tags::circuit::OUTPUT_IDS)? {
            Some(payload) => Ok(read_u64_array(payload)?.into_iter().map(NodeId).collect()),
            None => Ok(Vec::new()),
        }
    }

    pub fn input_types(&self) -> Result<Vec<DataTypeReader<'a>>, DecodeError> {
        read_records(self.body, tags::circuit::INPUT_TYPE)
    }

    pub fn output_types(&self) -> Result<Vec<DataTypeReader<'a>>, DecodeError> {
        read_records(self.body, tags::circuit::OUTPUT_TYPE)
    }

    pub fn num_inputs(&self) -> Result<usize, DecodeError> {
        Ok(self.input_node_ids()?.len())
    }

    pub fn num_outputs(&self) -> Result<usize, DecodeError> {
        Ok(self.output_node_ids()?.len())
    }

    pub fn num_nodes(&self) -> Result<usize, DecodeError> {
        let mut count = 0;
        for field in FieldIter::new(self.body) {
            if field?.0 == tags::circuit::NODE {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Iterates node readers in topological (buffer) order.
    pub fn nodes(&self) -> impl Iterator<Item = Result<NodeReader<'a>, DecodeError>> {
        FieldIter::new(self.body).filter_map(|field| match field {
            Ok((tags::circuit::NODE, record)) => Some(Ok(NodeReader { record })),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    }

    /// Finds a node by id. O(n) scan over the buffer.
    pub fn node_with_id(&self, id: NodeId) -> Result<Option<NodeReader<'a>>, DecodeError> {
        for node in self.nodes() {
            let node = node?;
            if node.id()? == id {
                return Ok(Some(node));
            }
        }
        Ok(None)
    }
}

/// Read-only view over a serialized module buffer.
#[derive(Debug, Clone, Copy)]
pub struct ModuleReader<'a> {
    body: &'a [u8],
}

impl<'a> ModuleReader<'a> {
    /// Checks the header and wraps the buffer. The body is not parsed.
    pub fn new(buffer: &'a [u8]) -> Result<Self, DecodeError> {
        Ok(ModuleReader {
            body: check_header(buffer, &MODULE_MAGIC)?,
        })
    }

    pub fn entry_name(&self) -> Result<&'a str, DecodeError> {
        read_str(self.body, tags::module::ENTRY)
    }

    pub fn annotations(&self) -> Result<&'a str, DecodeError> {
        read_str(self.body, tags::module::ANNOTATIONS)
    }

    pub fn attribute(&self, key: &str) -> Result<&'a str, DecodeError> {
        Ok(annotation::attribute(self.annotations()?, key))
    }

    /// Iterates the raw embedded circuit buffers.
    pub fn circuit_buffers(&self) -> impl Iterator<Item = Result<&'a [u8], DecodeError>> {
        FieldIter::new(self.body).filter_map(|field| match field {
            Ok((tags::module::CIRCUIT, buffer)) => Some(Ok(buffer)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    }

    /// Iterates the embedded circuit buffers, each independently decodable.
    pub fn circuits(&self) -> impl Iterator<Item = Result<CircuitReader<'a>, DecodeError>> {
        FieldIter::new(self.body).filter_map(|field| match field {
            Ok((tags::module::CIRCUIT, buffer)) => Some(CircuitReader::new(buffer)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    }

    pub fn circuit_names(&self) -> Result<Vec<String>, DecodeError> {
        let mut names = Vec::new();
        for circuit in self.circuits() {
            names.push(circuit?.name()?.to_string());
        }
        Ok(names)
    }

    pub fn circuit_with_name(&self, name: &str) -> Result<Option<CircuitReader<'a>>, DecodeError> {
        for circuit in self.circuits() {
            let circuit = circuit?;
            if circuit.name()? == name {
                return Ok(Some(circuit));
            }
        }
        Ok(None)
    }

    pub fn entry_circuit(&self) -> Result<Option<CircuitReader<'a>>, DecodeError> {
        self.circuit_with_name(self.entry_name()?)
    }
}

fn read_str<'a>(region: &'a [u8], tag: u8) -> Result<&'a str, DecodeError> {
    match FieldIter::find(region, tag)? {
        Some(payload) => Ok(std::str::from_utf8(payload)?),
        None => Ok(""),
    }
}

fn read_records<'a>(region: &'a [u8], tag: u8) -> Result<Vec<DataTypeReader<'a>>, DecodeError> {
    let mut out = Vec::new();
    for field in FieldIter::new(region) {
        let (t, record) = field?;
        if t == tag {
            out.push(DataTypeReader { record });
        }
    }
    Ok(out)
}
