//! Serialized buffer → object tree.

use mpcir_wire::reader::{read_i64_array, read_u32_array, read_u64_array};
use mpcir_wire::{check_header, tags, ByteReader, DecodeError, FieldIter, CIRCUIT_MAGIC};

use crate::circuit::Circuit;
use crate::id::NodeId;
use crate::node::Node;
use crate::ops::Operation;
use crate::payload::{ConstantPayload, MatrixValue, ScalarValue, VectorValue};
use crate::types::{DataType, PrimitiveType, SecurityLevel};

/// Materializes an owned [`Module`](crate::Module) from a serialized buffer.
///
/// Member circuits stay in their packed form; they are unpacked
/// individually on first mutable access.
pub fn decode_module(buffer: &[u8]) -> Result<crate::module::Module, DecodeError> {
    let reader = crate::codec::read::ModuleReader::new(buffer)?;
    let mut module = crate::module::Module::new(reader.entry_name()?);
    module.annotations = reader.annotations()?.to_string();
    for bytes in reader.circuit_buffers() {
        let bytes = bytes?;
        let name = crate::codec::read::CircuitReader::new(bytes)?
            .name()?
            .to_string();
        module.insert_packed_named(name, bytes.to_vec());
    }
    Ok(module)
}

/// Materializes an owned [`Circuit`] from a serialized buffer.
pub fn decode_circuit(buffer: &[u8]) -> Result<Circuit, DecodeError> {
    let body = check_header(buffer, &CIRCUIT_MAGIC)?;
    let mut circuit = Circuit::new("");

    for field in FieldIter::new(body) {
        let (tag, payload) = field?;
        match tag {
            tags::circuit::NAME => {
                circuit.name = std::str::from_utf8(payload)?.to_string();
            }
            tags::circuit::ANNOTATIONS => {
                circuit.annotations = std::str::from_utf8(payload)?.to_string();
            }
            tags::circuit::INPUT_IDS => {
                circuit.inputs = read_u64_array(payload)?.into_iter().map(NodeId).collect();
            }
            tags::circuit::OUTPUT_IDS => {
                circuit.outputs = read_u64_array(payload)?.into_iter().map(NodeId).collect();
            }
            tags::circuit::INPUT_TYPE => {
                circuit.input_types.push(decode_data_type(payload)?);
            }
            tags::circuit::OUTPUT_TYPE => {
                circuit.output_types.push(decode_data_type(payload)?);
            }
            tags::circuit::NODE => {
                circuit.nodes.push(decode_node(payload)?);
            }
            _ => {} // unknown field from a newer writer
        }
    }
    Ok(circuit)
}

pub(crate) fn decode_node(record: &[u8]) -> Result<Node, DecodeError> {
    let mut id = None;
    let mut operation = None;
    let mut node = Node::new(NodeId(0), Operation::Input);

    for field in FieldIter::new(record) {
        let (tag, payload) = field?;
        match tag {
            tags::node::ID => {
                id = Some(NodeId(ByteReader::new(payload).u64()?));
            }
            tags::node::OPERATION => {
                let value = ByteReader::new(payload).u8()?;
                operation = Some(Operation::from_discriminant(value).ok_or(
                    DecodeError::UnknownDiscriminant {
                        what: "operation",
                        value: value as u64,
                    },
                )?);
            }
            tags::node::INPUT_IDS => {
                node.inputs = read_u64_array(payload)?.into_iter().map(NodeId).collect();
            }
            tags::node::INPUT_OFFSETS => {
                node.input_offsets = Some(read_u32_array(payload)?.into_iter().collect());
            }
            tags::node::NUM_OUTPUTS => {
                node.num_outputs = ByteReader::new(payload).u32()?;
            }
            tags::node::INPUT_TYPE => {
                node.input_types.push(decode_data_type(payload)?);
            }
            tags::node::OUTPUT_TYPE => {
                node.output_types.push(decode_data_type(payload)?);
            }
            tags::node::CUSTOM_OP_NAME => {
                node.custom_op_name = Some(std::str::from_utf8(payload)?.to_string());
            }
            tags::node::CALLEE => {
                node.callee = Some(std::str::from_utf8(payload)?.to_string());
            }
            tags::node::PAYLOAD => {
                node.payload = Some(decode_payload(payload)?);
            }
            tags::node::ANNOTATIONS => {
                node.annotations = std::str::from_utf8(payload)?.to_string();
            }
            _ => {}
        }
    }

    node.id = id.ok_or(DecodeError::MissingField {
        record: "node",
        field: "id",
    })?;
    node.operation = operation.ok_or(DecodeError::MissingField {
        record: "node",
        field: "operation",
    })?;
    Ok(node)
}

pub(crate) fn decode_data_type(record: &[u8]) -> Result<DataType, DecodeError> {
    let mut primitive = None;
    let mut security = SecurityLevel::Secure;
    let mut shape = Vec::new();
    let mut annotations = String::new();

    for field in FieldIter::new(record) {
        let (tag, payload) = field?;
        match tag {
            tags::datatype::PRIMITIVE => {
                let value = ByteReader::new(payload).u8()?;
                primitive = Some(PrimitiveType::from_discriminant(value).ok_or(
                    DecodeError::UnknownDiscriminant {
                        what: "primitive type",
                        value: value as u64,
                    },
                )?);
            }
            tags::datatype::SECURITY => {
                let value = ByteReader::new(payload).u8()?;
                security = SecurityLevel::from_discriminant(value).ok_or(
                    DecodeError::UnknownDiscriminant {
                        what: "security level",
                        value: value as u64,
                    },
                )?;
            }
            tags::datatype::SHAPE => {
                shape = read_i64_array(payload)?;
            }
            tags::datatype::ANNOTATIONS => {
                annotations = std::str::from_utf8(payload)?.to_string();
            }
            _ => {}
        }
    }

    let primitive = primitive.ok_or(DecodeError::MissingField {
        record: "datatype",
        field: "primitive",
    })?;
    Ok(DataType {
        primitive,
        security,
        shape,
        annotations,
    })
}

pub(crate) fn decode_payload(record: &[u8]) -> Result<ConstantPayload, DecodeError> {
    let kind = match FieldIter::find(record, tags::payload::KIND)? {
        Some(payload) => ByteReader::new(payload).u8()?,
        None => {
            return Err(DecodeError::MissingField {
                record: "payload",
                field: "kind",
            })
        }
    };
    let primitive = match FieldIter::find(record, tags::payload::PRIMITIVE)? {
        Some(payload) => {
            let value = ByteReader::new(payload).u8()?;
            Some(PrimitiveType::from_discriminant(value).ok_or(
                DecodeError::UnknownDiscriminant {
                    what: "payload primitive",
                    value: value as u64,
                },
            )?)
        }
        None => None,
    };

    match kind {
        tags::payload_kind::SCALAR => {
            let primitive = primitive.ok_or(DecodeError::MissingField {
                record: "payload",
                field: "primitive",
            })?;
            let data = FieldIter::find(record, tags::payload::DATA)?.ok_or(
                DecodeError::MissingField {
                    record: "payload",
                    field: "data",
                },
            )?;
            Ok(ConstantPayload::Scalar(decode_scalar(primitive, data)?))
        }
        tags::payload_kind::VECTOR => {
            let primitive = primitive.ok_or(DecodeError::MissingField {
                record: "payload",
                field: "primitive",
            })?;
            let data = FieldIter::find(record, tags::payload::DATA)?.ok_or(
                DecodeError::MissingField {
                    record: "payload",
                    field: "data",
                },
            )?;
            Ok(ConstantPayload::Vector(decode_vector(primitive, data)?))
        }
        tags::payload_kind::MATRIX => {
            let mut rows = Vec::new();
            if let Some(primitive) = primitive {
                for field in FieldIter::new(record) {
                    let (tag, payload) = field?;
                    if tag == tags::payload::DATA {
                        rows.push(decode_vector(primitive, payload)?);
                    }
                }
            }
            Ok(ConstantPayload::Matrix(MatrixValue { rows }))
        }
        tags::payload_kind::BLOB => {
            let data = FieldIter::find(record, tags::payload::DATA)?.unwrap_or(&[]);
            Ok(ConstantPayload::Blob(data.to_vec()))
        }
        other => Err(DecodeError::UnknownDiscriminant {
            what: "payload kind",
            value: other as u64,
        }),
    }
}

fn decode_scalar(primitive: PrimitiveType, data: &[u8]) -> Result<ScalarValue, DecodeError> {
    let mut r = ByteReader::new(data);
    Ok(match primitive {
        PrimitiveType::Bool => ScalarValue::Bool(r.u8()? != 0),
        PrimitiveType::Int8 => ScalarValue::Int8(r.u8()? as i8),
        PrimitiveType::Int16 => ScalarValue::Int16(r.u16()? as i16),
        PrimitiveType::Int32 => ScalarValue::Int32(r.u32()? as i32),
        PrimitiveType::Int64 => ScalarValue::Int64(r.i64()?),
        PrimitiveType::UInt8 => ScalarValue::UInt8(r.u8()?),
        PrimitiveType::UInt16 => ScalarValue::UInt16(r.u16()?),
        PrimitiveType::UInt32 => ScalarValue::UInt32(r.u32()?),
        PrimitiveType::UInt64 => ScalarValue::UInt64(r.u64()?),
        PrimitiveType::Float => ScalarValue::Float(r.f32()?),
        PrimitiveType::Double => ScalarValue::Double(r.f64()?),
    })
}

fn decode_vector(primitive: PrimitiveType, data: &[u8]) -> Result<VectorValue, DecodeError> {
    let mut r = ByteReader::new(data);
    let count = r.u32()? as usize;

    macro_rules! read_elems {
        ($variant:ident, $read:ident $(, $cast:ty)?) => {{
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(r.$read()? $(as $cast)?);
            }
            VectorValue::$variant(v)
        }};
    }

    Ok(match primitive {
        PrimitiveType::Bool => {
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(r.u8()? != 0);
            }
            VectorValue::Bool(v)
        }
        PrimitiveType::Int8 => read_elems!(Int8, u8, i8),
        PrimitiveType::Int16 => read_elems!(Int16, u16, i16),
        PrimitiveType::Int32 => read_elems!(Int32, u32, i32),
        PrimitiveType::Int64 => read_elems!(Int64, i64),
        PrimitiveType::UInt8 => read_elems!(UInt8, u8),
        PrimitiveType::UInt16 => read_elems!(UInt16, u16),
        PrimitiveType::UInt32 => read_elems!(UInt32, u32),
        PrimitiveType::UInt64 => read_elems!(UInt64, u64),
        PrimitiveType::Float => read_elems!(Float, f32),
        PrimitiveType::Double => read_elems!(Double, f64),
    })
}
