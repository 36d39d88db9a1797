//! Object tree → serialized buffer.

use mpcir_wire::{tags, write_header, FieldWriter, CIRCUIT_MAGIC, MODULE_MAGIC};

use crate::circuit::Circuit;
use crate::module::Module;
use crate::node::Node;
use crate::payload::{ConstantPayload, ScalarValue, VectorValue};
use crate::types::DataType;

/// Serializes a circuit into a standalone buffer.
pub fn encode_circuit(circuit: &Circuit) -> Vec<u8> {
    let mut out = Vec::with_capacity(256 + circuit.nodes.len() * 64);
    write_header(&mut out, &CIRCUIT_MAGIC);

    let mut w = FieldWriter::new();
    w.field_str(tags::circuit::NAME, &circuit.name);
    w.field_str(tags::circuit::ANNOTATIONS, &circuit.annotations);
    w.field_u64_array(
        tags::circuit::INPUT_IDS,
        &circuit.inputs.iter().map(|id| id.0).collect::<Vec<_>>(),
    );
    w.field_u64_array(
        tags::circuit::OUTPUT_IDS,
        &circuit.outputs.iter().map(|id| id.0).collect::<Vec<_>>(),
    );
    for ty in &circuit.input_types {
        w.field_bytes_always(tags::circuit::INPUT_TYPE, &encode_data_type(ty));
    }
    for ty in &circuit.output_types {
        w.field_bytes_always(tags::circuit::OUTPUT_TYPE, &encode_data_type(ty));
    }
    for node in &circuit.nodes {
        w.field_bytes_always(tags::circuit::NODE, &encode_node(node));
    }

    out.extend_from_slice(&w.into_bytes());
    out
}

/// Serializes a module into a standalone buffer.
///
/// Member circuits still held as packed bytes are copied through verbatim;
/// unpacked circuits are serialized first. Circuits appear in the module's
/// insertion order.
pub fn encode_module(module: &Module) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    write_header(&mut out, &MODULE_MAGIC);

    let mut w = FieldWriter::new();
    w.field_str(tags::module::ENTRY, &module.entry);
    w.field_str(tags::module::ANNOTATIONS, &module.annotations);
    for name in module.circuit_names() {
        let bytes = module
            .circuit_bytes(&name)
            .expect("name enumerated from the module");
        w.field_bytes_always(tags::module::CIRCUIT, &bytes);
    }

    out.extend_from_slice(&w.into_bytes());
    out
}

pub(crate) fn encode_node(node: &Node) -> Vec<u8> {
    let mut w = FieldWriter::new();
    w.field_u64(tags::node::ID, node.id.0);
    w.field_u8(tags::node::OPERATION, node.operation.discriminant());
    w.field_u64_array(
        tags::node::INPUT_IDS,
        &node.inputs.iter().map(|id| id.0).collect::<Vec<_>>(),
    );
    if let Some(offsets) = node.input_offsets.as_ref() {
        w.field_u32_array(tags::node::INPUT_OFFSETS, offsets);
    }
    w.field_u32(tags::node::NUM_OUTPUTS, node.num_outputs);
    for ty in &node.input_types {
        w.field_bytes_always(tags::node::INPUT_TYPE, &encode_data_type(ty));
    }
    for ty in &node.output_types {
        w.field_bytes_always(tags::node::OUTPUT_TYPE, &encode_data_type(ty));
    }
    if let Some(name) = node.custom_op_name.as_deref() {
        w.field_str(tags::node::CUSTOM_OP_NAME, name);
    }
    if let Some(callee) = node.callee.as_deref() {
        w.field_str(tags::node::CALLEE, callee);
    }
    if let Some(payload) = node.payload.as_ref() {
        w.field_bytes_always(tags::node::PAYLOAD, &encode_payload(payload));
    }
    w.field_str(tags::node::ANNOTATIONS, &node.annotations);
    w.into_bytes()
}

pub(crate) fn encode_data_type(ty: &DataType) -> Vec<u8> {
    let mut w = FieldWriter::new();
    w.field_u8(tags::datatype::PRIMITIVE, ty.primitive.discriminant());
    w.field_u8(tags::datatype::SECURITY, ty.security.discriminant());
    w.field_i64_array(tags::datatype::SHAPE, &ty.shape);
    w.field_str(tags::datatype::ANNOTATIONS, &ty.annotations);
    w.into_bytes()
}

pub(crate) fn encode_payload(payload: &ConstantPayload) -> Vec<u8> {
    let mut w = FieldWriter::new();
    match payload {
        ConstantPayload::Scalar(scalar) => {
            w.field_u8(tags::payload::KIND, tags::payload_kind::SCALAR);
            w.field_u8(tags::payload::PRIMITIVE, scalar.primitive().discriminant());
            w.field_bytes_always(tags::payload::DATA, &encode_scalar(scalar));
        }
        ConstantPayload::Vector(vector) => {
            w.field_u8(tags::payload::KIND, tags::payload_kind::VECTOR);
            w.field_u8(tags::payload::PRIMITIVE, vector.primitive().discriminant());
            w.field_bytes_always(tags::payload::DATA, &encode_vector(vector));
        }
        ConstantPayload::Matrix(matrix) => {
            w.field_u8(tags::payload::KIND, tags::payload_kind::MATRIX);
            if let Some(primitive) = matrix.primitive() {
                w.field_u8(tags::payload::PRIMITIVE, primitive.discriminant());
            }
            w.field_u32(tags::payload::ROWS, matrix.rows.len() as u32);
            for row in &matrix.rows {
                w.field_bytes_always(tags::payload::DATA, &encode_vector(row));
            }
        }
        ConstantPayload::Blob(bytes) => {
            w.field_u8(tags::payload::KIND, tags::payload_kind::BLOB);
            w.field_bytes_always(tags::payload::DATA, bytes);
        }
    }
    w.into_bytes()
}

fn encode_scalar(scalar: &ScalarValue) -> Vec<u8> {
    match scalar {
        ScalarValue::Bool(v) => vec![*v as u8],
        ScalarValue::Int8(v) => v.to_le_bytes().to_vec(),
        ScalarValue::Int16(v) => v.to_le_bytes().to_vec(),
        ScalarValue::Int32(v) => v.to_le_bytes().to_vec(),
        ScalarValue::Int64(v) => v.to_le_bytes().to_vec(),
        ScalarValue::UInt8(v) => v.to_le_bytes().to_vec(),
        ScalarValue::UInt16(v) => v.to_le_bytes().to_vec(),
        ScalarValue::UInt32(v) => v.to_le_bytes().to_vec(),
        ScalarValue::UInt64(v) => v.to_le_bytes().to_vec(),
        ScalarValue::Float(v) => v.to_le_bytes().to_vec(),
        ScalarValue::Double(v) => v.to_le_bytes().to_vec(),
    }
}

fn encode_vector(vector: &VectorValue) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(vector.len() as u32).to_le_bytes());
    match vector {
        VectorValue::Bool(v) => out.extend(v.iter().map(|&b| b as u8)),
        VectorValue::Int8(v) => {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        VectorValue::Int16(v) => {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        VectorValue::Int32(v) => {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        VectorValue::Int64(v) => {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        VectorValue::UInt8(v) => out.extend_from_slice(v),
        VectorValue::UInt16(v) => {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        VectorValue::UInt32(v) => {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        VectorValue::UInt64(v) => {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        VectorValue::Float(v) => {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
        VectorValue::Double(v) => {
            for x in v {
                out.extend_from_slice(&x.to_le_bytes());
            }
        }
    }
    out
}
