//! Append-only builders emitting the serialized form.
//!
//! A [`CircuitBuilder`] accumulates a data-type table (by index;
//! deduplication is the caller's concern), nodes in insertion order, and the
//! I/O manifests, then serializes everything in one shot. A
//! [`ModuleBuilder`] owns nested circuit builders and/or already-serialized
//! circuit buffers.
//!
//! Identifier discipline: every node constructor has two forms, one that
//! allocates the next free identifier and returns it, and one that accepts a
//! caller-provided identifier. Generated ids come from a monotonic counter
//! that skips over externally claimed ids; the claimed set is kept sorted so
//! contiguous runs of custom ids are skipped cheaply. Every id below the
//! counter is assigned to exactly one node.
//!
//! Builders are single-shot: `finish` consumes the builder, so further
//! mutation after serialization is impossible by construction.

use std::collections::BTreeSet;
use std::path::Path;

use indexmap::IndexMap;

use crate::circuit::Circuit;
use crate::codec::encode::{encode_circuit, encode_module};
use crate::codec::read::CircuitReader;
use crate::error::IrError;
use crate::id::NodeId;
use crate::module::Module;
use crate::node::Node;
use crate::ops::Operation;
use crate::payload::ConstantPayload;
use crate::types::{DataType, PrimitiveType};

/// Index into a circuit builder's data-type table.
pub type TypeIndex = usize;

/// Append-only constructor for one circuit.
#[derive(Debug)]
pub struct CircuitBuilder {
    name: String,
    annotations: String,
    data_types: Vec<DataType>,
    nodes: Vec<Node>,
    inputs: Vec<NodeId>,
    input_types: Vec<TypeIndex>,
    outputs: Vec<NodeId>,
    output_types: Vec<TypeIndex>,
    /// Externally supplied ids, kept sorted.
    custom_ids: BTreeSet<u64>,
    /// Every id below this is assigned to exactly one node.
    next_id: u64,
}

impl CircuitBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        CircuitBuilder {
            name: name.into(),
            annotations: String::new(),
            data_types: Vec::new(),
            nodes: Vec::new(),
            inputs: Vec::new(),
            input_types: Vec::new(),
            outputs: Vec::new(),
            output_types: Vec::new(),
            custom_ids: BTreeSet::new(),
            next_id: 0,
        }
    }

    pub fn with_annotations(name: impl Into<String>, annotations: impl Into<String>) -> Self {
        let mut builder = CircuitBuilder::new(name);
        builder.annotations = annotations.into();
        builder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends to the circuit annotation string.
    pub fn add_annotations(&mut self, annotations: &str) {
        if self.annotations.is_empty() {
            self.annotations = annotations.to_string();
        } else {
            self.annotations.push_str(", ");
            self.annotations.push_str(annotations);
        }
    }

    /// Registers a data type, returning its table index. No deduplication.
    pub fn add_data_type(&mut self, data_type: DataType) -> TypeIndex {
        self.data_types.push(data_type);
        self.data_types.len() - 1
    }

    fn resolve_type(&self, index: TypeIndex) -> Result<DataType, IrError> {
        self.data_types
            .get(index)
            .cloned()
            .ok_or_else(|| IrError::TypeMismatch {
                reason: format!("type index {index} out of range"),
            })
    }

    fn alloc_id(&mut self) -> NodeId {
        // One ordered range scan jumps past a contiguous run of claimed
        // ids: O(log n) to position plus one step per run member, instead
        // of a membership probe per candidate.
        let mut candidate = self.next_id;
        for &claimed in self.custom_ids.range(self.next_id..) {
            if claimed != candidate {
                break;
            }
            candidate += 1;
        }
        self.next_id = candidate + 1;
        NodeId(candidate)
    }

    fn claim_id(&mut self, id: NodeId) -> Result<(), IrError> {
        if id.0 < self.next_id || self.custom_ids.contains(&id.0) {
            return Err(IrError::DuplicateIdentifier { id });
        }
        self.custom_ids.insert(id.0);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Fully general node constructor
    // -------------------------------------------------------------------

    /// Adds a node with every field spelled out, allocating the next free
    /// id and returning it.
    #[allow(clippy::too_many_arguments)]
    pub fn add_node_full(
        &mut self,
        input_types: &[TypeIndex],
        input_ids: &[NodeId],
        input_offsets: &[u32],
        operation: Operation,
        custom_op_name: Option<&str>,
        callee: Option<&str>,
        payload: Option<ConstantPayload>,
        num_outputs: u32,
        output_types: &[TypeIndex],
        annotations: &str,
    ) -> Result<NodeId, IrError> {
        let id = self.alloc_id();
        self.push_node(
            id,
            input_types,
            input_ids,
            input_offsets,
            operation,
            custom_op_name,
            callee,
            payload,
            num_outputs,
            output_types,
            annotations,
        )?;
        Ok(id)
    }

    /// Adds a node under a caller-provided id.
    ///
    /// Fails with [`IrError::DuplicateIdentifier`] when the id is already
    /// assigned, generated or custom.
    #[allow(clippy::too_many_arguments)]
    pub fn add_node_full_with_id(
        &mut self,
        id: NodeId,
        input_types: &[TypeIndex],
        input_ids: &[NodeId],
        input_offsets: &[u32],
        operation: Operation,
        custom_op_name: Option<&str>,
        callee: Option<&str>,
        payload: Option<ConstantPayload>,
        num_outputs: u32,
        output_types: &[TypeIndex],
        annotations: &str,
    ) -> Result<(), IrError> {
        self.claim_id(id)?;
        self.push_node(
            id,
            input_types,
            input_ids,
            input_offsets,
            operation,
            custom_op_name,
            callee,
            payload,
            num_outputs,
            output_types,
            annotations,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn push_node(
        &mut self,
        id: NodeId,
        input_types: &[TypeIndex],
        input_ids: &[NodeId],
        input_offsets: &[u32],
        operation: Operation,
        custom_op_name: Option<&str>,
        callee: Option<&str>,
        payload: Option<ConstantPayload>,
        num_outputs: u32,
        output_types: &[TypeIndex],
        annotations: &str,
    ) -> Result<(), IrError> {
        let mut node = Node::new(id, operation);
        node.inputs = input_ids.iter().copied().collect();
        if !input_offsets.is_empty() {
            node.input_offsets = Some(input_offsets.iter().copied().collect());
        }
        node.num_outputs = num_outputs;
        for &index in input_types {
            node.input_types.push(self.resolve_type(index)?);
        }
        for &index in output_types {
            node.output_types.push(self.resolve_type(index)?);
        }
        node.custom_op_name = custom_op_name.map(str::to_string);
        node.callee = callee.map(str::to_string);
        node.payload = payload;
        node.annotations = annotations.to_string();
        self.nodes.push(node);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Inputs and outputs
    // -------------------------------------------------------------------

    /// Adds an Input node of the given type to the circuit manifest.
    pub fn add_input(&mut self, input_type: TypeIndex) -> NodeId {
        self.add_input_annotated(input_type, "")
    }

    pub fn add_input_annotated(&mut self, input_type: TypeIndex, annotations: &str) -> NodeId {
        let id = self
            .add_node_full(
                &[],
                &[],
                &[],
                Operation::Input,
                None,
                None,
                None,
                1,
                &[input_type],
                annotations,
            )
            .expect("input type index in range");
        self.inputs.push(id);
        self.input_types.push(input_type);
        id
    }

    /// Adds an Input node under a caller-provided id.
    pub fn add_input_with_id(&mut self, id: NodeId, input_type: TypeIndex) -> Result<(), IrError> {
        self.add_node_full_with_id(
            id,
            &[],
            &[],
            &[],
            Operation::Input,
            None,
            None,
            None,
            1,
            &[input_type],
            "",
        )?;
        self.inputs.push(id);
        self.input_types.push(input_type);
        Ok(())
    }

    /// Adds an Output node reading the given producers.
    pub fn add_output(
        &mut self,
        output_type: TypeIndex,
        input_ids: &[NodeId],
        input_offsets: &[u32],
    ) -> NodeId {
        let id = self
            .add_node_full(
                &[],
                input_ids,
                input_offsets,
                Operation::Output,
                None,
                None,
                None,
                1,
                &[output_type],
                "",
            )
            .expect("output type index in range");
        self.outputs.push(id);
        self.output_types.push(output_type);
        id
    }

    /// Adds an Output node under a caller-provided id.
    pub fn add_output_with_id(
        &mut self,
        id: NodeId,
        output_type: TypeIndex,
        input_ids: &[NodeId],
        input_offsets: &[u32],
    ) -> Result<(), IrError> {
        self.add_node_full_with_id(
            id,
            &[],
            input_ids,
            input_offsets,
            Operation::Output,
            None,
            None,
            None,
            1,
            &[output_type],
            "",
        )?;
        self.outputs.push(id);
        self.output_types.push(output_type);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Constants
    // -------------------------------------------------------------------

    /// Adds a Constant node, registering a plaintext scalar type matching
    /// the payload. Works for every primitive scalar via `Into`.
    pub fn add_constant(&mut self, payload: impl Into<ConstantPayload>) -> NodeId {
        let payload = payload.into();
        let primitive = payload.primitive().unwrap_or(PrimitiveType::UInt8);
        let ty = self.add_data_type(DataType::plaintext(primitive));
        self.add_node_full(
            &[],
            &[],
            &[],
            Operation::Constant,
            None,
            None,
            Some(payload),
            1,
            &[ty],
            "",
        )
        .expect("constant node has no fallible fields")
    }

    /// Adds a Constant node under a caller-provided id.
    pub fn add_constant_with_id(
        &mut self,
        id: NodeId,
        payload: impl Into<ConstantPayload>,
    ) -> Result<(), IrError> {
        let payload = payload.into();
        let primitive = payload.primitive().unwrap_or(PrimitiveType::UInt8);
        let ty = self.add_data_type(DataType::plaintext(primitive));
        self.add_node_full_with_id(
            id,
            &[],
            &[],
            &[],
            Operation::Constant,
            None,
            None,
            Some(payload),
            1,
            &[ty],
            "",
        )
    }

    /// Adds a Constant node with an explicit declared output type. The
    /// payload must decode under it.
    pub fn add_constant_with_type(
        &mut self,
        output_type: TypeIndex,
        payload: impl Into<ConstantPayload>,
    ) -> Result<NodeId, IrError> {
        let payload = payload.into();
        payload.check_type(&self.resolve_type(output_type)?)?;
        self.add_node_full(
            &[],
            &[],
            &[],
            Operation::Constant,
            None,
            None,
            Some(payload),
            1,
            &[output_type],
            "",
        )
    }

    // -------------------------------------------------------------------
    // Regular gates
    // -------------------------------------------------------------------

    /// Adds a plain node: operation, producers, optional offsets.
    pub fn add_node(
        &mut self,
        operation: Operation,
        input_ids: &[NodeId],
        input_offsets: &[u32],
    ) -> NodeId {
        self.add_node_full(
            &[],
            input_ids,
            input_offsets,
            operation,
            None,
            None,
            None,
            1,
            &[],
            "",
        )
        .expect("plain node has no fallible fields")
    }

    /// Adds a plain node under a caller-provided id.
    pub fn add_node_with_id(
        &mut self,
        id: NodeId,
        operation: Operation,
        input_ids: &[NodeId],
        input_offsets: &[u32],
    ) -> Result<(), IrError> {
        self.add_node_full_with_id(
            id,
            &[],
            input_ids,
            input_offsets,
            operation,
            None,
            None,
            None,
            1,
            &[],
            "",
        )
    }

    /// Adds a plain node with an explicit output count.
    pub fn add_node_with_num_outputs(
        &mut self,
        operation: Operation,
        input_ids: &[NodeId],
        input_offsets: &[u32],
        num_outputs: u32,
    ) -> NodeId {
        self.add_node_full(
            &[],
            input_ids,
            input_offsets,
            operation,
            None,
            None,
            None,
            num_outputs,
            &[],
            "",
        )
        .expect("plain node has no fallible fields")
    }

    // -------------------------------------------------------------------
    // Split / Merge / SelectOffset
    // -------------------------------------------------------------------

    /// Adds a Split node decomposing a word into boolean wires. The output
    /// count is the bit width of the input primitive; a 1-bit split has
    /// exactly one output.
    ///
    /// Fails with [`IrError::TypeMismatch`] for aggregate-shaped inputs,
    /// whose width is not defined.
    pub fn add_split(
        &mut self,
        input_type: TypeIndex,
        input_id: NodeId,
    ) -> Result<NodeId, IrError> {
        let ty = self.resolve_type(input_type)?;
        if ty.is_aggregate() {
            return Err(IrError::TypeMismatch {
                reason: format!(
                    "cannot split aggregate type {} of shape {:?}",
                    ty.primitive.name(),
                    ty.shape
                ),
            });
        }
        let bool_ty = self.add_data_type(DataType {
            primitive: PrimitiveType::Bool,
            security: ty.security,
            shape: Vec::new(),
            annotations: String::new(),
        });
        self.add_node_full(
            &[input_type],
            &[input_id],
            &[],
            Operation::Split,
            None,
            None,
            None,
            ty.primitive.bit_width(),
            &[bool_ty],
            "",
        )
    }

    /// Adds a Merge node packing boolean wires into a word; input i becomes
    /// bit i.
    pub fn add_merge(
        &mut self,
        output_type: TypeIndex,
        input_ids: &[NodeId],
        input_offsets: &[u32],
    ) -> Result<NodeId, IrError> {
        self.add_node_full(
            &[],
            input_ids,
            input_offsets,
            Operation::Merge,
            None,
            None,
            None,
            1,
            &[output_type],
            "",
        )
    }

    /// Adds a SelectOffset node picking one output of a multi-output
    /// producer.
    pub fn add_select_offset(&mut self, input_id: NodeId, input_offset: u32) -> NodeId {
        self.add_node_full(
            &[],
            &[input_id],
            &[input_offset],
            Operation::SelectOffset,
            None,
            None,
            None,
            1,
            &[],
            "",
        )
        .expect("select-offset node has no fallible fields")
    }

    // -------------------------------------------------------------------
    // Custom operations and subcircuit calls
    // -------------------------------------------------------------------

    /// Adds a node with a custom operation.
    pub fn add_custom(
        &mut self,
        custom_op_name: &str,
        input_types: &[TypeIndex],
        input_ids: &[NodeId],
        output_types: &[TypeIndex],
    ) -> Result<NodeId, IrError> {
        self.add_node_full(
            input_types,
            input_ids,
            &[],
            Operation::Custom,
            Some(custom_op_name),
            None,
            None,
            output_types.len().max(1) as u32,
            output_types,
            "",
        )
    }

    /// Adds a call to a named subcircuit of the enclosing module.
    pub fn add_call(
        &mut self,
        callee: &str,
        input_ids: &[NodeId],
        input_offsets: &[u32],
        num_outputs: u32,
    ) -> NodeId {
        self.add_node_full(
            &[],
            input_ids,
            input_offsets,
            Operation::CallSubcircuit,
            None,
            Some(callee),
            None,
            num_outputs,
            &[],
            "",
        )
        .expect("call node has no fallible fields")
    }

    /// Adds a call node under a caller-provided id.
    pub fn add_call_with_id(
        &mut self,
        id: NodeId,
        callee: &str,
        input_ids: &[NodeId],
        input_offsets: &[u32],
        num_outputs: u32,
    ) -> Result<(), IrError> {
        self.add_node_full_with_id(
            id,
            &[],
            input_ids,
            input_offsets,
            Operation::CallSubcircuit,
            None,
            Some(callee),
            None,
            num_outputs,
            &[],
            "",
        )
    }

    // -------------------------------------------------------------------
    // Finish
    // -------------------------------------------------------------------

    /// Builds the owned circuit. Used by `finish` and by module assembly.
    fn into_circuit(self) -> Result<Circuit, IrError> {
        let mut circuit = Circuit::new(self.name.clone());
        circuit.annotations = self.annotations.clone();
        circuit.inputs = self.inputs.clone();
        circuit.outputs = self.outputs.clone();
        for &index in &self.input_types {
            let ty = self
                .data_types
                .get(index)
                .cloned()
                .ok_or_else(|| IrError::TypeMismatch {
                    reason: format!("type index {index} out of range"),
                })?;
            circuit.input_types.push(ty);
        }
        for &index in &self.output_types {
            let ty = self
                .data_types
                .get(index)
                .cloned()
                .ok_or_else(|| IrError::TypeMismatch {
                    reason: format!("type index {index} out of range"),
                })?;
            circuit.output_types.push(ty);
        }
        circuit.nodes = self.nodes;
        Ok(circuit)
    }

    /// Serializes the accumulated circuit. Consumes the builder: after
    /// `finish` no further mutation is possible.
    pub fn finish(self) -> Result<Vec<u8>, IrError> {
        Ok(encode_circuit(&self.into_circuit()?))
    }

    /// Serializes and writes the circuit to a file.
    pub fn finish_and_write_to_file(self, path: impl AsRef<Path>) -> Result<(), IrError> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Append-only constructor for one module.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    entry: String,
    annotations: String,
    builders: IndexMap<String, CircuitBuilder>,
    serialized: Vec<Vec<u8>>,
}

impl ModuleBuilder {
    pub fn new() -> Self {
        ModuleBuilder {
            entry: "main".to_string(),
            annotations: String::new(),
            builders: IndexMap::new(),
            serialized: Vec::new(),
        }
    }

    /// Adds a fresh circuit builder under `name` and returns it. Returns
    /// the existing builder when the name is already present.
    pub fn add_circuit(&mut self, name: &str) -> &mut CircuitBuilder {
        self.builders
            .entry(name.to_string())
            .or_insert_with(|| CircuitBuilder::new(name))
    }

    /// The builder registered under `name`, if any.
    pub fn circuit(&mut self, name: &str) -> Option<&mut CircuitBuilder> {
        self.builders.get_mut(name)
    }

    /// The builder of the entry circuit, created on demand.
    pub fn main_circuit(&mut self) -> &mut CircuitBuilder {
        let entry = self.entry.clone();
        self.add_circuit(&entry)
    }

    /// Attaches an already-serialized circuit buffer. The bytes are copied
    /// into the module and checked to open like a circuit buffer.
    pub fn add_serialized_circuit(&mut self, bytes: &[u8]) -> Result<(), IrError> {
        CircuitReader::new(bytes)?;
        self.serialized.push(bytes.to_vec());
        Ok(())
    }

    pub fn contains_circuit(&self, name: &str) -> bool {
        if self.builders.contains_key(name) {
            return true;
        }
        self.serialized.iter().any(|bytes| {
            CircuitReader::new(bytes)
                .and_then(|r| r.name())
                .map(|n| n == name)
                .unwrap_or(false)
        })
    }

    /// Designates the entry circuit.
    pub fn set_entry(&mut self, name: &str) {
        self.entry = name.to_string();
    }

    /// Appends to the module annotation string.
    pub fn add_annotations(&mut self, annotations: &str) {
        if self.annotations.is_empty() {
            self.annotations = annotations.to_string();
        } else {
            self.annotations.push_str(", ");
            self.annotations.push_str(annotations);
        }
    }

    /// Serializes the module. Consumes the builder.
    ///
    /// Validation happens here: the entry must resolve, every subcircuit
    /// call must target a member circuit, and the call graph must be
    /// acyclic.
    pub fn finish(self) -> Result<Vec<u8>, IrError> {
        let mut module = Module::new(self.entry);
        module.annotations = self.annotations;
        for (_, builder) in self.builders {
            module.insert_circuit(builder.into_circuit()?);
        }
        for bytes in self.serialized {
            module.insert_packed_circuit(bytes)?;
        }
        module.validate()?;
        Ok(encode_module(&module))
    }

    /// Serializes and writes the module to a file.
    pub fn finish_and_write_to_file(self, path: impl AsRef<Path>) -> Result<(), IrError> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
