//! The hypergraph vertex.
//!
//! A [`Node`] is one operation instance. Its inputs are references to other
//! nodes of the same circuit by [`NodeId`], each optionally refined by an
//! output offset selecting one output of a multi-output producer. When the
//! offset list is absent every input is taken at offset 0.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::annotation;
use crate::error::IrError;
use crate::id::NodeId;
use crate::ops::Operation;
use crate::payload::{ConstantPayload, ScalarValue};
use crate::types::DataType;

/// One operation instance in a circuit (owned object form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Stable identifier, unique within the circuit, never reused.
    pub id: NodeId,
    pub operation: Operation,
    /// Ordered producer references.
    pub inputs: SmallVec<[NodeId; 2]>,
    /// Parallel output offsets on the producers. `None` means every input
    /// is taken at offset 0; when present, the length equals `inputs.len()`.
    pub input_offsets: Option<SmallVec<[u32; 2]>>,
    pub num_outputs: u32,
    pub input_types: Vec<DataType>,
    pub output_types: Vec<DataType>,
    /// Set iff `operation == Custom`.
    pub custom_op_name: Option<String>,
    /// Callee circuit name; set iff `operation == CallSubcircuit`.
    pub callee: Option<String>,
    /// Set iff `operation == Constant`.
    pub payload: Option<ConstantPayload>,
    pub annotations: String,
}

impl Node {
    /// Creates a node with no inputs and one output.
    pub fn new(id: NodeId, operation: Operation) -> Self {
        Node {
            id,
            operation,
            inputs: SmallVec::new(),
            input_offsets: None,
            num_outputs: 1,
            input_types: Vec::new(),
            output_types: Vec::new(),
            custom_op_name: None,
            callee: None,
            payload: None,
            annotations: String::new(),
        }
    }

    // -------------------------------------------------------------------
    // Classification predicates
    // -------------------------------------------------------------------

    pub fn is_input(&self) -> bool {
        self.operation == Operation::Input
    }

    pub fn is_output(&self) -> bool {
        self.operation == Operation::Output
    }

    pub fn is_constant(&self) -> bool {
        self.operation == Operation::Constant
    }

    pub fn is_unary(&self) -> bool {
        self.operation.is_unary()
    }

    pub fn is_binary(&self) -> bool {
        self.operation.is_binary()
    }

    pub fn is_subcircuit_call(&self) -> bool {
        self.operation == Operation::CallSubcircuit
    }

    pub fn is_loop(&self) -> bool {
        self.operation == Operation::Loop
    }

    pub fn is_split(&self) -> bool {
        self.operation == Operation::Split
    }

    pub fn is_merge(&self) -> bool {
        self.operation == Operation::Merge
    }

    pub fn is_custom(&self) -> bool {
        self.operation == Operation::Custom
    }

    pub fn has_boolean_operator(&self) -> bool {
        self.operation.is_boolean()
    }

    pub fn has_arithmetic_operator(&self) -> bool {
        self.operation.is_arithmetic()
    }

    pub fn has_comparison_operator(&self) -> bool {
        self.operation.is_comparison()
    }

    // -------------------------------------------------------------------
    // Input access
    // -------------------------------------------------------------------

    /// `true` when an explicit offset list is present.
    pub fn uses_input_offsets(&self) -> bool {
        self.input_offsets.is_some()
    }

    /// Output offset taken on the producer of input `index` (0 when the
    /// offset list is absent).
    pub fn offset_at(&self, index: usize) -> u32 {
        self.input_offsets
            .as_ref()
            .and_then(|offs| offs.get(index).copied())
            .unwrap_or(0)
    }

    /// Iterates `(producer, offset)` pairs in input order.
    pub fn input_edges(&self) -> impl Iterator<Item = (NodeId, u32)> + '_ {
        self.inputs
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, self.offset_at(i)))
    }

    // -------------------------------------------------------------------
    // Constant access
    // -------------------------------------------------------------------

    /// Returns the constant payload, checked against the declared output
    /// type.
    ///
    /// Fails with [`IrError::TypeMismatch`] when the payload does not decode
    /// under the declared type, and with [`IrError::MissingValue`] when the
    /// node carries no payload.
    pub fn constant(&self) -> Result<&ConstantPayload, IrError> {
        let payload = self
            .payload
            .as_ref()
            .ok_or(IrError::MissingValue { id: self.id })?;
        if let Some(declared) = self.output_types.first() {
            payload.check_type(declared)?;
        }
        Ok(payload)
    }

    /// Typed scalar accessor for boolean constants.
    pub fn constant_bool(&self) -> Result<bool, IrError> {
        match self.constant()? {
            ConstantPayload::Scalar(ScalarValue::Bool(b)) => Ok(*b),
            other => Err(IrError::TypeMismatch {
                reason: format!("expected Bool scalar payload, found {other:?}"),
            }),
        }
    }

    /// Typed scalar accessor for 64-bit unsigned constants.
    pub fn constant_u64(&self) -> Result<u64, IrError> {
        match self.constant()? {
            ConstantPayload::Scalar(ScalarValue::UInt64(v)) => Ok(*v),
            other => Err(IrError::TypeMismatch {
                reason: format!("expected UInt64 scalar payload, found {other:?}"),
            }),
        }
    }

    // -------------------------------------------------------------------
    // Mutation (object form only)
    // -------------------------------------------------------------------

    /// Replaces one input edge `(prev, prev_offset)` by `(new, new_offset)`.
    ///
    /// When the node previously had no offset list and a nonzero offset is
    /// now needed, a zero-initialized list is materialized first. Every
    /// matching edge is rewritten.
    pub fn replace_input_by(
        &mut self,
        prev: NodeId,
        new: NodeId,
        prev_offset: u32,
        new_offset: u32,
    ) {
        let needs_offsets = self.input_offsets.is_some() || new_offset != 0;
        if needs_offsets && self.input_offsets.is_none() {
            self.input_offsets = Some(SmallVec::from_elem(0, self.inputs.len()));
        }
        for i in 0..self.inputs.len() {
            if self.inputs[i] == prev && self.offset_at(i) == prev_offset {
                self.inputs[i] = new;
                if let Some(offs) = self.input_offsets.as_mut() {
                    offs[i] = new_offset;
                }
            }
        }
    }

    pub fn set_operation(&mut self, operation: Operation) {
        self.operation = operation;
    }

    pub fn set_num_outputs(&mut self, num_outputs: u32) {
        self.num_outputs = num_outputs;
    }

    pub fn set_payload(&mut self, payload: ConstantPayload) {
        self.payload = Some(payload);
    }

    // -------------------------------------------------------------------
    // Annotations
    // -------------------------------------------------------------------

    /// Best-effort attribute lookup; `""` when absent.
    pub fn attribute(&self, key: &str) -> &str {
        annotation::attribute(&self.annotations, key)
    }

    /// Replaces or appends an annotation attribute.
    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.annotations = annotation::set_attribute(&self.annotations, key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveType;
    use smallvec::smallvec;

    fn gate(id: u64, op: Operation, inputs: &[u64]) -> Node {
        let mut n = Node::new(NodeId(id), op);
        n.inputs = inputs.iter().map(|&i| NodeId(i)).collect();
        n
    }

    #[test]
    fn predicates_follow_operation() {
        assert!(gate(0, Operation::Input, &[]).is_input());
        assert!(gate(0, Operation::Output, &[1]).is_output());
        assert!(gate(0, Operation::And, &[1, 2]).is_binary());
        assert!(gate(0, Operation::And, &[1, 2]).has_boolean_operator());
        assert!(gate(0, Operation::Add, &[1, 2]).has_arithmetic_operator());
        assert!(gate(0, Operation::Lt, &[1, 2]).has_comparison_operator());
        assert!(gate(0, Operation::Split, &[1]).is_split());
        assert!(gate(0, Operation::Merge, &[1, 2]).is_merge());
        assert!(gate(0, Operation::CallSubcircuit, &[1]).is_subcircuit_call());
    }

    #[test]
    fn absent_offset_list_reads_as_zeros() {
        let n = gate(3, Operation::And, &[1, 2]);
        assert!(!n.uses_input_offsets());
        assert_eq!(n.offset_at(0), 0);
        assert_eq!(n.offset_at(1), 0);
        let edges: Vec<_> = n.input_edges().collect();
        assert_eq!(edges, vec![(NodeId(1), 0), (NodeId(2), 0)]);
    }

    #[test]
    fn replace_input_materializes_offsets() {
        let mut n = gate(3, Operation::And, &[1, 2]);
        n.replace_input_by(NodeId(2), NodeId(9), 0, 5);

        assert!(n.uses_input_offsets());
        assert_eq!(n.inputs.as_slice(), &[NodeId(1), NodeId(9)]);
        assert_eq!(n.offset_at(0), 0);
        assert_eq!(n.offset_at(1), 5);
    }

    #[test]
    fn replace_input_without_offsets_stays_offsetless() {
        let mut n = gate(3, Operation::And, &[1, 2]);
        n.replace_input_by(NodeId(1), NodeId(7), 0, 0);
        assert!(!n.uses_input_offsets());
        assert_eq!(n.inputs.as_slice(), &[NodeId(7), NodeId(2)]);
    }

    #[test]
    fn replace_input_respects_previous_offset() {
        let mut n = gate(3, Operation::And, &[1, 1]);
        n.input_offsets = Some(smallvec![0, 4]);
        // Only the edge at offset 4 should be rewritten.
        n.replace_input_by(NodeId(1), NodeId(8), 4, 2);

        assert_eq!(n.inputs.as_slice(), &[NodeId(1), NodeId(8)]);
        assert_eq!(n.offset_at(0), 0);
        assert_eq!(n.offset_at(1), 2);
    }

    #[test]
    fn replace_input_rewrites_all_matching_edges() {
        let mut n = gate(3, Operation::Merge, &[1, 1, 2]);
        n.replace_input_by(NodeId(1), NodeId(5), 0, 0);
        assert_eq!(n.inputs.as_slice(), &[NodeId(5), NodeId(5), NodeId(2)]);
    }

    #[test]
    fn set_operation_changes_classification() {
        let mut n = gate(3, Operation::And, &[1, 2]);
        assert!(n.has_boolean_operator());

        n.set_operation(Operation::Add);
        assert_eq!(n.operation, Operation::Add);
        assert!(n.has_arithmetic_operator());
        assert!(!n.has_boolean_operator());
    }

    #[test]
    fn constant_accessor_checks_declared_type() {
        let mut n = Node::new(NodeId(0), Operation::Constant);
        n.output_types = vec![DataType::plaintext(PrimitiveType::Bool)];
        n.set_payload(ConstantPayload::from(true));
        assert!(n.constant_bool().unwrap());

        // Declared type changed out from under the payload.
        n.output_types = vec![DataType::plaintext(PrimitiveType::UInt32)];
        assert!(matches!(n.constant(), Err(IrError::TypeMismatch { .. })));
    }

    #[test]
    fn constant_accessor_without_payload_fails() {
        let n = Node::new(NodeId(4), Operation::Constant);
        assert!(matches!(n.constant(), Err(IrError::MissingValue { .. })));
    }

    #[test]
    fn attribute_roundtrip_on_node() {
        let mut n = Node::new(NodeId(0), Operation::Input);
        n.set_attribute("owner", "1");
        assert_eq!(n.attribute("owner"), "1");
        assert_eq!(n.attribute("simd"), "");
    }

    #[test]
    fn serde_roundtrip() {
        let mut n = gate(3, Operation::Mux, &[0, 1, 2]);
        n.input_offsets = Some(smallvec![0, 1, 0]);
        let json = serde_json::to_string(&n).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(n, back);
    }
}
