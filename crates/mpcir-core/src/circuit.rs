//! The circuit: a named, topologically ordered node sequence plus its I/O
//! manifest.
//!
//! The node sequence *is* the topological order: every producer referenced
//! by a node appears strictly earlier in the sequence. Traversals simply
//! walk the sequence; rewrites that disturb the order must repair it before
//! returning (see [`crate::rewrite`]).
//!
//! There is deliberately no id → node index. Rewrites would invalidate it,
//! so lookup is O(n) and callers that need repeated lookups build their own
//! side map.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::annotation;
use crate::error::IrError;
use crate::id::NodeId;
use crate::node::Node;
use crate::ops::Operation;
use crate::types::DataType;

/// A named, ordered, acyclic hypergraph of typed operations (owned object
/// form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    pub name: String,
    /// Node sequence in topological order.
    pub nodes: Vec<Node>,
    /// Ids of the Input nodes, in port order.
    pub inputs: Vec<NodeId>,
    /// Ids of the Output nodes, in port order.
    pub outputs: Vec<NodeId>,
    pub input_types: Vec<DataType>,
    pub output_types: Vec<DataType>,
    pub annotations: String,
}

impl Circuit {
    /// Creates an empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Circuit {
            name: name.into(),
            nodes: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_types: Vec::new(),
            output_types: Vec::new(),
            annotations: String::new(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    // -------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------

    /// Finds a node by id. O(n) over the sequence.
    pub fn node_with_id(&self, id: NodeId) -> Result<&Node, IrError> {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .ok_or(IrError::NodeNotFound { id })
    }

    /// Finds a node by id for mutation. O(n) over the sequence.
    pub fn node_with_id_mut(&mut self, id: NodeId) -> Result<&mut Node, IrError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(IrError::NodeNotFound { id })
    }

    /// Position of a node in the sequence.
    pub fn position_of(&self, id: NodeId) -> Result<usize, IrError> {
        self.nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or(IrError::NodeNotFound { id })
    }

    // -------------------------------------------------------------------
    // Identifier allocation
    // -------------------------------------------------------------------

    /// A fresh identifier greater than every currently assigned identifier.
    pub fn next_id(&self) -> NodeId {
        NodeId(
            self.nodes
                .iter()
                .map(|n| n.id.0 + 1)
                .max()
                .unwrap_or(0),
        )
    }

    // -------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------

    /// Appends a node with a fresh id at the back of the sequence and
    /// returns it for further configuration.
    pub fn add_node(&mut self, operation: Operation) -> &mut Node {
        let id = self.next_id();
        self.nodes.push(Node::new(id, operation));
        self.nodes.last_mut().expect("node just pushed")
    }

    /// Inserts a node with a fresh id at `position` in the sequence.
    pub fn add_node_at(&mut self, position: usize, operation: Operation) -> &mut Node {
        let id = self.next_id();
        let position = position.min(self.nodes.len());
        self.nodes.insert(position, Node::new(id, operation));
        &mut self.nodes[position]
    }

    /// Removes the node with `id`. Dangling references in surviving nodes
    /// are the caller's responsibility, as in any rewrite intermediate
    /// state.
    pub fn remove_node(&mut self, id: NodeId) {
        self.nodes.retain(|n| n.id != id);
    }

    /// Removes every node whose id is in `ids`.
    pub fn remove_nodes(&mut self, ids: &HashSet<NodeId>) {
        self.nodes.retain(|n| !ids.contains(&n.id));
    }

    /// Removes every node whose id is NOT in `keep`.
    pub fn remove_nodes_not_in(&mut self, keep: &HashSet<NodeId>) {
        self.nodes.retain(|n| keep.contains(&n.id));
    }

    pub fn set_input_node_ids(&mut self, ids: Vec<NodeId>) {
        self.inputs = ids;
    }

    pub fn set_output_node_ids(&mut self, ids: Vec<NodeId>) {
        self.outputs = ids;
    }

    // -------------------------------------------------------------------
    // Annotations
    // -------------------------------------------------------------------

    pub fn attribute(&self, key: &str) -> &str {
        annotation::attribute(&self.annotations, key)
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.annotations = annotation::set_attribute(&self.annotations, key, value);
    }

    // -------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------

    /// Checks the structural invariants of the circuit:
    ///
    /// - node ids are unique;
    /// - the node sequence is a valid topological order (every input edge's
    ///   producer appears strictly earlier);
    /// - a present offset list has the same length as the input list;
    /// - every manifest input is an Input node and every manifest output is
    ///   an Output node.
    pub fn validate(&self) -> Result<(), IrError> {
        let mut seen: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(IrError::DuplicateIdentifier { id: node.id });
            }
        }

        let mut defined: HashSet<NodeId> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if let Some(offs) = node.input_offsets.as_ref() {
                if offs.len() != node.inputs.len() {
                    return Err(IrError::InconsistentRewrite {
                        reason: format!(
                            "node {} has {} inputs but {} offsets",
                            node.id,
                            node.inputs.len(),
                            offs.len()
                        ),
                    });
                }
            }
            for &input in &node.inputs {
                if !defined.contains(&input) {
                    return Err(IrError::CycleIntroduced {
                        reason: format!(
                            "node {} reads {} which is not defined earlier in the sequence",
                            node.id, input
                        ),
                    });
                }
            }
            defined.insert(node.id);
        }

        for &id in &self.inputs {
            if !self.node_with_id(id)?.is_input() {
                return Err(IrError::InconsistentRewrite {
                    reason: format!("manifest input {id} is not an Input node"),
                });
            }
        }
        for &id in &self.outputs {
            if !self.node_with_id(id)?.is_output() {
                return Err(IrError::InconsistentRewrite {
                    reason: format!("manifest output {id} is not an Output node"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrimitiveType;

    /// in0, in1 -> and -> out
    fn and_circuit() -> Circuit {
        let mut c = Circuit::new("and2");
        let bool_ty = DataType::secure(PrimitiveType::Bool);

        let a = c.add_node(Operation::Input).id;
        let b = c.add_node(Operation::Input).id;
        let g = c.add_node(Operation::And);
        g.inputs = [a, b].into_iter().collect();
        let g = g.id;
        let o = c.add_node(Operation::Output);
        o.inputs = [g].into_iter().collect();
        let o = o.id;

        c.set_input_node_ids(vec![a, b]);
        c.set_output_node_ids(vec![o]);
        c.input_types = vec![bool_ty.clone(), bool_ty.clone()];
        c.output_types = vec![bool_ty];
        c
    }

    #[test]
    fn fresh_ids_are_sequential() {
        let mut c = Circuit::new("c");
        assert_eq!(c.next_id(), NodeId(0));
        let first = c.add_node(Operation::Input).id;
        let second = c.add_node(Operation::Input).id;
        assert_eq!(first, NodeId(0));
        assert_eq!(second, NodeId(1));
        assert_eq!(c.next_id(), NodeId(2));
    }

    #[test]
    fn next_id_skips_past_the_maximum() {
        let mut c = Circuit::new("c");
        c.nodes.push(Node::new(NodeId(100), Operation::Input));
        assert_eq!(c.next_id(), NodeId(101));
    }

    #[test]
    fn lookup_finds_nodes_and_reports_missing() {
        let c = and_circuit();
        assert_eq!(c.node_with_id(NodeId(2)).unwrap().operation, Operation::And);
        assert!(matches!(
            c.node_with_id(NodeId(99)),
            Err(IrError::NodeNotFound { id: NodeId(99) })
        ));
    }

    #[test]
    fn add_node_at_inserts_at_position() {
        let mut c = and_circuit();
        let id = c.add_node_at(2, Operation::Not).id;
        assert_eq!(c.nodes[2].id, id);
        assert_eq!(c.num_nodes(), 5);
    }

    #[test]
    fn remove_node_variants() {
        let mut c = and_circuit();
        c.remove_node(NodeId(2));
        assert_eq!(c.num_nodes(), 3);

        let mut c = and_circuit();
        c.remove_nodes(&[NodeId(0), NodeId(1)].into_iter().collect());
        assert_eq!(c.num_nodes(), 2);

        let mut c = and_circuit();
        c.remove_nodes_not_in(&[NodeId(3)].into_iter().collect());
        assert_eq!(c.num_nodes(), 1);
        assert_eq!(c.nodes[0].id, NodeId(3));
    }

    #[test]
    fn valid_circuit_passes_validation() {
        and_circuit().validate().unwrap();
    }

    #[test]
    fn out_of_order_sequence_fails_validation() {
        let mut c = and_circuit();
        // Move the AND gate before its inputs.
        let gate = c.nodes.remove(2);
        c.nodes.insert(0, gate);
        assert!(matches!(
            c.validate(),
            Err(IrError::CycleIntroduced { .. })
        ));
    }

    #[test]
    fn short_offset_list_fails_validation() {
        let mut c = and_circuit();
        c.node_with_id_mut(NodeId(2)).unwrap().input_offsets = Some([0].into_iter().collect());
        assert!(matches!(
            c.validate(),
            Err(IrError::InconsistentRewrite { .. })
        ));
    }

    #[test]
    fn duplicate_ids_fail_validation() {
        let mut c = and_circuit();
        c.nodes.push(Node::new(NodeId(0), Operation::Constant));
        assert!(matches!(
            c.validate(),
            Err(IrError::DuplicateIdentifier { id: NodeId(0) })
        ));
    }

    #[test]
    fn non_input_in_manifest_fails_validation() {
        let mut c = and_circuit();
        c.set_input_node_ids(vec![NodeId(2)]);
        assert!(matches!(
            c.validate(),
            Err(IrError::InconsistentRewrite { .. })
        ));
    }

    #[test]
    fn io_only_circuit_is_valid() {
        let mut c = Circuit::new("wire");
        let i = c.add_node(Operation::Input).id;
        let o = c.add_node(Operation::Output);
        o.inputs = [i].into_iter().collect();
        let o = o.id;
        c.set_input_node_ids(vec![i]);
        c.set_output_node_ids(vec![o]);
        c.validate().unwrap();
    }
}
