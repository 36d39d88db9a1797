//! Structural rewrites over an unpacked circuit.
//!
//! Two transformations operate on the node sequence: replacing a matched
//! node set by a single call to a factored-out subcircuit, and fusing many
//! same-operation nodes into one SIMD node. Both rewire every consumer of a
//! removed node to the correct output offset of the replacement, prove that
//! no cyclic dependency was introduced, and restore the topological order of
//! the sequence before returning.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;

use crate::annotation;
use crate::circuit::Circuit;
use crate::error::IrError;
use crate::id::NodeId;
use crate::node::Node;
use crate::ops::Operation;
use crate::view::CircuitView;

/// Arguments of the subcircuit-factoring rewrite.
///
/// `nodes_to_replace` is the matched subgraph in the enclosing circuit.
/// `input_map` places each input of the subcircuit at an existing producer
/// in the enclosing circuit. `output_consumers` lists, for each subcircuit
/// output, all enclosing-circuit consumers of the value it stands for, and
/// `output_producers` names which replaced node used to produce it.
#[derive(Debug, Clone)]
pub struct SubcircuitReplacement {
    pub nodes_to_replace: Vec<NodeId>,
    /// subcircuit input id → producer in the enclosing circuit.
    pub input_map: HashMap<NodeId, NodeId>,
    /// subcircuit output id → consumers in the enclosing circuit.
    pub output_consumers: HashMap<NodeId, Vec<NodeId>>,
    /// subcircuit output id → replaced node that produced the value.
    pub output_producers: HashMap<NodeId, NodeId>,
}

impl Circuit {
    /// Replaces the matched node set by a single call node to `subcircuit`.
    ///
    /// The call node takes the producers named by the input map (in
    /// subcircuit input order), exposes one output per mapped subcircuit
    /// output (offsets assigned in subcircuit output order), and is inserted
    /// at the earliest position where all of its inputs are already defined.
    /// Every consumer port that referred to a replaced producer is rewired
    /// to the corresponding call output, the replaced nodes are removed, and
    /// the topological order is repaired.
    ///
    /// Returns the id of the new call node.
    pub fn replace_nodes_by_subcircuit(
        &mut self,
        subcircuit: &CircuitView<'_>,
        replacement: &SubcircuitReplacement,
    ) -> Result<NodeId, IrError> {
        let replaced: HashSet<NodeId> = replacement.nodes_to_replace.iter().copied().collect();

        // Every referenced node must exist before anything is touched.
        for &id in replacement
            .nodes_to_replace
            .iter()
            .chain(replacement.input_map.values())
            .chain(replacement.output_consumers.values().flatten())
        {
            self.node_with_id(id)?;
        }
        for (&sub_out, &producer) in &replacement.output_producers {
            if !replaced.contains(&producer) {
                return Err(IrError::InconsistentRewrite {
                    reason: format!(
                        "output producer {producer} for subcircuit output {sub_out} \
                         is not in the replaced set"
                    ),
                });
            }
        }
        for &producer in replacement.input_map.values() {
            if replaced.contains(&producer) {
                return Err(IrError::InconsistentRewrite {
                    reason: format!(
                        "input placement {producer} is itself in the replaced set"
                    ),
                });
            }
        }
        // A replaced node still feeding a survivor must be a declared
        // output, or removal would orphan that consumer.
        let declared_outputs: HashSet<NodeId> =
            replacement.output_producers.values().copied().collect();
        for node in &self.nodes {
            if replaced.contains(&node.id) {
                continue;
            }
            for &input in &node.inputs {
                if replaced.contains(&input) && !declared_outputs.contains(&input) {
                    return Err(IrError::InconsistentRewrite {
                        reason: format!(
                            "replaced node {input} feeds surviving node {} but is not a \
                             declared subcircuit output",
                            node.id
                        ),
                    });
                }
            }
        }

        // The call node takes the producers named by the input map, in
        // subcircuit input order.
        let sub_inputs = subcircuit.input_node_ids()?;
        let mut call_inputs = Vec::with_capacity(sub_inputs.len());
        for sub_in in &sub_inputs {
            let producer = replacement.input_map.get(sub_in).ok_or_else(|| {
                IrError::InconsistentRewrite {
                    reason: format!("subcircuit input {sub_in} has no placement in the input map"),
                }
            })?;
            call_inputs.push(*producer);
        }

        let call_id = self.next_id();
        let mut call = Node::new(call_id, Operation::CallSubcircuit);
        call.callee = Some(subcircuit.name()?.to_string());
        call.inputs = call_inputs.iter().copied().collect();
        call.num_outputs = replacement.output_producers.len() as u32;
        self.insert_after_last_of(call, &call_inputs);

        // Fresh output offsets in subcircuit output order.
        let sub_outputs = subcircuit.output_node_ids()?;
        let mut output_offset: HashMap<NodeId, u32> = HashMap::new();
        let mut next = 0u32;
        for sub_out in &sub_outputs {
            output_offset.insert(*sub_out, next);
            next += 1;
        }

        // Rewire every consumer port that referred to a replaced producer.
        for sub_out in &sub_outputs {
            let Some(&old_producer) = replacement.output_producers.get(sub_out) else {
                continue;
            };
            let new_offset = output_offset[sub_out];
            let Some(consumers) = replacement.output_consumers.get(sub_out) else {
                continue;
            };
            for &consumer_id in consumers {
                let consumer = self.node_with_id_mut(consumer_id)?;
                let ports: Vec<(usize, u32)> = consumer
                    .inputs
                    .iter()
                    .enumerate()
                    .filter(|(_, &input)| input == old_producer)
                    .map(|(i, _)| (i, consumer.offset_at(i)))
                    .collect();
                for (_, prev_offset) in ports {
                    consumer.replace_input_by(old_producer, call_id, prev_offset, new_offset);
                }
            }
        }

        self.remove_nodes(&replaced);
        self.check_acyclic()?;
        let successors = successor_sets(self);
        self.restore_topological_order(call_id, &successors);
        Ok(call_id)
    }

    /// Fuses the listed same-operation nodes into one SIMD node.
    ///
    /// The fused node's inputs are the concatenation of the input lists of
    /// the fused nodes in list order (offsets concatenated in parallel,
    /// zero-padded where a source had no offset list), and it exposes one
    /// output per fused node, assigned in list order. Consumers are rewired,
    /// the fused nodes are removed, and the topological order is repaired.
    ///
    /// Returns the id of the new SIMD node.
    pub fn replace_nodes_by_simd_node(&mut self, to_fuse: &[NodeId]) -> Result<NodeId, IrError> {
        if to_fuse.is_empty() {
            return Err(IrError::InconsistentRewrite {
                reason: "empty fusion list".into(),
            });
        }
        let unique: HashSet<NodeId> = to_fuse.iter().copied().collect();
        if unique.len() != to_fuse.len() {
            return Err(IrError::InconsistentRewrite {
                reason: "fusion list contains duplicate nodes".into(),
            });
        }

        let operation = self.node_with_id(to_fuse[0])?.operation;
        if operation.input_group_arity().is_none() {
            return Err(IrError::InconsistentRewrite {
                reason: format!("operation {operation} cannot be fused"),
            });
        }

        // Concatenate inputs and offsets; map each fused node to its output
        // offset on the SIMD node.
        let mut fused_inputs: Vec<NodeId> = Vec::new();
        let mut fused_offsets: Vec<u32> = Vec::new();
        let mut output_offset: HashMap<NodeId, u32> = HashMap::new();
        for (lane, &id) in to_fuse.iter().enumerate() {
            let node = self.node_with_id(id)?;
            if node.operation != operation {
                return Err(IrError::InconsistentRewrite {
                    reason: format!(
                        "node {id} has operation {} but the fusion list started with {operation}",
                        node.operation
                    ),
                });
            }
            if let Some(dep) = node.inputs.iter().copied().find(|input| unique.contains(input)) {
                return Err(IrError::InconsistentRewrite {
                    reason: format!("fused node {id} depends on fused node {dep}"),
                });
            }
            fused_inputs.extend(node.inputs.iter().copied());
            match node.input_offsets.as_ref() {
                Some(offs) => fused_offsets.extend(offs.iter().copied()),
                None => fused_offsets.extend(std::iter::repeat(0).take(node.inputs.len())),
            }
            output_offset.insert(id, lane as u32);
        }

        let simd_id = self.next_id();
        let mut simd = Node::new(simd_id, operation);
        simd.inputs = fused_inputs.iter().copied().collect();
        if fused_offsets.iter().any(|&o| o != 0) {
            simd.input_offsets = Some(fused_offsets.iter().copied().collect());
        }
        simd.num_outputs = to_fuse.len() as u32;
        simd.annotations =
            annotation::set_attribute("", annotation::SIMD, &to_fuse.len().to_string());
        self.insert_after_last_of(simd, &fused_inputs);

        // Rewire every port anywhere in the circuit that read a fused node.
        for node in &mut self.nodes {
            if node.id == simd_id {
                continue;
            }
            let ports: Vec<(NodeId, u32, u32)> = node
                .inputs
                .iter()
                .enumerate()
                .filter_map(|(i, &input)| {
                    output_offset
                        .get(&input)
                        .map(|&lane| (input, node.offset_at(i), lane))
                })
                .collect();
            for (prev, prev_offset, lane) in ports {
                node.replace_input_by(prev, simd_id, prev_offset, lane);
            }
        }

        self.remove_nodes(&unique);
        self.check_acyclic()?;
        let successors = successor_sets(self);
        self.restore_topological_order(simd_id, &successors);
        Ok(simd_id)
    }

    /// Inserts `node` immediately after the last listed producer in the
    /// current sequence order (at the front when the list is empty).
    fn insert_after_last_of(&mut self, node: Node, producers: &[NodeId]) {
        let mut pending: HashSet<NodeId> = producers.iter().copied().collect();
        if pending.is_empty() {
            self.nodes.insert(0, node);
            return;
        }
        let mut insert_at = self.nodes.len();
        for (pos, existing) in self.nodes.iter().enumerate() {
            pending.remove(&existing.id);
            if pending.is_empty() {
                insert_at = pos + 1;
                break;
            }
        }
        self.nodes.insert(insert_at, node);
    }

    /// Restores the topological order of the sequence after a rewrite.
    ///
    /// Breadth-first worklist starting from the freshly inserted node: any
    /// direct consumer found *before* a worklist node is moved to just after
    /// it, and the moved consumers are enqueued in turn. Runs until no
    /// consumer precedes its producer; each move strictly reduces the number
    /// of back edges, so the loop terminates on an acyclic sequence.
    pub(crate) fn restore_topological_order(
        &mut self,
        start: NodeId,
        successors: &HashMap<NodeId, HashSet<NodeId>>,
    ) {
        let empty = HashSet::new();
        let mut worklist: VecDeque<NodeId> = VecDeque::new();
        worklist.push_back(start);

        while let Some(current) = worklist.pop_front() {
            let succs = successors.get(&current).unwrap_or(&empty);
            if self.nodes.iter().all(|n| n.id != current) {
                continue;
            }

            // Extract the consumers sitting before the current node,
            // preserving their relative order. Each removal shifts the
            // current node one slot left, so its position is re-found.
            let mut moved: Vec<Node> = Vec::new();
            let mut pos = 0;
            loop {
                let cur = self
                    .nodes
                    .iter()
                    .position(|n| n.id == current)
                    .expect("current node stays in the sequence");
                if pos >= cur {
                    break;
                }
                if succs.contains(&self.nodes[pos].id) {
                    moved.push(self.nodes.remove(pos));
                } else {
                    pos += 1;
                }
            }

            if moved.is_empty() {
                continue;
            }
            let cur = self
                .nodes
                .iter()
                .position(|n| n.id == current)
                .expect("current node stays in the sequence");
            for (i, node) in moved.into_iter().enumerate() {
                worklist.push_back(node.id);
                self.nodes.insert(cur + 1 + i, node);
            }
        }
    }

    /// Fails with [`IrError::CycleIntroduced`] when the node edges no longer
    /// form a DAG.
    pub(crate) fn check_acyclic(&self) -> Result<(), IrError> {
        let mut graph: DiGraph<NodeId, ()> = DiGraph::new();
        let mut index = HashMap::with_capacity(self.nodes.len());
        for node in &self.nodes {
            index.insert(node.id, graph.add_node(node.id));
        }
        for node in &self.nodes {
            for &input in &node.inputs {
                if let (Some(&from), Some(&to)) = (index.get(&input), index.get(&node.id)) {
                    graph.add_edge(from, to, ());
                }
            }
        }
        if is_cyclic_directed(&graph) {
            return Err(IrError::CycleIntroduced {
                reason: format!("rewrite left circuit '{}' cyclic", self.name),
            });
        }
        Ok(())
    }
}

/// Direct-consumer sets over the current node sequence.
pub(crate) fn successor_sets(circuit: &Circuit) -> HashMap<NodeId, HashSet<NodeId>> {
    let mut successors: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
    for node in &circuit.nodes {
        for &input in &node.inputs {
            successors.entry(input).or_default().insert(node.id);
        }
    }
    successors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CircuitBuilder;
    use crate::types::{DataType, PrimitiveType};

    /// a, b -> and1(a, b) -> and2(and1, b) -> out. Both gates share the
    /// external input b, so the factored form has two inputs.
    fn two_and_deep() -> Circuit {
        let mut c = Circuit::new("twoAndDeep");
        let bool_ty = DataType::secure(PrimitiveType::Bool);

        let a = c.add_node(Operation::Input).id;
        let b = c.add_node(Operation::Input).id;
        let and1 = c.add_node(Operation::And);
        and1.inputs = [a, b].into_iter().collect();
        let and1 = and1.id;
        let and2 = c.add_node(Operation::And);
        and2.inputs = [and1, b].into_iter().collect();
        let and2 = and2.id;
        let out = c.add_node(Operation::Output);
        out.inputs = [and2].into_iter().collect();
        let out = out.id;

        c.set_input_node_ids(vec![a, b]);
        c.set_output_node_ids(vec![out]);
        c.input_types = vec![bool_ty.clone(); 2];
        c.output_types = vec![bool_ty];
        c
    }

    /// A standalone two-AND subcircuit with the same shape, serialized.
    fn and2_bytes() -> Vec<u8> {
        let mut b = CircuitBuilder::new("and2");
        let bool_ty = b.add_data_type(DataType::secure(PrimitiveType::Bool));
        let x = b.add_input(bool_ty);
        let y = b.add_input(bool_ty);
        let g1 = b.add_node(Operation::And, &[x, y], &[]);
        let g2 = b.add_node(Operation::And, &[g1, y], &[]);
        b.add_output(bool_ty, &[g2], &[]);
        b.finish().unwrap()
    }

    #[test]
    fn factor_two_ands_into_subcircuit() {
        let mut c = two_and_deep();
        let sub_bytes = and2_bytes();
        let sub = crate::codec::read::CircuitReader::new(&sub_bytes).unwrap();
        let sub_view = CircuitView::Buffer(sub.clone());

        let sub_inputs = sub.input_node_ids().unwrap();
        let sub_outputs = sub.output_node_ids().unwrap();
        assert_eq!(sub_inputs.len(), 2);
        assert_eq!(sub_outputs.len(), 1);

        // Replace both AND gates by one call to and2 placed on (a, b).
        let replacement = SubcircuitReplacement {
            nodes_to_replace: vec![NodeId(2), NodeId(3)],
            input_map: [(sub_inputs[0], NodeId(0)), (sub_inputs[1], NodeId(1))]
                .into_iter()
                .collect(),
            output_consumers: [(sub_outputs[0], vec![NodeId(4)])].into_iter().collect(),
            output_producers: [(sub_outputs[0], NodeId(3))].into_iter().collect(),
        };

        let call_id = c
            .replace_nodes_by_subcircuit(&sub_view, &replacement)
            .unwrap();

        c.validate().unwrap();
        let call = c.node_with_id(call_id).unwrap();
        assert_eq!(call.operation, Operation::CallSubcircuit);
        assert_eq!(call.callee.as_deref(), Some("and2"));
        assert_eq!(call.num_outputs, 1);
        assert_eq!(call.inputs.as_slice(), &[NodeId(0), NodeId(1)]);

        // Both gates are gone; the output reads the call at offset 0.
        assert!(c.node_with_id(NodeId(2)).is_err());
        assert!(c.node_with_id(NodeId(3)).is_err());
        let out = c.node_with_id(NodeId(4)).unwrap();
        assert_eq!(out.inputs.as_slice(), &[call_id]);
        assert_eq!(out.offset_at(0), 0);

        let calls = c.nodes.iter().filter(|n| n.is_subcircuit_call()).count();
        assert_eq!(calls, 1);
    }

    #[test]
    fn factoring_rejects_producer_outside_replaced_set() {
        let mut c = two_and_deep();
        let sub_bytes = and2_bytes();
        let sub = crate::codec::read::CircuitReader::new(&sub_bytes).unwrap();
        let sub_view = CircuitView::Buffer(sub.clone());
        let sub_inputs = sub.input_node_ids().unwrap();
        let sub_outputs = sub.output_node_ids().unwrap();

        let replacement = SubcircuitReplacement {
            nodes_to_replace: vec![NodeId(3)],
            input_map: [(sub_inputs[0], NodeId(0)), (sub_inputs[1], NodeId(1))]
                .into_iter()
                .collect(),
            output_consumers: [(sub_outputs[0], vec![NodeId(4)])].into_iter().collect(),
            // Producer is not in the replaced set.
            output_producers: [(sub_outputs[0], NodeId(4))].into_iter().collect(),
        };

        let err = c
            .replace_nodes_by_subcircuit(&sub_view, &replacement)
            .unwrap_err();
        assert!(matches!(err, IrError::InconsistentRewrite { .. }));
    }

    #[test]
    fn factoring_rejects_undeclared_surviving_consumer() {
        let mut c = two_and_deep();
        // and1 also feeds a second gate that the rewrite does not mention.
        let extra = c.add_node(Operation::Not);
        extra.inputs = [NodeId(3)].into_iter().collect();

        let sub_bytes = and2_bytes();
        let sub = crate::codec::read::CircuitReader::new(&sub_bytes).unwrap();
        let sub_view = CircuitView::Buffer(sub.clone());
        let sub_inputs = sub.input_node_ids().unwrap();

        let replacement = SubcircuitReplacement {
            nodes_to_replace: vec![NodeId(3)],
            input_map: [(sub_inputs[0], NodeId(0)), (sub_inputs[1], NodeId(1))]
                .into_iter()
                .collect(),
            // No outputs declared at all.
            output_consumers: HashMap::new(),
            output_producers: HashMap::new(),
        };

        let err = c
            .replace_nodes_by_subcircuit(&sub_view, &replacement)
            .unwrap_err();
        assert!(matches!(err, IrError::InconsistentRewrite { .. }));
    }

    #[test]
    fn factoring_missing_node_reports_not_found() {
        let mut c = two_and_deep();
        let sub_bytes = and2_bytes();
        let sub = crate::codec::read::CircuitReader::new(&sub_bytes).unwrap();
        let sub_view = CircuitView::Buffer(sub);

        let replacement = SubcircuitReplacement {
            nodes_to_replace: vec![NodeId(99)],
            input_map: HashMap::new(),
            output_consumers: HashMap::new(),
            output_producers: HashMap::new(),
        };

        let err = c
            .replace_nodes_by_subcircuit(&sub_view, &replacement)
            .unwrap_err();
        assert!(matches!(err, IrError::NodeNotFound { id: NodeId(99) }));
    }

    /// in0..in3 -> xor1(in0, in1), xor2(in2, in3) -> and(xor1, xor2) -> out
    fn two_xor_circuit() -> Circuit {
        let mut c = Circuit::new("xors");
        let in0 = c.add_node(Operation::Input).id;
        let in1 = c.add_node(Operation::Input).id;
        let in2 = c.add_node(Operation::Input).id;
        let in3 = c.add_node(Operation::Input).id;
        let x1 = c.add_node(Operation::Xor);
        x1.inputs = [in0, in1].into_iter().collect();
        let x1 = x1.id;
        let x2 = c.add_node(Operation::Xor);
        x2.inputs = [in2, in3].into_iter().collect();
        let x2 = x2.id;
        let and = c.add_node(Operation::And);
        and.inputs = [x1, x2].into_iter().collect();
        let and = and.id;
        let out = c.add_node(Operation::Output);
        out.inputs = [and].into_iter().collect();
        let out = out.id;
        c.set_input_node_ids(vec![in0, in1, in2, in3]);
        c.set_output_node_ids(vec![out]);
        c
    }

    #[test]
    fn fuse_two_xors_into_simd_node() {
        let mut c = two_xor_circuit();
        let simd_id = c
            .replace_nodes_by_simd_node(&[NodeId(4), NodeId(5)])
            .unwrap();

        c.validate().unwrap();
        let simd = c.node_with_id(simd_id).unwrap();
        assert_eq!(simd.operation, Operation::Xor);
        assert_eq!(simd.num_outputs, 2);
        assert_eq!(
            simd.inputs.as_slice(),
            &[NodeId(0), NodeId(1), NodeId(2), NodeId(3)]
        );
        assert_eq!(simd.attribute(annotation::SIMD), "2");

        // The AND now reads lanes 0 and 1 of the SIMD node.
        let and = c.node_with_id(NodeId(6)).unwrap();
        assert_eq!(and.inputs.as_slice(), &[simd_id, simd_id]);
        assert_eq!(and.offset_at(0), 0);
        assert_eq!(and.offset_at(1), 1);

        // Fused nodes are gone.
        assert!(c.node_with_id(NodeId(4)).is_err());
        assert!(c.node_with_id(NodeId(5)).is_err());
    }

    #[test]
    fn fusion_rejects_mixed_operations() {
        let mut c = two_xor_circuit();
        let err = c
            .replace_nodes_by_simd_node(&[NodeId(4), NodeId(6)])
            .unwrap_err();
        assert!(matches!(err, IrError::InconsistentRewrite { .. }));
    }

    #[test]
    fn fusion_rejects_duplicates_and_empty_lists() {
        let mut c = two_xor_circuit();
        assert!(matches!(
            c.replace_nodes_by_simd_node(&[]),
            Err(IrError::InconsistentRewrite { .. })
        ));
        assert!(matches!(
            c.replace_nodes_by_simd_node(&[NodeId(4), NodeId(4)]),
            Err(IrError::InconsistentRewrite { .. })
        ));
    }

    #[test]
    fn fusion_rejects_dependent_nodes() {
        let mut c = Circuit::new("dep");
        let i = c.add_node(Operation::Input).id;
        let n1 = c.add_node(Operation::Not);
        n1.inputs = [i].into_iter().collect();
        let n1 = n1.id;
        let n2 = c.add_node(Operation::Not);
        n2.inputs = [n1].into_iter().collect();
        let n2 = n2.id;

        let err = c.replace_nodes_by_simd_node(&[n1, n2]).unwrap_err();
        assert!(matches!(err, IrError::InconsistentRewrite { .. }));
    }

    #[test]
    fn fusion_rejects_io_nodes() {
        let mut c = two_xor_circuit();
        let err = c
            .replace_nodes_by_simd_node(&[NodeId(0), NodeId(1)])
            .unwrap_err();
        assert!(matches!(err, IrError::InconsistentRewrite { .. }));
    }

    #[test]
    fn repair_moves_displaced_consumers_to_convergence() {
        // The second NOT reads a producer defined late in the sequence, so
        // the fused node lands after that producer -- behind the first
        // NOT's consumer chain, which the repair must push back past it,
        // recursively.
        let mut c = Circuit::new("chain");
        let i0 = c.add_node(Operation::Input).id;
        let i1 = c.add_node(Operation::Input).id;
        let n1 = c.add_node(Operation::Not);
        n1.inputs = [i0].into_iter().collect();
        let n1 = n1.id;
        let a = c.add_node(Operation::And);
        a.inputs = [n1, i1].into_iter().collect();
        let a = a.id;
        let o = c.add_node(Operation::Output);
        o.inputs = [a].into_iter().collect();
        let o = o.id;
        let late = c.add_node(Operation::Not);
        late.inputs = [i1].into_iter().collect();
        let late = late.id;
        let n2 = c.add_node(Operation::Not);
        n2.inputs = [late].into_iter().collect();
        let n2 = n2.id;
        let o2 = c.add_node(Operation::Output);
        o2.inputs = [n2].into_iter().collect();
        let o2 = o2.id;
        c.set_input_node_ids(vec![i0, i1]);
        c.set_output_node_ids(vec![o, o2]);
        c.validate().unwrap();

        let simd_id = c.replace_nodes_by_simd_node(&[n1, n2]).unwrap();
        c.validate().unwrap();

        let simd = c.node_with_id(simd_id).unwrap();
        assert_eq!(simd.num_outputs, 2);
        assert_eq!(simd.inputs.as_slice(), &[i0, late]);

        // a and o moved behind the fused node; both read the right lanes.
        let and1 = c.node_with_id(a).unwrap();
        assert_eq!(and1.inputs[0], simd_id);
        assert_eq!(and1.offset_at(0), 0);
        let out2 = c.node_with_id(o2).unwrap();
        assert_eq!(out2.inputs[0], simd_id);
        assert_eq!(out2.offset_at(0), 1);
        let pos_simd = c.position_of(simd_id).unwrap();
        assert!(c.position_of(a).unwrap() > pos_simd);
        assert!(c.position_of(o).unwrap() > c.position_of(a).unwrap());
    }
}
