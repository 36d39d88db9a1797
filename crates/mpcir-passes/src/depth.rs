//! Topological depth analyses.
//!
//! BFS from the circuit inputs. A node is assigned a depth only once every
//! predecessor has one; until then it is re-enqueued by whichever
//! predecessor resolves last, so the queue may touch a node several times.

use std::collections::{HashMap, HashSet, VecDeque};

use mpcir_core::{CircuitView, IrError, NodeId, Operation};

use crate::successors::node_successors;

/// Level of each node in the circuit DAG: inputs are at depth 0, every
/// other node at `1 + max(depth of predecessors)`.
pub fn node_depths(circuit: &CircuitView<'_>) -> Result<HashMap<NodeId, u64>, IrError> {
    depths_with(circuit, |_| true)
}

/// Like [`node_depths`], but the `+1` step only applies at nodes whose
/// operation is `operation`; all other nodes inherit the maximum
/// predecessor depth unchanged.
pub fn node_instruction_depths(
    circuit: &CircuitView<'_>,
    operation: Operation,
) -> Result<HashMap<NodeId, u64>, IrError> {
    depths_with(circuit, |op| op == operation)
}

fn depths_with(
    circuit: &CircuitView<'_>,
    counts: impl Fn(Operation) -> bool,
) -> Result<HashMap<NodeId, u64>, IrError> {
    let successors = node_successors(circuit)?;
    let mut depth: HashMap<NodeId, u64> = HashMap::new();

    // Seed with every source: the manifest inputs plus any node without
    // predecessors (constants).
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    let mut enqueued: HashSet<NodeId> = HashSet::new();
    for id in circuit.input_node_ids()? {
        if enqueued.insert(id) {
            queue.push_back(id);
        }
    }
    circuit.topological_traversal(|node| {
        if node.input_node_ids()?.is_empty() {
            let id = node.id()?;
            if enqueued.insert(id) {
                queue.push_back(id);
            }
        }
        Ok(())
    })?;

    while let Some(current) = queue.pop_front() {
        enqueued.remove(&current);

        let node = circuit.node_with_id(current)?;
        let mut max_pred = 0u64;
        let mut unresolved = false;
        for pred in node.input_node_ids()?.iter() {
            match depth.get(pred) {
                Some(&d) => max_pred = max_pred.max(d),
                None => {
                    // Re-enqueued later by the unresolved predecessor.
                    unresolved = true;
                    break;
                }
            }
        }
        if unresolved {
            continue;
        }

        let is_source = node.input_node_ids()?.is_empty();
        let own = if is_source {
            0
        } else if counts(node.operation()?) {
            max_pred + 1
        } else {
            max_pred
        };
        depth.insert(current, own);

        if let Some(succs) = successors.get(&current) {
            for &succ in succs {
                if enqueued.insert(succ) {
                    queue.push_back(succ);
                }
            }
        }
    }

    Ok(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpcir_core::Circuit;

    /// in0, in1 -> xor1 -> xor2(xor1, in1) -> and(xor2, in0) -> out
    fn chain() -> Circuit {
        let mut c = Circuit::new("chain");
        let i0 = c.add_node(Operation::Input).id;
        let i1 = c.add_node(Operation::Input).id;
        let x1 = c.add_node(Operation::Xor);
        x1.inputs = [i0, i1].into_iter().collect();
        let x1 = x1.id;
        let x2 = c.add_node(Operation::Xor);
        x2.inputs = [x1, i1].into_iter().collect();
        let x2 = x2.id;
        let a = c.add_node(Operation::And);
        a.inputs = [x2, i0].into_iter().collect();
        let a = a.id;
        let o = c.add_node(Operation::Output);
        o.inputs = [a].into_iter().collect();
        let o = o.id;
        c.set_input_node_ids(vec![i0, i1]);
        c.set_output_node_ids(vec![o]);
        c
    }

    #[test]
    fn inputs_are_at_depth_zero() {
        let c = chain();
        let depths = node_depths(&CircuitView::Object(&c)).unwrap();
        assert_eq!(depths[&NodeId(0)], 0);
        assert_eq!(depths[&NodeId(1)], 0);
    }

    #[test]
    fn depth_is_one_plus_max_predecessor() {
        let c = chain();
        let depths = node_depths(&CircuitView::Object(&c)).unwrap();
        assert_eq!(depths[&NodeId(2)], 1); // xor1
        assert_eq!(depths[&NodeId(3)], 2); // xor2
        assert_eq!(depths[&NodeId(4)], 3); // and
        assert_eq!(depths[&NodeId(5)], 4); // out
        assert_eq!(depths.len(), 6);
    }

    #[test]
    fn instruction_depth_counts_only_the_given_operation() {
        let c = chain();
        let depths =
            node_instruction_depths(&CircuitView::Object(&c), Operation::Xor).unwrap();
        assert_eq!(depths[&NodeId(0)], 0);
        assert_eq!(depths[&NodeId(2)], 1); // first xor
        assert_eq!(depths[&NodeId(3)], 2); // second xor
        assert_eq!(depths[&NodeId(4)], 2); // and inherits
        assert_eq!(depths[&NodeId(5)], 2); // out inherits
    }

    #[test]
    fn instruction_depth_of_absent_operation_is_zero_everywhere() {
        let c = chain();
        let depths =
            node_instruction_depths(&CircuitView::Object(&c), Operation::Mul).unwrap();
        assert!(depths.values().all(|&d| d == 0));
    }

    #[test]
    fn works_over_buffer_views() {
        let c = chain();
        let bytes = mpcir_core::codec::encode::encode_circuit(&c);
        let reader = mpcir_core::CircuitReader::new(&bytes).unwrap();
        let depths = node_depths(&CircuitView::Buffer(reader)).unwrap();
        assert_eq!(depths[&NodeId(4)], 3);
    }
}
