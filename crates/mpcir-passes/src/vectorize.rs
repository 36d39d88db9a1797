//! Instruction vectorization: fusing same-operation nodes at the same
//! instruction depth into SIMD nodes.
//!
//! Candidates are grouped by instruction depth for the target operation.
//! A group is fused only when it is large enough and its members are close
//! together in plain node depth: members farther than `max_distance` from
//! the group's median depth are dropped first, which keeps the fusion from
//! serializing otherwise-parallel regions of the circuit.

use std::collections::BTreeMap;

use tracing::debug;

use mpcir_core::{Circuit, CircuitView, IrError, NodeId, Operation};

use crate::depth::{node_depths, node_instruction_depths};

/// What a vectorization run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VectorizeReport {
    /// Number of SIMD nodes created.
    pub fusion_calls: u64,
    /// Number of original nodes folded into SIMD nodes.
    pub fused_nodes: u64,
    pub nodes_before: usize,
    pub nodes_after: usize,
}

/// Fuses nodes of `operation` into SIMD nodes, one per instruction-depth
/// level with at least `min_gates` surviving candidates.
pub fn vectorize_instructions(
    circuit: &mut Circuit,
    operation: Operation,
    min_gates: usize,
    max_distance: u64,
) -> Result<VectorizeReport, IrError> {
    let mut report = VectorizeReport {
        nodes_before: circuit.num_nodes(),
        ..VectorizeReport::default()
    };
    if operation.input_group_arity().is_none() {
        return Err(IrError::InconsistentRewrite {
            reason: format!("operation {operation} cannot be vectorized"),
        });
    }

    let (instruction_depth, depth) = {
        let view = CircuitView::Object(circuit);
        (
            node_instruction_depths(&view, operation)?,
            node_depths(&view)?,
        )
    };

    // Candidates per instruction-depth level, in level order.
    let mut levels: BTreeMap<u64, Vec<NodeId>> = BTreeMap::new();
    for node in &circuit.nodes {
        if node.operation == operation {
            if let Some(&level) = instruction_depth.get(&node.id) {
                levels.entry(level).or_default().push(node.id);
            }
        }
    }

    for (level, candidates) in levels {
        if candidates.len() < min_gates {
            continue;
        }

        // Median plain depth of the candidates.
        let mut depths: Vec<u64> = candidates
            .iter()
            .map(|id| depth.get(id).copied().unwrap_or(0))
            .collect();
        depths.sort_unstable();
        let median = if depths.len() % 2 == 0 {
            (depths[depths.len() / 2 - 1] + depths[depths.len() / 2]) / 2
        } else {
            depths[depths.len() / 2]
        };

        let survivors: Vec<NodeId> = candidates
            .into_iter()
            .filter(|id| depth.get(id).copied().unwrap_or(0).abs_diff(median) <= max_distance)
            .collect();
        if survivors.len() < min_gates {
            continue;
        }

        let lanes = survivors.len();
        let simd_id = circuit.replace_nodes_by_simd_node(&survivors)?;
        debug!(
            op = %operation,
            level,
            lanes,
            simd_node = %simd_id,
            "fused instruction-depth level into SIMD node"
        );
        report.fusion_calls += 1;
        report.fused_nodes += lanes as u64;
    }

    report.nodes_after = circuit.num_nodes();
    Ok(report)
}

/// Runs [`vectorize_instructions`] for every fusable operation.
pub fn vectorize_all_instructions(
    circuit: &mut Circuit,
    min_gates: usize,
    max_distance: u64,
) -> Result<VectorizeReport, IrError> {
    let mut total = VectorizeReport {
        nodes_before: circuit.num_nodes(),
        ..VectorizeReport::default()
    };
    for operation in Operation::ALL {
        if operation.input_group_arity().is_none() {
            continue;
        }
        let report = vectorize_instructions(circuit, operation, min_gates, max_distance)?;
        total.fusion_calls += report.fusion_calls;
        total.fused_nodes += report.fused_nodes;
    }
    total.nodes_after = circuit.num_nodes();
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpcir_core::annotation;

    /// Four independent XOR gates at instruction depth 1 feeding four
    /// outputs.
    fn parallel_xors() -> Circuit {
        let mut c = Circuit::new("xors");
        let mut inputs = Vec::new();
        for _ in 0..8 {
            inputs.push(c.add_node(Operation::Input).id);
        }
        let mut gates = Vec::new();
        for pair in inputs.chunks(2) {
            let g = c.add_node(Operation::Xor);
            g.inputs = [pair[0], pair[1]].into_iter().collect();
            gates.push(g.id);
        }
        let mut outs = Vec::new();
        for &g in &gates {
            let o = c.add_node(Operation::Output);
            o.inputs = [g].into_iter().collect();
            outs.push(o.id);
        }
        c.set_input_node_ids(inputs);
        c.set_output_node_ids(outs);
        c
    }

    #[test]
    fn fuses_a_full_level() {
        let mut c = parallel_xors();
        let report = vectorize_instructions(&mut c, Operation::Xor, 2, 10).unwrap();
        assert_eq!(report.fusion_calls, 1);
        assert_eq!(report.fused_nodes, 4);
        assert_eq!(report.nodes_after, report.nodes_before - 3);
        c.validate().unwrap();

        let simd = c
            .nodes
            .iter()
            .find(|n| n.operation == Operation::Xor)
            .unwrap();
        assert_eq!(simd.num_outputs, 4);
        assert_eq!(simd.attribute(annotation::SIMD), "4");
    }

    #[test]
    fn level_below_min_gates_is_left_alone() {
        let mut c = parallel_xors();
        let report = vectorize_instructions(&mut c, Operation::Xor, 5, 10).unwrap();
        assert_eq!(report.fusion_calls, 0);
        assert_eq!(report.nodes_after, report.nodes_before);
    }

    #[test]
    fn unfusable_operation_is_rejected() {
        let mut c = parallel_xors();
        let err = vectorize_instructions(&mut c, Operation::Input, 2, 10).unwrap_err();
        assert!(matches!(err, IrError::InconsistentRewrite { .. }));
    }

    #[test]
    fn distance_filter_drops_outliers() {
        // Three XORs at instruction depth 1, but one of them sits much
        // deeper in the circuit through a NOT chain.
        let mut c = Circuit::new("skewed");
        let mut inputs = Vec::new();
        for _ in 0..6 {
            inputs.push(c.add_node(Operation::Input).id);
        }
        let x1 = c.add_node(Operation::Xor);
        x1.inputs = [inputs[0], inputs[1]].into_iter().collect();
        let x1 = x1.id;
        let x2 = c.add_node(Operation::Xor);
        x2.inputs = [inputs[2], inputs[3]].into_iter().collect();
        let x2 = x2.id;
        // Deep NOT chain before the third XOR.
        let mut prev = inputs[4];
        for _ in 0..6 {
            let n = c.add_node(Operation::Not);
            n.inputs = [prev].into_iter().collect();
            prev = n.id;
        }
        let x3 = c.add_node(Operation::Xor);
        x3.inputs = [prev, inputs[5]].into_iter().collect();
        let x3 = x3.id;
        for &g in &[x1, x2, x3] {
            let o = c.add_node(Operation::Output);
            o.inputs = [g].into_iter().collect();
        }
        c.set_input_node_ids(inputs);

        let report = vectorize_instructions(&mut c, Operation::Xor, 2, 2).unwrap();
        assert_eq!(report.fusion_calls, 1);
        assert_eq!(report.fused_nodes, 2);
        // The outlier XOR survives unfused.
        assert!(c.node_with_id(x3).is_ok());
        c.validate().unwrap();
    }

    #[test]
    fn vectorize_all_sweeps_every_fusable_operation() {
        let mut c = parallel_xors();
        // Add two parallel NOT gates reading the SIMD-eligible inputs.
        let i0 = c.inputs[0];
        let i1 = c.inputs[1];
        let n1 = c.add_node(Operation::Not);
        n1.inputs = [i0].into_iter().collect();
        let n2 = c.add_node(Operation::Not);
        n2.inputs = [i1].into_iter().collect();

        let report = vectorize_all_instructions(&mut c, 2, 10).unwrap();
        assert_eq!(report.fusion_calls, 2); // one Xor fusion + one Not fusion
        c.validate().unwrap();
    }
}
