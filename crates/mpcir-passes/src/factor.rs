//! Subcircuit factoring: extracting a matched node set into a standalone
//! circuit and replacing it by a single call node.
//!
//! Extraction walks the matched set in the enclosing circuit's topological
//! order. Every distinct external producer feeding the set becomes one
//! subcircuit input; every member with a consumer outside the set becomes
//! one subcircuit output. The subcircuit's I/O carries the types of the
//! factored edges, read from the producer's declared output type with the
//! consumer's declared input type as fallback. The returned replacement
//! specification plugs directly into the core rewrite.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use mpcir_core::{
    Circuit, CircuitBuilder, CircuitReader, CircuitView, DataType, IrError, Module, Node, NodeId,
    Operation, PrimitiveType, SubcircuitReplacement,
};

/// A factored-out subcircuit plus the rewrite specification that replaces
/// its origin nodes by a call.
#[derive(Debug, Clone)]
pub struct ExtractedSubcircuit {
    /// Serialized subcircuit buffer.
    pub bytes: Vec<u8>,
    pub replacement: SubcircuitReplacement,
}

/// Rebuilds the matched node set as a standalone circuit named `name`.
///
/// Fails with [`IrError::NodeNotFound`] when a listed node is missing and
/// [`IrError::InconsistentRewrite`] when the set contains Input or Output
/// nodes (the circuit's I/O manifest cannot be factored out).
pub fn extract_subcircuit(
    circuit: &Circuit,
    nodes: &[NodeId],
    name: &str,
) -> Result<ExtractedSubcircuit, IrError> {
    let matched: HashSet<NodeId> = nodes.iter().copied().collect();
    for &id in nodes {
        let node = circuit.node_with_id(id)?;
        if node.is_input() || node.is_output() {
            return Err(IrError::InconsistentRewrite {
                reason: format!("node {id} in the matched set is an I/O node"),
            });
        }
    }

    let mut builder = CircuitBuilder::new(name);

    // External producer -> subcircuit input id (deduplicated).
    let mut external_inputs: IndexMap<NodeId, NodeId> = IndexMap::new();
    // Matched circuit node -> its gate in the subcircuit.
    let mut rebuilt: HashMap<NodeId, NodeId> = HashMap::new();

    for node in &circuit.nodes {
        if !matched.contains(&node.id) {
            continue;
        }
        let mut operands = Vec::with_capacity(node.inputs.len());
        for (port, &producer) in node.inputs.iter().enumerate() {
            if matched.contains(&producer) {
                operands.push(rebuilt[&producer]);
            } else {
                let sub_input = match external_inputs.get(&producer) {
                    Some(&existing) => existing,
                    None => {
                        let ty = edge_type(circuit, producer, node.offset_at(port), node, port);
                        let ty_index = builder.add_data_type(ty);
                        let created = builder.add_input(ty_index);
                        external_inputs.insert(producer, created);
                        created
                    }
                };
                operands.push(sub_input);
            }
        }
        let gate = builder.add_node(node.operation, &operands, &[]);
        rebuilt.insert(node.id, gate);
    }

    // Members consumed outside the set become subcircuit outputs.
    let mut producer_to_output: HashMap<NodeId, NodeId> = HashMap::new();
    let mut output_producers: HashMap<NodeId, NodeId> = HashMap::new();
    let mut output_consumers: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for node in &circuit.nodes {
        if matched.contains(&node.id) {
            continue;
        }
        for (port, &producer) in node.inputs.iter().enumerate() {
            if matched.contains(&producer) {
                let sub_output = match producer_to_output.get(&producer) {
                    Some(&existing) => existing,
                    None => {
                        let ty = edge_type(circuit, producer, node.offset_at(port), node, port);
                        let ty_index = builder.add_data_type(ty);
                        let out = builder.add_output(ty_index, &[rebuilt[&producer]], &[]);
                        producer_to_output.insert(producer, out);
                        output_producers.insert(out, producer);
                        out
                    }
                };
                let consumers = output_consumers.entry(sub_output).or_default();
                if !consumers.contains(&node.id) {
                    consumers.push(node.id);
                }
            }
        }
    }

    let input_map: HashMap<NodeId, NodeId> = external_inputs
        .into_iter()
        .map(|(producer, sub_input)| (sub_input, producer))
        .collect();

    debug!(
        subcircuit = name,
        inputs = input_map.len(),
        outputs = output_producers.len(),
        gates = nodes.len(),
        "extracted subcircuit"
    );

    Ok(ExtractedSubcircuit {
        bytes: builder.finish()?,
        replacement: SubcircuitReplacement {
            nodes_to_replace: nodes.to_vec(),
            input_map,
            output_consumers,
            output_producers,
        },
    })
}

/// Type of the value flowing along the edge `(producer, offset)` into
/// `consumer` port `port`: the producer's declared output type at that
/// offset when present, else the consumer's declared input type, else a
/// plaintext boolean wire for circuits that carry no type lists.
fn edge_type(
    circuit: &Circuit,
    producer: NodeId,
    offset: u32,
    consumer: &Node,
    port: usize,
) -> DataType {
    if let Ok(node) = circuit.node_with_id(producer) {
        if let Some(ty) = node
            .output_types
            .get(offset as usize)
            .or_else(|| node.output_types.first())
        {
            return ty.clone();
        }
    }
    if let Some(ty) = consumer.input_types.get(port) {
        return ty.clone();
    }
    DataType::plaintext(PrimitiveType::Bool)
}

/// Extracts `nodes` from the named circuit into a new subcircuit, registers
/// it in the module, and replaces the nodes by a call. Returns the id of
/// the call node.
pub fn factor_into_subcircuit(
    module: &mut Module,
    circuit_name: &str,
    nodes: &[NodeId],
    subcircuit_name: &str,
) -> Result<NodeId, IrError> {
    let extracted = {
        let circuit = module.circuit_mut(circuit_name)?;
        extract_subcircuit(circuit, nodes, subcircuit_name)?
    };

    module.insert_packed_circuit(extracted.bytes.clone())?;

    let circuit = module.circuit_mut(circuit_name)?;
    let reader = CircuitReader::new(&extracted.bytes)?;
    let call = circuit
        .replace_nodes_by_subcircuit(&CircuitView::Buffer(reader), &extracted.replacement)?;

    module.validate()?;
    Ok(call)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpcir_core::SecurityLevel;

    /// a, b -> and1(a, b) -> and2(and1, b) -> out
    fn two_and_deep() -> Circuit {
        let mut c = Circuit::new("twoAndDeep");
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
        c
    }

    #[test]
    fn extraction_dedups_external_producers() {
        let c = two_and_deep();
        let extracted = extract_subcircuit(&c, &[NodeId(2), NodeId(3)], "and2").unwrap();

        let reader = CircuitReader::new(&extracted.bytes).unwrap();
        assert_eq!(reader.name().unwrap(), "and2");
        // b feeds both gates but becomes a single input.
        assert_eq!(reader.num_inputs().unwrap(), 2);
        assert_eq!(reader.num_outputs().unwrap(), 1);
        // 2 inputs + 2 gates + 1 output.
        assert_eq!(reader.num_nodes().unwrap(), 5);

        assert_eq!(extracted.replacement.input_map.len(), 2);
        assert_eq!(extracted.replacement.output_producers.len(), 1);
        let (_, &producer) = extracted
            .replacement
            .output_producers
            .iter()
            .next()
            .unwrap();
        assert_eq!(producer, NodeId(3));

        // The source circuit carries no type lists, so the factored I/O
        // falls back to plaintext boolean wires.
        let in_types = reader.input_types().unwrap();
        assert_eq!(in_types[0].primitive().unwrap(), PrimitiveType::Bool);
        assert_eq!(in_types[0].security().unwrap(), SecurityLevel::Plaintext);
    }

    #[test]
    fn extraction_preserves_edge_types() {
        // in(u8 secure) -> square -> neg -> out, every edge typed.
        let word = DataType::secure(PrimitiveType::UInt8);
        let mut c = Circuit::new("arith");
        let input = c.add_node(Operation::Input);
        input.output_types = vec![word.clone()];
        let input = input.id;
        let square = c.add_node(Operation::Square);
        square.inputs = [input].into_iter().collect();
        square.input_types = vec![word.clone()];
        square.output_types = vec![word.clone()];
        let square = square.id;
        let neg = c.add_node(Operation::Neg);
        neg.inputs = [square].into_iter().collect();
        neg.input_types = vec![word.clone()];
        neg.output_types = vec![word.clone()];
        let neg = neg.id;
        let out = c.add_node(Operation::Output);
        out.inputs = [neg].into_iter().collect();
        out.input_types = vec![word.clone()];
        out.output_types = vec![word.clone()];
        let out = out.id;
        c.set_input_node_ids(vec![input]);
        c.set_output_node_ids(vec![out]);
        c.input_types = vec![word.clone()];
        c.output_types = vec![word.clone()];
        c.validate().unwrap();

        let extracted = extract_subcircuit(&c, &[square, neg], "arith2").unwrap();
        let reader = CircuitReader::new(&extracted.bytes).unwrap();

        // The factored circuit's declared I/O matches the original edges.
        let in_types = reader.input_types().unwrap();
        assert_eq!(in_types.len(), 1);
        assert_eq!(in_types[0].primitive().unwrap(), PrimitiveType::UInt8);
        assert_eq!(in_types[0].security().unwrap(), SecurityLevel::Secure);
        let out_types = reader.output_types().unwrap();
        assert_eq!(out_types.len(), 1);
        assert_eq!(out_types[0].primitive().unwrap(), PrimitiveType::UInt8);
        assert_eq!(out_types[0].security().unwrap(), SecurityLevel::Secure);

        // The I/O nodes themselves carry the edge type too.
        let sub_in = reader.input_node_ids().unwrap()[0];
        let in_node = reader.node_with_id(sub_in).unwrap().unwrap();
        let node_types = in_node.output_types().unwrap();
        assert_eq!(node_types[0].primitive().unwrap(), PrimitiveType::UInt8);
        let sub_out = reader.output_node_ids().unwrap()[0];
        let out_node = reader.node_with_id(sub_out).unwrap().unwrap();
        let node_types = out_node.output_types().unwrap();
        assert_eq!(node_types[0].primitive().unwrap(), PrimitiveType::UInt8);
    }

    #[test]
    fn extraction_rejects_io_nodes() {
        let c = two_and_deep();
        let err = extract_subcircuit(&c, &[NodeId(0)], "bad").unwrap_err();
        assert!(matches!(err, IrError::InconsistentRewrite { .. }));
    }

    #[test]
    fn factoring_registers_subcircuit_and_rewrites_caller() {
        let mut m = Module::new("twoAndDeep");
        m.insert_circuit(two_and_deep());

        let call = factor_into_subcircuit(&mut m, "twoAndDeep", &[NodeId(2), NodeId(3)], "and2")
            .unwrap();

        assert!(m.contains_circuit("and2"));
        let caller = m.circuit_mut("twoAndDeep").unwrap();
        caller.validate().unwrap();
        let call_node = caller.node_with_id(call).unwrap();
        assert_eq!(call_node.callee.as_deref(), Some("and2"));
        assert_eq!(call_node.num_outputs, 1);
        let calls = caller
            .nodes
            .iter()
            .filter(|n| n.is_subcircuit_call())
            .count();
        assert_eq!(calls, 1);
    }
}
