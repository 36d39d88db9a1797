//! Direct-consumer sets.

use std::collections::{HashMap, HashSet};

use mpcir_core::{CircuitView, IrError, NodeId};

/// For every node, the set of ids of its direct consumers.
pub fn node_successors(
    circuit: &CircuitView<'_>,
) -> Result<HashMap<NodeId, HashSet<NodeId>>, IrError> {
    let mut successors: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
    circuit.topological_traversal(|node| {
        let id = node.id()?;
        // Every node gets an entry, consumers or not.
        successors.entry(id).or_default();
        for input in node.input_node_ids()?.iter() {
            successors.entry(*input).or_default().insert(id);
        }
        Ok(())
    })?;
    Ok(successors)
}
