//! Call-stack usage analysis.

use indexmap::IndexMap;

use mpcir_core::{CircuitView, IrError, ModuleView};

/// Histogram of callee name → call count over the subcircuit-call nodes of
/// one circuit.
pub fn circuit_call_frequencies(
    circuit: &CircuitView<'_>,
) -> Result<IndexMap<String, u64>, IrError> {
    let mut frequencies: IndexMap<String, u64> = IndexMap::new();
    circuit.topological_traversal(|node| {
        if node.is_subcircuit_call()? {
            let callee = node.callee()?;
            *frequencies.entry(callee.to_string()).or_insert(0) += 1;
        }
        Ok(())
    })?;
    Ok(frequencies)
}

/// [`circuit_call_frequencies`] lifted to a module: circuit name → its
/// histogram.
pub fn module_call_frequencies(
    module: &ModuleView<'_>,
) -> Result<IndexMap<String, IndexMap<String, u64>>, IrError> {
    let mut result = IndexMap::new();
    for name in module.circuit_names()? {
        let circuit = module.circuit_with_name(&name)?;
        let frequencies = circuit_call_frequencies(&circuit)?;
        result.insert(name, frequencies);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mpcir_core::{Circuit, Module, Operation};

    fn calling_circuit(name: &str, callees: &[&str]) -> Circuit {
        let mut c = Circuit::new(name);
        let i = c.add_node(Operation::Input).id;
        for callee in callees {
            let call = c.add_node(Operation::CallSubcircuit);
            call.callee = Some(callee.to_string());
            call.inputs = [i].into_iter().collect();
        }
        c.set_input_node_ids(vec![i]);
        c
    }

    #[test]
    fn counts_calls_per_callee() {
        let c = calling_circuit("main", &["f", "g", "f", "f"]);
        let freq = circuit_call_frequencies(&CircuitView::Object(&c)).unwrap();
        assert_eq!(freq["f"], 3);
        assert_eq!(freq["g"], 1);
        assert_eq!(freq.len(), 2);
    }

    #[test]
    fn circuit_without_calls_yields_empty_histogram() {
        let c = calling_circuit("main", &[]);
        let freq = circuit_call_frequencies(&CircuitView::Object(&c)).unwrap();
        assert!(freq.is_empty());
    }

    #[test]
    fn module_histogram_keyed_by_circuit_name() {
        let mut m = Module::new("main");
        m.insert_circuit(calling_circuit("main", &["helper", "helper"]));
        m.insert_circuit(calling_circuit("helper", &[]));

        let all = module_call_frequencies(&ModuleView::Object(&m)).unwrap();
        assert_eq!(all["main"]["helper"], 2);
        assert!(all["helper"].is_empty());
    }
}
