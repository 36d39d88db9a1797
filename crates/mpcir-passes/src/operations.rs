//! Operation histograms.

use indexmap::IndexMap;

use mpcir_core::{CircuitView, IrError, ModuleView};

/// Histogram of operation name → count over one circuit.
pub fn circuit_operation_histogram(
    circuit: &CircuitView<'_>,
) -> Result<IndexMap<&'static str, u64>, IrError> {
    let mut histogram: IndexMap<&'static str, u64> = IndexMap::new();
    circuit.topological_traversal(|node| {
        *histogram.entry(node.operation()?.name()).or_insert(0) += 1;
        Ok(())
    })?;
    Ok(histogram)
}

/// [`circuit_operation_histogram`] lifted to a module: circuit name → its
/// histogram.
pub fn module_operation_histogram(
    module: &ModuleView<'_>,
) -> Result<IndexMap<String, IndexMap<&'static str, u64>>, IrError> {
    let mut result = IndexMap::new();
    for name in module.circuit_names()? {
        let circuit = module.circuit_with_name(&name)?;
        let histogram = circuit_operation_histogram(&circuit)?;
        result.insert(name, histogram);
    }
    Ok(result)
}
