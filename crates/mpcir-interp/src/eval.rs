//! Topological evaluation with per-node value lists.
//!
//! The environment maps every evaluated node to the ordered list of its
//! output values; consumers read `env[producer][offset]`. Multi-output
//! nodes (Split, SIMD-fused gates, subcircuit calls) therefore need no
//! special casing on the consumer side.
//!
//! A fused node is evaluated group-wise: the input list is chunked into
//! `num_outputs` equal groups and the operation is applied to each group
//! independently, which also covers the plain single-output case where the
//! whole input list forms one group (n-ary gates fold left).

use std::collections::HashMap;

use mpcir_core::{CircuitView, ConstantPayload, IrError, ModuleView, NodeId, Operation};

use crate::value::{apply_binary, apply_unary, Value};

/// Node id → ordered output values.
pub type Environment = HashMap<NodeId, Vec<Value>>;

/// Evaluates a standalone circuit. Subcircuit calls are unsupported here;
/// use [`evaluate_module`] when the circuit calls others.
///
/// `inputs` seeds the environment, usually one single-value entry per
/// manifest input node. Returns the full environment after evaluation.
pub fn evaluate_circuit(
    circuit: &CircuitView<'_>,
    inputs: &Environment,
) -> Result<Environment, IrError> {
    let mut env = inputs.clone();
    evaluate_into(circuit, &mut env, None)?;
    Ok(env)
}

/// Evaluates a module's entry circuit, resolving subcircuit calls by
/// recursive descent.
///
/// The call graph is checked for cycles before any evaluation; a module
/// with direct or transitive recursion is rejected with
/// [`IrError::CycleIntroduced`].
pub fn evaluate_module(
    module: &ModuleView<'_>,
    inputs: &Environment,
) -> Result<Environment, IrError> {
    check_call_graph_acyclic(module)?;
    let entry = module.entry_circuit()?;
    let mut env = inputs.clone();
    evaluate_into(&entry, &mut env, Some(module))?;
    Ok(env)
}

/// Values at the circuit's manifest outputs, in manifest order.
pub fn output_values(
    circuit: &CircuitView<'_>,
    env: &Environment,
) -> Result<Vec<Value>, IrError> {
    let mut out = Vec::new();
    for id in circuit.output_node_ids()? {
        let values = env.get(&id).ok_or(IrError::MissingValue { id })?;
        out.extend(values.iter().copied());
    }
    Ok(out)
}

fn evaluate_into(
    circuit: &CircuitView<'_>,
    env: &mut Environment,
    module: Option<&ModuleView<'_>>,
) -> Result<(), IrError> {
    for node in circuit.nodes()? {
        let node = node?;
        let id = node.id()?;
        if env.contains_key(&id) {
            continue; // seeded input or already computed
        }

        // Read the inputs through their offsets.
        let input_ids = node.input_node_ids()?;
        let offsets = node.input_offsets()?;
        let mut args = Vec::with_capacity(input_ids.len());
        for (i, producer) in input_ids.iter().enumerate() {
            let values = env
                .get(producer)
                .ok_or(IrError::MissingValue { id: *producer })?;
            let offset = offsets.get(i).copied().unwrap_or(0) as usize;
            let value = values
                .get(offset)
                .ok_or(IrError::MissingValue { id: *producer })?;
            args.push(*value);
        }

        let op = node.operation()?;
        let result = match op {
            Operation::Input => {
                // Inputs are seeded by the caller.
                return Err(IrError::MissingValue { id });
            }
            Operation::Output => args,
            Operation::Constant => match node.constant()? {
                ConstantPayload::Scalar(scalar) => vec![Value::from(scalar)],
                // A vector constant acts as a multi-output node.
                ConstantPayload::Vector(vector) => crate::value::values_from_vector(vector),
                ConstantPayload::Matrix(_) | ConstantPayload::Blob(_) => {
                    return Err(IrError::UnsupportedOperation { op })
                }
            },
            Operation::Split => {
                let value = args.first().ok_or(IrError::MissingValue { id })?;
                value.split_bits()?
            }
            Operation::Merge => {
                let mut bits = 0u64;
                for (i, arg) in args.iter().enumerate() {
                    if arg.as_bool()? {
                        bits |= 1 << i;
                    }
                }
                let primitive = match node.output_types()?.first() {
                    Some(ty) => ty.primitive()?,
                    None => mpcir_core::PrimitiveType::UInt64,
                };
                vec![Value::from_bits(primitive, bits)?]
            }
            Operation::SelectOffset => args,
            Operation::Mux => evaluate_groups(op, &args, node.num_outputs()?)?,
            Operation::CallSubcircuit => {
                let module = module.ok_or(IrError::UnsupportedOperation { op })?;
                let callee = module.circuit_with_name(node.callee()?)?;

                // Bind the callee's inputs, in order, to this node's
                // argument values.
                let callee_inputs = callee.input_node_ids()?;
                if callee_inputs.len() != args.len() {
                    return Err(IrError::InconsistentRewrite {
                        reason: format!(
                            "call node {id} passes {} values to '{}' which declares {} inputs",
                            args.len(),
                            callee.name()?,
                            callee_inputs.len()
                        ),
                    });
                }
                let mut child_env: Environment = Environment::new();
                for (input_id, value) in callee_inputs.iter().zip(&args) {
                    child_env.insert(*input_id, vec![*value]);
                }
                evaluate_into(&callee, &mut child_env, Some(module))?;

                // The callee's outputs, in manifest order, are this node's
                // result list.
                let mut result = Vec::new();
                for output_id in callee.output_node_ids()? {
                    let values = child_env
                        .get(&output_id)
                        .ok_or(IrError::MissingValue { id: output_id })?;
                    result.extend(values.iter().copied());
                }
                result
            }
            Operation::Loop | Operation::Custom => {
                return Err(IrError::UnsupportedOperation { op })
            }
            _ => evaluate_groups(op, &args, node.num_outputs()?)?,
        };

        env.insert(id, result);
    }
    Ok(())
}

/// Applies `op` group-wise: `num_outputs` equal chunks of the argument
/// list, one output value per chunk. Within a chunk, binary operations
/// fold left over every member.
fn evaluate_groups(op: Operation, args: &[Value], num_outputs: u32) -> Result<Vec<Value>, IrError> {
    let groups = num_outputs.max(1) as usize;
    if args.is_empty() || args.len() % groups != 0 {
        return Err(IrError::TypeMismatch {
            reason: format!("{op} over {} inputs cannot form {groups} groups", args.len()),
        });
    }
    let chunk = args.len() / groups;

    let mut out = Vec::with_capacity(groups);
    for group in args.chunks(chunk) {
        let value = if op == Operation::Mux {
            if group.len() != 3 {
                return Err(IrError::TypeMismatch {
                    reason: format!("Mux group of size {}", group.len()),
                });
            }
            let choice = group[0].as_bool()?;
            if choice {
                group[2]
            } else {
                group[1]
            }
        } else if op.is_unary() {
            if group.len() != 1 {
                return Err(IrError::TypeMismatch {
                    reason: format!("{op} group of size {}", group.len()),
                });
            }
            apply_unary(op, &group[0])?
        } else if op.is_comparison() {
            if group.len() != 2 {
                return Err(IrError::TypeMismatch {
                    reason: format!("{op} group of size {}", group.len()),
                });
            }
            apply_binary(op, &group[0], &group[1])?
        } else if op.is_binary() {
            let mut acc = group[0];
            for value in &group[1..] {
                acc = apply_binary(op, &acc, value)?;
            }
            acc
        } else {
            return Err(IrError::UnsupportedOperation { op });
        };
        out.push(value);
    }
    Ok(out)
}

fn check_call_graph_acyclic(module: &ModuleView<'_>) -> Result<(), IrError> {
    // callee sets per circuit
    let mut edges: HashMap<String, Vec<String>> = HashMap::new();
    for name in module.circuit_names()? {
        let circuit = module.circuit_with_name(&name)?;
        let mut callees = Vec::new();
        circuit.topological_traversal(|node| {
            if node.is_subcircuit_call()? {
                let callee = node.callee()?;
                if !callee.is_empty() {
                    callees.push(callee.to_string());
                }
            }
            Ok(())
        })?;
        edges.insert(name, callees);
    }

    // Iterative DFS with three colors.
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let names: Vec<&String> = edges.keys().collect();
    for root in names {
        if marks.contains_key(root.as_str()) {
            continue;
        }
        // stack of (node, next child index)
        let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
        marks.insert(root.as_str(), Mark::Visiting);
        while let Some((current, child)) = stack.pop() {
            let callees = edges.get(current).map(Vec::as_slice).unwrap_or(&[]);
            if child < callees.len() {
                stack.push((current, child + 1));
                let next = callees[child].as_str();
                match marks.get(next) {
                    Some(Mark::Visiting) => {
                        return Err(IrError::CycleIntroduced {
                            reason: format!("recursive call chain through '{next}'"),
                        });
                    }
                    Some(Mark::Done) => {}
                    None => {
                        if edges.contains_key(next) {
                            marks.insert(next, Mark::Visiting);
                            stack.push((next, 0));
                        }
                        // Unresolved callee: reported by validation, not here.
                    }
                }
            } else {
                marks.insert(current, Mark::Done);
            }
        }
    }
    Ok(())
}
