//! Synthetic circuit and module generators.
//!
//! Deterministic builders for test fixtures and load experiments: a plain
//! two-party module with one call, a gate chain of configurable size, and a
//! module that threads a chaining state through many rounds of calls to a
//! generated compression circuit. All output is produced through the
//! regular builders, so every generated buffer is a well-formed container.

use crate::builder::{CircuitBuilder, ModuleBuilder};
use crate::error::IrError;
use crate::id::NodeId;
use crate::ops::Operation;
use crate::types::{DataType, PrimitiveType, SecurityLevel};

/// A two-circuit module: `c1` forwards its two party inputs into a call to
/// `c2`, which computes their conjunction.
pub fn module_with_call() -> Result<Vec<u8>, IrError> {
    let mut mb = ModuleBuilder::new();
    mb.set_entry("c1");

    {
        let c2 = mb.add_circuit("c2");
        let secure = c2.add_data_type(DataType::secure(PrimitiveType::Bool));
        let plain = c2.add_data_type(DataType::plaintext(PrimitiveType::Bool));
        let a = c2.add_input_annotated(secure, "party: 1");
        let b = c2.add_input_annotated(secure, "party: 2");
        let and = c2.add_node(Operation::And, &[a, b], &[]);
        c2.add_output(plain, &[and], &[]);
    }
    {
        let c1 = mb.add_circuit("c1");
        let secure = c1.add_data_type(DataType::secure(PrimitiveType::Bool));
        let plain = c1.add_data_type(DataType::plaintext(PrimitiveType::Bool));
        let a = c1.add_input_annotated(secure, "party: 1");
        let b = c1.add_input_annotated(secure, "party: 2");
        let call = c1.add_call("c2", &[a, b], &[], 1);
        c1.add_output(plain, &[call], &[]);
    }

    mb.finish()
}

/// A single circuit of roughly `total_nodes` nodes: a tenth inputs, a tenth
/// constants, the bulk a multiplication chain, a tenth outputs reading
/// spread positions of the chain. Deterministic, so repeated generation
/// yields identical buffers.
pub fn multiplication_chain_circuit(total_nodes: usize) -> Result<Vec<u8>, IrError> {
    let num_inputs = total_nodes / 10 + 1;
    let num_constants = total_nodes / 10 + 1;
    let num_outputs = total_nodes / 10 + 1;
    let num_gates = total_nodes.saturating_sub(num_inputs + num_constants + num_outputs);

    let mut cb = CircuitBuilder::new(format!("chain_{total_nodes}_nodes"));
    let secure_int = cb.add_data_type(DataType::secure(PrimitiveType::Int32));
    let plain_int = cb.add_data_type(DataType {
        primitive: PrimitiveType::Int32,
        security: SecurityLevel::Plaintext,
        shape: Vec::new(),
        annotations: String::new(),
    });

    let mut producers: Vec<NodeId> = Vec::new();
    for _ in 0..num_inputs {
        producers.push(cb.add_input(secure_int));
    }
    for i in 0..num_constants {
        producers.push(cb.add_constant(i as i32));
    }
    for i in 0..num_gates {
        let left = producers[i % producers.len()];
        let right = producers[(i + 1) % producers.len()];
        producers.push(cb.add_node(Operation::Mul, &[left, right], &[]));
    }

    // Fixed-stride positions stand in for the sampled outputs of a load
    // generator; determinism keeps generated fixtures reproducible.
    for i in 0..num_outputs {
        let producer = producers[(i * 7 + 3) % producers.len()];
        cb.add_output(plain_int, &[producer], &[]);
    }

    cb.finish()
}

/// A module threading a chaining state through `rounds` calls to a
/// generated compression circuit.
///
/// The entry circuit declares `buffer_bits` party-1 inputs and `state_bits`
/// party-2 inputs. Every round calls the compression circuit with the
/// buffer and the current state; from the second round on, the state
/// operands read the previous call's outputs through offsets
/// `0..state_bits`. The final state is exposed on the entry outputs the
/// same way.
pub fn chained_compression_module(
    rounds: usize,
    buffer_bits: usize,
    state_bits: usize,
) -> Result<Vec<u8>, IrError> {
    if rounds == 0 || buffer_bits == 0 || state_bits == 0 {
        return Err(IrError::InconsistentRewrite {
            reason: "chained compression module needs rounds, buffer, and state".into(),
        });
    }

    let mut mb = ModuleBuilder::new();
    mb.set_entry("main");

    {
        let leaf = mb.add_circuit("compress");
        let secure = leaf.add_data_type(DataType::secure(PrimitiveType::Bool));
        let mut buffer = Vec::with_capacity(buffer_bits);
        for _ in 0..buffer_bits {
            buffer.push(leaf.add_input(secure));
        }
        let mut state = Vec::with_capacity(state_bits);
        for _ in 0..state_bits {
            state.push(leaf.add_input(secure));
        }
        for (i, &state_bit) in state.iter().enumerate() {
            let mixed_in = buffer[(i * 7 + 3) % buffer_bits];
            let mixed = leaf.add_node(Operation::Xor, &[mixed_in, state_bit], &[]);
            leaf.add_output(secure, &[mixed], &[]);
        }
    }

    let main = mb.add_circuit("main");
    let secure = main.add_data_type(DataType::secure(PrimitiveType::Bool));
    let plain = main.add_data_type(DataType::plaintext(PrimitiveType::Bool));

    let mut buffer = Vec::with_capacity(buffer_bits);
    for _ in 0..buffer_bits {
        buffer.push(main.add_input_annotated(secure, "party: 1"));
    }
    let mut state: Vec<NodeId> = Vec::with_capacity(state_bits);
    for _ in 0..state_bits {
        state.push(main.add_input_annotated(secure, "party: 2"));
    }

    let mut offsets: Vec<u32> = Vec::new();
    let mut current_call = NodeId(0);
    for round in 0..rounds {
        let mut inputs = Vec::with_capacity(buffer_bits + state_bits);
        inputs.extend_from_slice(&buffer);
        inputs.extend_from_slice(&state);
        current_call = main.add_call("compress", &inputs, &offsets, state_bits as u32);

        // From the second round on, the state operands select the previous
        // call's outputs by offset.
        if round == 0 {
            offsets = vec![0; buffer_bits];
            offsets.extend(0..state_bits as u32);
        }
        state.clear();
        state.resize(state_bits, current_call);
    }

    for i in 0..state_bits as u32 {
        main.add_output(plain, &[current_call], &[i]);
    }

    mb.finish()
}
