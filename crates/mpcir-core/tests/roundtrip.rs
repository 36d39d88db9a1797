//! Round-trip laws over the storage container and the wire format.

use proptest::prelude::*;

use mpcir_core::{
    Circuit, CircuitBuilder, CircuitContext, ConstantPayload, DataType, Module, ModuleContext,
    NodeId, Operation, PrimitiveType,
};

fn not_circuit() -> Circuit {
    let mut c = Circuit::new("not1");
    let i = c.add_node(Operation::Input).id;
    let n = c.add_node(Operation::Not);
    n.inputs = [i].into_iter().collect();
    let n = n.id;
    let o = c.add_node(Operation::Output);
    o.inputs = [n].into_iter().collect();
    let o = o.id;
    c.set_input_node_ids(vec![i]);
    c.set_output_node_ids(vec![o]);
    c.input_types = vec![DataType::secure(PrimitiveType::Bool)];
    c.output_types = vec![DataType::secure(PrimitiveType::Bool)];
    c
}

#[test]
fn pack_unpack_identity_on_observable_ir() {
    let circuit = not_circuit();
    let mut ctx = CircuitContext::from_circuit(circuit.clone());
    ctx.pack().unwrap();
    let roundtripped = ctx.mutable().unwrap().clone();
    assert_eq!(roundtripped, circuit);
}

#[test]
fn write_read_identity_on_observable_ir() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.fs");

    let circuit = not_circuit();
    CircuitContext::from_circuit(circuit.clone())
        .write_to_file(&path)
        .unwrap();

    let mut reread = CircuitContext::new();
    reread.read_from_file(&path).unwrap();
    assert_eq!(*reread.mutable().unwrap(), circuit);
}

#[test]
fn io_only_circuit_packs_unpacks_without_error() {
    let mut c = Circuit::new("wire");
    let i = c.add_node(Operation::Input).id;
    let o = c.add_node(Operation::Output);
    o.inputs = [i].into_iter().collect();
    let o = o.id;
    c.set_input_node_ids(vec![i]);
    c.set_output_node_ids(vec![o]);

    let mut ctx = CircuitContext::from_circuit(c.clone());
    ctx.pack().unwrap();
    let back = ctx.mutable().unwrap();
    back.validate().unwrap();
    assert_eq!(*back, c);
}

#[test]
fn copy_of_module_container_is_deeply_independent() {
    let mut module = Module::new("not1");
    module.insert_circuit(not_circuit());
    let mut ctx = ModuleContext::from_module(module);

    let mut copy = ctx.create_copy();
    copy.mutable()
        .unwrap()
        .circuit_mut("not1")
        .unwrap()
        .set_attribute("owner", "5");

    let original = ctx.mutable().unwrap().circuit_mut("not1").unwrap();
    assert_eq!(original.attribute("owner"), "");
}

#[test]
fn unknown_annotation_keys_survive_roundtrips() {
    let mut circuit = not_circuit();
    circuit.annotations = "vendor-hint: opaque, owner: 1".into();
    circuit.nodes[0].annotations = "weird.key: value".into();

    let mut ctx = CircuitContext::from_circuit(circuit);
    ctx.pack().unwrap();
    let back = ctx.mutable().unwrap();
    assert_eq!(back.attribute("vendor-hint"), "opaque");
    assert_eq!(back.nodes[0].attribute("weird.key"), "value");
}

#[test]
fn deep_call_chains_serialize_and_reread_identically() {
    for rounds in [1usize, 10, 100] {
        let bytes = mpcir_core::generate::chained_compression_module(rounds, 32, 16).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chain.mfs");
        let ctx = ModuleContext::from_bytes(bytes).unwrap();
        ctx.write_to_file(&path).unwrap();

        let mut reread = ModuleContext::new();
        reread.read_from_file(&path).unwrap();

        let mut first = ctx;
        let mut second = reread;
        let a = first.mutable().unwrap();
        let b = second.mutable().unwrap();
        assert_eq!(a.entry, b.entry);
        assert_eq!(a.circuit_names(), b.circuit_names());
        for name in a.circuit_names() {
            assert_eq!(
                a.circuit_mut(&name).unwrap(),
                b.circuit_mut(&name).unwrap(),
                "circuit {name} differs after reread at {rounds} rounds"
            );
        }
        b.validate().unwrap();
    }
}

#[test]
fn builder_bytes_decode_to_the_same_circuit_as_the_object_path() {
    let mut builder = CircuitBuilder::new("mixer");
    let ty = builder.add_data_type(DataType::secure(PrimitiveType::Bool));
    let a = builder.add_input(ty);
    let b = builder.add_input(ty);
    let x = builder.add_node(Operation::Xor, &[a, b], &[]);
    let k = builder.add_constant(true);
    let g = builder.add_node(Operation::And, &[x, k], &[]);
    builder.add_output(ty, &[g], &[]);
    let bytes = builder.finish().unwrap();

    let mut ctx = CircuitContext::from_bytes(bytes).unwrap();
    let circuit = ctx.mutable().unwrap();
    circuit.validate().unwrap();
    assert_eq!(circuit.num_nodes(), 6);
    assert_eq!(
        circuit.node_with_id(k).unwrap().payload,
        Some(ConstantPayload::from(true))
    );
}

// ---------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------

fn arb_operation() -> impl Strategy<Value = Operation> {
    prop::sample::select(vec![
        Operation::And,
        Operation::Or,
        Operation::Xor,
        Operation::Nand,
        Operation::Add,
        Operation::Mul,
        Operation::Eq,
    ])
}

prop_compose! {
    /// A random valid gate chain: inputs followed by binary gates reading
    /// earlier nodes only.
    fn arb_chain_circuit()(
        num_inputs in 1usize..5,
        gate_ops in prop::collection::vec(arb_operation(), 1..20),
        annotation in "[a-z]{0,8}",
    ) -> Circuit {
        let mut c = Circuit::new("random");
        c.annotations = annotation;
        let mut ids: Vec<NodeId> = Vec::new();
        for _ in 0..num_inputs {
            ids.push(c.add_node(Operation::Input).id);
        }
        c.set_input_node_ids(ids.clone());
        for (i, op) in gate_ops.into_iter().enumerate() {
            let left = ids[i % ids.len()];
            let right = ids[(i / 2) % ids.len()];
            let gate = c.add_node(op);
            gate.inputs = [left, right].into_iter().collect();
            ids.push(gate.id);
        }
        c
    }
}

proptest! {
    #[test]
    fn encode_decode_is_identity_on_random_circuits(circuit in arb_chain_circuit()) {
        let mut ctx = CircuitContext::from_circuit(circuit.clone());
        ctx.pack().unwrap();
        prop_assert_eq!(ctx.mutable().unwrap().clone(), circuit);
    }

    #[test]
    fn repacking_packed_bytes_is_stable(circuit in arb_chain_circuit()) {
        // pack -> unpack -> pack yields identical canonical bytes.
        let mut ctx = CircuitContext::from_circuit(circuit);
        ctx.pack().unwrap();
        let first = ctx.bytes().unwrap().to_vec();
        ctx.mutable().unwrap();
        ctx.pack().unwrap();
        prop_assert_eq!(ctx.bytes().unwrap(), first.as_slice());
    }
}
