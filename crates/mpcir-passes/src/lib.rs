//! Analyses and rewrite drivers over the MPCIR circuit IR.
//!
//! Every analysis takes a read-only [`CircuitView`](mpcir_core::CircuitView)
//! and returns a freshly allocated map; nothing is cached on the circuit.
//! The rewrite drivers compose the analyses with the structural rewrites of
//! `mpcir-core`: instruction vectorization groups same-operation nodes by
//! instruction depth and fuses them into SIMD nodes, and subcircuit
//! factoring extracts a matched node set into a standalone circuit and
//! replaces it by a call.

pub mod callstack;
pub mod depth;
pub mod factor;
pub mod operations;
pub mod successors;
pub mod vectorize;

pub use callstack::{circuit_call_frequencies, module_call_frequencies};
pub use depth::{node_depths, node_instruction_depths};
pub use factor::{extract_subcircuit, factor_into_subcircuit, ExtractedSubcircuit};
pub use operations::{circuit_operation_histogram, module_operation_histogram};
pub use successors::node_successors;
pub use vectorize::{vectorize_all_instructions, vectorize_instructions, VectorizeReport};
