//! Reference plaintext evaluator for MPCIR circuits.
//!
//! A topological interpreter used as a test oracle: it walks a circuit's
//! node sequence once, keeps an environment mapping node ids to their
//! output value lists, and resolves subcircuit calls by recursive descent
//! through the enclosing module. It makes no attempt at being fast or
//! secure; protocol backends own the real evaluation story.

pub mod eval;
pub mod value;

pub use eval::{evaluate_circuit, evaluate_module, output_values, Environment};
pub use value::Value;
