//! Error types for the MPCIR core.
//!
//! Uses `thiserror` for structured, matchable error variants. All errors are
//! returned to the caller; nothing is recovered inside the core. File I/O
//! errors pass through with their platform detail attached.

use crate::id::NodeId;
use crate::ops::Operation;
use thiserror::Error;

/// Errors produced by the MPCIR core.
#[derive(Debug, Error)]
pub enum IrError {
    /// A node id was not found in the circuit.
    #[error("node not found: {id}")]
    NodeNotFound { id: NodeId },

    /// A named circuit was not found in the module.
    #[error("circuit not found: '{name}'")]
    CircuitNotFound { name: String },

    /// A caller-supplied identifier collides with an already-assigned one.
    #[error("duplicate identifier: {id} is already assigned")]
    DuplicateIdentifier { id: NodeId },

    /// A view kind was requested that is inconsistent with the container
    /// state (e.g. a buffer view over an unpacked container).
    #[error("wrong container state: {reason}")]
    WrongState { reason: &'static str },

    /// A constant payload does not decode under the declared type, or a
    /// type-directed operation was applied to an incompatible type.
    #[error("type mismatch: {reason}")]
    TypeMismatch { reason: String },

    /// The evaluator reached an operation it does not implement.
    #[error("unsupported operation: {op}")]
    UnsupportedOperation { op: Operation },

    /// The evaluator lacks an input value for a node.
    #[error("missing value for node {id}")]
    MissingValue { id: NodeId },

    /// The arguments to a rewrite do not form a self-consistent
    /// specification.
    #[error("inconsistent rewrite: {reason}")]
    InconsistentRewrite { reason: String },

    /// A rewrite or a call graph would introduce a cyclic dependency.
    #[error("cycle introduced: {reason}")]
    CycleIntroduced { reason: String },

    /// Serialized bytes are malformed or not a circuit/module buffer.
    #[error("decode error: {0}")]
    Decode(#[from] mpcir_wire::DecodeError),

    /// A file operation failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
