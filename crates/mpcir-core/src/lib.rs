//! Core data model and storage container for the MPCIR circuit IR.
//!
//! A program is a [`Module`]: a named collection of [`Circuit`]s with one
//! designated entry. A circuit is a directed acyclic hypergraph of typed
//! operations, stored as a node sequence in topological order. Edges are
//! `(NodeId, output offset)` references, never pointers, so ownership is
//! strictly tree-shaped: modules own circuits, circuits own nodes, nodes own
//! their type descriptors and constant payloads.
//!
//! The same logical IR exists in two storage states. *Packed* is a
//! contiguous serialized byte buffer that can be read through zero-copy
//! buffer readers; *unpacked* is a materialized object tree that supports
//! mutation. [`CircuitContext`] and [`ModuleContext`] own one state at a
//! time and provide the transitions between them, and [`CircuitView`] /
//! [`ModuleView`] give read-only access that is polymorphic over the state.
//!
//! Circuits are constructed through the append-only [`CircuitBuilder`] /
//! [`ModuleBuilder`], which emit the serialized form directly. Structural
//! rewrites (subcircuit factoring, SIMD fusion) live on [`Circuit`] and
//! only operate on the unpacked tree.

pub mod annotation;
pub mod builder;
pub mod circuit;
pub mod codec;
pub mod container;
pub mod error;
pub mod generate;
pub mod id;
pub mod module;
pub mod node;
pub mod ops;
pub mod payload;
pub mod rewrite;
pub mod types;
pub mod view;

pub use builder::{CircuitBuilder, ModuleBuilder, TypeIndex};
pub use circuit::Circuit;
pub use codec::read::{CircuitReader, DataTypeReader, ModuleReader, NodeReader};
pub use container::{CircuitContext, ModuleContext};
pub use error::IrError;
pub use id::NodeId;
pub use module::Module;
pub use node::Node;
pub use ops::Operation;
pub use payload::{ConstantPayload, MatrixValue, ScalarValue, VectorValue};
pub use rewrite::SubcircuitReplacement;
pub use types::{DataType, PrimitiveType, SecurityLevel};
pub use view::{CircuitView, DataTypeView, ModuleView, NodeView};
