//! Read-only views polymorphic over the two storage states.
//!
//! A view is a tagged variant: either a zero-copy reader over a serialized
//! buffer or a borrow of the unpacked object tree. One set of accessors
//! matches on the tag, so analyses and traversals are written once and run
//! over either state. Only the object variant supports mutation, and that
//! goes through `&mut` access to the owned types directly.

use std::borrow::Cow;

use crate::annotation;
use crate::circuit::Circuit;
use crate::codec::read::{CircuitReader, DataTypeReader, ModuleReader, NodeReader};
use crate::error::IrError;
use crate::id::NodeId;
use crate::module::Module;
use crate::node::Node;
use crate::ops::Operation;
use crate::payload::ConstantPayload;
use crate::types::{DataType, PrimitiveType, SecurityLevel};

/// Read-only view of a type descriptor.
#[derive(Debug, Clone, Copy)]
pub enum DataTypeView<'a> {
    Buffer(DataTypeReader<'a>),
    Object(&'a DataType),
}

impl<'a> DataTypeView<'a> {
    pub fn primitive(&self) -> Result<PrimitiveType, IrError> {
        match self {
            DataTypeView::Buffer(r) => Ok(r.primitive()?),
            DataTypeView::Object(ty) => Ok(ty.primitive),
        }
    }

    pub fn security(&self) -> Result<SecurityLevel, IrError> {
        match self {
            DataTypeView::Buffer(r) => Ok(r.security()?),
            DataTypeView::Object(ty) => Ok(ty.security),
        }
    }

    pub fn annotations(&self) -> Result<&'a str, IrError> {
        match self {
            DataTypeView::Buffer(r) => Ok(r.annotations()?),
            DataTypeView::Object(ty) => Ok(&ty.annotations),
        }
    }

    pub fn attribute(&self, key: &str) -> Result<&'a str, IrError> {
        Ok(annotation::attribute(self.annotations()?, key))
    }

    /// Materializes an owned descriptor regardless of the view kind.
    pub fn to_owned(&self) -> Result<DataType, IrError> {
        match self {
            DataTypeView::Buffer(r) => Ok(r.to_owned()?),
            DataTypeView::Object(ty) => Ok((*ty).clone()),
        }
    }
}

/// Read-only view of a node.
#[derive(Debug, Clone, Copy)]
pub enum NodeView<'a> {
    Buffer(NodeReader<'a>),
    Object(&'a Node),
}

impl<'a> NodeView<'a> {
    pub fn id(&self) -> Result<NodeId, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r.id()?),
            NodeView::Object(n) => Ok(n.id),
        }
    }

    pub fn operation(&self) -> Result<Operation, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r.operation()?),
            NodeView::Object(n) => Ok(n.operation),
        }
    }

    pub fn input_node_ids(&self) -> Result<Cow<'a, [NodeId]>, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(Cow::Owned(r.input_node_ids()?)),
            NodeView::Object(n) => Ok(Cow::Borrowed(n.inputs.as_slice())),
        }
    }

    /// Explicit offset list; empty when absent.
    pub fn input_offsets(&self) -> Result<Vec<u32>, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r.input_offsets()?),
            NodeView::Object(n) => Ok(n
                .input_offsets
                .as_ref()
                .map(|o| o.to_vec())
                .unwrap_or_default()),
        }
    }

    pub fn uses_input_offsets(&self) -> Result<bool, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r.uses_input_offsets()?),
            NodeView::Object(n) => Ok(n.uses_input_offsets()),
        }
    }

    pub fn num_inputs(&self) -> Result<usize, IrError> {
        Ok(self.input_node_ids()?.len())
    }

    pub fn num_outputs(&self) -> Result<u32, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r.num_outputs()?),
            NodeView::Object(n) => Ok(n.num_outputs),
        }
    }

    /// Custom-operation name; `""` when absent.
    pub fn custom_op_name(&self) -> Result<&'a str, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r.custom_op_name()?),
            NodeView::Object(n) => Ok(n.custom_op_name.as_deref().unwrap_or("")),
        }
    }

    /// Callee circuit name; `""` when absent.
    pub fn callee(&self) -> Result<&'a str, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r.callee()?),
            NodeView::Object(n) => Ok(n.callee.as_deref().unwrap_or("")),
        }
    }

    pub fn annotations(&self) -> Result<&'a str, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r.annotations()?),
            NodeView::Object(n) => Ok(&n.annotations),
        }
    }

    pub fn attribute(&self, key: &str) -> Result<&'a str, IrError> {
        Ok(annotation::attribute(self.annotations()?, key))
    }

    pub fn input_types(&self) -> Result<Vec<DataTypeView<'a>>, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r
                .input_types()?
                .into_iter()
                .map(DataTypeView::Buffer)
                .collect()),
            NodeView::Object(n) => Ok(n.input_types.iter().map(DataTypeView::Object).collect()),
        }
    }

    pub fn output_types(&self) -> Result<Vec<DataTypeView<'a>>, IrError> {
        match self {
            NodeView::Buffer(r) => Ok(r
                .output_types()?
                .into_iter()
                .map(DataTypeView::Buffer)
                .collect()),
            NodeView::Object(n) => Ok(n.output_types.iter().map(DataTypeView::Object).collect()),
        }
    }

    /// Constant payload, checked against the declared output type.
    pub fn constant(&self) -> Result<ConstantPayload, IrError> {
        match self {
            NodeView::Buffer(r) => {
                let payload = r.payload()?.ok_or(IrError::MissingValue { id: r.id()? })?;
                if let Some(declared) = r.output_types()?.first() {
                    payload.check_type(&declared.to_owned()?)?;
                }
                Ok(payload)
            }
            NodeView::Object(n) => Ok(n.constant()?.clone()),
        }
    }

    pub fn is_constant(&self) -> Result<bool, IrError> {
        Ok(self.operation()? == Operation::Constant)
    }

    pub fn is_subcircuit_call(&self) -> Result<bool, IrError> {
        Ok(self.operation()? == Operation::CallSubcircuit)
    }
}

/// Read-only view of a circuit.
#[derive(Debug, Clone, Copy)]
pub enum CircuitView<'a> {
    Buffer(CircuitReader<'a>),
    Object(&'a Circuit),
}

impl<'a> CircuitView<'a> {
    pub fn name(&self) -> Result<&'a str, IrError> {
        match self {
            CircuitView::Buffer(r) => Ok(r.name()?),
            CircuitView::Object(c) => Ok(&c.name),
        }
    }

    pub fn annotations(&self) -> Result<&'a str, IrError> {
        match self {
            CircuitView::Buffer(r) => Ok(r.annotations()?),
            CircuitView::Object(c) => Ok(&c.annotations),
        }
    }

    pub fn attribute(&self, key: &str) -> Result<&'a str, IrError> {
        Ok(annotation::attribute(self.annotations()?, key))
    }

    pub fn input_node_ids(&self) -> Result<Vec<NodeId>, IrError> {
        match self {
            CircuitView::Buffer(r) => Ok(r.input_node_ids()?),
            CircuitView::Object(c) => Ok(c.inputs.clone()),
        }
    }

    pub fn output_node_ids(&self) -> Result<Vec<NodeId>, IrError> {
        match self {
            CircuitView::Buffer(r) => Ok(r.output_node_ids()?),
            CircuitView::Object(c) => Ok(c.outputs.clone()),
        }
    }

    pub fn input_types(&self) -> Result<Vec<DataTypeView<'a>>, IrError> {
        match self {
            CircuitView::Buffer(r) => Ok(r
                .input_types()?
                .into_iter()
                .map(DataTypeView::Buffer)
                .collect()),
            CircuitView::Object(c) => Ok(c.input_types.iter().map(DataTypeView::Object).collect()),
        }
    }

    pub fn output_types(&self) -> Result<Vec<DataTypeView<'a>>, IrError> {
        match self {
            CircuitView::Buffer(r) => Ok(r
                .output_types()?
                .into_iter()
                .map(DataTypeView::Buffer)
                .collect()),
            CircuitView::Object(c) => Ok(c.output_types.iter().map(DataTypeView::Object).collect()),
        }
    }

    pub fn num_inputs(&self) -> Result<usize, IrError> {
        Ok(self.input_node_ids()?.len())
    }

    pub fn num_outputs(&self) -> Result<usize, IrError> {
        Ok(self.output_node_ids()?.len())
    }

    pub fn num_nodes(&self) -> Result<usize, IrError> {
        match self {
            CircuitView::Buffer(r) => Ok(r.num_nodes()?),
            CircuitView::Object(c) => Ok(c.num_nodes()),
        }
    }

    /// Node views in topological order.
    ///
    /// The sequence is its own topological order, so this is the traversal
    /// every analysis builds on.
    pub fn nodes(&self) -> Result<Vec<Result<NodeView<'a>, IrError>>, IrError> {
        match self {
            CircuitView::Buffer(r) => Ok(r
                .nodes()
                .map(|n| n.map(NodeView::Buffer).map_err(IrError::from))
                .collect()),
            CircuitView::Object(c) => {
                Ok(c.nodes.iter().map(|n| Ok(NodeView::Object(n))).collect())
            }
        }
    }

    /// Visits every node in topological order.
    pub fn topological_traversal(
        &self,
        mut visit: impl FnMut(&NodeView<'a>) -> Result<(), IrError>,
    ) -> Result<(), IrError> {
        for node in self.nodes()? {
            visit(&node?)?;
        }
        Ok(())
    }

    /// Finds a node by id. O(n) over either representation.
    pub fn node_with_id(&self, id: NodeId) -> Result<NodeView<'a>, IrError> {
        match self {
            CircuitView::Buffer(r) => match r.node_with_id(id)? {
                Some(node) => Ok(NodeView::Buffer(node)),
                None => Err(IrError::NodeNotFound { id }),
            },
            CircuitView::Object(c) => Ok(NodeView::Object(c.node_with_id(id)?)),
        }
    }

    /// Materializes an owned circuit regardless of the view kind.
    pub fn to_owned(&self) -> Result<Circuit, IrError> {
        match self {
            CircuitView::Buffer(r) => {
                let mut nodes = Vec::new();
                for node in r.nodes() {
                    nodes.push(node?.to_owned()?);
                }
                let mut circuit = Circuit::new(r.name()?);
                circuit.annotations = r.annotations()?.to_string();
                circuit.inputs = r.input_node_ids()?;
                circuit.outputs = r.output_node_ids()?;
                for ty in r.input_types()? {
                    circuit.input_types.push(ty.to_owned()?);
                }
                for ty in r.output_types()? {
                    circuit.output_types.push(ty.to_owned()?);
                }
                circuit.nodes = nodes;
                Ok(circuit)
            }
            CircuitView::Object(c) => Ok((*c).clone()),
        }
    }
}

/// Read-only view of a module.
#[derive(Debug, Clone, Copy)]
pub enum ModuleView<'a> {
    Buffer(ModuleReader<'a>),
    Object(&'a Module),
}

impl<'a> ModuleView<'a> {
    pub fn entry_name(&self) -> Result<String, IrError> {
        match self {
            ModuleView::Buffer(r) => Ok(r.entry_name()?.to_string()),
            ModuleView::Object(m) => Ok(m.entry.clone()),
        }
    }

    pub fn annotations(&self) -> Result<String, IrError> {
        match self {
            ModuleView::Buffer(r) => Ok(r.annotations()?.to_string()),
            ModuleView::Object(m) => Ok(m.annotations.clone()),
        }
    }

    pub fn attribute(&self, key: &str) -> Result<String, IrError> {
        Ok(annotation::attribute(&self.annotations()?, key).to_string())
    }

    pub fn circuit_names(&self) -> Result<Vec<String>, IrError> {
        match self {
            ModuleView::Buffer(r) => Ok(r.circuit_names()?),
            ModuleView::Object(m) => Ok(m.circuit_names()),
        }
    }

    pub fn circuit_with_name(&self, name: &str) -> Result<CircuitView<'a>, IrError> {
        match self {
            ModuleView::Buffer(r) => match r.circuit_with_name(name)? {
                Some(circuit) => Ok(CircuitView::Buffer(circuit)),
                None => Err(IrError::CircuitNotFound {
                    name: name.to_string(),
                }),
            },
            ModuleView::Object(m) => (*m).circuit(name),
        }
    }

    pub fn entry_circuit(&self) -> Result<CircuitView<'a>, IrError> {
        let entry = self.entry_name()?;
        self.circuit_with_name(&entry)
    }
}
