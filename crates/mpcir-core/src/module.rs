//! Modules: named collections of circuits with one designated entry.
//!
//! Inter-circuit calls are forward name references resolved at module scope;
//! no back pointer is ever stored. Inside an unpacked module each circuit is
//! held either as its serialized buffer or as an unpacked object. The first
//! mutable access to a named circuit transparently unpacks it and discards
//! the buffer; read-only access over a still-packed entry goes through a
//! buffer reader without unpacking.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};

use crate::annotation;
use crate::circuit::Circuit;
use crate::codec::encode::encode_circuit;
use crate::codec::read::CircuitReader;
use crate::error::IrError;
use crate::view::CircuitView;

/// One member circuit, packed or unpacked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum CircuitSlot {
    Packed(Vec<u8>),
    Unpacked(Circuit),
}

/// A named collection of circuits with one designated entry (owned object
/// form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Name of the entry circuit.
    pub entry: String,
    circuits: IndexMap<String, CircuitSlot>,
    pub annotations: String,
}

impl Module {
    /// Creates an empty module with the given entry name.
    pub fn new(entry: impl Into<String>) -> Self {
        Module {
            entry: entry.into(),
            circuits: IndexMap::new(),
            annotations: String::new(),
        }
    }

    /// All circuit names, in insertion order.
    pub fn circuit_names(&self) -> Vec<String> {
        self.circuits.keys().cloned().collect()
    }

    pub fn contains_circuit(&self, name: &str) -> bool {
        self.circuits.contains_key(name)
    }

    pub fn num_circuits(&self) -> usize {
        self.circuits.len()
    }

    /// Designates the entry circuit.
    pub fn set_entry(&mut self, name: impl Into<String>) {
        self.entry = name.into();
    }

    /// Adds an unpacked circuit, keyed by its name. Replaces any existing
    /// circuit with the same name.
    pub fn insert_circuit(&mut self, circuit: Circuit) {
        self.circuits
            .insert(circuit.name.clone(), CircuitSlot::Unpacked(circuit));
    }

    /// Adds a circuit still in serialized form. The name is read from the
    /// buffer; the bytes are kept as-is until first mutable access.
    pub fn insert_packed_circuit(&mut self, bytes: Vec<u8>) -> Result<(), IrError> {
        let name = CircuitReader::new(&bytes)?.name()?.to_string();
        self.circuits.insert(name, CircuitSlot::Packed(bytes));
        Ok(())
    }

    /// Adds a packed circuit under a name already read from the buffer.
    pub(crate) fn insert_packed_named(&mut self, name: String, bytes: Vec<u8>) {
        self.circuits.insert(name, CircuitSlot::Packed(bytes));
    }

    /// Removes a circuit by name.
    pub fn remove_circuit(&mut self, name: &str) {
        self.circuits.shift_remove(name);
    }

    /// Read-only view of a named circuit. A packed entry is read through a
    /// buffer reader without unpacking.
    pub fn circuit(&self, name: &str) -> Result<CircuitView<'_>, IrError> {
        match self.circuits.get(name) {
            Some(CircuitSlot::Packed(bytes)) => {
                Ok(CircuitView::Buffer(CircuitReader::new(bytes)?))
            }
            Some(CircuitSlot::Unpacked(circuit)) => Ok(CircuitView::Object(circuit)),
            None => Err(IrError::CircuitNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Read-only view of the entry circuit.
    pub fn entry_circuit(&self) -> Result<CircuitView<'_>, IrError> {
        let entry = self.entry.clone();
        self.circuit(&entry)
    }

    /// Mutable access to a named circuit. A packed entry is unpacked first
    /// and its buffer discarded; subsequent accesses return the same
    /// unpacked object.
    pub fn circuit_mut(&mut self, name: &str) -> Result<&mut Circuit, IrError> {
        let slot = self
            .circuits
            .get_mut(name)
            .ok_or_else(|| IrError::CircuitNotFound {
                name: name.to_string(),
            })?;
        if let CircuitSlot::Packed(bytes) = slot {
            let circuit = crate::codec::decode::decode_circuit(bytes)?;
            *slot = CircuitSlot::Unpacked(circuit);
        }
        match slot {
            CircuitSlot::Unpacked(circuit) => Ok(circuit),
            CircuitSlot::Packed(_) => unreachable!("slot unpacked above"),
        }
    }

    /// Mutable access to the entry circuit.
    pub fn entry_circuit_mut(&mut self) -> Result<&mut Circuit, IrError> {
        let entry = self.entry.clone();
        self.circuit_mut(&entry)
    }

    /// Serialized bytes of a member circuit: packed entries verbatim,
    /// unpacked entries re-encoded.
    pub(crate) fn circuit_bytes(&self, name: &str) -> Option<Vec<u8>> {
        match self.circuits.get(name)? {
            CircuitSlot::Packed(bytes) => Some(bytes.clone()),
            CircuitSlot::Unpacked(circuit) => Some(encode_circuit(circuit)),
        }
    }

    // -------------------------------------------------------------------
    // Annotations
    // -------------------------------------------------------------------

    pub fn attribute(&self, key: &str) -> &str {
        annotation::attribute(&self.annotations, key)
    }

    pub fn set_attribute(&mut self, key: &str, value: &str) {
        self.annotations = annotation::set_attribute(&self.annotations, key, value);
    }

    // -------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------

    /// Checks module-level invariants: the entry name resolves, every
    /// subcircuit call targets a circuit of this module, and the call graph
    /// is acyclic.
    pub fn validate(&self) -> Result<(), IrError> {
        if !self.contains_circuit(&self.entry) {
            return Err(IrError::CircuitNotFound {
                name: self.entry.clone(),
            });
        }

        let call_graph = self.call_graph()?;
        for (caller, callees) in &call_graph {
            for callee in callees {
                if !self.contains_circuit(callee) {
                    return Err(IrError::CircuitNotFound {
                        name: format!("{callee} (called from '{caller}')"),
                    });
                }
            }
        }

        let mut graph: DiGraph<&str, ()> = DiGraph::new();
        let mut index = HashMap::new();
        for name in call_graph.keys() {
            index.insert(name.as_str(), graph.add_node(name.as_str()));
        }
        for (caller, callees) in &call_graph {
            for callee in callees {
                if let (Some(&from), Some(&to)) =
                    (index.get(caller.as_str()), index.get(callee.as_str()))
                {
                    graph.add_edge(from, to, ());
                }
            }
        }
        if toposort(&graph, None).is_err() {
            return Err(IrError::CycleIntroduced {
                reason: "module call graph is cyclic".into(),
            });
        }
        Ok(())
    }

    /// Caller → set of callee names, over every circuit in the module.
    pub fn call_graph(&self) -> Result<IndexMap<String, HashSet<String>>, IrError> {
        let mut graph = IndexMap::new();
        for name in self.circuit_names() {
            let view = self.circuit(&name)?;
            let mut callees = HashSet::new();
            for node in view.nodes()? {
                let node = node?;
                if node.operation()? == crate::ops::Operation::CallSubcircuit {
                    let callee = node.callee()?;
                    if !callee.is_empty() {
                        callees.insert(callee.to_string());
                    }
                }
            }
            graph.insert(name, callees);
        }
        Ok(graph)
    }
}
