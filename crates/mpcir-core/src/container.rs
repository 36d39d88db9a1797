//! Storage containers: packed bytes or unpacked objects, never both.
//!
//! A container holds the IR in exactly one of two states. *Packed* is the
//! contiguous serialized buffer: cheap to forward between layers, readable
//! without allocation, immutable. *Unpacked* is the owned object tree:
//! freely mutable, serialized again on [`pack`](CircuitContext::pack).
//! At any instant exactly one representation is authoritative; transitions
//! discard the other.
//!
//! Writing a packed container to a file copies its bytes as-is, so
//! write-then-read is a byte identity from the Packed state. Writing an
//! unpacked container serializes first; the resulting bytes are canonical
//! but need not be identical to any earlier packed form.

use std::fs;
use std::path::Path;

use crate::circuit::Circuit;
use crate::codec::decode::{decode_circuit, decode_module};
use crate::codec::encode::{encode_circuit, encode_module};
use crate::codec::read::{CircuitReader, ModuleReader};
use crate::error::IrError;
use crate::module::Module;
use crate::view::{CircuitView, ModuleView};

#[derive(Debug, Clone)]
enum State<T> {
    Empty,
    Packed(Vec<u8>),
    Unpacked(T),
}

impl<T> Default for State<T> {
    fn default() -> Self {
        State::Empty
    }
}

/// Container for one circuit.
#[derive(Debug, Clone, Default)]
pub struct CircuitContext {
    state: State<Circuit>,
}

impl CircuitContext {
    /// An empty container.
    pub fn new() -> Self {
        CircuitContext::default()
    }

    /// Wraps serialized bytes; the container starts Packed. The bytes are
    /// checked to open like a circuit buffer.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, IrError> {
        CircuitReader::new(&bytes)?;
        Ok(CircuitContext {
            state: State::Packed(bytes),
        })
    }

    /// Wraps an unpacked circuit; the container starts Unpacked.
    pub fn from_circuit(circuit: Circuit) -> Self {
        CircuitContext {
            state: State::Unpacked(circuit),
        }
    }

    /// Reads a serialized circuit from a file, releasing any prior
    /// contents. The container is Packed afterwards.
    pub fn read_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), IrError> {
        let bytes = fs::read(path)?;
        CircuitReader::new(&bytes)?;
        self.state = State::Packed(bytes);
        Ok(())
    }

    /// Writes the container to a file: byte-for-byte in the Packed state,
    /// serializing first in the Unpacked state.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), IrError> {
        match &self.state {
            State::Packed(bytes) => fs::write(path, bytes)?,
            State::Unpacked(circuit) => fs::write(path, encode_circuit(circuit))?,
            State::Empty => {
                return Err(IrError::WrongState {
                    reason: "cannot write an empty container",
                })
            }
        }
        Ok(())
    }

    pub fn is_packed(&self) -> bool {
        matches!(self.state, State::Packed(_))
    }

    /// Read-only view over whichever state is current.
    pub fn read_only(&self) -> Result<CircuitView<'_>, IrError> {
        match &self.state {
            State::Packed(bytes) => Ok(CircuitView::Buffer(CircuitReader::new(bytes)?)),
            State::Unpacked(circuit) => Ok(CircuitView::Object(circuit)),
            State::Empty => Err(IrError::WrongState {
                reason: "container is empty",
            }),
        }
    }

    /// Zero-copy reader over the packed bytes. Fails with
    /// [`IrError::WrongState`] unless the container is Packed.
    pub fn buffer_reader(&self) -> Result<CircuitReader<'_>, IrError> {
        match &self.state {
            State::Packed(bytes) => Ok(CircuitReader::new(bytes)?),
            _ => Err(IrError::WrongState {
                reason: "buffer view requires the Packed state",
            }),
        }
    }

    /// The packed bytes themselves. Fails unless Packed.
    pub fn bytes(&self) -> Result<&[u8], IrError> {
        match &self.state {
            State::Packed(bytes) => Ok(bytes),
            _ => Err(IrError::WrongState {
                reason: "bytes require the Packed state",
            }),
        }
    }

    /// Mutable access to the object tree, unpacking first when Packed and
    /// discarding the buffer. Idempotent once Unpacked.
    pub fn mutable(&mut self) -> Result<&mut Circuit, IrError> {
        if let State::Packed(bytes) = &self.state {
            let circuit = decode_circuit(bytes)?;
            self.state = State::Unpacked(circuit);
        }
        match &mut self.state {
            State::Unpacked(circuit) => Ok(circuit),
            State::Empty => Err(IrError::WrongState {
                reason: "container is empty",
            }),
            State::Packed(_) => unreachable!("unpacked above"),
        }
    }

    /// Serializes the object tree back into bytes, discarding the tree.
    /// Idempotent once Packed.
    pub fn pack(&mut self) -> Result<(), IrError> {
        if let State::Unpacked(circuit) = &self.state {
            let bytes = encode_circuit(circuit);
            self.state = State::Packed(bytes);
        }
        match self.state {
            State::Empty => Err(IrError::WrongState {
                reason: "container is empty",
            }),
            _ => Ok(()),
        }
    }

    /// Releases all state.
    pub fn reset(&mut self) {
        self.state = State::Empty;
    }

    /// Deep copy of the current state.
    pub fn create_copy(&self) -> Self {
        self.clone()
    }
}

/// Container for one module.
#[derive(Debug, Clone, Default)]
pub struct ModuleContext {
    state: State<Module>,
}

impl ModuleContext {
    /// An empty container.
    pub fn new() -> Self {
        ModuleContext::default()
    }

    /// Wraps serialized bytes; the container starts Packed.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, IrError> {
        ModuleReader::new(&bytes)?;
        Ok(ModuleContext {
            state: State::Packed(bytes),
        })
    }

    /// Wraps an unpacked module; the container starts Unpacked.
    pub fn from_module(module: Module) -> Self {
        ModuleContext {
            state: State::Unpacked(module),
        }
    }

    /// Reads a serialized module from a file, releasing any prior contents.
    pub fn read_from_file(&mut self, path: impl AsRef<Path>) -> Result<(), IrError> {
        let bytes = fs::read(path)?;
        ModuleReader::new(&bytes)?;
        self.state = State::Packed(bytes);
        Ok(())
    }

    /// Writes the container to a file: byte-for-byte in the Packed state,
    /// serializing first in the Unpacked state.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), IrError> {
        match &self.state {
            State::Packed(bytes) => fs::write(path, bytes)?,
            State::Unpacked(module) => fs::write(path, encode_module(module))?,
            State::Empty => {
                return Err(IrError::WrongState {
                    reason: "cannot write an empty container",
                })
            }
        }
        Ok(())
    }

    pub fn is_packed(&self) -> bool {
        matches!(self.state, State::Packed(_))
    }

    /// Read-only view over whichever state is current.
    pub fn read_only(&self) -> Result<ModuleView<'_>, IrError> {
        match &self.state {
            State::Packed(bytes) => Ok(ModuleView::Buffer(ModuleReader::new(bytes)?)),
            State::Unpacked(module) => Ok(ModuleView::Object(module)),
            State::Empty => Err(IrError::WrongState {
                reason: "container is empty",
            }),
        }
    }

    /// Zero-copy reader over the packed bytes. Fails unless Packed.
    pub fn buffer_reader(&self) -> Result<ModuleReader<'_>, IrError> {
        match &self.state {
            State::Packed(bytes) => Ok(ModuleReader::new(bytes)?),
            _ => Err(IrError::WrongState {
                reason: "buffer view requires the Packed state",
            }),
        }
    }

    /// The packed bytes themselves. Fails unless Packed.
    pub fn bytes(&self) -> Result<&[u8], IrError> {
        match &self.state {
            State::Packed(bytes) => Ok(bytes),
            _ => Err(IrError::WrongState {
                reason: "bytes require the Packed state",
            }),
        }
    }

    /// Mutable access to the module, unpacking first when Packed and
    /// discarding the buffer. Idempotent once Unpacked.
    pub fn mutable(&mut self) -> Result<&mut Module, IrError> {
        if let State::Packed(bytes) = &self.state {
            let module = decode_module(bytes)?;
            self.state = State::Unpacked(module);
        }
        match &mut self.state {
            State::Unpacked(module) => Ok(module),
            State::Empty => Err(IrError::WrongState {
                reason: "container is empty",
            }),
            State::Packed(_) => unreachable!("unpacked above"),
        }
    }

    /// Serializes the module back into bytes, discarding the tree.
    /// Idempotent once Packed.
    pub fn pack(&mut self) -> Result<(), IrError> {
        if let State::Unpacked(module) = &self.state {
            let bytes = encode_module(module);
            self.state = State::Packed(bytes);
        }
        match self.state {
            State::Empty => Err(IrError::WrongState {
                reason: "container is empty",
            }),
            _ => Ok(()),
        }
    }

    /// Releases all state.
    pub fn reset(&mut self) {
        self.state = State::Empty;
    }

    /// Deep copy of the current state.
    pub fn create_copy(&self) -> Self {
        self.clone()
    }
}
