//! Constant payloads.
//!
//! A Constant node carries a typed scalar, a typed vector, a typed matrix,
//! or an opaque binary blob. The node's declared output type is the
//! authority: decoding and accessors check the payload against it and fail
//! with a type mismatch otherwise.

use serde::{Deserialize, Serialize};

use crate::error::IrError;
use crate::types::{DataType, PrimitiveType};

/// A single typed constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
}

impl ScalarValue {
    pub fn primitive(&self) -> PrimitiveType {
        use ScalarValue::*;
        match self {
            Bool(_) => PrimitiveType::Bool,
            Int8(_) => PrimitiveType::Int8,
            Int16(_) => PrimitiveType::Int16,
            Int32(_) => PrimitiveType::Int32,
            Int64(_) => PrimitiveType::Int64,
            UInt8(_) => PrimitiveType::UInt8,
            UInt16(_) => PrimitiveType::UInt16,
            UInt32(_) => PrimitiveType::UInt32,
            UInt64(_) => PrimitiveType::UInt64,
            Float(_) => PrimitiveType::Float,
            Double(_) => PrimitiveType::Double,
        }
    }
}

/// A fixed-typed constant vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VectorValue {
    Bool(Vec<bool>),
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl VectorValue {
    pub fn primitive(&self) -> PrimitiveType {
        use VectorValue::*;
        match self {
            Bool(_) => PrimitiveType::Bool,
            Int8(_) => PrimitiveType::Int8,
            Int16(_) => PrimitiveType::Int16,
            Int32(_) => PrimitiveType::Int32,
            Int64(_) => PrimitiveType::Int64,
            UInt8(_) => PrimitiveType::UInt8,
            UInt16(_) => PrimitiveType::UInt16,
            UInt32(_) => PrimitiveType::UInt32,
            UInt64(_) => PrimitiveType::UInt64,
            Float(_) => PrimitiveType::Float,
            Double(_) => PrimitiveType::Double,
        }
    }

    pub fn len(&self) -> usize {
        use VectorValue::*;
        match self {
            Bool(v) => v.len(),
            Int8(v) => v.len(),
            Int16(v) => v.len(),
            Int32(v) => v.len(),
            Int64(v) => v.len(),
            UInt8(v) => v.len(),
            UInt16(v) => v.len(),
            UInt32(v) => v.len(),
            UInt64(v) => v.len(),
            Float(v) => v.len(),
            Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A constant matrix: a vector of equally typed rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixValue {
    pub rows: Vec<VectorValue>,
}

impl MatrixValue {
    /// Primitive kind of the elements; `None` for an empty matrix.
    pub fn primitive(&self) -> Option<PrimitiveType> {
        self.rows.first().map(|r| r.primitive())
    }

    /// `(rows, columns)` of the matrix; columns of the first row.
    pub fn shape(&self) -> (usize, usize) {
        (
            self.rows.len(),
            self.rows.first().map(|r| r.len()).unwrap_or(0),
        )
    }

    /// `true` when every row has the same primitive kind and length.
    pub fn is_rectangular(&self) -> bool {
        let Some(first) = self.rows.first() else {
            return true;
        };
        self.rows
            .iter()
            .all(|r| r.primitive() == first.primitive() && r.len() == first.len())
    }
}

/// Payload attached to a Constant node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantPayload {
    Scalar(ScalarValue),
    Vector(VectorValue),
    Matrix(MatrixValue),
    /// Opaque bytes; interpretation is up to the consumer.
    Blob(Vec<u8>),
}

impl ConstantPayload {
    /// Primitive kind of the payload; `None` for blobs and empty matrices.
    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self {
            ConstantPayload::Scalar(s) => Some(s.primitive()),
            ConstantPayload::Vector(v) => Some(v.primitive()),
            ConstantPayload::Matrix(m) => m.primitive(),
            ConstantPayload::Blob(_) => None,
        }
    }

    /// Checks the payload against a declared output type.
    ///
    /// Scalars and vectors must match the primitive kind; matrices must in
    /// addition be rectangular and agree with the declared shape when one is
    /// present. Blobs are compatible with any type.
    pub fn check_type(&self, declared: &DataType) -> Result<(), IrError> {
        match self {
            ConstantPayload::Blob(_) => Ok(()),
            ConstantPayload::Scalar(s) => {
                if s.primitive() == declared.primitive {
                    Ok(())
                } else {
                    Err(IrError::TypeMismatch {
                        reason: format!(
                            "scalar payload of kind {} under declared type {}",
                            s.primitive().name(),
                            declared.primitive.name()
                        ),
                    })
                }
            }
            ConstantPayload::Vector(v) => {
                if v.primitive() == declared.primitive {
                    Ok(())
                } else {
                    Err(IrError::TypeMismatch {
                        reason: format!(
                            "vector payload of kind {} under declared type {}",
                            v.primitive().name(),
                            declared.primitive.name()
                        ),
                    })
                }
            }
            ConstantPayload::Matrix(m) => {
                if !m.is_rectangular() {
                    return Err(IrError::TypeMismatch {
                        reason: "matrix payload is not rectangular".into(),
                    });
                }
                if let Some(p) = m.primitive() {
                    if p != declared.primitive {
                        return Err(IrError::TypeMismatch {
                            reason: format!(
                                "matrix payload of kind {} under declared type {}",
                                p.name(),
                                declared.primitive.name()
                            ),
                        });
                    }
                }
                if declared.shape.len() == 2 {
                    let (rows, cols) = m.shape();
                    if declared.shape[0] != rows as i64 || declared.shape[1] != cols as i64 {
                        return Err(IrError::TypeMismatch {
                            reason: format!(
                                "matrix payload of shape {rows}x{cols} under declared shape {:?}",
                                declared.shape
                            ),
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<ScalarValue> for ConstantPayload {
    fn from(value: ScalarValue) -> Self {
        ConstantPayload::Scalar(value)
    }
}

impl From<VectorValue> for ConstantPayload {
    fn from(value: VectorValue) -> Self {
        ConstantPayload::Vector(value)
    }
}

impl From<MatrixValue> for ConstantPayload {
    fn from(value: MatrixValue) -> Self {
        ConstantPayload::Matrix(value)
    }
}

macro_rules! scalar_from {
    ($($rust:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$rust> for ScalarValue {
                fn from(value: $rust) -> Self {
                    ScalarValue::$variant(value)
                }
            }

            impl From<$rust> for ConstantPayload {
                fn from(value: $rust) -> Self {
                    ConstantPayload::Scalar(ScalarValue::$variant(value))
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
}
