//! Runtime values of the reference evaluator.
//!
//! One variant per primitive kind. Integer arithmetic wraps, matching the
//! fixed-width wire semantics of the circuits being interpreted (an 8-bit
//! adder on (255, 1) yields 0).

use serde::{Deserialize, Serialize};

use mpcir_core::{IrError, Operation, PrimitiveType, ScalarValue};

/// A plaintext runtime value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
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

impl Value {
    pub fn primitive(&self) -> PrimitiveType {
        use Value::*;
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

    pub fn as_bool(&self) -> Result<bool, IrError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(IrError::TypeMismatch {
                reason: format!("expected Bool value, found {}", other.primitive().name()),
            }),
        }
    }

    /// The value's bits, widened to 64. Floats are not bit-addressable.
    pub fn to_bits(&self) -> Result<u64, IrError> {
        use Value::*;
        Ok(match self {
            Bool(b) => *b as u64,
            Int8(v) => *v as u8 as u64,
            Int16(v) => *v as u16 as u64,
            Int32(v) => *v as u32 as u64,
            Int64(v) => *v as u64,
            UInt8(v) => *v as u64,
            UInt16(v) => *v as u64,
            UInt32(v) => *v as u64,
            UInt64(v) => *v,
            Float(_) | Double(_) => {
                return Err(IrError::TypeMismatch {
                    reason: "floating-point values are not bit-addressable".into(),
                })
            }
        })
    }

    /// Builds a value of `primitive` from raw bits (truncating).
    pub fn from_bits(primitive: PrimitiveType, bits: u64) -> Result<Value, IrError> {
        use PrimitiveType as P;
        Ok(match primitive {
            P::Bool => Value::Bool(bits & 1 != 0),
            P::Int8 => Value::Int8(bits as u8 as i8),
            P::Int16 => Value::Int16(bits as u16 as i16),
            P::Int32 => Value::Int32(bits as u32 as i32),
            P::Int64 => Value::Int64(bits as i64),
            P::UInt8 => Value::UInt8(bits as u8),
            P::UInt16 => Value::UInt16(bits as u16),
            P::UInt32 => Value::UInt32(bits as u32),
            P::UInt64 => Value::UInt64(bits),
            P::Float | P::Double => {
                return Err(IrError::TypeMismatch {
                    reason: "cannot merge bits into a floating-point value".into(),
                })
            }
        })
    }

    /// Decomposes the value into its boolean wires, least significant bit
    /// first.
    pub fn split_bits(&self) -> Result<Vec<Value>, IrError> {
        let width = self.primitive().bit_width();
        let bits = self.to_bits()?;
        Ok((0..width)
            .map(|i| Value::Bool(bits >> i & 1 != 0))
            .collect())
    }
}

/// Expands a constant vector into one runtime value per element, so a
/// vector constant behaves like a multi-output node read through offsets.
pub fn values_from_vector(vector: mpcir_core::VectorValue) -> Vec<Value> {
    use mpcir_core::VectorValue as V;
    match vector {
        V::Bool(v) => v.into_iter().map(Value::Bool).collect(),
        V::Int8(v) => v.into_iter().map(Value::Int8).collect(),
        V::Int16(v) => v.into_iter().map(Value::Int16).collect(),
        V::Int32(v) => v.into_iter().map(Value::Int32).collect(),
        V::Int64(v) => v.into_iter().map(Value::Int64).collect(),
        V::UInt8(v) => v.into_iter().map(Value::UInt8).collect(),
        V::UInt16(v) => v.into_iter().map(Value::UInt16).collect(),
        V::UInt32(v) => v.into_iter().map(Value::UInt32).collect(),
        V::UInt64(v) => v.into_iter().map(Value::UInt64).collect(),
        V::Float(v) => v.into_iter().map(Value::Float).collect(),
        V::Double(v) => v.into_iter().map(Value::Double).collect(),
    }
}

impl From<ScalarValue> for Value {
    fn from(scalar: ScalarValue) -> Self {
        match scalar {
            ScalarValue::Bool(v) => Value::Bool(v),
            ScalarValue::Int8(v) => Value::Int8(v),
            ScalarValue::Int16(v) => Value::Int16(v),
            ScalarValue::Int32(v) => Value::Int32(v),
            ScalarValue::Int64(v) => Value::Int64(v),
            ScalarValue::UInt8(v) => Value::UInt8(v),
            ScalarValue::UInt16(v) => Value::UInt16(v),
            ScalarValue::UInt32(v) => Value::UInt32(v),
            ScalarValue::UInt64(v) => Value::UInt64(v),
            ScalarValue::Float(v) => Value::Float(v),
            ScalarValue::Double(v) => Value::Double(v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::UInt8(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt64(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

fn mismatch(op: Operation, a: &Value, b: &Value) -> IrError {
    IrError::TypeMismatch {
        reason: format!(
            "{op} over mismatched values {} and {}",
            a.primitive().name(),
            b.primitive().name()
        ),
    }
}

macro_rules! arith_binary {
    ($op:expr, $a:expr, $b:expr, $wrap:ident, $float:tt) => {
        match ($a, $b) {
            (Value::Int8(x), Value::Int8(y)) => Ok(Value::Int8(x.$wrap(*y))),
            (Value::Int16(x), Value::Int16(y)) => Ok(Value::Int16(x.$wrap(*y))),
            (Value::Int32(x), Value::Int32(y)) => Ok(Value::Int32(x.$wrap(*y))),
            (Value::Int64(x), Value::Int64(y)) => Ok(Value::Int64(x.$wrap(*y))),
            (Value::UInt8(x), Value::UInt8(y)) => Ok(Value::UInt8(x.$wrap(*y))),
            (Value::UInt16(x), Value::UInt16(y)) => Ok(Value::UInt16(x.$wrap(*y))),
            (Value::UInt32(x), Value::UInt32(y)) => Ok(Value::UInt32(x.$wrap(*y))),
            (Value::UInt64(x), Value::UInt64(y)) => Ok(Value::UInt64(x.$wrap(*y))),
            (Value::Float(x), Value::Float(y)) => Ok(Value::Float(x $float y)),
            (Value::Double(x), Value::Double(y)) => Ok(Value::Double(x $float y)),
            (a, b) => Err(mismatch($op, a, b)),
        }
    };
}

macro_rules! bit_binary {
    ($op:expr, $a:expr, $b:expr, $sym:tt) => {
        match ($a, $b) {
            (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(x $sym y)),
            (Value::Int8(x), Value::Int8(y)) => Ok(Value::Int8(x $sym y)),
            (Value::Int16(x), Value::Int16(y)) => Ok(Value::Int16(x $sym y)),
            (Value::Int32(x), Value::Int32(y)) => Ok(Value::Int32(x $sym y)),
            (Value::Int64(x), Value::Int64(y)) => Ok(Value::Int64(x $sym y)),
            (Value::UInt8(x), Value::UInt8(y)) => Ok(Value::UInt8(x $sym y)),
            (Value::UInt16(x), Value::UInt16(y)) => Ok(Value::UInt16(x $sym y)),
            (Value::UInt32(x), Value::UInt32(y)) => Ok(Value::UInt32(x $sym y)),
            (Value::UInt64(x), Value::UInt64(y)) => Ok(Value::UInt64(x $sym y)),
            (a, b) => Err(mismatch($op, a, b)),
        }
    };
}

macro_rules! compare_binary {
    ($op:expr, $a:expr, $b:expr, $sym:tt) => {
        match ($a, $b) {
            (Value::Bool(x), Value::Bool(y)) => Ok(Value::Bool(x $sym y)),
            (Value::Int8(x), Value::Int8(y)) => Ok(Value::Bool(x $sym y)),
            (Value::Int16(x), Value::Int16(y)) => Ok(Value::Bool(x $sym y)),
            (Value::Int32(x), Value::Int32(y)) => Ok(Value::Bool(x $sym y)),
            (Value::Int64(x), Value::Int64(y)) => Ok(Value::Bool(x $sym y)),
            (Value::UInt8(x), Value::UInt8(y)) => Ok(Value::Bool(x $sym y)),
            (Value::UInt16(x), Value::UInt16(y)) => Ok(Value::Bool(x $sym y)),
            (Value::UInt32(x), Value::UInt32(y)) => Ok(Value::Bool(x $sym y)),
            (Value::UInt64(x), Value::UInt64(y)) => Ok(Value::Bool(x $sym y)),
            (Value::Float(x), Value::Float(y)) => Ok(Value::Bool(x $sym y)),
            (Value::Double(x), Value::Double(y)) => Ok(Value::Bool(x $sym y)),
            (a, b) => Err(mismatch($op, a, b)),
        }
    };
}

/// Applies a binary operation to two values of the same primitive kind.
pub fn apply_binary(op: Operation, a: &Value, b: &Value) -> Result<Value, IrError> {
    match op {
        Operation::Add => arith_binary!(op, a, b, wrapping_add, +),
        Operation::Sub => arith_binary!(op, a, b, wrapping_sub, -),
        Operation::Mul => arith_binary!(op, a, b, wrapping_mul, *),
        Operation::Div => match b {
            Value::Float(_) | Value::Double(_) => arith_binary!(op, a, b, wrapping_div, /),
            _ if b.to_bits()? == 0 => Err(IrError::TypeMismatch {
                reason: "division by zero".into(),
            }),
            _ => arith_binary!(op, a, b, wrapping_div, /),
        },
        Operation::And => bit_binary!(op, a, b, &),
        Operation::Or => bit_binary!(op, a, b, |),
        Operation::Xor => bit_binary!(op, a, b, ^),
        Operation::Nand => apply_unary(Operation::Not, &bit_binary!(op, a, b, &)?),
        Operation::Nor => apply_unary(Operation::Not, &bit_binary!(op, a, b, |)?),
        Operation::Xnor => apply_unary(Operation::Not, &bit_binary!(op, a, b, ^)?),
        Operation::Eq => compare_binary!(op, a, b, ==),
        Operation::Gt => compare_binary!(op, a, b, >),
        Operation::Ge => compare_binary!(op, a, b, >=),
        Operation::Lt => compare_binary!(op, a, b, <),
        Operation::Le => compare_binary!(op, a, b, <=),
        _ => Err(IrError::UnsupportedOperation { op }),
    }
}

/// Applies a unary operation.
pub fn apply_unary(op: Operation, a: &Value) -> Result<Value, IrError> {
    match (op, a) {
        (Operation::Not, Value::Bool(x)) => Ok(Value::Bool(!x)),
        (Operation::Not, Value::Int8(x)) => Ok(Value::Int8(!x)),
        (Operation::Not, Value::Int16(x)) => Ok(Value::Int16(!x)),
        (Operation::Not, Value::Int32(x)) => Ok(Value::Int32(!x)),
        (Operation::Not, Value::Int64(x)) => Ok(Value::Int64(!x)),
        (Operation::Not, Value::UInt8(x)) => Ok(Value::UInt8(!x)),
        (Operation::Not, Value::UInt16(x)) => Ok(Value::UInt16(!x)),
        (Operation::Not, Value::UInt32(x)) => Ok(Value::UInt32(!x)),
        (Operation::Not, Value::UInt64(x)) => Ok(Value::UInt64(!x)),

        (Operation::Neg, Value::Int8(x)) => Ok(Value::Int8(x.wrapping_neg())),
        (Operation::Neg, Value::Int16(x)) => Ok(Value::Int16(x.wrapping_neg())),
        (Operation::Neg, Value::Int32(x)) => Ok(Value::Int32(x.wrapping_neg())),
        (Operation::Neg, Value::Int64(x)) => Ok(Value::Int64(x.wrapping_neg())),
        (Operation::Neg, Value::UInt8(x)) => Ok(Value::UInt8(x.wrapping_neg())),
        (Operation::Neg, Value::UInt16(x)) => Ok(Value::UInt16(x.wrapping_neg())),
        (Operation::Neg, Value::UInt32(x)) => Ok(Value::UInt32(x.wrapping_neg())),
        (Operation::Neg, Value::UInt64(x)) => Ok(Value::UInt64(x.wrapping_neg())),
        (Operation::Neg, Value::Float(x)) => Ok(Value::Float(-x)),
        (Operation::Neg, Value::Double(x)) => Ok(Value::Double(-x)),

        (Operation::Square, v) => apply_binary(Operation::Mul, v, v),

        (op, v) => Err(IrError::TypeMismatch {
            reason: format!("{op} cannot be applied to {}", v.primitive().name()),
        }),
    }
}
