//! Parameter values with explicit shape.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// Named parameter values, ordered by name.
pub type ParameterValues = BTreeMap<String, Value>;

/// A parameter value: a scalar or a time-modulated array.
///
/// Arithmetic between two values broadcasts a scalar over an array and
/// combines two arrays element-wise. Arrays of different length never
/// combine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A single number.
    Scalar(f64),
    /// An array of numbers, one per time slice.
    Array(Vec<f64>),
}

impl Value {
    /// Number of elements (1 for a scalar).
    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Array(items) => items.len(),
        }
    }

    /// Check whether this is an empty array.
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Array(items) if items.is_empty())
    }

    /// Check if this is a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    /// Get the scalar, if this is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Array(_) => None,
        }
    }

    /// Get element `index`; a scalar answers for every index.
    pub fn get(&self, index: usize) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Array(items) => items.get(index).copied(),
        }
    }

    /// First element, used where a backend needs a single number.
    pub fn first(&self) -> Option<f64> {
        self.get(0)
    }

    /// All elements as a vector.
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Value::Scalar(v) => vec![*v],
            Value::Array(items) => items.clone(),
        }
    }

    /// Apply `f` to every element.
    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(v) => Value::Scalar(f(*v)),
            Value::Array(items) => Value::Array(items.iter().map(|v| f(*v)).collect()),
        }
    }

    /// Combine two values element-wise, broadcasting scalars.
    pub fn zip_with(&self, other: &Value, f: impl Fn(f64, f64) -> f64) -> IrResult<Value> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(*a, *b))),
            (Value::Scalar(a), Value::Array(bs)) => {
                Ok(Value::Array(bs.iter().map(|b| f(*a, *b)).collect()))
            }
            (Value::Array(as_), Value::Scalar(b)) => {
                Ok(Value::Array(as_.iter().map(|a| f(*a, *b)).collect()))
            }
            (Value::Array(as_), Value::Array(bs)) => {
                if as_.len() != bs.len() {
                    return Err(IrError::ShapeMismatch {
                        left: as_.len(),
                        right: bs.len(),
                    });
                }
                Ok(Value::Array(
                    as_.iter().zip(bs).map(|(a, b)| f(*a, *b)).collect(),
                ))
            }
        }
    }

    /// Element-wise sum.
    pub fn add(&self, other: &Value) -> IrResult<Value> {
        self.zip_with(other, |a, b| a + b)
    }

    /// Element-wise product.
    pub fn mul(&self, other: &Value) -> IrResult<Value> {
        self.zip_with(other, |a, b| a * b)
    }

    /// Element-wise power.
    pub fn pow(&self, other: &Value) -> IrResult<Value> {
        self.zip_with(other, f64::powf)
    }

    /// Check two values for equality within `tol`.
    pub fn approx_eq(&self, other: &Value, tol: f64) -> bool {
        self.len() == other.len()
            && self.to_vec()
                .iter()
                .zip(other.to_vec())
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(items: Vec<f64>) -> Self {
        Value::Array(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(v) => write!(f, "{v}"),
            Value::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}
