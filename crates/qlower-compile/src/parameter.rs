//! Trainable parameter buffer.

use std::collections::BTreeMap;

use qlower_ir::{Alloc, ParameterValues, Value};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{CompileError, CompileResult};

/// Values of the trainable parameters of one compiled model.
///
/// Each trainable parameter starts uniformly in `[0, 1)`. Optimisers update
/// entries through [`ParameterBuffer::set`], which keeps the declared shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBuffer {
    shapes: BTreeMap<String, usize>,
    values: ParameterValues,
}

impl ParameterBuffer {
    /// Random initial values from the thread-local generator.
    pub fn random(declared: &BTreeMap<String, Alloc>) -> Self {
        Self::with_rng(declared, &mut rand::thread_rng())
    }

    /// Reproducible initial values.
    pub fn seeded(declared: &BTreeMap<String, Alloc>, seed: u64) -> Self {
        Self::with_rng(declared, &mut StdRng::seed_from_u64(seed))
    }

    fn with_rng(declared: &BTreeMap<String, Alloc>, rng: &mut impl Rng) -> Self {
        let mut shapes = BTreeMap::new();
        let mut values = ParameterValues::new();
        for (name, alloc) in declared.iter().filter(|(_, a)| a.is_trainable) {
            let value = if alloc.size == 1 {
                Value::Scalar(rng.r#gen())
            } else {
                Value::Array((0..alloc.size).map(|_| rng.r#gen()).collect())
            };
            shapes.insert(name.clone(), alloc.size);
            values.insert(name.clone(), value);
        }
        Self { shapes, values }
    }

    /// Current values.
    pub fn values(&self) -> &ParameterValues {
        &self.values
    }

    /// Trainable parameter names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shapes.keys().map(String::as_str)
    }

    /// Current value of one parameter.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Replace one parameter's value.
    pub fn set(&mut self, name: &str, value: Value) -> CompileResult<()> {
        let size = *self
            .shapes
            .get(name)
            .ok_or_else(|| CompileError::UnboundVariable(name.to_string()))?;
        if value.len() != size {
            return Err(CompileError::InputShapeMismatch {
                name: name.to_string(),
                expected: size,
                got: value.len(),
            });
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Number of trainable parameters.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Check whether there are no trainable parameters.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
