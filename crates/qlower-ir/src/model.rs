//! The compilation unit: register, parameters, instructions and directives.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::{Arg, Assign, Expr, FILL, Instruction, QuInstruct, Support};
use crate::register::AllocQubits;

/// Declaration of a named parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alloc {
    /// Number of elements; more than one marks a time-modulated parameter.
    pub size: usize,
    /// Trainable parameters live in the parameter buffer; the others are
    /// supplied by the caller.
    #[serde(default)]
    pub is_trainable: bool,
}

impl Alloc {
    /// Create a parameter declaration.
    pub fn new(size: usize, is_trainable: bool) -> Self {
        Self { size, is_trainable }
    }

    /// A caller-supplied parameter.
    pub fn input(size: usize) -> Self {
        Self::new(size, false)
    }

    /// An optimisable parameter.
    pub fn trainable(size: usize) -> Self {
        Self::new(size, true)
    }

    /// Check whether the parameter varies over time slices.
    pub fn is_time_modulated(&self) -> bool {
        self.size > 1
    }
}

/// A backend-agnostic quantum program.
///
/// A model is validated on construction and immutable afterwards:
///
/// - every assigned variable is bound exactly once and never shadows an input,
/// - every qubit referenced by an instruction exists in the register,
/// - parameter sizes are positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawModel")]
pub struct Model {
    register: AllocQubits,
    inputs: BTreeMap<String, Alloc>,
    instructions: Vec<Instruction>,
    directives: serde_json::Map<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct RawModel {
    register: AllocQubits,
    #[serde(default)]
    inputs: BTreeMap<String, Alloc>,
    #[serde(default)]
    instructions: Vec<Instruction>,
    #[serde(default)]
    directives: serde_json::Map<String, serde_json::Value>,
}

impl TryFrom<RawModel> for Model {
    type Error = IrError;

    fn try_from(raw: RawModel) -> IrResult<Self> {
        Model::new(raw.register, raw.inputs, raw.instructions, raw.directives)
    }
}

impl Model {
    /// Create and validate a model.
    pub fn new(
        register: AllocQubits,
        inputs: BTreeMap<String, Alloc>,
        instructions: Vec<Instruction>,
        directives: serde_json::Map<String, serde_json::Value>,
    ) -> IrResult<Self> {
        let model = Self {
            register,
            inputs,
            instructions,
            directives,
        };
        model.validate()?;
        Ok(model)
    }

    /// Start building a model on `register`.
    pub fn builder(register: AllocQubits) -> ModelBuilder {
        ModelBuilder::new(register)
    }

    fn validate(&self) -> IrResult<()> {
        let positions = self.register.qubit_positions.len();
        if positions != 0 && positions != self.register.num_qubits {
            return Err(IrError::PositionCountMismatch {
                num_qubits: self.register.num_qubits,
                positions,
            });
        }

        for (name, alloc) in &self.inputs {
            if name == FILL {
                return Err(IrError::ReservedName(name.clone()));
            }
            if alloc.size == 0 {
                return Err(IrError::InvalidAllocSize(name.clone()));
            }
        }

        let mut assigned = BTreeSet::new();
        for instruction in &self.instructions {
            match instruction {
                Instruction::Assign(Assign { variable, .. }) => {
                    if variable == FILL {
                        return Err(IrError::ReservedName(variable.clone()));
                    }
                    if self.inputs.contains_key(variable) {
                        return Err(IrError::AssignToInput(variable.clone()));
                    }
                    if !assigned.insert(variable.as_str()) {
                        return Err(IrError::DuplicateAssignment(variable.clone()));
                    }
                }
                Instruction::Quantum(inst) => {
                    inst.support
                        .validate(self.register.num_qubits, &inst.opcode)?;
                }
            }
        }
        Ok(())
    }

    /// The register description.
    pub fn register(&self) -> &AllocQubits {
        &self.register
    }

    /// Number of logical qubits.
    pub fn num_qubits(&self) -> usize {
        self.register.num_qubits
    }

    /// Declared parameters, ordered by name.
    pub fn inputs(&self) -> &BTreeMap<String, Alloc> {
        &self.inputs
    }

    /// The instruction list in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Backend-neutral hints.
    pub fn directives(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.directives
    }

    /// A directive's value if it is set to something other than `null` or `false`.
    pub fn directive(&self, key: &str) -> Option<&serde_json::Value> {
        self.directives
            .get(key)
            .filter(|v| !v.is_null() && v.as_bool() != Some(false))
    }

    /// Names of directives that are switched on.
    pub fn active_directives(&self) -> impl Iterator<Item = &str> {
        self.directives
            .keys()
            .filter(|k| self.directive(k).is_some())
            .map(String::as_str)
    }

    /// Names of trainable parameters.
    pub fn trainable_names(&self) -> Vec<&str> {
        self.inputs
            .iter()
            .filter(|(_, a)| a.is_trainable)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Names of caller-supplied parameters.
    pub fn non_trainable_names(&self) -> Vec<&str> {
        self.inputs
            .iter()
            .filter(|(_, a)| !a.is_trainable)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// SSA assignments in program order.
    pub fn assignments(&self) -> impl Iterator<Item = &Assign> {
        self.instructions.iter().filter_map(|i| match i {
            Instruction::Assign(a) => Some(a),
            Instruction::Quantum(_) => None,
        })
    }

    /// Quantum instructions in program order.
    pub fn quantum_instructions(&self) -> impl Iterator<Item = &QuInstruct> {
        self.instructions.iter().filter_map(|i| match i {
            Instruction::Quantum(q) => Some(q),
            Instruction::Assign(_) => None,
        })
    }
}

/// Incremental construction of a [`Model`].
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    register: AllocQubits,
    inputs: BTreeMap<String, Alloc>,
    instructions: Vec<Instruction>,
    directives: serde_json::Map<String, serde_json::Value>,
}

impl ModelBuilder {
    /// Create a builder for `register`.
    pub fn new(register: AllocQubits) -> Self {
        Self {
            register,
            inputs: BTreeMap::new(),
            instructions: Vec::new(),
            directives: serde_json::Map::new(),
        }
    }

    /// Declare a parameter.
    #[must_use]
    pub fn input(mut self, name: impl Into<String>, alloc: Alloc) -> Self {
        self.inputs.insert(name.into(), alloc);
        self
    }

    /// Append an assignment.
    #[must_use]
    pub fn assign(mut self, variable: impl Into<String>, value: Expr) -> Self {
        self.instructions.push(Instruction::assign(variable, value));
        self
    }

    /// Append a quantum instruction.
    #[must_use]
    pub fn quantum(mut self, opcode: impl Into<String>, support: Support, args: Vec<Arg>) -> Self {
        self.instructions
            .push(Instruction::quantum(opcode, support, args));
        self
    }

    /// Set a directive.
    #[must_use]
    pub fn directive(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.directives.insert(key.into(), value);
        self
    }

    /// Validate and build the model.
    pub fn build(self) -> IrResult<Model> {
        Model::new(
            self.register,
            self.inputs,
            self.instructions,
            self.directives,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::Expr;

    fn two_qubit() -> ModelBuilder {
        Model::builder(AllocQubits::new(2)).input("x", Alloc::input(1))
    }

    #[test]
    fn test_duplicate_assignment_rejected() {
        let err = two_qubit()
            .assign("%0", Expr::Constant(1.0))
            .assign("%0", Expr::Constant(2.0))
            .build()
            .unwrap_err();
        assert_eq!(err, IrError::DuplicateAssignment("%0".into()));
    }

    #[test]
    fn test_assign_to_input_rejected() {
        let err = two_qubit()
            .assign("x", Expr::Constant(1.0))
            .build()
            .unwrap_err();
        assert_eq!(err, IrError::AssignToInput("x".into()));
    }

    #[test]
    fn test_qubit_out_of_range() {
        let err = two_qubit()
            .quantum("x", Support::target_only(vec![2]), vec![])
            .build()
            .unwrap_err();
        assert!(matches!(err, IrError::QubitOutOfRange { qubit: 2, .. }));
    }

    #[test]
    fn test_duplicate_qubit_in_support() {
        let support = Support::new(vec![0], vec![0]).unwrap();
        let err = two_qubit().quantum("not", support, vec![]).build().unwrap_err();
        assert!(matches!(err, IrError::DuplicateQubit { qubit: 0, .. }));
    }

    #[test]
    fn test_position_count_mismatch() {
        let err = Model::builder(AllocQubits::new(3).with_coords(vec![(0, 0)]))
            .build()
            .unwrap_err();
        assert!(matches!(err, IrError::PositionCountMismatch { .. }));
    }

    #[test]
    fn test_parameter_partition() {
        let model = two_qubit()
            .input("theta", Alloc::trainable(1))
            .build()
            .unwrap();
        assert_eq!(model.trainable_names(), vec!["theta"]);
        assert_eq!(model.non_trainable_names(), vec!["x"]);
    }

    #[test]
    fn test_directive_truthiness() {
        let model = two_qubit()
            .directive("enable_digital_analog", serde_json::json!(true))
            .directive("digital", serde_json::json!(false))
            .build()
            .unwrap();
        assert!(model.directive("enable_digital_analog").is_some());
        assert!(model.directive("digital").is_none());
        assert_eq!(
            model.active_directives().collect::<Vec<_>>(),
            vec!["enable_digital_analog"]
        );
    }
}
