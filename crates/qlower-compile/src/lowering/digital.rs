//! Lowering to gate circuits for digital simulators.
//!
//! Symbolic gate arguments stay symbolic: a gate stores the name of the
//! variable it reads, and the engine looks the value up in the evaluated
//! embedding on every run.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use qlower_ir::{Arg, Model, ParameterValues, Value};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{InstructionLowering, NativeProgram, check_bound, check_max_args, required_arg};
use crate::embedding::{Arity, Embedding, FunctionTable, Operator};
use crate::error::{CompileError, CompileResult};
use crate::register::NativeRegister;

/// Gates understood by digital engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NativeGate {
    /// Identity.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
    /// Hadamard.
    H,
    /// S = sqrt(Z).
    S,
    /// T = sqrt(S).
    T,
    /// S-dagger.
    Sdg,
    /// T-dagger.
    Tdg,
    /// X rotation.
    Rx,
    /// Y rotation.
    Ry,
    /// Z rotation.
    Rz,
    /// Phase gate diag(1, e^{iθ}).
    Phase,
    /// Swap of two qubits.
    Swap,
}

impl NativeGate {
    /// Lowercase gate name.
    pub fn name(&self) -> &'static str {
        match self {
            NativeGate::I => "i",
            NativeGate::X => "x",
            NativeGate::Y => "y",
            NativeGate::Z => "z",
            NativeGate::H => "h",
            NativeGate::S => "s",
            NativeGate::T => "t",
            NativeGate::Sdg => "sdg",
            NativeGate::Tdg => "tdg",
            NativeGate::Rx => "rx",
            NativeGate::Ry => "ry",
            NativeGate::Rz => "rz",
            NativeGate::Phase => "phase",
            NativeGate::Swap => "swap",
        }
    }

    /// Check whether the gate takes an angle.
    pub fn is_parametric(&self) -> bool {
        matches!(
            self,
            NativeGate::Rx | NativeGate::Ry | NativeGate::Rz | NativeGate::Phase
        )
    }

    /// Number of target qubits per application.
    pub fn num_targets(&self) -> usize {
        match self {
            NativeGate::Swap => 2,
            _ => 1,
        }
    }
}

static OPCODES: LazyLock<FxHashMap<&'static str, NativeGate>> = LazyLock::new(|| {
    [
        ("i", NativeGate::I),
        ("x", NativeGate::X),
        ("y", NativeGate::Y),
        ("z", NativeGate::Z),
        ("h", NativeGate::H),
        ("s", NativeGate::S),
        ("t", NativeGate::T),
        ("sdg", NativeGate::Sdg),
        ("tdg", NativeGate::Tdg),
        ("rx", NativeGate::Rx),
        ("ry", NativeGate::Ry),
        ("rz", NativeGate::Rz),
        ("phase", NativeGate::Phase),
        ("not", NativeGate::X),
        ("cnot", NativeGate::X),
        ("cz", NativeGate::Z),
        ("swap", NativeGate::Swap),
    ]
    .into_iter()
    .collect()
});

/// Opcodes accepted by the digital backend, sorted.
pub fn supported_opcodes() -> Vec<&'static str> {
    let mut names: Vec<_> = OPCODES.keys().copied().collect();
    names.sort_unstable();
    names
}

fn op_sigmoid(args: &[Value]) -> CompileResult<Value> {
    Ok(args[0].map(|v| 1.0 / (1.0 + (-v).exp())))
}

fn op_relu(args: &[Value]) -> CompileResult<Value> {
    Ok(args[0].map(|v| v.max(0.0)))
}

/// Functions the digital backend adds to the builtins.
pub static NATIVE_FUNCTIONS: LazyLock<FunctionTable> = LazyLock::new(|| {
    FunctionTable::new(&[
        Operator::new("sigmoid", Arity::Exactly(1), op_sigmoid),
        Operator::new("relu", Arity::Exactly(1), op_relu),
    ])
});

/// Angle of a parametric gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateParam {
    /// Read from the evaluated parameters at run time.
    Symbol(String),
    /// Fixed angle.
    Constant(f64),
}

impl GateParam {
    /// Numeric angle for the given evaluated parameters.
    ///
    /// Array values contribute their first element.
    pub fn resolve(&self, values: &ParameterValues) -> CompileResult<f64> {
        match self {
            GateParam::Constant(v) => Ok(*v),
            GateParam::Symbol(name) => values
                .get(name)
                .and_then(Value::first)
                .ok_or_else(|| CompileError::UnboundVariable(name.clone())),
        }
    }
}

/// One gate application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateOp {
    /// The gate.
    pub gate: NativeGate,
    /// Control qubits.
    pub control: Vec<usize>,
    /// Target qubits, already expanded.
    pub target: Vec<usize>,
    /// Angle for parametric gates.
    pub param: Option<GateParam>,
}

impl GateOp {
    /// Qubits in native order: controls, then targets.
    pub fn qubits(&self) -> Vec<usize> {
        let mut qubits = self.control.clone();
        qubits.extend(&self.target);
        qubits
    }
}

/// A gate circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Circuit {
    /// Register size.
    pub num_qubits: usize,
    /// Initial basis state, qubit 0 first.
    pub initial_state: Option<String>,
    /// Gates in application order.
    pub ops: Vec<GateOp>,
}

impl Circuit {
    /// Variable names read by the circuit.
    pub fn symbols(&self) -> BTreeSet<&str> {
        self.ops
            .iter()
            .filter_map(|op| match &op.param {
                Some(GateParam::Symbol(name)) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Lowering for the digital backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigitalLowering;

impl InstructionLowering for DigitalLowering {
    #[instrument(skip_all)]
    fn lower(
        &self,
        model: &Model,
        register: &NativeRegister,
        embedding: &Embedding,
    ) -> CompileResult<NativeProgram> {
        let NativeRegister::Qubits(qubits) = register else {
            return Err(CompileError::IncompatibleRegister {
                backend: "digital".into(),
                found: "atom",
            });
        };
        let num_qubits = qubits.num_qubits;

        let mut ops = Vec::new();
        for inst in model.quantum_instructions() {
            let gate = *OPCODES.get(inst.opcode.as_str()).ok_or_else(|| {
                CompileError::UnsupportedOpcode {
                    backend: "digital".into(),
                    opcode: inst.opcode.clone(),
                }
            })?;

            let param = if gate.is_parametric() {
                check_max_args(inst, 1)?;
                let arg = required_arg(inst, 0, "angle")?;
                check_bound(arg, embedding)?;
                Some(match arg {
                    Arg::Load(name) => GateParam::Symbol(name.clone()),
                    Arg::Constant(v) => GateParam::Constant(*v),
                })
            } else {
                check_max_args(inst, 0)?;
                None
            };

            let target = inst.support.resolved_target(num_qubits);
            if gate.num_targets() > 1 && target.len() != gate.num_targets() {
                return Err(CompileError::InvalidQubitCount {
                    opcode: inst.opcode.clone(),
                    expected: gate.num_targets(),
                    got: target.len(),
                });
            }

            ops.push(GateOp {
                gate,
                control: inst.support.control().to_vec(),
                target,
                param,
            });
        }

        debug!("Lowered {} gates on {} qubits", ops.len(), num_qubits);
        Ok(NativeProgram::Circuit(Circuit {
            num_qubits,
            initial_state: qubits.initial_state.clone(),
            ops,
        }))
    }
}
