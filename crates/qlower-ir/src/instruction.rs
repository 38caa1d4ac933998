//! Instructions: SSA assignments and quantum instructions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};

/// Reserved argument name standing for "fill the remaining duration".
pub const FILL: &str = "fill";

/// An instruction argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arg {
    /// Reference to a named input, trainable parameter or SSA variable.
    Load(String),
    /// A literal number.
    Constant(f64),
}

impl Arg {
    /// Create a load argument.
    pub fn load(name: impl Into<String>) -> Self {
        Arg::Load(name.into())
    }

    /// The referenced name, if this is a load.
    pub fn name(&self) -> Option<&str> {
        match self {
            Arg::Load(name) => Some(name),
            Arg::Constant(_) => None,
        }
    }

    /// Check whether this is the `fill` duration sentinel.
    pub fn is_fill(&self) -> bool {
        self.name() == Some(FILL)
    }
}

impl From<f64> for Arg {
    fn from(v: f64) -> Self {
        Arg::Constant(v)
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Load(name) => write!(f, "{name}"),
            Arg::Constant(v) => write!(f, "{v}"),
        }
    }
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    /// Apply a named operator to arguments.
    Call {
        /// Operator name, e.g. `mul` or `sin`.
        op: String,
        /// Operator arguments.
        args: Vec<Arg>,
    },
    /// Alias of another name.
    Load(String),
    /// A literal number.
    Constant(f64),
}

impl Expr {
    /// Create a call expression.
    pub fn call(op: impl Into<String>, args: impl IntoIterator<Item = Arg>) -> Self {
        Expr::Call {
            op: op.into(),
            args: args.into_iter().collect(),
        }
    }

    /// Names this expression reads.
    pub fn loads(&self) -> Vec<&str> {
        match self {
            Expr::Call { args, .. } => args.iter().filter_map(Arg::name).collect(),
            Expr::Load(name) => vec![name.as_str()],
            Expr::Constant(_) => Vec::new(),
        }
    }
}

/// Single static assignment `variable = value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    /// Variable being bound.
    pub variable: String,
    /// The bound expression.
    pub value: Expr,
}

impl Assign {
    /// Create an assignment.
    pub fn new(variable: impl Into<String>, value: Expr) -> Self {
        Self {
            variable: variable.into(),
            value,
        }
    }
}

/// Qubits an instruction acts on.
///
/// An empty target means "all qubits"; a controlled operation always names
/// its target explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSupport")]
pub struct Support {
    target: Vec<usize>,
    control: Vec<usize>,
}

#[derive(Deserialize)]
struct RawSupport {
    #[serde(default)]
    target: Vec<usize>,
    #[serde(default)]
    control: Vec<usize>,
}

impl TryFrom<RawSupport> for Support {
    type Error = IrError;

    fn try_from(raw: RawSupport) -> IrResult<Self> {
        Support::new(raw.target, raw.control)
    }
}

impl Support {
    /// Create a support, rejecting controls without a target.
    pub fn new(target: Vec<usize>, control: Vec<usize>) -> IrResult<Self> {
        if target.is_empty() && !control.is_empty() {
            return Err(IrError::SupportWithoutTarget { control });
        }
        Ok(Self { target, control })
    }

    /// Support on the given targets with no controls.
    pub fn target_only(target: Vec<usize>) -> Self {
        Self {
            target,
            control: Vec::new(),
        }
    }

    /// Support on every qubit of the register.
    pub fn all() -> Self {
        Self::default()
    }

    /// Target qubits as declared.
    pub fn target(&self) -> &[usize] {
        &self.target
    }

    /// Control qubits as declared.
    pub fn control(&self) -> &[usize] {
        &self.control
    }

    /// Check whether this addresses all qubits.
    pub fn is_all(&self) -> bool {
        self.target.is_empty()
    }

    /// Target qubits with "all qubits" expanded for a register of `num_qubits`.
    pub fn resolved_target(&self, num_qubits: usize) -> Vec<usize> {
        if self.target.is_empty() {
            (0..num_qubits).collect()
        } else {
            self.target.clone()
        }
    }

    /// Native addressing order: controls first, then targets.
    pub fn native_order(&self, num_qubits: usize) -> Vec<usize> {
        let mut qubits = self.control.clone();
        qubits.extend(self.resolved_target(num_qubits));
        qubits
    }

    pub(crate) fn validate(&self, num_qubits: usize, opcode: &str) -> IrResult<()> {
        let mut seen = Vec::with_capacity(self.target.len() + self.control.len());
        for &q in self.control.iter().chain(&self.target) {
            if q >= num_qubits {
                return Err(IrError::QubitOutOfRange {
                    qubit: q,
                    num_qubits,
                    opcode: opcode.to_string(),
                });
            }
            if seen.contains(&q) {
                return Err(IrError::DuplicateQubit {
                    qubit: q,
                    opcode: Some(opcode.to_string()),
                });
            }
            seen.push(q);
        }
        Ok(())
    }
}

/// A quantum instruction: opcode, support and arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuInstruct {
    /// Operation name, e.g. `rx` or `dyn_pulse`.
    pub opcode: String,
    /// Qubits the operation acts on.
    #[serde(default)]
    pub support: Support,
    /// Operation arguments.
    #[serde(default)]
    pub args: Vec<Arg>,
}

impl QuInstruct {
    /// Create a quantum instruction.
    pub fn new(opcode: impl Into<String>, support: Support, args: Vec<Arg>) -> Self {
        Self {
            opcode: opcode.into(),
            support,
            args,
        }
    }
}

/// One entry in a model's instruction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Instruction {
    /// SSA assignment, consumed by the embedding.
    Assign(Assign),
    /// Quantum operation, consumed by lowering.
    Quantum(QuInstruct),
}

impl Instruction {
    /// Shorthand for an assignment.
    pub fn assign(variable: impl Into<String>, value: Expr) -> Self {
        Instruction::Assign(Assign::new(variable, value))
    }

    /// Shorthand for a quantum instruction.
    pub fn quantum(opcode: impl Into<String>, support: Support, args: Vec<Arg>) -> Self {
        Instruction::Quantum(QuInstruct::new(opcode, support, args))
    }
}

impl From<Assign> for Instruction {
    fn from(assign: Assign) -> Self {
        Instruction::Assign(assign)
    }
}

impl From<QuInstruct> for Instruction {
    fn from(inst: QuInstruct) -> Self {
        Instruction::Quantum(inst)
    }
}
