//! Error types for compilation.

use qlower_ir::IrError;
use thiserror::Error;

/// Broad classification of compile errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown backend, device or opcode. Never retried.
    Configuration,
    /// Caller-correctable input problem.
    Validation,
    /// Malformed model: unbound names, unknown operators.
    Model,
}

/// Errors that can occur while compiling or evaluating a model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// No backend is registered under this name.
    #[error("Unknown backend '{0}'")]
    UnknownBackend(String),

    /// The backend exists but does not know this device.
    #[error("Unknown device '{device}' for backend '{backend}'")]
    UnknownDevice {
        /// Backend name.
        backend: String,
        /// Requested device name.
        device: String,
    },

    /// The backend has no lowering for this opcode.
    #[error("Opcode '{opcode}' is not supported by backend '{backend}'")]
    UnsupportedOpcode {
        /// Backend name.
        backend: String,
        /// Offending opcode.
        opcode: String,
    },

    /// The device cannot drive time-modulated parameters.
    #[error("Device '{device}' cannot handle time-modulated parameter '{name}'")]
    TimeModulatedInput {
        /// Parameter name.
        name: String,
        /// Device name.
        device: String,
    },

    /// Register with zero qubits.
    #[error("Register must contain at least one qubit")]
    EmptyRegister,

    /// More qubits than the calibrated layout can hold.
    #[error("Requested {requested} qubits but device '{device}' provides only {available} traps")]
    LayoutOverflow {
        /// Device name.
        device: String,
        /// Requested qubit count.
        requested: usize,
        /// Usable trap count.
        available: usize,
    },

    /// Malformed `initial_state` register option.
    #[error("Invalid initial state '{state}' for {num_qubits} qubits")]
    InvalidInitialState {
        /// The given state.
        state: String,
        /// Register size.
        num_qubits: usize,
    },

    /// Instruction received more arguments than its native operation takes.
    #[error("Opcode '{opcode}' accepts at most {max} argument(s), got {got}")]
    TooManyArgs {
        /// Offending opcode.
        opcode: String,
        /// Maximum accepted.
        max: usize,
        /// Number given.
        got: usize,
    },

    /// Required instruction argument is absent.
    #[error("Opcode '{opcode}' is missing its '{argument}' argument")]
    MissingArgument {
        /// Offending opcode.
        opcode: String,
        /// Name of the missing argument.
        argument: &'static str,
    },

    /// Operation addresses the wrong number of qubits.
    #[error("Opcode '{opcode}' acts on {expected} target qubit(s), got {got}")]
    InvalidQubitCount {
        /// Offending opcode.
        opcode: String,
        /// Expected target count.
        expected: usize,
        /// Given target count.
        got: usize,
    },

    /// `fill` duration used without concurrent mode.
    #[error("Opcode '{opcode}': a 'fill' duration can only be used in concurrent mode")]
    InvalidFillUsage {
        /// Offending opcode.
        opcode: String,
    },

    /// Local pulse without a configured detuning map.
    #[error("Opcode '{opcode}' needs the 'local_targets' directive to address qubits locally")]
    MissingDetuningMap {
        /// Offending opcode.
        opcode: String,
    },

    /// Malformed directive value.
    #[error("Invalid directive '{directive}': {reason}")]
    InvalidDirective {
        /// Directive name.
        directive: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Detuning-map weight outside `[0, 1]`.
    #[error("Detuning weight {weight} for qubit {qubit} is outside [0, 1]")]
    InvalidDetuningWeight {
        /// Qubit index.
        qubit: usize,
        /// Offending weight.
        weight: f64,
    },

    /// Argument must be a literal constant.
    #[error("Opcode '{opcode}': argument '{argument}' must be a constant")]
    ConstantRequired {
        /// Offending opcode.
        opcode: String,
        /// Name of the argument.
        argument: &'static str,
    },

    /// The lowering received a register of the wrong kind.
    #[error("Backend '{backend}' cannot lower onto a {found} register")]
    IncompatibleRegister {
        /// Backend name.
        backend: String,
        /// Register kind received.
        found: &'static str,
    },

    /// A resolved pulse duration is negative.
    #[error("Pulse duration must be non-negative, got {0} ns")]
    InvalidDuration(f64),

    /// Operator name found neither in the builtins nor the backend natives.
    #[error("Unknown operator '{0}'")]
    UnknownOperator(String),

    /// A name is read before it is bound.
    #[error("Unbound variable '{0}'")]
    UnboundVariable(String),

    /// Operator called with the wrong number of arguments.
    #[error("Operator '{op}' expects {expected} argument(s), got {got}")]
    InvalidArity {
        /// Operator name.
        op: String,
        /// Human-readable expectation, e.g. "1" or "at least 1".
        expected: String,
        /// Number given.
        got: usize,
    },

    /// A single number was needed but an array was bound.
    #[error("Argument '{0}' must be a scalar")]
    NonScalarArgument(String),

    /// Indexed read past the end of an array parameter.
    #[error("Index {index} out of range for parameter '{name}' of length {len}")]
    IndexOutOfRange {
        /// Parameter name.
        name: String,
        /// Requested index.
        index: usize,
        /// Parameter length.
        len: usize,
    },

    /// Supplied values do not match the declared caller parameters.
    #[error("Input mismatch: missing {missing:?}, unexpected {extra:?}")]
    MissingOrExtraInputs {
        /// Declared names that were not supplied.
        missing: Vec<String>,
        /// Supplied names that are not declared.
        extra: Vec<String>,
    },

    /// Supplied value has the wrong length.
    #[error("Parameter '{name}' expects {expected} element(s), got {got}")]
    InputShapeMismatch {
        /// Parameter name.
        name: String,
        /// Declared size.
        expected: usize,
        /// Supplied length.
        got: usize,
    },

    /// Invalid model.
    #[error(transparent)]
    Ir(#[from] IrError),
}

impl CompileError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::UnknownBackend(_)
            | CompileError::UnknownDevice { .. }
            | CompileError::UnsupportedOpcode { .. }
            | CompileError::TimeModulatedInput { .. }
            | CompileError::IncompatibleRegister { .. } => ErrorKind::Configuration,
            CompileError::UnknownOperator(_)
            | CompileError::UnboundVariable(_)
            | CompileError::InvalidArity { .. }
            | CompileError::Ir(_) => ErrorKind::Model,
            _ => ErrorKind::Validation,
        }
    }
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;
