//! Error types for the IR crate.

use thiserror::Error;

/// Errors raised while constructing or validating a [`Model`](crate::Model).
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum IrError {
    /// A controlled operation was declared without an explicit target.
    #[error("Support has control qubits {control:?} but no target qubits")]
    SupportWithoutTarget {
        /// The control qubits that were given.
        control: Vec<usize>,
    },

    /// A qubit appears more than once in one support.
    #[error("Duplicate qubit {qubit} in support{}", format_opcode_context(.opcode))]
    DuplicateQubit {
        /// The duplicated qubit index.
        qubit: usize,
        /// Optional opcode for context.
        opcode: Option<String>,
    },

    /// A support addresses a qubit outside the register.
    #[error("Qubit {qubit} out of range for a {num_qubits}-qubit register (opcode: {opcode})")]
    QubitOutOfRange {
        /// The offending qubit index.
        qubit: usize,
        /// Register size.
        num_qubits: usize,
        /// Opcode of the instruction.
        opcode: String,
    },

    /// A variable is assigned more than once.
    #[error("Variable '{0}' is assigned more than once")]
    DuplicateAssignment(String),

    /// An assignment rebinds a declared input parameter.
    #[error("Assignment to '{0}' shadows a declared input parameter")]
    AssignToInput(String),

    /// A parameter was declared with size zero.
    #[error("Parameter '{0}' must have size >= 1")]
    InvalidAllocSize(String),

    /// The number of qubit positions does not match the register size.
    #[error("Register declares {num_qubits} qubits but {positions} positions")]
    PositionCountMismatch {
        /// Declared qubit count.
        num_qubits: usize,
        /// Number of positions given.
        positions: usize,
    },

    /// Element-wise operation on arrays of different length.
    #[error("Shape mismatch: array of length {left} combined with array of length {right}")]
    ShapeMismatch {
        /// Length of the left operand.
        left: usize,
        /// Length of the right operand.
        right: usize,
    },

    /// Reserved name used as a variable.
    #[error("'{0}' is a reserved name and cannot be declared")]
    ReservedName(String),
}

/// Helper function to format optional opcode context.
#[allow(clippy::ref_option)]
fn format_opcode_context(opcode: &Option<String>) -> String {
    match opcode {
        Some(name) => format!(" (opcode: {name})"),
        None => String::new(),
    }
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
