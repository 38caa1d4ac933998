//! Error types for execution.

use qlower_compile::{CompileError, ErrorKind as CompileErrorKind};
use thiserror::Error;

/// Broad classification of runtime errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown backend, device or opcode. Never retried.
    Configuration,
    /// Caller-correctable input problem.
    Validation,
    /// Malformed model.
    Model,
    /// Recognised but unimplemented execution path.
    NotImplemented,
    /// Failure inside the simulation engine.
    Engine,
}

/// Errors raised by a simulation engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// The observable has a shape the engine cannot express natively.
    #[error("Unsupported observable: {0}")]
    UnsupportedObservable(String),

    /// The engine does not execute this kind of program.
    #[error("Engine '{engine}' cannot execute {program} programs")]
    UnsupportedProgram {
        /// Engine name.
        engine: String,
        /// Program kind received.
        program: &'static str,
    },

    /// Supplied initial state has the wrong dimension.
    #[error("Initial state has {got} amplitudes, expected {expected}")]
    StateDimensionMismatch {
        /// Expected amplitude count.
        expected: usize,
        /// Given amplitude count.
        got: usize,
    },

    /// Register larger than the engine can hold in memory.
    #[error("Register of {num_qubits} qubits exceeds the engine limit of {max}")]
    TooManyQubits {
        /// Register size.
        num_qubits: usize,
        /// Engine limit.
        max: usize,
    },

    /// Binding parameters into the native program failed.
    #[error(transparent)]
    Binding(#[from] CompileError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while executing a compiled model.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RuntimeError {
    /// Parameter names that are not declared caller inputs.
    #[error("Unknown parameter(s): {}", .0.join(", "))]
    UnknownParameter(Vec<String>),

    /// Non-positive shot count.
    #[error("Shot count must be a positive integer, got {0}")]
    InvalidShotCount(usize),

    /// `expectation` without an observable.
    #[error("An observable is required: pass one or bind it with set_observable")]
    ObservableRequired,

    /// Execution path that exists but is not available.
    #[error("{0} is not implemented")]
    NotImplemented(String),

    /// Compilation or parameter evaluation failed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The engine failed; carried unchanged.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl RuntimeError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::UnknownParameter(_)
            | RuntimeError::InvalidShotCount(_)
            | RuntimeError::ObservableRequired => ErrorKind::Validation,
            RuntimeError::NotImplemented(_) => ErrorKind::NotImplemented,
            RuntimeError::Compile(e) => match e.kind() {
                CompileErrorKind::Configuration => ErrorKind::Configuration,
                CompileErrorKind::Model => ErrorKind::Model,
                _ => ErrorKind::Validation,
            },
            RuntimeError::Engine(_) => ErrorKind::Engine,
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(RuntimeError::ObservableRequired.kind(), ErrorKind::Validation);
        assert_eq!(
            RuntimeError::NotImplemented("QPU execution".into()).kind(),
            ErrorKind::NotImplemented
        );
        assert_eq!(
            RuntimeError::from(CompileError::UnknownBackend("x".into())).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            RuntimeError::from(EngineError::UnsupportedObservable("x".into())).kind(),
            ErrorKind::Engine
        );
    }

    #[test]
    fn test_engine_errors_pass_through() {
        let err = RuntimeError::from(EngineError::UnsupportedObservable("kron".into()));
        assert_eq!(err.to_string(), "Unsupported observable: kron");
    }

    #[test]
    fn test_unknown_parameter_message() {
        let err = RuntimeError::UnknownParameter(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Unknown parameter(s): a, b");
    }
}
