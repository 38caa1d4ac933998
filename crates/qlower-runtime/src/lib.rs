//! qlower Runtime
//!
//! Execution facade for compiled models. A [`RuntimeInterface`] owns one
//! [`CompiledArtifact`](qlower_compile::CompiledArtifact), the trainable
//! parameter buffer and any stored caller inputs, and delegates numeric work
//! to an [`Engine`].
//!
//! # Overview
//!
//! - [`Engine`]: the contract a simulation engine implements
//! - [`Observable`]: capability queries an engine uses to build its native
//!   observable, independent of any concrete expression type
//! - [`QuantumState`] and [`Histogram`]: execution results
//! - [`Target`]: emulator or hardware; hardware is not implemented
//!
//! # Example
//!
//! ```ignore
//! use qlower_ir::{ParameterValues, Value};
//!
//! let interface = qlower::compile(&model, "digital", None)?;
//! let inputs: ParameterValues = [("x".to_string(), Value::Scalar(1.57))].into();
//! let histogram = interface.sample(&inputs, 1000, None)?;
//! println!("{:?}", histogram.most_frequent());
//! ```

pub mod engine;
pub mod error;
pub mod interface;
pub mod observable;
pub mod state;

pub use engine::Engine;
pub use error::{EngineError, EngineResult, ErrorKind, RuntimeError, RuntimeResult};
pub use interface::{InterfaceInfo, InterfaceState, RuntimeInterface, Target};
pub use observable::{Observable, ObservableArg};
pub use state::{Histogram, QuantumState, bitstring};
