//! qlower: multi-target quantum program compiler
//!
//! One entry point, [`compile`], turns a backend-agnostic [`Model`] into a
//! [`RuntimeInterface`] bound to the local engine for the backend's class.
//! The only global state consulted is the static dialect registry.
//!
//! ```text
//!   Model ──compile(backend, device)──► RuntimeInterface ──run/sample/expectation──► engine
//! ```
//!
//! # Example
//!
//! ```rust
//! use qlower::{Alloc, AllocQubits, Arg, Expr, Model, ParameterValues, Support, Value};
//!
//! let model = Model::builder(AllocQubits::new(2).with_option("initial_state", "10".into()))
//!     .input("x", Alloc::input(1))
//!     .assign("%0", Expr::call("mul", [Arg::Constant(1.57), Arg::load("x")]))
//!     .assign("%1", Expr::call("sin", [Arg::load("%0")]))
//!     .quantum("rx", Support::target_only(vec![0]), vec![Arg::load("%1")])
//!     .quantum("not", Support::new(vec![1], vec![0]).unwrap(), vec![])
//!     .build()
//!     .unwrap();
//!
//! let interface = qlower::compile(&model, "digital", None).unwrap();
//! let inputs: ParameterValues =
//!     [("x".to_string(), Value::Scalar(std::f64::consts::FRAC_PI_2))].into();
//! let histogram = interface.sample(&inputs, 2000, None).unwrap();
//!
//! assert_eq!(histogram.total(), 2000);
//! assert_eq!(histogram.most_frequent().map(|(k, _)| k), Some("11"));
//! ```

use std::sync::Arc;

use tracing::{info, instrument};

pub use qlower_adapter_sim::{
    DEFAULT_MAX_ATOMS, DEFAULT_MAX_QUBITS, PauliExpr, PulseEngine, StatevectorEngine,
};
pub use qlower_compile::{
    BackendClass, CompatibilityWarning, CompileError, CompileResult, CompiledArtifact,
    DeviceSettings, Dialect, DialectRegistry, NativeProgram, NativeRegister,
};
pub use qlower_ir::{
    Alloc, AllocQubits, Arg, Expr, GridType, Instruction, Model, ParameterValues, Support, Value,
};
pub use qlower_runtime::{
    Engine, ErrorKind, Histogram, InterfaceInfo, InterfaceState, Observable, QuantumState,
    RuntimeError, RuntimeInterface, RuntimeResult, Target, bitstring,
};

/// The local engine executing programs of `class`.
pub fn engine_for(class: BackendClass) -> Arc<dyn Engine> {
    match class {
        BackendClass::Digital => Arc::new(StatevectorEngine::new()),
        BackendClass::Analog => Arc::new(PulseEngine::new()),
    }
}

/// Compile `model` for `backend` (and optionally `device`) and bind the
/// matching local engine.
///
/// Deterministic in its inputs. Fails with
/// [`CompileError::UnknownBackend`]/[`CompileError::UnknownDevice`] for names
/// outside the registry, and with validation errors for models the target
/// cannot express.
#[instrument(skip(model))]
pub fn compile(
    model: &Model,
    backend: &str,
    device: Option<&str>,
) -> CompileResult<RuntimeInterface> {
    let dialect = DialectRegistry::global().resolve(backend, device)?;
    let artifact = dialect.compile(model)?;
    let engine = engine_for(dialect.class());
    info!(
        "Bound {} program to engine '{}'",
        dialect.class(),
        engine.name()
    );
    Ok(RuntimeInterface::new(artifact, engine))
}

/// Like [`compile`], with a caller-supplied engine.
pub fn compile_with_engine(
    model: &Model,
    backend: &str,
    device: Option<&str>,
    engine: Arc<dyn Engine>,
) -> CompileResult<RuntimeInterface> {
    let artifact = DialectRegistry::global()
        .resolve(backend, device)?
        .compile(model)?;
    Ok(RuntimeInterface::new(artifact, engine))
}
