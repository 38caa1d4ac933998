//! The runtime interface wrapping one compiled artifact.
//!
//! ```text
//!   Compiled ──set_parameters──► Parameterized
//!      │                              │
//!      └──────run/sample/expectation──┴──► Executed ──┐
//!                                            ▲        │
//!                                            └────────┘
//! ```
//!
//! The interface never reaches a terminal state. Each execution evaluates
//! the embedding over `(trainable, fixed ∪ call-site values)`, with call-site
//! values taking precedence, and hands the result to the engine.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use qlower_compile::{
    CompatibilityWarning, CompiledArtifact, NativeProgram, NativeRegister, ParameterBuffer,
};
use qlower_ir::{ParameterValues, Value};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::engine::Engine;
use crate::error::{RuntimeError, RuntimeResult};
use crate::observable::Observable;
use crate::state::{Histogram, QuantumState};

/// Where programs execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Local simulation engine.
    #[default]
    Emulator,
    /// Physical hardware. Not available.
    Qpu,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Emulator => write!(f, "emulator"),
            Target::Qpu => write!(f, "qpu"),
        }
    }
}

/// Lifecycle state of a [`RuntimeInterface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceState {
    /// Freshly compiled.
    Compiled,
    /// Fixed parameters stored, not yet executed.
    Parameterized,
    /// Executed at least once.
    Executed,
}

/// Summary of a compiled interface.
#[derive(Debug, Clone, Serialize)]
pub struct InterfaceInfo {
    /// Backend name.
    pub backend: String,
    /// Device name, if any.
    pub device: Option<String>,
    /// Number of qubits.
    pub num_qubits: usize,
    /// Number of native operations.
    pub num_operations: usize,
    /// Engine register limit, if any.
    pub engine_max_qubits: Option<usize>,
    /// Trainable parameter names.
    pub trainable: Vec<String>,
    /// Caller input names.
    pub inputs: Vec<String>,
    /// Caller inputs with stored values.
    pub fixed: Vec<String>,
    /// Compilation advisories.
    pub warnings: Vec<CompatibilityWarning>,
    /// Execution target.
    pub target: Target,
    /// Lifecycle state.
    pub state: InterfaceState,
}

/// Uniform execution facade over a compiled model and its engine.
pub struct RuntimeInterface {
    artifact: CompiledArtifact,
    engine: Arc<dyn Engine>,
    trainable: ParameterBuffer,
    fixed: ParameterValues,
    observable: Option<Box<dyn Observable>>,
    target: Target,
    executed: AtomicBool,
}

impl RuntimeInterface {
    /// Wrap an artifact. Trainable parameters start uniformly in `[0, 1)`.
    pub fn new(artifact: CompiledArtifact, engine: Arc<dyn Engine>) -> Self {
        let trainable = ParameterBuffer::random(artifact.embedding().declared());
        Self::with_buffer(artifact, engine, trainable)
    }

    /// Wrap an artifact with reproducible trainable initial values.
    pub fn with_seed(artifact: CompiledArtifact, engine: Arc<dyn Engine>, seed: u64) -> Self {
        let trainable = ParameterBuffer::seeded(artifact.embedding().declared(), seed);
        Self::with_buffer(artifact, engine, trainable)
    }

    fn with_buffer(
        artifact: CompiledArtifact,
        engine: Arc<dyn Engine>,
        trainable: ParameterBuffer,
    ) -> Self {
        debug!(
            "Runtime interface on '{}' with engine '{}' ({} trainable parameters)",
            artifact.backend(),
            engine.name(),
            trainable.len()
        );
        if let Some(max) = engine.max_qubits() {
            if artifact.num_qubits() > max {
                warn!(
                    "Register of {} qubits exceeds the {}-qubit limit of engine '{}'",
                    artifact.num_qubits(),
                    max,
                    engine.name()
                );
            }
        }
        Self {
            artifact,
            engine,
            trainable,
            fixed: ParameterValues::new(),
            observable: None,
            target: Target::default(),
            executed: AtomicBool::new(false),
        }
    }

    /// The compiled artifact.
    pub fn artifact(&self) -> &CompiledArtifact {
        &self.artifact
    }

    /// Native register.
    pub fn register(&self) -> &NativeRegister {
        self.artifact.register()
    }

    /// Native program.
    pub fn program(&self) -> &NativeProgram {
        self.artifact.program()
    }

    /// Engine name.
    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    /// Lifecycle state.
    pub fn state(&self) -> InterfaceState {
        if self.executed.load(Ordering::Relaxed) {
            InterfaceState::Executed
        } else if !self.fixed.is_empty() {
            InterfaceState::Parameterized
        } else {
            InterfaceState::Compiled
        }
    }

    /// Summary of the interface.
    pub fn info(&self) -> InterfaceInfo {
        let embedding = self.artifact.embedding();
        InterfaceInfo {
            backend: self.artifact.backend().to_string(),
            device: self.artifact.device().map(str::to_string),
            num_qubits: self.artifact.num_qubits(),
            num_operations: self.artifact.program().len(),
            engine_max_qubits: self.engine.max_qubits(),
            trainable: embedding.vparams().into_iter().map(str::to_string).collect(),
            inputs: embedding.fparams().into_iter().map(str::to_string).collect(),
            fixed: self.fixed.keys().cloned().collect(),
            warnings: self.artifact.warnings().to_vec(),
            target: self.target,
            state: self.state(),
        }
    }

    /// Trainable parameter buffer.
    pub fn parameters(&self) -> &ParameterBuffer {
        &self.trainable
    }

    /// Stored caller inputs.
    pub fn fixed_parameters(&self) -> &ParameterValues {
        &self.fixed
    }

    /// Update one trainable parameter.
    pub fn set_trainable(&mut self, name: &str, value: Value) -> RuntimeResult<()> {
        self.trainable.set(name, value)?;
        Ok(())
    }

    /// Store caller inputs for later executions.
    ///
    /// Every key must be a declared non-trainable parameter. On failure the
    /// stored values are left untouched.
    pub fn set_parameters(&mut self, params: ParameterValues) -> RuntimeResult<()> {
        self.check_known(&params)?;
        debug!("Storing fixed parameters {:?}", params.keys().collect::<Vec<_>>());
        self.fixed.extend(params);
        Ok(())
    }

    /// Bind an observable used when `expectation` is called without one.
    pub fn set_observable(&mut self, observable: Box<dyn Observable>) {
        self.observable = Some(observable);
    }

    /// Select the execution target.
    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    /// Execution target.
    pub fn target(&self) -> Target {
        self.target
    }

    /// Run the program and return the final state.
    #[instrument(skip_all, fields(backend = self.artifact.backend()))]
    pub fn run(
        &self,
        values: &ParameterValues,
        state: Option<&QuantumState>,
    ) -> RuntimeResult<QuantumState> {
        let resolved = self.prepare(values)?;
        let result = self.engine.run(
            self.artifact.program(),
            self.artifact.register(),
            state,
            &resolved,
        )?;
        self.mark_executed();
        Ok(result)
    }

    /// Run the program and measure `shots` times.
    #[instrument(skip_all, fields(backend = self.artifact.backend(), shots = shots))]
    pub fn sample(
        &self,
        values: &ParameterValues,
        shots: usize,
        state: Option<&QuantumState>,
    ) -> RuntimeResult<Histogram> {
        if shots == 0 {
            return Err(RuntimeError::InvalidShotCount(shots));
        }
        let resolved = self.prepare(values)?;
        let histogram = self.engine.sample(
            self.artifact.program(),
            self.artifact.register(),
            state,
            &resolved,
            shots,
        )?;
        self.mark_executed();
        info!("Sampled {} shots into {} outcomes", histogram.shots(), histogram.len());
        Ok(histogram)
    }

    /// Run the program and return the expectation of an observable.
    ///
    /// Uses `observable` when given, else the one bound with
    /// [`RuntimeInterface::set_observable`].
    #[instrument(skip_all, fields(backend = self.artifact.backend()))]
    pub fn expectation(
        &self,
        values: &ParameterValues,
        observable: Option<&dyn Observable>,
        state: Option<&QuantumState>,
    ) -> RuntimeResult<Value> {
        let observable = observable
            .or(self.observable.as_deref())
            .ok_or(RuntimeError::ObservableRequired)?;
        let resolved = self.prepare(values)?;
        let value = self.engine.expectation(
            self.artifact.program(),
            self.artifact.register(),
            state,
            &resolved,
            observable,
        )?;
        self.mark_executed();
        Ok(value)
    }

    /// Run the program and return one expectation per observable.
    ///
    /// The result is a [`Value::Array`] in the order of `observables`. An
    /// empty slice falls back to the bound observable.
    #[instrument(skip_all, fields(backend = self.artifact.backend(), observables = observables.len()))]
    pub fn expectations(
        &self,
        values: &ParameterValues,
        observables: &[&dyn Observable],
        state: Option<&QuantumState>,
    ) -> RuntimeResult<Value> {
        let bound;
        let observables = if observables.is_empty() {
            bound = [self
                .observable
                .as_deref()
                .ok_or(RuntimeError::ObservableRequired)?];
            &bound[..]
        } else {
            observables
        };
        let resolved = self.prepare(values)?;
        let value = self.engine.expectations(
            self.artifact.program(),
            self.artifact.register(),
            state,
            &resolved,
            observables,
        )?;
        self.mark_executed();
        Ok(value)
    }

    /// Merge inputs and evaluate the embedding.
    fn prepare(&self, values: &ParameterValues) -> RuntimeResult<ParameterValues> {
        if self.target == Target::Qpu {
            return Err(RuntimeError::NotImplemented("QPU execution".to_string()));
        }
        self.check_known(values)?;

        let mut inputs = self.fixed.clone();
        inputs.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));

        let resolved = self
            .artifact
            .embedding()
            .evaluate(self.trainable.values(), &inputs)?;
        Ok(resolved)
    }

    fn check_known(&self, params: &ParameterValues) -> RuntimeResult<()> {
        let known: BTreeSet<&str> = self.artifact.embedding().fparams().into_iter().collect();
        let unknown: Vec<String> = params
            .keys()
            .filter(|k| !known.contains(k.as_str()))
            .cloned()
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::UnknownParameter(unknown))
        }
    }

    fn mark_executed(&self) {
        self.executed.store(true, Ordering::Relaxed);
    }
}

impl fmt::Debug for RuntimeInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeInterface")
            .field("backend", &self.artifact.backend())
            .field("device", &self.artifact.device())
            .field("engine", &self.engine.name())
            .field("target", &self.target)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
