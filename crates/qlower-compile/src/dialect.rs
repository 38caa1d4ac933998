//! Dialects: the per-backend bundle of resolver, embedding builder and lowering.
//!
//! The set of backends is closed. [`DialectRegistry::global`] is built once
//! on first use and only read afterwards, so lookups from several threads
//! need no locking.

use std::fmt;
use std::sync::LazyLock;

use qlower_ir::Model;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::device::{ANALOG_DEVICE, DeviceSettings, FRESNEL1};
use crate::embedding::{Embedding, EmbeddingBuilder, StandardEmbedding};
use crate::error::{CompileError, CompileResult};
use crate::lowering::{
    AnalogLowering, DigitalLowering, InstructionLowering, NativeProgram, analog, digital,
};
use crate::register::{
    GeometryResolver, NativeRegister, QubitRegisterResolver, RegisterResolver,
};
use crate::warning::CompatibilityWarning;

/// Name of the gate-based backend.
pub const DIGITAL_BACKEND: &str = "digital";

/// Name of the pulse-based backend.
pub const ANALOG_BACKEND: &str = "analog";

/// Execution model of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendClass {
    /// Gate circuits.
    Digital,
    /// Pulse sequences.
    Analog,
}

impl fmt::Display for BackendClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendClass::Digital => write!(f, "digital"),
            BackendClass::Analog => write!(f, "analog"),
        }
    }
}

/// The compiled form of one model on one backend/device.
///
/// Never mutated after compilation: running with different values only
/// threads those values through the embedding.
#[derive(Debug)]
pub struct CompiledArtifact {
    backend: &'static str,
    device: Option<&'static str>,
    class: BackendClass,
    register: NativeRegister,
    embedding: Embedding,
    program: NativeProgram,
    warnings: Vec<CompatibilityWarning>,
}

impl CompiledArtifact {
    /// Backend name.
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Device name, for backends with devices.
    pub fn device(&self) -> Option<&'static str> {
        self.device
    }

    /// Execution model.
    pub fn class(&self) -> BackendClass {
        self.class
    }

    /// Native register.
    pub fn register(&self) -> &NativeRegister {
        &self.register
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.register.num_qubits()
    }

    /// Evaluator table.
    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    /// Native circuit or pulse sequence.
    pub fn program(&self) -> &NativeProgram {
        &self.program
    }

    /// Advisories raised during compilation.
    pub fn warnings(&self) -> &[CompatibilityWarning] {
        &self.warnings
    }
}

/// Everything needed to compile for one backend/device pair.
pub struct Dialect {
    backend: &'static str,
    device: Option<&'static DeviceSettings>,
    class: BackendClass,
    register_resolver: Box<dyn RegisterResolver>,
    embedding_builder: Box<dyn EmbeddingBuilder>,
    lowering: Box<dyn InstructionLowering>,
    opcodes: Vec<&'static str>,
}

impl Dialect {
    /// Gate-based dialect.
    pub fn digital() -> Self {
        Self {
            backend: DIGITAL_BACKEND,
            device: None,
            class: BackendClass::Digital,
            register_resolver: Box::new(QubitRegisterResolver),
            embedding_builder: Box::new(StandardEmbedding::new(&digital::NATIVE_FUNCTIONS)),
            lowering: Box::new(DigitalLowering),
            opcodes: digital::supported_opcodes(),
        }
    }

    /// Pulse-based dialect for `device`.
    pub fn analog(device: &'static DeviceSettings) -> Self {
        let lowering = AnalogLowering::new(device);
        Self {
            backend: ANALOG_BACKEND,
            device: Some(device),
            class: BackendClass::Analog,
            register_resolver: Box::new(GeometryResolver::new(device)),
            embedding_builder: Box::new(StandardEmbedding::new(&analog::NATIVE_FUNCTIONS)),
            opcodes: lowering.supported_opcodes(),
            lowering: Box::new(lowering),
        }
    }

    /// Backend name.
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Device registry name, if any.
    pub fn device_name(&self) -> Option<&'static str> {
        self.device.map(|d| d.name_short)
    }

    /// Device settings, if any.
    pub fn device(&self) -> Option<&'static DeviceSettings> {
        self.device
    }

    /// Execution model.
    pub fn class(&self) -> BackendClass {
        self.class
    }

    /// Opcodes this dialect can lower, sorted.
    pub fn opcodes(&self) -> &[&'static str] {
        &self.opcodes
    }

    /// Compile `model`: resolve the register, build the embedding, lower.
    #[instrument(skip(self, model), fields(backend = self.backend, device = ?self.device_name()))]
    pub fn compile(&self, model: &Model) -> CompileResult<CompiledArtifact> {
        let mut warnings = Vec::new();
        let register = self.register_resolver.resolve(model, &mut warnings)?;
        let embedding = self.embedding_builder.build(model)?;
        let program = self.lowering.lower(model, &register, &embedding)?;

        info!(
            "Compiled {} qubits into {} native operations ({} warnings)",
            register.num_qubits(),
            program.len(),
            warnings.len()
        );

        Ok(CompiledArtifact {
            backend: self.backend,
            device: self.device_name(),
            class: self.class,
            register,
            embedding,
            program,
            warnings,
        })
    }
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect")
            .field("backend", &self.backend)
            .field("device", &self.device_name())
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

/// Static registry of dialects keyed by backend name.
///
/// The first dialect registered for a backend is its default.
#[derive(Debug, Default)]
pub struct DialectRegistry {
    backends: FxHashMap<&'static str, Vec<Dialect>>,
}

static REGISTRY: LazyLock<DialectRegistry> = LazyLock::new(|| {
    let mut registry = DialectRegistry::default();
    registry.register(Dialect::digital());
    registry.register(Dialect::analog(&ANALOG_DEVICE));
    registry.register(Dialect::analog(&FRESNEL1));
    debug!(
        "Dialect registry initialised with backends {:?}",
        registry.available_backends()
    );
    registry
});

impl DialectRegistry {
    /// The process-wide registry.
    pub fn global() -> &'static DialectRegistry {
        &REGISTRY
    }

    fn register(&mut self, dialect: Dialect) {
        self.backends
            .entry(dialect.backend)
            .or_default()
            .push(dialect);
    }

    /// Look up the dialect for `backend` and optional `device`.
    ///
    /// Without a device the backend's default dialect is returned.
    pub fn resolve(&self, backend: &str, device: Option<&str>) -> CompileResult<&Dialect> {
        let dialects = self
            .backends
            .get(backend)
            .ok_or_else(|| CompileError::UnknownBackend(backend.to_string()))?;

        let found = match device {
            None => dialects.first(),
            Some(name) => dialects.iter().find(|d| d.device_name() == Some(name)),
        };
        found.ok_or_else(|| CompileError::UnknownDevice {
            backend: backend.to_string(),
            device: device.unwrap_or_default().to_string(),
        })
    }

    /// Registered backend names, sorted.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.backends.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Device names of `backend`, default first. Empty for unknown backends.
    pub fn devices(&self, backend: &str) -> Vec<&'static str> {
        self.backends
            .get(backend)
            .map(|ds| ds.iter().filter_map(Dialect::device_name).collect())
            .unwrap_or_default()
    }

    /// Check whether `backend` is registered.
    pub fn has_backend(&self, backend: &str) -> bool {
        self.backends.contains_key(backend)
    }

    /// Every registered dialect, sorted by backend.
    pub fn dialects(&self) -> Vec<&Dialect> {
        self.available_backends()
            .into_iter()
            .filter_map(|b| self.backends.get(b))
            .flatten()
            .collect()
    }
}

/// Resolve a dialect from the global registry.
pub fn resolve(backend: &str, device: Option<&str>) -> CompileResult<&'static Dialect> {
    DialectRegistry::global().resolve(backend, device)
}
