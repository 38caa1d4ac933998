//! qlower Compilation Framework
//!
//! This crate turns a backend-agnostic [`Model`](qlower_ir::Model) into a
//! backend-native [`CompiledArtifact`]. Compilation is a pure function of
//! `(model, backend, device)` and proceeds in three stages, each behind a
//! trait so a backend can swap in its own implementation:
//!
//! 1. **Register resolution** ([`RegisterResolver`]): qubit count for
//!    gate-based backends; atom placement on a calibrated trap layout for
//!    analog devices, with compatibility warnings for unsupported hints.
//! 2. **Embedding** ([`EmbeddingBuilder`]): the model's single-assignment
//!    arithmetic compiled into an ordered table of evaluator closures.
//! 3. **Lowering** ([`InstructionLowering`]): quantum instructions mapped
//!    onto a gate [`Circuit`] or a timed [`PulseSequence`].
//!
//! ```text
//!   Model ──► RegisterResolver ──► NativeRegister ─┐
//!     │                                            ├─► InstructionLowering ──► NativeProgram
//!     └────► EmbeddingBuilder ───► Embedding ──────┘
//! ```
//!
//! # Example: Digital Compilation
//!
//! ```rust
//! use qlower_compile::{DialectRegistry, NativeProgram};
//! use qlower_ir::{Alloc, AllocQubits, Arg, Model, Support};
//!
//! let model = Model::builder(AllocQubits::new(2))
//!     .input("theta", Alloc::input(1))
//!     .quantum("rx", Support::target_only(vec![0]), vec![Arg::load("theta")])
//!     .quantum("cnot", Support::new(vec![1], vec![0]).unwrap(), vec![])
//!     .build()
//!     .unwrap();
//!
//! let dialect = DialectRegistry::global().resolve("digital", None).unwrap();
//! let artifact = dialect.compile(&model).unwrap();
//!
//! assert!(matches!(artifact.program(), NativeProgram::Circuit(c) if c.ops.len() == 2));
//! assert!(artifact.warnings().is_empty());
//! ```
//!
//! # Backends
//!
//! | Backend | Devices | Program |
//! |---------|---------|---------|
//! | `digital` | none | [`Circuit`] |
//! | `analog` | `analog-device` (default), `fresnel1` | [`PulseSequence`] |

pub mod device;
pub mod dialect;
pub mod embedding;
pub mod error;
pub mod lowering;
pub mod parameter;
pub mod register;
pub mod warning;

pub use device::{ANALOG_DEVICE, DeviceSettings, FRESNEL1, TrapLayout};
pub use dialect::{
    ANALOG_BACKEND, BackendClass, CompiledArtifact, DIGITAL_BACKEND, Dialect, DialectRegistry,
    resolve,
};
pub use embedding::{Embedding, EmbeddingBuilder, FunctionTable, StandardEmbedding};
pub use error::{CompileError, CompileResult, ErrorKind};
pub use lowering::pulse::{ChannelId, Drive, TimedPulse};
pub use lowering::{
    BuiltSequence, Circuit, GateOp, GateParam, InstructionLowering, NativeGate, NativeProgram,
    PulseSequence,
};
pub use parameter::ParameterBuffer;
pub use register::{NativeLayout, NativeRegister, QubitRegister, RegisterResolver};
pub use warning::CompatibilityWarning;
