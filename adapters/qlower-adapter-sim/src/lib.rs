//! qlower Local Simulation Engines
//!
//! Engines that execute compiled qlower programs on this machine:
//!
//! - [`StatevectorEngine`]: exact statevector simulation of gate circuits
//! - [`PulseEngine`]: Runge-Kutta integration of analog pulse sequences on
//!   the Rydberg Hamiltonian of the placed atoms
//!
//! Both build their native observable with [`PauliSum::from_observable`],
//! which accepts any [`Observable`](qlower_runtime::Observable). [`PauliExpr`]
//! is a ready-made expression type for callers without their own algebra.
//!
//! # Performance
//!
//! | Qubits | Memory | Notes |
//! |--------|--------|-------|
//! | 10 | ~16 KB | Instant |
//! | 12 | ~64 KB | Pulse engine default limit |
//! | 20 | ~16 MB | Statevector engine default limit |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qlower_adapter_sim::{PauliExpr, StatevectorEngine};
//! use qlower_runtime::RuntimeInterface;
//!
//! let artifact = qlower_compile::resolve("digital", None)?.compile(&model)?;
//! let interface = RuntimeInterface::new(artifact, Arc::new(StatevectorEngine::new()));
//! let zz: PauliExpr = "Z0*Z1".parse()?;
//! let energy = interface.expectation(&inputs, Some(&zz), None)?;
//! ```

mod analog;
mod digital;
mod expr;
mod pauli;
mod statevector;

pub use analog::{DEFAULT_MAX_ATOMS, DEFAULT_MAX_STEP, PulseEngine};
pub use digital::{DEFAULT_MAX_QUBITS, StatevectorEngine};
pub use expr::{ParseObservableError, PauliExpr};
pub use pauli::{Pauli, PauliString, PauliSum};
