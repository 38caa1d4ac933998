//! qlower Intermediate Representation
//!
//! This crate defines the backend-agnostic description of a quantum program
//! that every qlower backend compiles from. A [`Model`] bundles:
//!
//! - a register description ([`AllocQubits`]) with optional layout hints,
//! - named parameter declarations ([`Alloc`]), trainable or caller-supplied,
//! - a flat instruction list mixing single-assignment arithmetic
//!   ([`Assign`]) and quantum operations ([`QuInstruct`]),
//! - free-form directives for backend-specific modes.
//!
//! Models are plain data. They are validated once when built and never
//! mutated afterwards.
//!
//! # Example: Rotation followed by CNOT
//!
//! ```rust
//! use qlower_ir::{Alloc, AllocQubits, Arg, Expr, Model, Support};
//!
//! let model = Model::builder(AllocQubits::new(2))
//!     .input("x", Alloc::input(1))
//!     .assign("%0", Expr::call("mul", [Arg::Constant(1.57), Arg::load("x")]))
//!     .assign("%1", Expr::call("sin", [Arg::load("%0")]))
//!     .quantum("rx", Support::target_only(vec![0]), vec![Arg::load("%1")])
//!     .quantum("not", Support::new(vec![1], vec![0]).unwrap(), vec![])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(model.num_qubits(), 2);
//! assert_eq!(model.assignments().count(), 2);
//! ```
//!
//! # Values
//!
//! Parameters evaluate to a [`Value`], either a scalar or an array for
//! time-modulated parameters. Arithmetic on values broadcasts scalars and
//! rejects arrays of mismatched length.

pub mod error;
pub mod instruction;
pub mod model;
pub mod register;
pub mod value;

pub use error::{IrError, IrResult};
pub use instruction::{Arg, Assign, Expr, FILL, Instruction, QuInstruct, Support};
pub use model::{Alloc, Model, ModelBuilder};
pub use register::{AllocQubits, GridType, INITIAL_STATE, QubitPositions};
pub use value::{ParameterValues, Value};
