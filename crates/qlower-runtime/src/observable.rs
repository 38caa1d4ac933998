//! Observable capability trait.
//!
//! The runtime never inspects an observable's algebra. It hands the object
//! to the engine, whose native-observable constructor walks it through the
//! queries below. Any expression type answering them can be measured.
//!
//! ```text
//!   Z(0) * Z(1) + 0.5 * X(0)
//!
//!   addition
//!   ├── multiplication
//!   │   ├── quantum operator [symbol "Z", support {0}]
//!   │   └── quantum operator [symbol "Z", support {1}]
//!   └── multiplication
//!       ├── value 0.5
//!       └── quantum operator [symbol "X", support {0}]
//! ```

use std::fmt;

use qlower_ir::Support;

/// Queries an engine may ask of an observable expression.
///
/// Exactly one of the `is_*` predicates should hold for a well-formed node.
/// Shapes the engine cannot express are rejected with
/// [`EngineError::UnsupportedObservable`](crate::EngineError::UnsupportedObservable).
pub trait Observable: fmt::Debug + Send + Sync {
    /// A bare operator name such as `"Z"`. `args()` holds one
    /// [`ObservableArg::Symbol`].
    fn is_symbol(&self) -> bool;

    /// A symbol placed on qubits. `args()` holds the symbol node followed by
    /// an [`ObservableArg::Support`].
    fn is_quantum_operator(&self) -> bool {
        false
    }

    /// Sum of the arguments.
    fn is_addition(&self) -> bool;

    /// Product of the arguments, in order. Arguments may include scalar
    /// [`ObservableArg::Value`] factors.
    fn is_multiplication(&self) -> bool;

    /// Tensor product of the arguments.
    fn is_kronecker_product(&self) -> bool;

    /// Child nodes.
    fn args(&self) -> Vec<ObservableArg<'_>>;

    /// Qubits the expression acts on, if known.
    fn subspace(&self) -> Option<Vec<usize>>;
}

/// One argument of an observable node.
#[derive(Debug, Clone, Copy)]
pub enum ObservableArg<'a> {
    /// Nested expression.
    Expr(&'a dyn Observable),
    /// Operator name.
    Symbol(&'a str),
    /// Qubits of a quantum operator.
    Support(&'a Support),
    /// Scalar coefficient.
    Value(f64),
}

impl ObservableArg<'_> {
    /// Short description of the argument kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ObservableArg::Expr(_) => "expression",
            ObservableArg::Symbol(_) => "symbol",
            ObservableArg::Support(_) => "support",
            ObservableArg::Value(_) => "value",
        }
    }
}
