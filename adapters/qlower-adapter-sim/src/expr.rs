//! A small concrete observable expression.
//!
//! [`PauliExpr`] answers the [`Observable`] capability queries, so it can be
//! handed to any engine. It also parses the compact text form used on the
//! command line:
//!
//! ```text
//!   Z0*Z1 + 0.5*X0 - Y2      operators are a letter (I, X, Y, Z, N)
//!                            followed by a qubit index
//! ```

use std::str::FromStr;

use qlower_ir::Support;
use qlower_runtime::{Observable, ObservableArg};
use thiserror::Error;

/// Error parsing an observable expression.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid observable '{input}': {reason}")]
pub struct ParseObservableError {
    /// The text that failed to parse.
    pub input: String,
    /// What went wrong.
    pub reason: String,
}

/// An observable expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PauliExpr {
    /// Bare operator name, acting on every qubit.
    Symbol(String),
    /// Operator placed on the target qubits of `support`.
    Operator {
        /// Operator name.
        symbol: String,
        /// Qubits.
        support: Support,
    },
    /// Sum of terms.
    Add(Vec<PauliExpr>),
    /// Scaled product of factors.
    Mul {
        /// Scalar coefficient.
        coeff: f64,
        /// Factors, applied in order.
        factors: Vec<PauliExpr>,
    },
    /// Tensor product of terms on disjoint qubits.
    Kron(Vec<PauliExpr>),
}

impl PauliExpr {
    /// `symbol` on the given qubits.
    pub fn op(symbol: impl Into<String>, qubits: Vec<usize>) -> Self {
        PauliExpr::Operator {
            symbol: symbol.into(),
            support: Support::target_only(qubits),
        }
    }

    /// Pauli X on one qubit.
    pub fn x(qubit: usize) -> Self {
        Self::op("X", vec![qubit])
    }

    /// Pauli Y on one qubit.
    pub fn y(qubit: usize) -> Self {
        Self::op("Y", vec![qubit])
    }

    /// Pauli Z on one qubit.
    pub fn z(qubit: usize) -> Self {
        Self::op("Z", vec![qubit])
    }

    /// Sum of terms.
    pub fn sum(terms: impl IntoIterator<Item = PauliExpr>) -> Self {
        PauliExpr::Add(terms.into_iter().collect())
    }

    /// Product of factors.
    pub fn product(factors: impl IntoIterator<Item = PauliExpr>) -> Self {
        PauliExpr::Mul {
            coeff: 1.0,
            factors: factors.into_iter().collect(),
        }
    }

    /// Scale an expression.
    #[must_use]
    pub fn scaled(self, coeff: f64) -> Self {
        match self {
            PauliExpr::Mul { coeff: c, factors } => PauliExpr::Mul {
                coeff: c * coeff,
                factors,
            },
            other => PauliExpr::Mul {
                coeff,
                factors: vec![other],
            },
        }
    }
}

impl Observable for PauliExpr {
    fn is_symbol(&self) -> bool {
        matches!(self, PauliExpr::Symbol(_))
    }

    fn is_quantum_operator(&self) -> bool {
        matches!(self, PauliExpr::Operator { .. })
    }

    fn is_addition(&self) -> bool {
        matches!(self, PauliExpr::Add(_))
    }

    fn is_multiplication(&self) -> bool {
        matches!(self, PauliExpr::Mul { .. })
    }

    fn is_kronecker_product(&self) -> bool {
        matches!(self, PauliExpr::Kron(_))
    }

    fn args(&self) -> Vec<ObservableArg<'_>> {
        match self {
            PauliExpr::Symbol(s) => vec![ObservableArg::Symbol(s)],
            PauliExpr::Operator { symbol, support } => {
                vec![ObservableArg::Symbol(symbol), ObservableArg::Support(support)]
            }
            PauliExpr::Add(terms) | PauliExpr::Kron(terms) => terms
                .iter()
                .map(|t| ObservableArg::Expr(t as &dyn Observable))
                .collect(),
            PauliExpr::Mul { coeff, factors } => {
                let mut args = Vec::with_capacity(factors.len() + 1);
                if *coeff != 1.0 {
                    args.push(ObservableArg::Value(*coeff));
                }
                args.extend(factors.iter().map(|f| ObservableArg::Expr(f as &dyn Observable)));
                args
            }
        }
    }

    fn subspace(&self) -> Option<Vec<usize>> {
        match self {
            PauliExpr::Symbol(_) => None,
            PauliExpr::Operator { support, .. } => {
                (!support.is_all()).then(|| support.target().to_vec())
            }
            PauliExpr::Add(children) | PauliExpr::Kron(children) => union(children),
            PauliExpr::Mul { factors, .. } => union(factors),
        }
    }
}

fn union(children: &[PauliExpr]) -> Option<Vec<usize>> {
    let mut qubits = Vec::new();
    for child in children {
        qubits.extend(child.subspace()?);
    }
    qubits.sort_unstable();
    qubits.dedup();
    Some(qubits)
}

impl FromStr for PauliExpr {
    type Err = ParseObservableError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason: String| ParseObservableError {
            input: input.to_string(),
            reason,
        };

        let mut terms = Vec::new();
        let mut sign = 1.0;
        let mut rest = input.trim();
        if rest.is_empty() {
            return Err(fail("empty expression".into()));
        }
        loop {
            let end = rest.find(['+', '-']).unwrap_or(rest.len());
            let term = rest[..end].trim();
            if term.is_empty() {
                // A leading sign, as in "-Z0".
                if !terms.is_empty() || end == rest.len() {
                    return Err(fail("missing term".into()));
                }
            } else {
                terms.push(parse_term(term).map_err(&fail)?.scaled(sign));
            }
            if end == rest.len() {
                break;
            }
            sign = if rest[end..].starts_with('-') { -1.0 } else { 1.0 };
            rest = &rest[end + 1..];
        }

        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            PauliExpr::Add(terms)
        })
    }
}

fn parse_term(term: &str) -> Result<PauliExpr, String> {
    let mut coeff = 1.0;
    let mut factors = Vec::new();
    for factor in term.split('*').map(str::trim) {
        if factor.is_empty() {
            return Err(format!("empty factor in '{term}'"));
        }
        if let Ok(value) = factor.parse::<f64>() {
            coeff *= value;
            continue;
        }
        let split = factor.char_indices().nth(1).map_or(factor.len(), |(i, _)| i);
        let (symbol, index) = factor.split_at(split);
        if !matches!(symbol, "I" | "X" | "Y" | "Z" | "N") {
            return Err(format!("unknown operator '{factor}'"));
        }
        let qubit = index
            .parse::<usize>()
            .map_err(|_| format!("expected a qubit index after '{symbol}' in '{factor}'"))?;
        factors.push(PauliExpr::op(symbol, vec![qubit]));
    }
    Ok(PauliExpr::Mul { coeff, factors })
}
