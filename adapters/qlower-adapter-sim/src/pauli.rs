//! Native observables: weighted sums of Pauli strings.
//!
//! [`PauliSum::from_observable`] is the engine-side constructor. It walks any
//! [`Observable`] through its capability queries and never sees a concrete
//! expression type.

use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;
use rustc_hash::FxHashMap;

use qlower_runtime::{EngineError, EngineResult, Observable, ObservableArg, QuantumState};

/// Coefficients below this magnitude are dropped.
const COEFF_EPSILON: f64 = 1e-12;

/// A single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Pauli {
    /// Pauli X.
    X,
    /// Pauli Y.
    Y,
    /// Pauli Z.
    Z,
}

impl Pauli {
    /// Product `self · other` as a phase and an optional remaining Pauli.
    fn mul(self, other: Pauli) -> (Complex64, Option<Pauli>) {
        use Pauli::{X, Y, Z};
        let i = Complex64::new(0.0, 1.0);
        match (self, other) {
            (X, X) | (Y, Y) | (Z, Z) => (Complex64::new(1.0, 0.0), None),
            (X, Y) => (i, Some(Z)),
            (Y, Z) => (i, Some(X)),
            (Z, X) => (i, Some(Y)),
            (Y, X) => (-i, Some(Z)),
            (Z, Y) => (-i, Some(X)),
            (X, Z) => (-i, Some(Y)),
        }
    }

    fn name(self) -> char {
        match self {
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        }
    }
}

/// Tensor product of Paulis on distinct qubits. Qubits not listed carry I.
pub type PauliString = BTreeMap<usize, Pauli>;

/// A weighted sum of Pauli strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PauliSum {
    terms: Vec<(Complex64, PauliString)>,
}

impl PauliSum {
    /// The zero operator.
    pub fn zero() -> Self {
        Self::default()
    }

    /// A scalar multiple of the identity.
    pub fn scalar(c: f64) -> Self {
        Self {
            terms: vec![(Complex64::new(c, 0.0), PauliString::new())],
        }
    }

    /// One Pauli on one qubit.
    pub fn single(qubit: usize, pauli: Pauli) -> Self {
        Self {
            terms: vec![(Complex64::new(1.0, 0.0), [(qubit, pauli)].into())],
        }
    }

    /// Named single-qubit operator. `N` is the number operator `(I - Z)/2`.
    pub fn named(symbol: &str, qubit: usize) -> Option<Self> {
        Some(match symbol {
            "I" => Self::scalar(1.0),
            "X" => Self::single(qubit, Pauli::X),
            "Y" => Self::single(qubit, Pauli::Y),
            "Z" => Self::single(qubit, Pauli::Z),
            "N" => Self::scalar(0.5).add(&Self::single(qubit, Pauli::Z).scale(-0.5)),
            _ => return None,
        })
    }

    /// The terms, with like strings merged.
    pub fn terms(&self) -> &[(Complex64, PauliString)] {
        &self.terms
    }

    /// Sum of two operators.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().cloned());
        Self { terms }.simplified()
    }

    /// Product `self · other`.
    #[must_use]
    pub fn mul(&self, other: &Self) -> Self {
        let mut terms = Vec::with_capacity(self.terms.len() * other.terms.len());
        for (ca, sa) in &self.terms {
            for (cb, sb) in &other.terms {
                let mut coeff = ca * cb;
                let mut string = sa.clone();
                for (&q, &pb) in sb {
                    match string.remove(&q) {
                        None => {
                            string.insert(q, pb);
                        }
                        Some(pa) => {
                            let (phase, rest) = pa.mul(pb);
                            coeff *= phase;
                            if let Some(p) = rest {
                                string.insert(q, p);
                            }
                        }
                    }
                }
                terms.push((coeff, string));
            }
        }
        Self { terms }.simplified()
    }

    /// Multiply every coefficient by `factor`.
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self {
            terms: self
                .terms
                .iter()
                .map(|(c, s)| (c * factor, s.clone()))
                .collect(),
        }
        .simplified()
    }

    /// Largest qubit index acted on, if any.
    pub fn max_qubit(&self) -> Option<usize> {
        self.terms
            .iter()
            .filter_map(|(_, s)| s.keys().next_back().copied())
            .max()
    }

    fn simplified(self) -> Self {
        let mut merged: FxHashMap<PauliString, Complex64> = FxHashMap::default();
        let mut order = Vec::new();
        for (c, s) in self.terms {
            match merged.get_mut(&s) {
                Some(acc) => *acc += c,
                None => {
                    order.push(s.clone());
                    merged.insert(s, c);
                }
            }
        }
        let terms = order
            .into_iter()
            .filter_map(|s| {
                let c = merged.remove(&s)?;
                (c.norm() > COEFF_EPSILON).then_some((c, s))
            })
            .collect();
        Self { terms }
    }

    /// Build from an observable expression on a `num_qubits` register.
    pub fn from_observable(observable: &dyn Observable, num_qubits: usize) -> EngineResult<Self> {
        let sum = build(observable, num_qubits)?;
        if let Some(q) = sum.max_qubit() {
            if q >= num_qubits {
                return Err(EngineError::UnsupportedObservable(format!(
                    "qubit {q} outside a {num_qubits}-qubit register"
                )));
            }
        }
        Ok(sum)
    }

    /// Build one operator per observable, failing on the first unsupported one.
    pub fn from_observables(
        observables: &[&dyn Observable],
        num_qubits: usize,
    ) -> EngineResult<Vec<Self>> {
        observables
            .iter()
            .map(|o| Self::from_observable(*o, num_qubits))
            .collect()
    }

    /// `⟨ψ|H|ψ⟩`. Hermitian sums give a real value; the imaginary part is dropped.
    pub fn expectation(&self, state: &QuantumState) -> f64 {
        let amps = state.amplitudes();
        let mut total = Complex64::new(0.0, 0.0);
        for (coeff, string) in &self.terms {
            let mut acc = Complex64::new(0.0, 0.0);
            for (i, amp) in amps.iter().enumerate() {
                // P|i⟩ = phase |j⟩, so ⟨ψ|P|ψ⟩ = Σ conj(ψ_j) phase ψ_i.
                let mut j = i;
                let mut phase = Complex64::new(1.0, 0.0);
                for (&q, &p) in string {
                    let bit = (i >> q) & 1;
                    match p {
                        Pauli::X => j ^= 1 << q,
                        Pauli::Y => {
                            j ^= 1 << q;
                            phase *= if bit == 0 {
                                Complex64::new(0.0, 1.0)
                            } else {
                                Complex64::new(0.0, -1.0)
                            };
                        }
                        Pauli::Z => {
                            if bit == 1 {
                                phase = -phase;
                            }
                        }
                    }
                }
                acc += amps[j].conj() * phase * amp;
            }
            total += coeff * acc;
        }
        total.re
    }
}

impl fmt::Display for PauliSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (k, (c, s)) in self.terms.iter().enumerate() {
            if k > 0 {
                write!(f, " + ")?;
            }
            if c.im.abs() > COEFF_EPSILON {
                write!(f, "({c})")?;
            } else {
                write!(f, "{}", c.re)?;
            }
            for (q, p) in s {
                write!(f, "*{}{}", p.name(), q)?;
            }
        }
        Ok(())
    }
}

fn unsupported(what: impl Into<String>) -> EngineError {
    EngineError::UnsupportedObservable(what.into())
}

fn build(node: &dyn Observable, num_qubits: usize) -> EngineResult<PauliSum> {
    if node.is_symbol() {
        // A bare operator acts on every qubit.
        let symbol = symbol_of(node)?;
        return (0..num_qubits).try_fold(PauliSum::scalar(1.0), |acc, q| {
            let op = PauliSum::named(symbol, q)
                .ok_or_else(|| unsupported(format!("unknown operator '{symbol}'")))?;
            Ok(acc.mul(&op))
        });
    }

    if node.is_quantum_operator() {
        return quantum_operator(node, num_qubits);
    }

    let args = node.args();
    if node.is_addition() {
        return args.iter().try_fold(PauliSum::zero(), |acc, arg| {
            Ok(acc.add(&build_arg(arg, num_qubits)?))
        });
    }
    if node.is_multiplication() || node.is_kronecker_product() {
        return args.iter().try_fold(PauliSum::scalar(1.0), |acc, arg| {
            Ok(acc.mul(&build_arg(arg, num_qubits)?))
        });
    }

    Err(unsupported(format!("{node:?}")))
}

fn build_arg(arg: &ObservableArg<'_>, num_qubits: usize) -> EngineResult<PauliSum> {
    match arg {
        ObservableArg::Expr(e) => build(*e, num_qubits),
        ObservableArg::Value(v) => Ok(PauliSum::scalar(*v)),
        other => Err(unsupported(format!("{} as an operand", other.kind()))),
    }
}

fn symbol_of(node: &dyn Observable) -> EngineResult<&str> {
    match node.args().first() {
        Some(ObservableArg::Symbol(s)) => Ok(*s),
        _ => Err(unsupported("symbol without a name")),
    }
}

fn quantum_operator(node: &dyn Observable, num_qubits: usize) -> EngineResult<PauliSum> {
    let args = node.args();
    let (symbol, support) = match args.as_slice() {
        [ObservableArg::Symbol(s), ObservableArg::Support(sup)] => (*s, *sup),
        [ObservableArg::Expr(e), ObservableArg::Support(sup)] if e.is_symbol() => {
            (symbol_of(*e)?, *sup)
        }
        _ => return Err(unsupported("quantum operator without symbol and support")),
    };
    if !support.control().is_empty() {
        return Err(unsupported("controlled observable"));
    }
    support
        .resolved_target(num_qubits)
        .into_iter()
        .try_fold(PauliSum::scalar(1.0), |acc, q| {
            let op = PauliSum::named(symbol, q)
                .ok_or_else(|| unsupported(format!("unknown operator '{symbol}'")))?;
            Ok(acc.mul(&op))
        })
}
