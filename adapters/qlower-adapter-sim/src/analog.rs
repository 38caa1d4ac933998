//! Pulse engine: Schrödinger integration of a built sequence.
//!
//! Each atom is a two-level system, `|0⟩` ground and `|1⟩` Rydberg. The
//! Hamiltonian at time `t` is
//!
//! ```text
//!   H(t) = Σ_i Ω/2 (cos φ X_i − sin φ Y_i) − (δ + w_i δ_dmm) n_i + Σ_{i<j} C6 / r_ij⁶ n_i n_j
//! ```
//!
//! with frequencies in rad/µs and times in ns. The state is propagated with
//! fixed-step fourth-order Runge-Kutta and renormalised at the end.

use std::time::Instant;

use num_complex::Complex64;
use tracing::{debug, instrument};

use qlower_compile::{BuiltSequence, Drive, NativeProgram, NativeRegister, PulseSequence};
use qlower_ir::{ParameterValues, Value};
use qlower_runtime::{Engine, EngineError, EngineResult, Observable, QuantumState};

use crate::pauli::PauliSum;

/// Default atom limit.
pub const DEFAULT_MAX_ATOMS: usize = 12;

/// Default integration step (ns).
pub const DEFAULT_MAX_STEP: f64 = 1.0;

/// Time-dependent simulation of analog pulse sequences.
///
/// Registers above [`DEFAULT_MAX_ATOMS`] compile for devices with larger
/// trap layouts but fail here with `TooManyQubits`; raise the limit with
/// [`PulseEngine::with_max_atoms`] when memory allows.
#[derive(Debug, Clone)]
pub struct PulseEngine {
    max_atoms: usize,
    max_step: f64,
}

impl PulseEngine {
    /// Create an engine with default settings.
    pub fn new() -> Self {
        Self {
            max_atoms: DEFAULT_MAX_ATOMS,
            max_step: DEFAULT_MAX_STEP,
        }
    }

    /// Set the atom limit.
    #[must_use]
    pub fn with_max_atoms(mut self, max_atoms: usize) -> Self {
        self.max_atoms = max_atoms;
        self
    }

    /// Set the largest integration step (ns).
    #[must_use]
    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }

    fn sequence<'a>(&self, program: &'a NativeProgram) -> EngineResult<&'a PulseSequence> {
        program
            .as_pulse()
            .ok_or_else(|| EngineError::UnsupportedProgram {
                engine: self.name().to_string(),
                program: "circuit",
            })
    }

    /// Propagate `state` through a built sequence.
    pub fn evolve(&self, built: &BuiltSequence, state: QuantumState) -> QuantumState {
        let hamiltonian = Hamiltonian::new(built);
        let total = built.total_duration;
        if total <= 0.0 {
            return state;
        }
        let steps = (total / self.max_step).ceil().max(1.0) as usize;
        let dt = total / steps as f64;

        let mut psi = state.amplitudes().to_vec();
        for k in 0..steps {
            let t = k as f64 * dt;
            rk4_step(&hamiltonian, built, &mut psi, t, dt);
        }

        let mut result = state;
        result.amplitudes_mut().copy_from_slice(&psi);
        result.normalize();
        result
    }
}

impl Default for PulseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for PulseEngine {
    fn name(&self) -> &str {
        "pulse"
    }

    fn max_qubits(&self) -> Option<usize> {
        Some(self.max_atoms)
    }

    #[instrument(skip_all)]
    fn run(
        &self,
        program: &NativeProgram,
        _register: &NativeRegister,
        state: Option<&QuantumState>,
        values: &ParameterValues,
    ) -> EngineResult<QuantumState> {
        let start = Instant::now();
        let built = self.sequence(program)?.build(values)?;
        let n = built.num_qubits();
        if n > self.max_atoms {
            return Err(EngineError::TooManyQubits {
                num_qubits: n,
                max: self.max_atoms,
            });
        }
        let initial = match state {
            Some(s) if s.num_qubits() != n => {
                return Err(EngineError::StateDimensionMismatch {
                    expected: 1 << n,
                    got: s.amplitudes().len(),
                });
            }
            Some(s) => s.clone(),
            None => QuantumState::zero(n),
        };

        let result = self.evolve(&built, initial);
        debug!(
            "Integrated {} pulses over {} ns on {} atoms in {:?}",
            built.pulses.len(),
            built.total_duration,
            n,
            start.elapsed()
        );
        Ok(result)
    }

    fn expectation(
        &self,
        program: &NativeProgram,
        register: &NativeRegister,
        state: Option<&QuantumState>,
        values: &ParameterValues,
        observable: &dyn Observable,
    ) -> EngineResult<Value> {
        let hamiltonian = PauliSum::from_observable(observable, register.num_qubits())?;
        let final_state = self.run(program, register, state, values)?;
        Ok(Value::Scalar(hamiltonian.expectation(&final_state)))
    }

    fn expectations(
        &self,
        program: &NativeProgram,
        register: &NativeRegister,
        state: Option<&QuantumState>,
        values: &ParameterValues,
        observables: &[&dyn Observable],
    ) -> EngineResult<Value> {
        let hamiltonians = PauliSum::from_observables(observables, register.num_qubits())?;
        let final_state = self.run(program, register, state, values)?;
        Ok(Value::Array(
            hamiltonians
                .iter()
                .map(|h| h.expectation(&final_state))
                .collect(),
        ))
    }
}

/// Time-independent parts of the Hamiltonian, per basis state.
struct Hamiltonian {
    num_qubits: usize,
    /// Number of excited atoms.
    excitations: Vec<f64>,
    /// Σ w_i n_i.
    weighted: Vec<f64>,
    /// Σ_{i<j} V_ij n_i n_j.
    interaction: Vec<f64>,
}

impl Hamiltonian {
    fn new(built: &BuiltSequence) -> Self {
        let n = built.num_qubits();
        let mut couplings = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                let (xi, yi) = built.coords[i];
                let (xj, yj) = built.coords[j];
                let r = (xi - xj).hypot(yi - yj);
                if r > 0.0 {
                    couplings.push((i, j, built.interaction_coeff / r.powi(6)));
                }
            }
        }

        let dim = 1usize << n;
        let mut excitations = vec![0.0; dim];
        let mut weighted = vec![0.0; dim];
        let mut interaction = vec![0.0; dim];
        for k in 0..dim {
            excitations[k] = k.count_ones() as f64;
            weighted[k] = (0..n)
                .filter(|&i| k >> i & 1 == 1)
                .map(|i| built.dmm_weights.get(i).copied().unwrap_or(0.0))
                .sum();
            interaction[k] = couplings
                .iter()
                .filter(|&&(i, j, _)| k >> i & 1 == 1 && k >> j & 1 == 1)
                .map(|&(_, _, v)| v)
                .sum();
        }

        Self {
            num_qubits: n,
            excitations,
            weighted,
            interaction,
        }
    }

    /// `out = -i H ψ` for the drive at one instant, in 1/µs.
    fn derivative(&self, drive: &Drive, psi: &[Complex64], out: &mut [Complex64]) {
        let minus_i = Complex64::new(0.0, -1.0);
        let half_rabi = drive.amplitude / 2.0;
        let up = Complex64::from_polar(half_rabi, drive.phase);
        let down = up.conj();

        for (k, slot) in out.iter_mut().enumerate() {
            let diag = -drive.detuning * self.excitations[k]
                - drive.local_detuning * self.weighted[k]
                + self.interaction[k];
            *slot = psi[k] * diag;
        }
        if half_rabi != 0.0 {
            for q in 0..self.num_qubits {
                let mask = 1 << q;
                for k in 0..psi.len() {
                    if k & mask == 0 {
                        let j = k | mask;
                        // Ω/2 (cos φ X − sin φ Y) maps (a, b) to (e^{iφ} b, e^{-iφ} a).
                        out[k] += up * psi[j];
                        out[j] += down * psi[k];
                    }
                }
            }
        }
        for slot in out.iter_mut() {
            *slot *= minus_i;
        }
    }
}

fn rk4_step(h: &Hamiltonian, built: &BuiltSequence, psi: &mut [Complex64], t: f64, dt: f64) {
    let dt_us = dt / 1000.0;
    let dim = psi.len();
    let mut k1 = vec![Complex64::new(0.0, 0.0); dim];
    let mut k2 = k1.clone();
    let mut k3 = k1.clone();
    let mut k4 = k1.clone();
    let mut tmp = k1.clone();

    h.derivative(&built.drive_at(t), psi, &mut k1);
    for i in 0..dim {
        tmp[i] = psi[i] + k1[i] * (dt_us / 2.0);
    }
    let mid = built.drive_at(t + dt / 2.0);
    h.derivative(&mid, &tmp, &mut k2);
    for i in 0..dim {
        tmp[i] = psi[i] + k2[i] * (dt_us / 2.0);
    }
    h.derivative(&mid, &tmp, &mut k3);
    for i in 0..dim {
        tmp[i] = psi[i] + k3[i] * dt_us;
    }
    // Left limit, so a pulse ending on the step boundary still drives k4.
    h.derivative(&built.drive_at(t + dt * (1.0 - 1e-9)), &tmp, &mut k4);

    for i in 0..dim {
        psi[i] += (k1[i] + k2[i] * 2.0 + k3[i] * 2.0 + k4[i]) * (dt_us / 6.0);
    }
}
