//! Statevector gate kernels.

use num_complex::Complex64;
use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

use qlower_compile::{GateOp, NativeGate};
use qlower_runtime::QuantumState;

/// A 2x2 single-qubit unitary, row-major.
pub type Matrix2 = [[Complex64; 2]; 2];

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A statevector being propagated.
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

impl Statevector {
    /// Take ownership of a state.
    pub fn from_state(state: QuantumState) -> Self {
        let num_qubits = state.num_qubits();
        Self {
            amplitudes: state.amplitudes().to_vec(),
            num_qubits,
        }
    }

    /// Give the amplitudes back as a state.
    pub fn into_state(self) -> QuantumState {
        let mut state = QuantumState::zero(self.num_qubits);
        state.amplitudes_mut().copy_from_slice(&self.amplitudes);
        state
    }

    /// Apply one gate application with a resolved angle.
    ///
    /// Single-qubit gates act on every target, each controlled by all controls.
    pub fn apply(&mut self, op: &GateOp, angle: f64) {
        let ctrl_mask = op.control.iter().fold(0usize, |m, &q| m | (1 << q));
        match op.gate {
            NativeGate::Swap => {
                if let [a, b] = op.target[..] {
                    self.apply_swap(a, b, ctrl_mask);
                }
            }
            gate => {
                let matrix = gate_matrix(gate, angle);
                for &target in &op.target {
                    self.apply_matrix(&matrix, target, ctrl_mask);
                }
            }
        }
    }

    /// Apply a single-qubit matrix to `target` where every bit of `ctrl_mask` is set.
    pub fn apply_matrix(&mut self, m: &Matrix2, target: usize, ctrl_mask: usize) {
        let mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 && i & ctrl_mask == ctrl_mask {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m[0][0] * a + m[0][1] * b;
                self.amplitudes[j] = m[1][0] * a + m[1][1] * b;
            }
        }
    }

    fn apply_swap(&mut self, q1: usize, q2: usize, ctrl_mask: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..(1 << self.num_qubits) {
            let b1 = (i & mask1) != 0;
            let b2 = (i & mask2) != 0;
            if b1 && !b2 && i & ctrl_mask == ctrl_mask {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
    }
}

/// Matrix of a single-qubit gate.
pub fn gate_matrix(gate: NativeGate, theta: f64) -> Matrix2 {
    let half = theta / 2.0;
    match gate {
        // Swap is applied directly and never reaches here.
        NativeGate::I | NativeGate::Swap => [[ONE, ZERO], [ZERO, ONE]],
        NativeGate::X => [[ZERO, ONE], [ONE, ZERO]],
        NativeGate::Y => [[ZERO, -I], [I, ZERO]],
        NativeGate::Z => [[ONE, ZERO], [ZERO, -ONE]],
        NativeGate::H => {
            let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
            [[h, h], [h, -h]]
        }
        NativeGate::S => [[ONE, ZERO], [ZERO, I]],
        NativeGate::Sdg => [[ONE, ZERO], [ZERO, -I]],
        NativeGate::T => [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, FRAC_PI_4)]],
        NativeGate::Tdg => [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, -FRAC_PI_4)]],
        NativeGate::Rx => {
            let c = Complex64::new(half.cos(), 0.0);
            let neg_i_s = Complex64::new(0.0, -half.sin());
            [[c, neg_i_s], [neg_i_s, c]]
        }
        NativeGate::Ry => {
            let c = Complex64::new(half.cos(), 0.0);
            let s = Complex64::new(half.sin(), 0.0);
            [[c, -s], [s, c]]
        }
        NativeGate::Rz => [
            [Complex64::from_polar(1.0, -half), ZERO],
            [ZERO, Complex64::from_polar(1.0, half)],
        ],
        NativeGate::Phase => [[ONE, ZERO], [ZERO, Complex64::from_polar(1.0, theta)]],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-10
    }

    fn op(gate: NativeGate, control: Vec<usize>, target: Vec<usize>) -> GateOp {
        GateOp {
            gate,
            control,
            target,
            param: None,
        }
    }

    #[test]
    fn test_hadamard() {
        let mut sv = Statevector::from_state(QuantumState::zero(1));
        sv.apply(&op(NativeGate::H, vec![], vec![0]), 0.0);
        let s = Complex64::new(FRAC_1_SQRT_2, 0.0);
        assert!(approx_eq(sv.amplitudes[0], s));
        assert!(approx_eq(sv.amplitudes[1], s));
    }

    #[test]
    fn test_bell_state() {
        let mut sv = Statevector::from_state(QuantumState::zero(2));
        sv.apply(&op(NativeGate::H, vec![], vec![0]), 0.0);
        sv.apply(&op(NativeGate::X, vec![0], vec![1]), 0.0);

        let s = Complex64::new(FRAC_1_SQRT_2, 0.0);
        assert!(approx_eq(sv.amplitudes[0], s));
        assert!(approx_eq(sv.amplitudes[1], ZERO));
        assert!(approx_eq(sv.amplitudes[2], ZERO));
        assert!(approx_eq(sv.amplitudes[3], s));
    }

    #[test]
    fn test_multi_target_applies_to_each() {
        let mut sv = Statevector::from_state(QuantumState::zero(3));
        sv.apply(&op(NativeGate::X, vec![], vec![0, 2]), 0.0);
        let state = sv.into_state();
        assert_eq!(state.most_likely().0, "101");
    }

    #[test]
    fn test_swap() {
        let mut sv = Statevector::from_state(QuantumState::basis("10").unwrap());
        sv.apply(&op(NativeGate::Swap, vec![], vec![0, 1]), 0.0);
        assert_eq!(sv.into_state().most_likely().0, "01");
    }

    #[test]
    fn test_controlled_swap_needs_control() {
        let mut sv = Statevector::from_state(QuantumState::basis("010").unwrap());
        sv.apply(&op(NativeGate::Swap, vec![0], vec![1, 2]), 0.0);
        assert_eq!(sv.into_state().most_likely().0, "010");
    }

    #[test]
    fn test_rx_pi_is_x_up_to_phase() {
        let mut sv = Statevector::from_state(QuantumState::zero(1));
        sv.apply(&op(NativeGate::Rx, vec![], vec![0]), std::f64::consts::PI);
        assert!(approx_eq(sv.amplitudes[0], ZERO));
        assert!(approx_eq(sv.amplitudes[1], -I));
    }

    #[test]
    fn test_rotations_are_unitary() {
        for gate in [NativeGate::Rx, NativeGate::Ry, NativeGate::Rz, NativeGate::Phase] {
            let mut sv = Statevector::from_state(QuantumState::zero(2));
            sv.apply(&op(NativeGate::H, vec![], vec![0, 1]), 0.0);
            sv.apply(&op(gate, vec![1], vec![0]), 0.7);
            assert!(sv.into_state().is_normalized());
        }
    }
}
