//! Quantum states and measurement histograms.
//!
//! Amplitude index bit `q` holds qubit `q`. Bitstrings are written with
//! qubit 0 first, so index `0b01` on two qubits reads `"10"`.

use std::collections::BTreeMap;

use num_complex::Complex64;
use rand::Rng;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};

/// Tolerance used when comparing norms.
const NORM_TOLERANCE: f64 = 1e-9;

/// A pure state over `num_qubits` qubits.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantumState {
    num_qubits: usize,
    amplitudes: Vec<Complex64>,
}

impl QuantumState {
    /// Wrap raw amplitudes. The length must be `2^num_qubits`.
    pub fn new(num_qubits: usize, amplitudes: Vec<Complex64>) -> EngineResult<Self> {
        let expected = 1usize << num_qubits;
        if amplitudes.len() != expected {
            return Err(EngineError::StateDimensionMismatch {
                expected,
                got: amplitudes.len(),
            });
        }
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// The all-zero state |0...0⟩.
    pub fn zero(num_qubits: usize) -> Self {
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); 1 << num_qubits];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            num_qubits,
            amplitudes,
        }
    }

    /// Computational basis state from a bitstring, qubit 0 first.
    ///
    /// Returns `None` if the string contains anything but `'0'` and `'1'`.
    pub fn basis(bitstring: &str) -> Option<Self> {
        let num_qubits = bitstring.len();
        let mut index = 0usize;
        for (q, c) in bitstring.chars().enumerate() {
            match c {
                '0' => {}
                '1' => index |= 1 << q,
                _ => return None,
            }
        }
        let mut state = Self::zero(num_qubits);
        state.amplitudes.swap(0, index);
        Some(state)
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Raw amplitudes.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Mutable raw amplitudes, for engines.
    pub fn amplitudes_mut(&mut self) -> &mut [Complex64] {
        &mut self.amplitudes
    }

    /// Amplitude of a basis state given as a bitstring.
    pub fn amplitude(&self, bitstring: &str) -> Option<Complex64> {
        if bitstring.len() != self.num_qubits {
            return None;
        }
        let index = bitstring
            .chars()
            .enumerate()
            .try_fold(0usize, |acc, (q, c)| match c {
                '0' => Some(acc),
                '1' => Some(acc | (1 << q)),
                _ => None,
            })?;
        Some(self.amplitudes[index])
    }

    /// Measurement probability of every basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(|a| a.norm_sqr()).collect()
    }

    /// Squared norm.
    pub fn norm_sqr(&self) -> f64 {
        self.amplitudes.iter().map(|a| a.norm_sqr()).sum()
    }

    /// Check that the state is normalized.
    pub fn is_normalized(&self) -> bool {
        (self.norm_sqr() - 1.0).abs() < NORM_TOLERANCE
    }

    /// Rescale to unit norm. Zero vectors are left alone.
    pub fn normalize(&mut self) {
        let norm = self.norm_sqr().sqrt();
        if norm > 0.0 {
            for amp in &mut self.amplitudes {
                *amp /= norm;
            }
        }
    }

    /// The most probable basis state and its probability.
    pub fn most_likely(&self) -> (String, f64) {
        let (index, p) = self
            .probabilities()
            .into_iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 { (i, p) } else { best }
            });
        (bitstring(index, self.num_qubits), p)
    }

    /// Draw one basis index.
    pub fn sample_index(&self, rng: &mut impl Rng) -> usize {
        let r: f64 = rng.r#gen();
        let mut cumulative = 0.0;
        for (i, amp) in self.amplitudes.iter().enumerate() {
            cumulative += amp.norm_sqr();
            if r < cumulative {
                return i;
            }
        }
        // Rounding on a not-quite-normalized state.
        self.amplitudes.len() - 1
    }

    /// Measure `shots` times with the thread-local generator.
    pub fn sample(&self, shots: usize) -> Histogram {
        self.sample_with(shots, &mut rand::thread_rng())
    }

    /// Measure `shots` times with the given generator.
    pub fn sample_with(&self, shots: usize, rng: &mut impl Rng) -> Histogram {
        let mut histogram = Histogram::new();
        for _ in 0..shots {
            let outcome = self.sample_index(rng);
            histogram.record(bitstring(outcome, self.num_qubits));
        }
        histogram
    }
}

/// Bitstring of a basis index, qubit 0 first.
pub fn bitstring(index: usize, num_qubits: usize) -> String {
    (0..num_qubits)
        .map(|q| if index >> q & 1 == 1 { '1' } else { '0' })
        .collect()
}

/// Measurement outcome counts keyed by bitstring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Histogram {
    shots: usize,
    counts: BTreeMap<String, usize>,
}

impl Histogram {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one shot.
    pub fn record(&mut self, bitstring: impl Into<String>) {
        *self.counts.entry(bitstring.into()).or_insert(0) += 1;
        self.shots += 1;
    }

    /// Add `count` shots of one outcome.
    pub fn insert(&mut self, bitstring: impl Into<String>, count: usize) {
        *self.counts.entry(bitstring.into()).or_insert(0) += count;
        self.shots += count;
    }

    /// Count of one outcome.
    pub fn get(&self, bitstring: &str) -> usize {
        self.counts.get(bitstring).copied().unwrap_or(0)
    }

    /// Number of shots recorded.
    pub fn shots(&self) -> usize {
        self.shots
    }

    /// Sum of all counts. Always equal to [`Histogram::shots`].
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// The outcome seen most often. Ties go to the smaller bitstring.
    pub fn most_frequent(&self) -> Option<(&str, usize)> {
        self.counts
            .iter()
            .fold(None, |best: Option<(&str, usize)>, (k, &v)| match best {
                Some((_, c)) if c >= v => best,
                _ => Some((k.as_str(), v)),
            })
    }

    /// Iterate over outcomes in bitstring order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Check whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_zero_state() {
        let state = QuantumState::zero(2);
        assert_eq!(state.amplitudes().len(), 4);
        assert!(state.is_normalized());
        assert_eq!(state.most_likely(), ("00".to_string(), 1.0));
    }

    #[test]
    fn test_dimension_checked() {
        let err = QuantumState::new(2, vec![Complex64::new(1.0, 0.0); 3]).unwrap_err();
        assert!(matches!(
            err,
            EngineError::StateDimensionMismatch {
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn test_basis_is_qubit_zero_first() {
        let state = QuantumState::basis("10").unwrap();
        assert_eq!(state.amplitudes()[1], Complex64::new(1.0, 0.0));
        assert_eq!(state.amplitude("10"), Some(Complex64::new(1.0, 0.0)));
        assert_eq!(state.amplitude("01"), Some(Complex64::new(0.0, 0.0)));
        assert!(QuantumState::basis("1x").is_none());
        assert_eq!(bitstring(1, 3), "100");
        assert_eq!(bitstring(6, 3), "011");
    }

    #[test]
    fn test_sample_basis_state_is_deterministic() {
        let state = QuantumState::basis("011").unwrap();
        let hist = state.sample_with(50, &mut StdRng::seed_from_u64(3));
        assert_eq!(hist.get("011"), 50);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist.shots(), 50);
    }

    #[test]
    fn test_histogram_totals() {
        let mut hist = Histogram::new();
        hist.record("00");
        hist.record("11");
        hist.insert("11", 4);
        assert_eq!(hist.shots(), 6);
        assert_eq!(hist.total(), 6);
        assert_eq!(hist.most_frequent(), Some(("11", 5)));
        assert_eq!(hist.get("01"), 0);
    }

    #[test]
    fn test_uniform_sampling_covers_outcomes() {
        let h = 1.0 / 2.0_f64.sqrt();
        let state = QuantumState::new(
            1,
            vec![Complex64::new(h, 0.0), Complex64::new(h, 0.0)],
        )
        .unwrap();
        let hist = state.sample_with(1000, &mut StdRng::seed_from_u64(11));
        assert_eq!(hist.total(), 1000);
        assert!(hist.get("0") > 400 && hist.get("1") > 400);
    }

    proptest::proptest! {
        #[test]
        fn prop_sample_total_equals_shots(
            raw in proptest::collection::vec((-1.0_f64..1.0, -1.0_f64..1.0), 8),
            shots in 1_usize..500,
            seed in proptest::prelude::any::<u64>(),
        ) {
            let amplitudes: Vec<Complex64> = raw.iter().map(|&(re, im)| Complex64::new(re, im)).collect();
            proptest::prop_assume!(amplitudes.iter().map(|a| a.norm_sqr()).sum::<f64>() > 1e-6);
            let mut state = QuantumState::new(3, amplitudes).unwrap();
            state.normalize();

            let hist = state.sample_with(shots, &mut StdRng::seed_from_u64(seed));
            proptest::prop_assert_eq!(hist.total(), shots);
            proptest::prop_assert!(hist.iter().all(|(k, _)| k.len() == 3));
        }
    }
}
