//! Statevector engine for gate circuits.

use std::time::Instant;

use tracing::{debug, instrument};

use qlower_compile::{Circuit, NativeProgram, NativeRegister};
use qlower_ir::{ParameterValues, Value};
use qlower_runtime::{Engine, EngineError, EngineResult, Observable, QuantumState};

use crate::pauli::PauliSum;
use crate::statevector::Statevector;

/// Default register limit (~16 MB of amplitudes).
pub const DEFAULT_MAX_QUBITS: usize = 20;

/// Exact statevector simulation of digital circuits.
#[derive(Debug, Clone)]
pub struct StatevectorEngine {
    /// Maximum number of qubits supported.
    max_qubits: usize,
}

impl StatevectorEngine {
    /// Create an engine with default settings.
    pub fn new() -> Self {
        Self {
            max_qubits: DEFAULT_MAX_QUBITS,
        }
    }

    /// Create an engine with a custom qubit limit.
    pub fn with_max_qubits(max_qubits: usize) -> Self {
        Self { max_qubits }
    }

    fn circuit<'a>(&self, program: &'a NativeProgram) -> EngineResult<&'a Circuit> {
        program
            .as_circuit()
            .ok_or_else(|| EngineError::UnsupportedProgram {
                engine: self.name().to_string(),
                program: "pulse",
            })
    }

    fn initial_state(
        &self,
        circuit: &Circuit,
        state: Option<&QuantumState>,
    ) -> EngineResult<QuantumState> {
        let n = circuit.num_qubits;
        if n > self.max_qubits {
            return Err(EngineError::TooManyQubits {
                num_qubits: n,
                max: self.max_qubits,
            });
        }
        match state {
            Some(s) if s.num_qubits() != n => Err(EngineError::StateDimensionMismatch {
                expected: 1 << n,
                got: s.amplitudes().len(),
            }),
            Some(s) => Ok(s.clone()),
            None => Ok(circuit
                .initial_state
                .as_deref()
                .and_then(QuantumState::basis)
                .unwrap_or_else(|| QuantumState::zero(n))),
        }
    }
}

impl Default for StatevectorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for StatevectorEngine {
    fn name(&self) -> &str {
        "statevector"
    }

    fn max_qubits(&self) -> Option<usize> {
        Some(self.max_qubits)
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
        let circuit = self.circuit(program)?;
        let mut sv = Statevector::from_state(self.initial_state(circuit, state)?);

        for op in &circuit.ops {
            let angle = match &op.param {
                Some(param) => param.resolve(values)?,
                None => 0.0,
            };
            sv.apply(op, angle);
        }

        debug!(
            "Applied {} gates on {} qubits in {:?}",
            circuit.ops.len(),
            circuit.num_qubits,
            start.elapsed()
        );
        Ok(sv.into_state())
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
