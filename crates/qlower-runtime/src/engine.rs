//! Simulation engine contract.
//!
//! An engine executes one kind of native program. It receives the program,
//! the native register, an optional initial state and the fully evaluated
//! parameter values (caller inputs, assigned variables and trainables).
//!
//! | Method | Required | Returns |
//! |--------|----------|---------|
//! | `name()` | yes | `&str` |
//! | `max_qubits()` | provided | `Option<usize>` |
//! | `run()` | yes | [`QuantumState`] |
//! | `sample()` | provided | [`Histogram`] |
//! | `expectation()` | yes | [`Value`] |
//! | `expectations()` | provided | [`Value::Array`] |
//!
//! Engines are shared behind `Arc` and must be `Send + Sync`. Errors are
//! returned to the caller unchanged.

use qlower_compile::{NativeProgram, NativeRegister};
use qlower_ir::{ParameterValues, Value};

use crate::error::EngineResult;
use crate::observable::Observable;
use crate::state::{Histogram, QuantumState};

/// A simulation engine for one backend class.
pub trait Engine: Send + Sync {
    /// Engine name.
    fn name(&self) -> &str;

    /// Largest register the engine simulates, if it has a limit.
    fn max_qubits(&self) -> Option<usize> {
        None
    }

    /// Propagate `state` (or the register's initial state) through `program`.
    fn run(
        &self,
        program: &NativeProgram,
        register: &NativeRegister,
        state: Option<&QuantumState>,
        values: &ParameterValues,
    ) -> EngineResult<QuantumState>;

    /// Run, then measure every qubit `shots` times.
    fn sample(
        &self,
        program: &NativeProgram,
        register: &NativeRegister,
        state: Option<&QuantumState>,
        values: &ParameterValues,
        shots: usize,
    ) -> EngineResult<Histogram> {
        let final_state = self.run(program, register, state, values)?;
        Ok(final_state.sample(shots))
    }

    /// Run, then take the expectation of `observable` on the final state.
    fn expectation(
        &self,
        program: &NativeProgram,
        register: &NativeRegister,
        state: Option<&QuantumState>,
        values: &ParameterValues,
        observable: &dyn Observable,
    ) -> EngineResult<Value>;

    /// Expectations of several observables on the same final state, in order.
    ///
    /// The default runs the program once per observable.
    fn expectations(
        &self,
        program: &NativeProgram,
        register: &NativeRegister,
        state: Option<&QuantumState>,
        values: &ParameterValues,
        observables: &[&dyn Observable],
    ) -> EngineResult<Value> {
        let mut results = Vec::with_capacity(observables.len());
        for observable in observables {
            let value = self.expectation(program, register, state, values, *observable)?;
            results.extend(value.to_vec());
        }
        Ok(Value::Array(results))
    }
}
