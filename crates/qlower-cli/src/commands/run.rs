//! Run command implementation.

use anyhow::Result;
use console::style;

use qlower::{QuantumState, bitstring};

use super::common::Request;

/// Amplitudes below this magnitude are not printed.
const PRINT_CUTOFF: f64 = 1e-6;

/// Execute the run command.
pub fn execute(request: &Request, initial_state: Option<&str>) -> Result<()> {
    request.announce("Running");
    let interface = request.compile()?;
    let values = request.parameter_values()?;

    let start = initial_state
        .map(|s| {
            QuantumState::basis(s).ok_or_else(|| {
                anyhow::anyhow!("Initial state must be a string of 0s and 1s, got '{s}'")
            })
        })
        .transpose()?;

    let state = interface.run(&values, start.as_ref())?;
    let n = state.num_qubits();

    println!(
        "\n{} Final state ({} qubits):",
        style("✓").green().bold(),
        n
    );
    for (index, amplitude) in state.amplitudes().iter().enumerate() {
        let probability = amplitude.norm_sqr();
        if probability < PRINT_CUTOFF {
            continue;
        }
        println!(
            "  {}: {:>+.6}{:+.6}i  (p = {:.4})",
            style(bitstring(index, n)).cyan(),
            amplitude.re,
            amplitude.im,
            probability
        );
    }

    Ok(())
}
