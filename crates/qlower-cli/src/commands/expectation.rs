//! Expectation command implementation.

use anyhow::{Context, Result};
use console::style;
use tracing::debug;

use qlower::{Observable, PauliExpr};

use super::common::Request;

/// Execute the expectation command.
pub fn execute(request: &Request, texts: &[String]) -> Result<()> {
    let parsed = texts
        .iter()
        .map(|text| {
            text.parse::<PauliExpr>()
                .with_context(|| format!("Failed to parse observable '{}'", text.trim()))
        })
        .collect::<Result<Vec<_>>>()?;
    let observables: Vec<&dyn Observable> = parsed.iter().map(|o| o as &dyn Observable).collect();
    debug!("Parsed {} observable(s)", observables.len());

    request.announce("Measuring");
    let interface = request.compile()?;
    let values = request.parameter_values()?;

    let results = interface.expectations(&values, &observables, None)?;
    println!();
    for (text, value) in texts.iter().zip(results.to_vec()) {
        println!(
            "{} <{}> = {}",
            style("✓").green().bold(),
            style(text.trim()).cyan(),
            value
        );
    }
    Ok(())
}
