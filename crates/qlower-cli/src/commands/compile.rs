//! Compile command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use serde_json::json;

use super::common::Request;

/// Execute the compile command.
pub fn execute(request: &Request, output: Option<&Path>) -> Result<()> {
    let interface = request.compile()?;
    let artifact = interface.artifact();
    let info = interface.info();

    for warning in artifact.warnings() {
        eprintln!("{} {}", style("warning:").yellow().bold(), warning);
    }

    let summary = json!({
        "info": info,
        "register": artifact.register(),
        "program": artifact.program(),
    });
    let text = serde_json::to_string_pretty(&summary)?;

    match output {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write file: {}", path.display()))?;
            println!(
                "{} Compiled {} qubits into {} native operations",
                style("✓").green().bold(),
                info.num_qubits,
                info.num_operations
            );
            println!("  Output: {}", style(path.display()).green());
        }
        None => println!("{text}"),
    }

    Ok(())
}
