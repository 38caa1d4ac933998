//! Backends command implementation.

use anyhow::Result;
use console::style;

use qlower::{Dialect, DialectRegistry};

/// Execute the backends command.
pub fn execute() -> Result<()> {
    println!("{} Available backends:\n", style("qlower").cyan().bold());

    let registry = DialectRegistry::global();
    for backend in registry.available_backends() {
        let dialects: Vec<&Dialect> = registry
            .dialects()
            .into_iter()
            .filter(|d| d.backend() == backend)
            .collect();
        let Some(first) = dialects.first() else {
            continue;
        };
        let engine = qlower::engine_for(first.class());

        println!(
            "  {} {} ({}, engine: {})",
            style("●").green(),
            style(backend).bold(),
            first.class(),
            engine.name()
        );
        println!("    Opcodes: {}", first.opcodes().join(", "));

        for (i, dialect) in dialects.iter().enumerate() {
            let Some(device) = dialect.device() else {
                continue;
            };
            println!(
                "    Device: {} ({}){}",
                style(device.name_short).yellow(),
                device.name,
                if i == 0 { " [default]" } else { "" }
            );
            println!(
                "      Atoms: {}, grid types: {}",
                device.max_atom_num,
                device
                    .available_grid_types
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        println!();
    }

    Ok(())
}
