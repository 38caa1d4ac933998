//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - multi-target quantum program compiler",
        style("qlower").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qlower-ir           Backend-agnostic model representation");
    println!("  qlower-compile      Dialects, parameter embedding and lowering");
    println!("  qlower-runtime      Runtime interface and engine contract");
    println!("  qlower-adapter-sim  Statevector and pulse engines");
    println!("  qlower-cli          Command-line interface");
    println!();
    println!("License: {}", style(env!("CARGO_PKG_LICENSE")).dim());
}
