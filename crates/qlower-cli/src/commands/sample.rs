//! Sample command implementation.

use anyhow::Result;

use super::common::{Request, print_histogram};

/// Execute the sample command.
pub fn execute(request: &Request, shots: usize, json: bool) -> Result<()> {
    if !json {
        request.announce(&format!("Sampling {shots} shots of"));
    }
    let interface = request.compile()?;
    let values = request.parameter_values()?;

    let histogram = interface.sample(&values, shots, None)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&histogram)?);
    } else {
        print_histogram(&histogram);
    }
    Ok(())
}
