//! Shared helpers for CLI commands.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use console::style;
use tracing::{debug, info};

use qlower::{Histogram, Model, ParameterValues, RuntimeInterface, Value};

/// What to compile and with which values.
#[derive(Debug, Clone)]
pub struct Request {
    /// Model file.
    pub input: PathBuf,
    /// Backend name.
    pub backend: String,
    /// Device name, if any.
    pub device: Option<String>,
    /// Raw `name=values` assignments.
    pub values: Vec<String>,
}

impl Request {
    /// Load and compile the model.
    pub fn compile(&self) -> Result<RuntimeInterface> {
        let model = load_model(&self.input)?;
        debug!(
            "Loaded {} ({} qubits, {} instructions)",
            self.input.display(),
            model.register().num_qubits,
            model.instructions().len()
        );
        let interface = qlower::compile(&model, &self.backend, self.device.as_deref())
            .with_context(|| {
                format!(
                    "Failed to compile {} for backend '{}'",
                    self.input.display(),
                    self.backend
                )
            })?;
        info!(
            "Compiled {} with engine '{}'",
            self.input.display(),
            interface.engine_name()
        );
        Ok(interface)
    }

    /// Parse the `--value` assignments.
    pub fn parameter_values(&self) -> Result<ParameterValues> {
        parse_values(&self.values)
    }

    /// Print the heading line of a command.
    pub fn announce(&self, action: &str) {
        println!(
            "{} {} {} for {}{}",
            style("→").cyan().bold(),
            action,
            style(self.input.display()).green(),
            style(&self.backend).yellow(),
            self.device
                .as_deref()
                .map(|d| format!(" ({d})"))
                .unwrap_or_default()
        );
    }
}

/// Load a model from a JSON or YAML file.
pub fn load_model(path: &Path) -> Result<Model> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&source)
            .with_context(|| format!("Invalid model in {}", path.display())),
        "yaml" | "yml" => serde_yaml_ng::from_str(&source)
            .with_context(|| format!("Invalid model in {}", path.display())),
        other => anyhow::bail!("Unknown model format '.{other}'. Available: json, yaml, yml"),
    }
}

/// Parse `name=1.5` and `name=1,2,3` assignments.
///
/// A single number is a scalar, a comma-separated list an array.
pub fn parse_values(assignments: &[String]) -> Result<ParameterValues> {
    let mut values = ParameterValues::new();
    for assignment in assignments {
        let (name, raw) = assignment
            .split_once('=')
            .with_context(|| format!("Expected NAME=VALUES, got '{assignment}'"))?;
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("Missing parameter name in '{assignment}'");
        }

        let numbers = raw
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .with_context(|| format!("Invalid number '{v}' for parameter '{name}'"))
            })
            .collect::<Result<Vec<_>>>()?;
        let value = match numbers.as_slice() {
            [single] => Value::Scalar(*single),
            _ => Value::Array(numbers),
        };
        if values.insert(name.to_string(), value).is_some() {
            anyhow::bail!("Parameter '{name}' given more than once");
        }
    }
    Ok(values)
}

/// Print a histogram as bars, most frequent outcome first.
pub fn print_histogram(histogram: &Histogram) {
    println!(
        "\n{} Results ({} shots):",
        style("✓").green().bold(),
        histogram.shots()
    );

    let mut sorted: Vec<_> = histogram.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    let total = histogram.total().max(1) as f64;

    for (bitstring, count) in sorted.iter().take(16) {
        let prob = *count as f64 / total * 100.0;
        let bar_len = (prob / 2.0).round() as usize;
        let bar: String = "█".repeat(bar_len);

        println!(
            "  {}: {:>6} ({:>5.2}%) {}",
            style(bitstring).cyan(),
            count,
            prob,
            style(bar).green()
        );
    }
    if sorted.len() > 16 {
        println!("  ... and {} more outcomes", sorted.len() - 16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_scalar_and_array() {
        let values = parse_values(&strings(&["x=1.5", "t = 1, 2,3"])).unwrap();
        assert_eq!(values["x"], Value::Scalar(1.5));
        assert_eq!(values["t"], Value::Array(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_values(&strings(&["x"])).is_err());
        assert!(parse_values(&strings(&["=1"])).is_err());
        assert!(parse_values(&strings(&["x=abc"])).is_err());
        assert!(parse_values(&strings(&["x=1,"])).is_err());
        let err = parse_values(&strings(&["x=1", "x=2"])).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_load_model_by_extension() {
        let doc = r#"{"register": {"num_qubits": 1},
            "instructions": [{"kind": "quantum", "opcode": "x", "support": {"target": [0]}}]}"#;
        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        json.write_all(doc.as_bytes()).unwrap();
        assert_eq!(load_model(json.path()).unwrap().num_qubits(), 1);

        // JSON is valid YAML.
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        yaml.write_all(doc.as_bytes()).unwrap();
        assert_eq!(load_model(yaml.path()).unwrap().num_qubits(), 1);

        let mut other = tempfile::Builder::new().suffix(".qasm").tempfile().unwrap();
        other.write_all(doc.as_bytes()).unwrap();
        assert!(load_model(other.path()).is_err());
    }

    #[test]
    fn test_missing_model_file() {
        let err = load_model(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }
}
