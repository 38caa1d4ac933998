//! qlower command-line interface
//!
//! ```text
//!   qlower compile     --input model.yaml --backend analog --device fresnel1
//!   qlower sample      --input model.json --value x=1.57 --shots 2000
//!   qlower expectation --input model.json --value x=0.3 --observable "Z0*Z1 + 0.5*X0"
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{backends, compile, expectation, run, sample, version};
use config::{Config, LogFormat};

/// qlower - compile quantum models for digital and analog backends
#[derive(Parser)]
#[command(name = "qlower")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Model, target and parameter values shared by every compiling command.
#[derive(Args, Debug, Clone)]
struct ModelArgs {
    /// Model file (JSON or YAML)
    #[arg(short, long)]
    input: PathBuf,

    /// Target backend (digital, analog); overrides the configuration
    #[arg(short, long)]
    backend: Option<String>,

    /// Target device of the backend
    #[arg(short, long)]
    device: Option<String>,

    /// Parameter value, `name=1.57` or `name=1,2,3` (repeatable)
    #[arg(long = "value", value_name = "NAME=VALUES")]
    values: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a model and print the native program
    Compile {
        #[command(flatten)]
        target: ModelArgs,

        /// Write the JSON summary to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run a model and print the final state
    Run {
        #[command(flatten)]
        target: ModelArgs,

        /// Initial basis state, qubit 0 first (e.g. "10")
        #[arg(long)]
        initial_state: Option<String>,
    },

    /// Run a model and sample measurement outcomes
    Sample {
        #[command(flatten)]
        target: ModelArgs,

        /// Number of shots; overrides the configuration
        #[arg(short, long)]
        shots: Option<usize>,

        /// Print the histogram as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a model and print the expectation of one or more observables
    Expectation {
        #[command(flatten)]
        target: ModelArgs,

        /// Observable, e.g. "Z0*Z1 + 0.5*X0" (repeatable)
        #[arg(short, long = "observable", required = true)]
        observables: Vec<String>,
    },

    /// List registered backends and devices
    Backends,

    /// Show version information
    Version,
}

fn init_logging(verbose: u8, format: LogFormat) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Console => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            std::process::exit(1);
        }
    };
    init_logging(cli.verbose, config.log_format);

    let result = match cli.command {
        Commands::Compile { target, output } => {
            compile::execute(&target.into_request(&config), output.as_deref())
        }
        Commands::Run {
            target,
            initial_state,
        } => run::execute(&target.into_request(&config), initial_state.as_deref()),
        Commands::Sample {
            target,
            shots,
            json,
        } => sample::execute(
            &target.into_request(&config),
            shots.unwrap_or(config.shots),
            json,
        ),
        Commands::Expectation {
            target,
            observables,
        } => expectation::execute(&target.into_request(&config), &observables),
        Commands::Backends => backends::execute(),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

impl ModelArgs {
    /// Fill backend and device from the configuration where not given.
    fn into_request(self, config: &Config) -> commands::common::Request {
        let backend = self.backend.unwrap_or_else(|| config.backend.clone());
        // A configured device belongs to the configured backend only.
        let device = self.device.or_else(|| {
            (backend == config.backend)
                .then(|| config.device.clone())
                .flatten()
        });
        commands::common::Request {
            input: self.input,
            backend,
            device,
            values: self.values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample() {
        let cli = Cli::try_parse_from([
            "qlower", "sample", "-i", "m.json", "--value", "x=1.5", "--value", "t=1,2", "-s",
            "200",
        ])
        .unwrap();
        let Commands::Sample { target, shots, json } = cli.command else {
            panic!("expected sample");
        };
        assert_eq!(target.values, vec!["x=1.5", "t=1,2"]);
        assert_eq!(shots, Some(200));
        assert!(!json);
    }

    #[test]
    fn test_missing_input_is_rejected() {
        assert!(Cli::try_parse_from(["qlower", "run"]).is_err());
    }

    #[test]
    fn test_parse_repeated_observables() {
        let cli = Cli::try_parse_from([
            "qlower", "expectation", "-i", "m.json", "-o", "Z0", "--observable", "X1",
        ])
        .unwrap();
        let Commands::Expectation { observables, .. } = cli.command else {
            panic!("expected expectation");
        };
        assert_eq!(observables, vec!["Z0", "X1"]);

        assert!(Cli::try_parse_from(["qlower", "expectation", "-i", "m.json"]).is_err());
    }

    #[test]
    fn test_request_uses_config_defaults() {
        let config = Config {
            backend: "analog".into(),
            device: Some("fresnel1".into()),
            ..Config::default()
        };
        let target = ModelArgs {
            input: "m.yaml".into(),
            backend: None,
            device: None,
            values: vec![],
        };
        let request = target.clone().into_request(&config);
        assert_eq!(request.backend, "analog");
        assert_eq!(request.device.as_deref(), Some("fresnel1"));

        // Switching backend drops the configured device.
        let request = ModelArgs {
            backend: Some("digital".into()),
            ..target
        }
        .into_request(&config);
        assert_eq!(request.backend, "digital");
        assert_eq!(request.device, None);
    }
}
