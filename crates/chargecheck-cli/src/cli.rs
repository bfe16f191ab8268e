//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chargecheck: validate hospital price-transparency CSV exports
#[derive(Parser)]
#[command(name = "chargecheck")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate one or more price files against a rule registry
    Validate {
        /// Paths to the price files (CSV/TSV)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,

        /// Rule document (YAML or JSON). Defaults to the built-in rules
        #[arg(short, long)]
        rules: Option<PathBuf>,

        /// Engine configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "human")]
        format: OutputFormat,

        /// Directory to write <stem>.validation.json reports into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of files validated at once (default: available cores)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Show the detected structure of a file without evaluating rules
    Sniff {
        /// Path to the price file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Engine configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the compiled rule definitions of a rule document
    Rules {
        /// Rule document (YAML or JSON). Defaults to the built-in rules
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use human or json.", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Human => write!(f, "human"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
