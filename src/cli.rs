//! Command-line interface for torchscript-rs.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run TorchScript models exported as training artifacts.
#[derive(Parser, Debug)]
#[command(name = "torchscript-rs")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay an artifact's validation samples and compare predictions.
    Validate {
        /// Path to the artifact JSON document.
        ///
        /// Falls back to `model.artifact_path` from the config file.
        #[arg(short, long)]
        artifact: Option<PathBuf>,

        /// Override the artifact's validation tolerance.
        #[arg(short, long)]
        tolerance: Option<f64>,

        /// Output format (json, pretty).
        #[arg(short, long, default_value = "json")]
        format: String,

        /// Path to optional YAML config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a forward pass with explicit input tensors.
    Infer {
        /// Path to a serialized TorchScript module.
        #[arg(short, long)]
        model: PathBuf,

        /// Path to input data file (JSON with numerical/categorical tensors).
        #[arg(short, long)]
        input: PathBuf,

        /// Output format (json, pretty).
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Print artifact metadata without running inference.
    Info {
        /// Path to the artifact JSON document.
        #[arg(short, long)]
        artifact: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
