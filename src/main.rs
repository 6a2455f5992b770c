//! CLI entry point for torchscript-rs.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use torchscript_rs::artifact::ModelEnvelope;
use torchscript_rs::cli::{Cli, Commands};
use torchscript_rs::config::Config;
use torchscript_rs::features::FeatureBatch;
use torchscript_rs::inference::{ScriptModule, Tensor};
use torchscript_rs::validation::compare_predictions;

/// Get the libtorch version from the build script.
fn libtorch_version() -> &'static str {
    option_env!("LIBTORCH_VERSION").unwrap_or("unknown")
}

fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Validate {
            artifact,
            tolerance,
            format,
            config,
        } => {
            // Load optional config
            let config = if let Some(config_path) = config {
                Config::from_yaml_file(&config_path)
                    .with_context(|| format!("Failed to load config: {}", config_path.display()))?
            } else {
                Config::default()
            };

            let artifact_path = artifact
                .or_else(|| config.model.artifact_path.clone().map(PathBuf::from))
                .context("No artifact path given (pass --artifact or set model.artifact_path)")?;

            info!("Loading artifact: {}", artifact_path.display());
            let envelope = ModelEnvelope::from_json_file(&artifact_path)?;
            let body = envelope.artifact()?;

            info!(
                "Task type: {}, epochs: {}, validation samples: {}",
                body.task_type,
                body.epochs,
                body.validation_data.len()
            );

            // Decode and load the serialized module
            let model_bytes = body.decode_model()?;
            info!("Model decoded: {} bytes", model_bytes.len());
            let module = ScriptModule::load_from_buffer(&model_bytes)?;
            info!("Model loaded successfully");

            // Prepare input tensors from the validation samples
            let batch = FeatureBatch::from_samples(&body.validation_data, &body.feature_info)?;
            info!(
                "Numerical batch shape: {:?}, categorical batch shape: {:?}",
                batch.numerical.dim(),
                batch.categorical.dim()
            );
            let (numerical, categorical) = batch.to_tensors()?;

            info!("Running forward pass...");
            let output = module.forward(&numerical, &categorical)?;
            let predicted: Vec<f64> = output.to_f32_vec()?.into_iter().map(f64::from).collect();

            let tolerance = tolerance
                .or(body.validation_tolerance)
                .unwrap_or(config.validation.tolerance);

            let report = compare_predictions(&predicted, &body.validation_predictions, tolerance);
            info!(
                "Validation complete: {} exact, {} close, {} diff (tolerance {:e})",
                report.exact, report.close, report.diff, report.tolerance
            );

            if format == "pretty" {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", serde_json::to_string(&report)?);
            }

            if !report.all_within_tolerance() {
                std::process::exit(1);
            }
        }

        Commands::Infer {
            model,
            input,
            format,
        } => {
            info!("Loading model: {}", model.display());
            let model_bytes =
                fs::read(&model).with_context(|| format!("Failed to read {}", model.display()))?;
            let module = ScriptModule::load_from_buffer(&model_bytes)?;
            info!("Model loaded successfully");

            // Load input data
            info!("Loading input: {}", input.display());
            let input_json: Value = serde_json::from_str(
                &fs::read_to_string(&input)
                    .with_context(|| format!("Failed to read input: {}", input.display()))?,
            )?;

            // Expected format:
            // { "numerical": { "data": [...], "shape": [...] },
            //   "categorical": { "data": [...], "shape": [...] } }
            let numerical = tensor_from_json(&input_json["numerical"], false)
                .context("Failed to build numerical input tensor")?;
            let categorical = tensor_from_json(&input_json["categorical"], true)
                .context("Failed to build categorical input tensor")?;

            info!("Running forward pass...");
            let output = module.forward(&numerical, &categorical)?;
            let values = output.to_f32_vec()?;

            let output = serde_json::json!({
                "numel": values.len(),
                "values": values,
            });

            if format == "pretty" {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", serde_json::to_string(&output)?);
            }
        }

        Commands::Info { artifact } => {
            let envelope = ModelEnvelope::from_json_file(&artifact)?;
            let body = envelope.artifact()?;

            println!("torchscript-rs v{}", env!("CARGO_PKG_VERSION"));
            println!("libtorch: {}", libtorch_version());
            println!();
            println!("Artifact: {}", artifact.display());
            println!("Interval: {}", envelope.interval);
            println!("Task type: {}", body.task_type);
            println!("Epochs: {}", body.epochs);
            println!("Learning rate: {}", body.learning_rate);
            println!("Validation samples: {}", body.validation_data.len());
            println!("Expected predictions: {}", body.validation_predictions.len());
            println!(
                "Numerical features: {}",
                body.feature_info.numerical_features().len()
            );
            println!(
                "Categorical features: {}",
                body.feature_info.categorical_features().len()
            );
            for (name, encoder) in &body.feature_info.missing_value_handling.label_encoders {
                println!("  {}: {} classes", name, encoder.classes.len());
            }
        }
    }

    Ok(())
}

/// Build an input tensor from a `{ "data": [...], "shape": [...] }` document.
fn tensor_from_json(value: &Value, categorical: bool) -> Result<Tensor> {
    let data: Vec<f32> = value["data"]
        .as_array()
        .context("Input must have 'data' array")?
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();

    let shape: Vec<i64> = value["shape"]
        .as_array()
        .context("Input must have 'shape' array")?
        .iter()
        .map(|v| v.as_i64().unwrap_or(1))
        .collect();

    let tensor = if categorical {
        Tensor::from_f32_truncated(&data, &shape)?
    } else {
        Tensor::from_f32(&data, &shape)?
    };
    Ok(tensor)
}
