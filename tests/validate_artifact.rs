//! End-to-end artifact replay: parse the envelope, decode the module, encode
//! the validation samples, forward, and compare against the recorded
//! predictions.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::fs;
use std::path::PathBuf;

use torchscript_rs::artifact::ModelEnvelope;
use torchscript_rs::features::FeatureBatch;
use torchscript_rs::validation::compare_predictions;
use torchscript_rs::ScriptModule;

fn fixture_bytes() -> Result<Vec<u8>> {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let model_path = manifest_dir.join("tests/fixtures/tabular_model.pt");
    if !model_path.exists() {
        bail!(
            "Missing test fixture at {}. Run `python tests/fixtures/export_tabular_model.py` first.",
            model_path.display()
        );
    }
    fs::read(&model_path).context("Failed to read model fixture")
}

/// Build an artifact document around the fixture module.
///
/// The fixture computes numerical.sum(dim=1) + 0.5 * categorical.sum(dim=1),
/// so the expected predictions below are exact:
///   row 1: (0.5 + 13)  + 0.5 * encode(ios)=1 -> 14.0
///   row 2: (1.25 + 2)  + 0.5 * encode(web)=2 -> 4.25
fn artifact_json(model_bytes: &[u8]) -> String {
    let inner = serde_json::json!({
        "torch_model": { "model": BASE64.encode(model_bytes), "config": "{}" },
        "feature_info": {
            "num_numerical_features": 2,
            "num_categorical_features": 1,
            "feature_names": {
                "numerical": ["bid_floor", "hour"],
                "categorical": ["platform"]
            },
            "target_column": "ctr",
            "missing_value_handling": {
                "categorical_missing_value": "unknown",
                "label_encoders": {
                    "platform": { "classes": ["android", "ios", "web"], "dtype": "int64" }
                }
            }
        },
        "task_type": "regression",
        "validation_tolerance": 1e-5,
        "validation_data": [
            { "bid_floor": 0.5, "hour": 13, "platform": "ios" },
            { "bid_floor": 1.25, "hour": 2, "platform": "web" }
        ],
        "validation_predictions": [14.0, 4.25]
    })
    .to_string();

    serde_json::json!({ "interval": 3600, "data": inner }).to_string()
}

#[test]
fn replayed_predictions_match_the_recorded_ones() -> Result<()> {
    let envelope = ModelEnvelope::from_json_str(&artifact_json(&fixture_bytes()?))?;
    let body = envelope.artifact()?;

    let module = ScriptModule::load_from_buffer(&body.decode_model()?)
        .context("Failed to load module from artifact bytes")?;

    let batch = FeatureBatch::from_samples(&body.validation_data, &body.feature_info)?;
    assert_eq!(batch.numerical.dim(), (2, 2));
    assert_eq!(batch.categorical.dim(), (2, 1));

    let (numerical, categorical) = batch.to_tensors()?;
    let output = module.forward(&numerical, &categorical)?;
    let predicted: Vec<f64> = output.to_f32_vec()?.into_iter().map(f64::from).collect();

    let tolerance = body.validation_tolerance.unwrap_or(1e-6);
    let report = compare_predictions(&predicted, &body.validation_predictions, tolerance);

    assert_eq!(report.samples(), 2);
    assert!(
        report.all_within_tolerance(),
        "mse {} rmse {} mae {}",
        report.mse,
        report.rmse,
        report.mae
    );
    Ok(())
}
