//! Trained-model artifact parsing.
//!
//! A training job exports a single JSON document: an outer envelope carrying
//! the export interval and a string-encoded inner document, which in turn
//! holds the serialized TorchScript module (base64), feature metadata with
//! per-feature label encoders, and validation samples with their expected
//! predictions.

use std::collections::HashMap;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Result, TorchScriptError};

/// A single validation sample: feature name to raw JSON value.
pub type Sample = serde_json::Map<String, Value>;

/// Outer artifact document.
#[derive(Debug, Deserialize)]
pub struct ModelEnvelope {
    /// Export interval, in seconds.
    #[serde(default)]
    pub interval: i64,

    /// JSON-encoded inner document; parse it with [`ModelEnvelope::artifact`].
    pub data: String,
}

impl ModelEnvelope {
    /// Load the envelope from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TorchScriptError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse the envelope from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse the inner artifact document.
    pub fn artifact(&self) -> Result<ModelArtifact> {
        Ok(serde_json::from_str(&self.data)?)
    }
}

/// Inner artifact document.
#[derive(Debug, Deserialize)]
pub struct ModelArtifact {
    pub torch_model: TorchModel,
    pub feature_info: FeatureInfo,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub learning_rate: f64,
    #[serde(default)]
    pub weight_decay: f64,
    #[serde(default)]
    pub epochs: u32,
    #[serde(default)]
    pub batch_size: usize,
    #[serde(default)]
    pub num_workers: usize,
    #[serde(default)]
    pub weight_column: String,
    #[serde(default)]
    pub validation_samples: usize,
    #[serde(default)]
    pub validation_tolerance: Option<f64>,
    #[serde(default)]
    pub validation_data: Vec<Sample>,
    #[serde(default)]
    pub validation_predictions: Vec<f64>,
    #[serde(default)]
    pub training_history: TrainingHistory,
}

impl ModelArtifact {
    /// Decode the base64 serialized module into raw bytes.
    pub fn decode_model(&self) -> Result<Vec<u8>> {
        Ok(BASE64.decode(self.torch_model.model.as_bytes())?)
    }
}

/// Serialized module payload.
#[derive(Debug, Deserialize)]
pub struct TorchModel {
    /// Base64-encoded TorchScript archive.
    pub model: String,
    #[serde(default)]
    pub config: String,
}

/// Feature metadata: names, vocabulary sizes, and missing-value handling.
#[derive(Debug, Default, Deserialize)]
pub struct FeatureInfo {
    #[serde(default)]
    pub num_numerical_features: usize,
    #[serde(default)]
    pub num_categorical_features: usize,
    #[serde(default)]
    pub categorical_vocab_sizes: HashMap<String, usize>,
    #[serde(default)]
    pub feature_names: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub target_column: String,
    #[serde(default)]
    pub missing_value_handling: MissingValueHandling,
}

impl FeatureInfo {
    /// Names of the numerical features, in model input order.
    pub fn numerical_features(&self) -> &[String] {
        self.feature_names
            .get("numerical")
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Names of the categorical features, in model input order.
    pub fn categorical_features(&self) -> &[String] {
        self.feature_names
            .get("categorical")
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Label encoder for a categorical feature, if one was exported.
    pub fn encoder(&self, feature: &str) -> Option<&LabelEncoder> {
        self.missing_value_handling.label_encoders.get(feature)
    }
}

/// Missing-value defaults and per-feature label encoders.
#[derive(Debug, Default, Deserialize)]
pub struct MissingValueHandling {
    #[serde(default)]
    pub numerical_missing_value: Option<Value>,
    #[serde(default)]
    pub categorical_missing_value: String,
    #[serde(default)]
    pub label_encoders: HashMap<String, LabelEncoder>,
}

/// Ordered class list for one categorical feature.
#[derive(Debug, Default, Deserialize)]
pub struct LabelEncoder {
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub dtype: String,
}

impl LabelEncoder {
    /// Class index for `value`. Unknown values map to index 0.
    pub fn encode(&self, value: &str) -> usize {
        match self.classes.iter().position(|class| class == value) {
            Some(index) => index,
            None => {
                warn!(value, "categorical value not found in encoder classes, using index 0");
                0
            }
        }
    }
}

/// Training metrics kept alongside the exported model.
#[derive(Debug, Default, Deserialize)]
pub struct TrainingHistory {
    #[serde(default)]
    pub train_losses: Vec<f64>,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub total_training_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_envelope() -> String {
        let inner = serde_json::json!({
            "torch_model": { "model": "aGVsbG8=", "config": "{}" },
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
            "epochs": 10,
            "validation_tolerance": 1e-5,
            "validation_data": [ { "bid_floor": 0.5, "hour": 13, "platform": "ios" } ],
            "validation_predictions": [0.25]
        })
        .to_string();

        serde_json::json!({ "interval": 3600, "data": inner }).to_string()
    }

    #[test]
    fn parses_envelope_and_inner_document() {
        let envelope = ModelEnvelope::from_json_str(&sample_envelope()).unwrap();
        assert_eq!(envelope.interval, 3600);

        let artifact = envelope.artifact().unwrap();
        assert_eq!(artifact.task_type, "regression");
        assert_eq!(artifact.epochs, 10);
        assert_eq!(artifact.validation_tolerance, Some(1e-5));
        assert_eq!(artifact.validation_data.len(), 1);
        assert_eq!(artifact.validation_predictions, vec![0.25]);
        assert_eq!(
            artifact.feature_info.numerical_features(),
            ["bid_floor", "hour"]
        );
        assert_eq!(artifact.feature_info.categorical_features(), ["platform"]);
    }

    #[test]
    fn decodes_base64_model_bytes() {
        let envelope = ModelEnvelope::from_json_str(&sample_envelope()).unwrap();
        let artifact = envelope.artifact().unwrap();
        assert_eq!(artifact.decode_model().unwrap(), b"hello");
    }

    #[test]
    fn encoder_maps_known_and_unknown_values() {
        let envelope = ModelEnvelope::from_json_str(&sample_envelope()).unwrap();
        let artifact = envelope.artifact().unwrap();
        let encoder = artifact.feature_info.encoder("platform").unwrap();

        assert_eq!(encoder.encode("android"), 0);
        assert_eq!(encoder.encode("web"), 2);
        // Unknown categories fall back to index 0.
        assert_eq!(encoder.encode("roku"), 0);
    }

    #[test]
    fn rejects_malformed_inner_document() {
        let envelope =
            ModelEnvelope::from_json_str(r#"{ "interval": 1, "data": "not json" }"#).unwrap();
        assert!(envelope.artifact().is_err());
    }
}
