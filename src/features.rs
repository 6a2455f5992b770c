//! Feature extraction: validation samples to model input tensors.

use ndarray::Array2;
use serde_json::Value;

use crate::artifact::{FeatureInfo, Sample};
use crate::error::{Result, TorchScriptError};
use crate::inference::Tensor;

/// Row-major feature matrices for one batch of samples.
///
/// Categorical values hold label-encoded indices stored as floats; they are
/// truncated to int64 when the tensor pair is created. A model without
/// numerical or categorical features gets a `[batch, 0]` matrix for the
/// missing family.
#[derive(Debug)]
pub struct FeatureBatch {
    pub numerical: Array2<f32>,
    pub categorical: Array2<f32>,
}

impl FeatureBatch {
    /// Extract the model's named features from each sample.
    ///
    /// # Errors
    ///
    /// Returns [`TorchScriptError::Artifact`] when a sample is missing a
    /// named feature or a categorical feature has no exported encoder.
    pub fn from_samples(samples: &[Sample], info: &FeatureInfo) -> Result<Self> {
        if samples.is_empty() {
            return Err(TorchScriptError::artifact("no samples provided"));
        }

        let numerical_names = info.numerical_features();
        let categorical_names = info.categorical_features();
        let batch = samples.len();

        let mut numerical = Array2::<f32>::zeros((batch, numerical_names.len()));
        let mut categorical = Array2::<f32>::zeros((batch, categorical_names.len()));

        for (row, sample) in samples.iter().enumerate() {
            for (col, name) in numerical_names.iter().enumerate() {
                numerical[[row, col]] = value_to_f32(feature_value(sample, name)?);
            }

            for (col, name) in categorical_names.iter().enumerate() {
                let encoder = info.encoder(name).ok_or_else(|| {
                    TorchScriptError::artifact(format!(
                        "no label encoder for categorical feature {name}"
                    ))
                })?;
                let value = feature_value(sample, name)?;
                categorical[[row, col]] = encoder.encode(&value_to_string(value)) as f32;
            }
        }

        Ok(Self {
            numerical,
            categorical,
        })
    }

    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.numerical.nrows()
    }

    /// Whether the batch holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the (float32 numerical, int64 categorical) tensor pair.
    pub fn to_tensors(&self) -> Result<(Tensor, Tensor)> {
        let numerical = Tensor::from_array(&self.numerical)?;
        let categorical = Tensor::from_array_truncated(&self.categorical)?;
        Ok((numerical, categorical))
    }
}

fn feature_value<'a>(sample: &'a Sample, name: &str) -> Result<&'a Value> {
    sample
        .get(name)
        .ok_or_else(|| TorchScriptError::artifact(format!("feature {name} not found in sample")))
}

/// Coerce a raw JSON value to f32. Non-numeric values fall back to 0.0.
fn value_to_f32(value: &Value) -> f32 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0) as f32,
        Value::String(text) => text.trim().parse::<f32>().unwrap_or(0.0),
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Render a raw JSON value the way the encoder classes were written.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
