use anyhow::{bail, Context, Result};
use approx::assert_abs_diff_eq;
use ndarray::Array2;
use std::fs;
use std::path::PathBuf;
use torchscript_rs::{ScriptModule, Tensor};

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

// The fixture computes numerical.sum(dim=1) + 0.5 * categorical.sum(dim=1).

#[test]
fn forward_produces_one_prediction_per_row() -> Result<()> {
    let module = ScriptModule::load_from_buffer(&fixture_bytes()?)
        .context("Failed to load tabular model fixture")?;

    let numerical = Array2::<f32>::zeros((4, 3));
    let categorical = Array2::<f32>::zeros((4, 2));
    let output = module.forward(
        &Tensor::from_array(&numerical)?,
        &Tensor::from_array_truncated(&categorical)?,
    )?;

    assert_eq!(output.numel(), 4, "expected one prediction per row");
    for &value in &output.to_f32_vec()? {
        assert_abs_diff_eq!(value, 0.0, epsilon = 1e-6);
    }
    Ok(())
}

#[test]
fn forward_truncates_categorical_inputs() -> Result<()> {
    let module = ScriptModule::load_from_buffer(&fixture_bytes()?)?;

    let numerical = Tensor::from_f32(&[1.0, 2.0, 3.0], &[1, 3])?;
    // 2.9 and 4.9 truncate to 2 and 4, contributing 0.5 * 6 = 3.
    let categorical = Tensor::from_f32_truncated(&[2.9, 4.9], &[1, 2])?;

    let output = module.forward(&numerical, &categorical)?;
    let values = output.to_f32_vec()?;
    assert_eq!(values.len(), 1);
    assert_abs_diff_eq!(values[0], 9.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn forward_with_mismatched_input_width_fails_cleanly() -> Result<()> {
    let module = ScriptModule::load_from_buffer(&fixture_bytes()?)?;

    // The fixture sums over dim 1, so a 1-D input is out of contract.
    let numerical = Tensor::from_f32(&[1.0, 2.0], &[2])?;
    let categorical = Tensor::from_f32_truncated(&[0.0], &[1])?;

    assert!(module.forward(&numerical, &categorical).is_err());
    Ok(())
}

#[test]
fn load_then_drop_does_not_crash() -> Result<()> {
    let bytes = fixture_bytes()?;
    for _ in 0..3 {
        let module = ScriptModule::load_from_buffer(&bytes)?;
        drop(module);
    }
    Ok(())
}
