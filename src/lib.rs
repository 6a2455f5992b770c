//! torchscript-rs: Run TorchScript models from Rust, with a flat C ABI for
//! foreign runtimes.
//!
//! This crate loads TorchScript modules from in-memory buffers and runs the
//! two-input (numerical, categorical) forward pass used by tabular models.
//! It uses a C++ bridge to interface with libtorch's `torch::jit` loader.
//!
//! Two surfaces are exposed:
//!
//! - The safe Rust API in [`inference`]: owning [`ScriptModule`] / [`Tensor`]
//!   handles released on drop, with a structured error taxonomy.
//! - The flat C ABI in [`capi`]: the `torchscript_*` exports of the cdylib,
//!   where failures collapse to null/zero sentinels for foreign callers.
//!
//! # Example
//!
//! ```ignore
//! use torchscript_rs::{ScriptModule, Tensor};
//!
//! // Load a serialized module
//! let bytes = std::fs::read("model.pt")?;
//! let module = ScriptModule::load_from_buffer(&bytes)?;
//!
//! // One row: two numerical features, one categorical index
//! let numerical = Tensor::from_f32(&[0.5, 13.0], &[1, 2])?;
//! let categorical = Tensor::from_f32_truncated(&[2.0], &[1, 1])?;
//!
//! // Run inference
//! let output = module.forward(&numerical, &categorical)?;
//! println!("{:?}", output.to_f32_vec()?);
//! ```
//!
//! # Building
//!
//! This crate requires PyTorch to be installed in the Python environment.
//! The build script will automatically detect PyTorch from `.venv/bin/python`.
//!
//! ```bash
//! # Create venv and install PyTorch
//! python -m venv .venv
//! .venv/bin/pip install torch
//!
//! # Build
//! cargo build --release
//! ```

pub mod artifact;
pub mod capi;
pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod inference;
pub mod validation;

// Re-export commonly used types
pub use error::{Result, TorchScriptError};
pub use inference::{DType, ScriptModule, Tensor};
