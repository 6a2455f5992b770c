//! Model inference module.
//!
//! This module provides FFI bindings to the C++ TorchScript bridge
//! and safe Rust wrappers for module loading, tensor construction, and
//! the two-input forward pass.

mod ffi;
mod model;

pub use model::{DType, ScriptModule, Tensor};
