//! FFI declarations for the C++ TorchScript bridge.
//!
//! This module contains the raw FFI bindings. Use the safe wrappers
//! in the `model` module instead of calling these directly.

use std::ffi::c_void;
use std::os::raw::{c_char, c_int};

/// Opaque handle to a C++ TorchScript module.
pub type ModuleHandle = *mut c_void;

/// Opaque handle to a C++ tensor.
pub type TensorHandle = *mut c_void;

/// Dtype tag for float32 tensors, as returned by [`tsb_tensor_dtype`].
pub const TSB_DTYPE_F32: c_int = 0;

/// Dtype tag for int64 tensors, as returned by [`tsb_tensor_dtype`].
pub const TSB_DTYPE_I64: c_int = 1;

extern "C" {
    // Module lifecycle
    pub fn tsb_module_load(data: *const c_char, len: i64) -> ModuleHandle;
    pub fn tsb_module_free(module: ModuleHandle);
    pub fn tsb_last_error() -> *const c_char;

    // Tensor construction
    pub fn tsb_tensor_from_f32(data: *const f32, dims: *const i64, ndims: usize) -> TensorHandle;
    pub fn tsb_tensor_from_f32_as_i64(
        data: *const f32,
        dims: *const i64,
        ndims: usize,
    ) -> TensorHandle;

    // Tensor accessors
    pub fn tsb_tensor_dtype(tensor: TensorHandle) -> c_int;
    pub fn tsb_tensor_data_f32(tensor: TensorHandle) -> *const f32;
    pub fn tsb_tensor_data_i64(tensor: TensorHandle) -> *const i64;
    pub fn tsb_tensor_numel(tensor: TensorHandle) -> i64;
    pub fn tsb_tensor_free(tensor: TensorHandle);

    // Inference
    pub fn tsb_module_forward(
        module: ModuleHandle,
        numerical: TensorHandle,
        categorical: TensorHandle,
    ) -> TensorHandle;
}
