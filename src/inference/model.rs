//! Safe wrappers for TorchScript module inference.
//!
//! This module provides type-safe Rust wrappers around the C++ FFI bindings
//! for loading TorchScript modules and running the two-input forward pass.

use ndarray::Array;
use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::slice;

use super::ffi;
use crate::error::{Result, TorchScriptError};

/// Element type of a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    /// 32-bit floating point.
    Float32,
    /// 64-bit signed integer.
    Int64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float32 => write!(f, "float32"),
            Self::Int64 => write!(f, "int64"),
        }
    }
}

/// Message for the most recent bridge failure on this thread.
fn last_bridge_error() -> String {
    unsafe {
        let err_ptr = ffi::tsb_last_error();
        if err_ptr.is_null() {
            "Unknown error".to_string()
        } else {
            CStr::from_ptr(err_ptr).to_string_lossy().into_owned()
        }
    }
}

/// Validate that a shape is non-negative and matches the buffer length.
fn checked_shape(shape: &[i64], len: usize) -> Result<()> {
    let mut expected: usize = 1;
    for &dim in shape {
        if dim < 0 {
            return Err(TorchScriptError::tensor(format!(
                "negative dimension {dim} in shape {shape:?}"
            )));
        }
        expected = expected.saturating_mul(dim as usize);
    }
    if expected != len {
        return Err(TorchScriptError::ShapeMismatch {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Deserialized, evaluation-mode TorchScript module.
///
/// The module owns its native handle and releases it on drop.
///
/// # Example
///
/// ```ignore
/// use torchscript_rs::{ScriptModule, Tensor};
///
/// let bytes = std::fs::read("model.pt")?;
/// let module = ScriptModule::load_from_buffer(&bytes)?;
///
/// let numerical = Tensor::from_f32(&[0.5, 1.5], &[1, 2])?;
/// let categorical = Tensor::from_f32_truncated(&[3.0], &[1, 1])?;
/// let output = module.forward(&numerical, &categorical)?;
/// println!("{} output values", output.numel());
/// ```
pub struct ScriptModule {
    handle: ffi::ModuleHandle,
}

// SAFETY: the handle is uniquely owned and the bridge keeps no thread-local
// state tied to it, so moving a module across threads is sound. Concurrent
// calls through one handle are not serialized by the bridge, hence no `Sync`.
unsafe impl Send for ScriptModule {}

impl ScriptModule {
    /// Deserialize a TorchScript module from an in-memory buffer.
    ///
    /// The module is switched to evaluation mode before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`TorchScriptError::ModelLoad`] if the buffer is empty or the
    /// runtime rejects it.
    pub fn load_from_buffer(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(TorchScriptError::model_load("model buffer is empty"));
        }

        let handle =
            unsafe { ffi::tsb_module_load(bytes.as_ptr() as *const c_char, bytes.len() as i64) };

        if handle.is_null() {
            Err(TorchScriptError::model_load(last_bridge_error()))
        } else {
            Ok(Self { handle })
        }
    }

    /// Invoke the module with the (numerical, categorical) input pair.
    ///
    /// The module is called with exactly two positional inputs in that order
    /// and must produce a single tensor output. Both inputs are borrowed for
    /// the duration of the call; the output is a new owned tensor.
    ///
    /// # Errors
    ///
    /// Returns [`TorchScriptError::Inference`] if the module expects a
    /// different input arity or the invocation raises inside the runtime.
    pub fn forward(&self, numerical: &Tensor, categorical: &Tensor) -> Result<Tensor> {
        let handle =
            unsafe { ffi::tsb_module_forward(self.handle, numerical.handle, categorical.handle) };

        if handle.is_null() {
            return Err(TorchScriptError::inference(last_bridge_error()));
        }

        // SAFETY: the bridge returned a live tensor handle we now own.
        unsafe { Tensor::from_raw(handle) }
    }
}

impl Drop for ScriptModule {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                ffi::tsb_module_free(self.handle);
            }
        }
    }
}

/// Runtime-owned contiguous numeric buffer with a shape and element type.
///
/// The tensor owns its native handle and releases it on drop.
pub struct Tensor {
    handle: ffi::TensorHandle,
    dtype: DType,
}

// SAFETY: same ownership argument as for `ScriptModule`.
unsafe impl Send for Tensor {}

impl Tensor {
    /// Copy a row-major f32 buffer into a new owned float32 tensor.
    ///
    /// # Errors
    ///
    /// Returns [`TorchScriptError::ShapeMismatch`] when the product of the
    /// shape dimensions does not equal the buffer length, and
    /// [`TorchScriptError::Tensor`] when the runtime fails to allocate.
    pub fn from_f32(data: &[f32], shape: &[i64]) -> Result<Self> {
        checked_shape(shape, data.len())?;

        let handle =
            unsafe { ffi::tsb_tensor_from_f32(data.as_ptr(), shape.as_ptr(), shape.len()) };

        if handle.is_null() {
            Err(TorchScriptError::tensor(last_bridge_error()))
        } else {
            Ok(Self {
                handle,
                dtype: DType::Float32,
            })
        }
    }

    /// Copy a row-major f32 buffer into a new owned int64 tensor.
    ///
    /// Every element is cast toward zero: 3.9 stores 3, -3.9 stores -3.
    /// Fractional parts are discarded, not rounded. Intended for
    /// categorical/index-valued inputs.
    ///
    /// # Errors
    ///
    /// Same contract as [`Tensor::from_f32`].
    pub fn from_f32_truncated(data: &[f32], shape: &[i64]) -> Result<Self> {
        checked_shape(shape, data.len())?;

        let handle =
            unsafe { ffi::tsb_tensor_from_f32_as_i64(data.as_ptr(), shape.as_ptr(), shape.len()) };

        if handle.is_null() {
            Err(TorchScriptError::tensor(last_bridge_error()))
        } else {
            Ok(Self {
                handle,
                dtype: DType::Int64,
            })
        }
    }

    /// Copy an `ndarray` array into a new owned float32 tensor.
    pub fn from_array<D: ndarray::Dimension>(array: &Array<f32, D>) -> Result<Self> {
        let shape: Vec<i64> = array.shape().iter().map(|&s| s as i64).collect();
        let contiguous = array.as_standard_layout();
        let data = contiguous
            .as_slice()
            .ok_or_else(|| TorchScriptError::tensor("input array is not contiguous"))?;
        Self::from_f32(data, &shape)
    }

    /// Copy an `ndarray` array into a new owned int64 tensor, truncating
    /// every element toward zero.
    pub fn from_array_truncated<D: ndarray::Dimension>(array: &Array<f32, D>) -> Result<Self> {
        let shape: Vec<i64> = array.shape().iter().map(|&s| s as i64).collect();
        let contiguous = array.as_standard_layout();
        let data = contiguous
            .as_slice()
            .ok_or_else(|| TorchScriptError::tensor("input array is not contiguous"))?;
        Self::from_f32_truncated(data, &shape)
    }

    /// Take ownership of a bridge handle, querying its element type.
    ///
    /// # Safety
    ///
    /// The handle must be a live tensor pointer from the bridge, not owned
    /// elsewhere.
    pub(crate) unsafe fn from_raw(handle: ffi::TensorHandle) -> Result<Self> {
        let dtype = match ffi::tsb_tensor_dtype(handle) {
            ffi::TSB_DTYPE_F32 => DType::Float32,
            ffi::TSB_DTYPE_I64 => DType::Int64,
            _ => {
                let message = last_bridge_error();
                ffi::tsb_tensor_free(handle);
                return Err(TorchScriptError::tensor(message));
            }
        };
        Ok(Self { handle, dtype })
    }

    /// Element type of this tensor.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Total number of scalar elements across all dimensions.
    pub fn numel(&self) -> usize {
        let numel = unsafe { ffi::tsb_tensor_numel(self.handle) };
        numel.max(0) as usize
    }

    fn require_dtype(&self, want: DType) -> Result<()> {
        if self.dtype != want {
            return Err(TorchScriptError::tensor(format!(
                "requested {} data from a {} tensor",
                want, self.dtype
            )));
        }
        Ok(())
    }

    /// Pointer into the tensor's float32 storage, valid for the handle's
    /// lifetime. Refuses an int64 tensor.
    pub(crate) fn data_ptr_f32(&self) -> Result<*const f32> {
        self.require_dtype(DType::Float32)?;
        let ptr = unsafe { ffi::tsb_tensor_data_f32(self.handle) };
        if ptr.is_null() {
            Err(TorchScriptError::tensor(last_bridge_error()))
        } else {
            Ok(ptr)
        }
    }

    /// Pointer into the tensor's int64 storage, valid for the handle's
    /// lifetime. Refuses a float32 tensor.
    pub(crate) fn data_ptr_i64(&self) -> Result<*const i64> {
        self.require_dtype(DType::Int64)?;
        let ptr = unsafe { ffi::tsb_tensor_data_i64(self.handle) };
        if ptr.is_null() {
            Err(TorchScriptError::tensor(last_bridge_error()))
        } else {
            Ok(ptr)
        }
    }

    /// Copy the tensor contents out as a flat `Vec<f32>`.
    ///
    /// # Errors
    ///
    /// Returns [`TorchScriptError::Tensor`] when the element type is not
    /// float32.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        let numel = self.numel();
        if numel == 0 {
            return Ok(Vec::new());
        }
        let ptr = self.data_ptr_f32()?;
        // SAFETY: the bridge guarantees `numel` contiguous elements behind a
        // non-null data pointer.
        Ok(unsafe { slice::from_raw_parts(ptr, numel) }.to_vec())
    }

    /// Copy the tensor contents out as a flat `Vec<i64>`.
    ///
    /// # Errors
    ///
    /// Returns [`TorchScriptError::Tensor`] when the element type is not
    /// int64.
    pub fn to_i64_vec(&self) -> Result<Vec<i64>> {
        let numel = self.numel();
        if numel == 0 {
            return Ok(Vec::new());
        }
        let ptr = self.data_ptr_i64()?;
        // SAFETY: as above.
        Ok(unsafe { slice::from_raw_parts(ptr, numel) }.to_vec())
    }
}

impl Drop for Tensor {
    fn drop(&mut self) {
        if !self.handle.is_null() {
            unsafe {
                ffi::tsb_tensor_free(self.handle);
            }
        }
    }
}
