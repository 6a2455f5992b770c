//! Flat C ABI over the safe inference layer.
//!
//! Foreign runtimes dynamically link the `torchscript_rs` cdylib and drive
//! inference through these exports. Handles are opaque pointers owning
//! [`ScriptModule`] / [`Tensor`] values; every handle returned by this
//! surface must be released exactly once through the matching free function.
//! Releasing the same non-null handle twice is undefined behavior and is not
//! guarded against.
//!
//! Failures collapse to a null (or zero) sentinel. The failure message is
//! written to the `tracing` diagnostic stream and kept in a thread-local
//! slot readable through [`torchscript_last_error_length`] and
//! [`torchscript_last_error_message`].

use std::cell::RefCell;
use std::ffi::{c_void, CString};
use std::fmt::Display;
use std::os::raw::{c_char, c_int, c_longlong};
use std::ptr;
use std::slice;

use tracing::error;

use crate::error::Result;
use crate::inference::{ScriptModule, Tensor};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn record_error(context: &str, message: impl Display) {
    let text = format!("{context}: {message}");
    error!("{text}");
    let owned = CString::new(text)
        .unwrap_or_else(|_| CString::new("error message contained a null byte").unwrap());
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = Some(owned);
    });
}

fn clear_error() {
    LAST_ERROR.with(|slot| {
        *slot.borrow_mut() = None;
    });
}

unsafe fn borrow_module<'a>(handle: *mut c_void) -> Option<&'a ScriptModule> {
    (handle as *const ScriptModule).as_ref()
}

unsafe fn borrow_tensor<'a>(handle: *mut c_void) -> Option<&'a Tensor> {
    (handle as *const Tensor).as_ref()
}

/// Deserialize a TorchScript module from `len` bytes at `data`.
///
/// Returns an owning module handle, or null on failure. The caller must
/// release the handle with [`torchscript_module_free`].
///
/// # Safety
///
/// `data` must point to at least `len` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn torchscript_module_load(
    data: *const c_char,
    len: c_longlong,
) -> *mut c_void {
    if data.is_null() || len <= 0 {
        record_error("module_load", "null or empty model buffer");
        return ptr::null_mut();
    }

    let bytes = slice::from_raw_parts(data as *const u8, len as usize);
    match ScriptModule::load_from_buffer(bytes) {
        Ok(module) => {
            clear_error();
            Box::into_raw(Box::new(module)) as *mut c_void
        }
        Err(err) => {
            record_error("module_load", err);
            ptr::null_mut()
        }
    }
}

/// Release a module handle. No-op on null.
///
/// # Safety
///
/// `module` must be null or a handle from [`torchscript_module_load`] that
/// has not been released yet.
#[no_mangle]
pub unsafe extern "C" fn torchscript_module_free(module: *mut c_void) {
    if module.is_null() {
        return;
    }
    drop(Box::from_raw(module as *mut ScriptModule));
}

/// Shared body of the two tensor constructors: validate the raw shape,
/// derive the buffer length from the dimension product, build the tensor.
unsafe fn create_tensor(
    context: &str,
    data: *const f32,
    dims: *const i64,
    ndims: c_int,
    make: impl FnOnce(&[f32], &[i64]) -> Result<Tensor>,
) -> *mut c_void {
    if data.is_null() {
        record_error(context, "null data pointer");
        return ptr::null_mut();
    }
    if ndims < 0 || (dims.is_null() && ndims > 0) {
        record_error(context, "invalid dimension array");
        return ptr::null_mut();
    }

    let shape: &[i64] = if ndims == 0 {
        &[]
    } else {
        slice::from_raw_parts(dims, ndims as usize)
    };

    let mut len: usize = 1;
    for &dim in shape {
        if dim < 0 {
            record_error(context, format!("negative dimension {dim}"));
            return ptr::null_mut();
        }
        len = len.saturating_mul(dim as usize);
    }

    let buffer = slice::from_raw_parts(data, len);
    match make(buffer, shape) {
        Ok(tensor) => {
            clear_error();
            Box::into_raw(Box::new(tensor)) as *mut c_void
        }
        Err(err) => {
            record_error(context, err);
            ptr::null_mut()
        }
    }
}

/// Copy a row-major f32 buffer into a new owned float32 tensor.
///
/// The buffer must hold exactly the product of the dimension sizes. Returns
/// a tensor handle, or null on failure.
///
/// # Safety
///
/// `data` must point to `product(dims)` readable floats and `dims` to
/// `ndims` readable dimension sizes.
#[no_mangle]
pub unsafe extern "C" fn torchscript_tensor_from_f32(
    data: *const f32,
    dims: *const i64,
    ndims: c_int,
) -> *mut c_void {
    create_tensor("tensor_from_f32", data, dims, ndims, Tensor::from_f32)
}

/// Copy a row-major f32 buffer into a new owned int64 tensor.
///
/// Every element is cast toward zero (3.9 stores 3, -3.9 stores -3);
/// fractional parts are discarded, not rounded. Intended for
/// categorical/index-valued inputs.
///
/// # Safety
///
/// Same contract as [`torchscript_tensor_from_f32`].
#[no_mangle]
pub unsafe extern "C" fn torchscript_tensor_from_f32_truncated(
    data: *const f32,
    dims: *const i64,
    ndims: c_int,
) -> *mut c_void {
    create_tensor(
        "tensor_from_f32_truncated",
        data,
        dims,
        ndims,
        Tensor::from_f32_truncated,
    )
}

/// Invoke the module with exactly two positional inputs, in (numerical,
/// categorical) order.
///
/// All three handles are borrowed for the duration of the call. Returns a
/// new owned output tensor handle, or null if any handle is null, the module
/// expects a different input arity, or the invocation raises.
///
/// # Safety
///
/// The handles must be null or live handles from this surface.
#[no_mangle]
pub unsafe extern "C" fn torchscript_module_forward(
    module: *mut c_void,
    numerical: *mut c_void,
    categorical: *mut c_void,
) -> *mut c_void {
    let Some(module) = borrow_module(module) else {
        record_error("module_forward", "null module handle");
        return ptr::null_mut();
    };
    let Some(numerical) = borrow_tensor(numerical) else {
        record_error("module_forward", "null numerical input handle");
        return ptr::null_mut();
    };
    let Some(categorical) = borrow_tensor(categorical) else {
        record_error("module_forward", "null categorical input handle");
        return ptr::null_mut();
    };

    match module.forward(numerical, categorical) {
        Ok(output) => {
            clear_error();
            Box::into_raw(Box::new(output)) as *mut c_void
        }
        Err(err) => {
            record_error("module_forward", err);
            ptr::null_mut()
        }
    }
}

/// Pointer into a float32 tensor's storage, valid for the handle's lifetime.
///
/// Returns null if the handle is null or the tensor's element type is not
/// float32; an int64 tensor is refused rather than reinterpreted.
///
/// # Safety
///
/// `tensor` must be null or a live tensor handle from this surface.
#[no_mangle]
pub unsafe extern "C" fn torchscript_tensor_data_f32(tensor: *mut c_void) -> *const f32 {
    let Some(tensor) = borrow_tensor(tensor) else {
        record_error("tensor_data_f32", "null tensor handle");
        return ptr::null();
    };
    match tensor.data_ptr_f32() {
        Ok(data) => {
            clear_error();
            data
        }
        Err(err) => {
            record_error("tensor_data_f32", err);
            ptr::null()
        }
    }
}

/// Pointer into an int64 tensor's storage, valid for the handle's lifetime.
///
/// Returns null if the handle is null or the tensor's element type is not
/// int64.
///
/// # Safety
///
/// `tensor` must be null or a live tensor handle from this surface.
#[no_mangle]
pub unsafe extern "C" fn torchscript_tensor_data_i64(tensor: *mut c_void) -> *const i64 {
    let Some(tensor) = borrow_tensor(tensor) else {
        record_error("tensor_data_i64", "null tensor handle");
        return ptr::null();
    };
    match tensor.data_ptr_i64() {
        Ok(data) => {
            clear_error();
            data
        }
        Err(err) => {
            record_error("tensor_data_i64", err);
            ptr::null()
        }
    }
}

/// Total number of scalar elements across all dimensions. Returns 0 on a
/// null handle.
///
/// # Safety
///
/// `tensor` must be null or a live tensor handle from this surface.
#[no_mangle]
pub unsafe extern "C" fn torchscript_tensor_numel(tensor: *mut c_void) -> c_longlong {
    let Some(tensor) = borrow_tensor(tensor) else {
        record_error("tensor_numel", "null tensor handle");
        return 0;
    };
    clear_error();
    tensor.numel() as c_longlong
}

/// Release a tensor handle. No-op on null.
///
/// # Safety
///
/// `tensor` must be null or a handle from this surface that has not been
/// released yet.
#[no_mangle]
pub unsafe extern "C" fn torchscript_tensor_free(tensor: *mut c_void) {
    if tensor.is_null() {
        return;
    }
    drop(Box::from_raw(tensor as *mut Tensor));
}

/// Length in bytes of the last error message on this thread, excluding the
/// trailing null terminator. 0 when no error is recorded.
#[no_mangle]
pub extern "C" fn torchscript_last_error_length() -> usize {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map(|msg| msg.as_bytes().len())
            .unwrap_or(0)
    })
}

/// Copy the last error message into `buffer` and return the number of bytes
/// copied, excluding the null terminator. The buffer is always
/// null-terminated when anything is copied. Returns 0 when no error is
/// recorded or the buffer is unusable.
///
/// # Safety
///
/// `buffer` must be null or point to `capacity` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn torchscript_last_error_message(
    buffer: *mut c_char,
    capacity: usize,
) -> usize {
    if buffer.is_null() || capacity == 0 {
        return 0;
    }
    LAST_ERROR.with(|slot| {
        if let Some(message) = slot.borrow().as_ref() {
            let bytes = message.as_bytes();
            let to_copy = bytes.len().min(capacity.saturating_sub(1));
            ptr::copy_nonoverlapping(bytes.as_ptr() as *const c_char, buffer, to_copy);
            *buffer.add(to_copy) = 0;
            to_copy
        } else {
            0
        }
    })
}
