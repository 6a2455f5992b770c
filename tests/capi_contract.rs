//! Contract tests for the flat C ABI.
//!
//! Every operation must collapse failures to its null/zero sentinel without
//! crashing the process. Releasing the same non-null handle twice is out of
//! contract (undefined behavior), so no test exercises it; the hazard is
//! documented here instead of asserted.

use std::os::raw::{c_char, c_longlong};
use std::ptr;
use std::slice;

use torchscript_rs::capi::{
    torchscript_last_error_length, torchscript_last_error_message, torchscript_module_forward,
    torchscript_module_free, torchscript_module_load, torchscript_tensor_data_f32,
    torchscript_tensor_data_i64, torchscript_tensor_free, torchscript_tensor_from_f32,
    torchscript_tensor_from_f32_truncated, torchscript_tensor_numel,
};

#[test]
fn free_on_null_is_a_no_op() {
    unsafe {
        torchscript_module_free(ptr::null_mut());
        torchscript_tensor_free(ptr::null_mut());
    }
}

#[test]
fn null_inputs_collapse_to_sentinels() {
    unsafe {
        assert!(torchscript_module_load(ptr::null(), 0).is_null());
        assert!(
            torchscript_module_forward(ptr::null_mut(), ptr::null_mut(), ptr::null_mut())
                .is_null()
        );
        assert!(torchscript_tensor_data_f32(ptr::null_mut()).is_null());
        assert!(torchscript_tensor_data_i64(ptr::null_mut()).is_null());
        assert_eq!(torchscript_tensor_numel(ptr::null_mut()), 0);
        assert!(torchscript_tensor_from_f32(ptr::null(), ptr::null(), 0).is_null());
    }
}

#[test]
fn failures_leave_a_readable_message() {
    unsafe {
        assert!(
            torchscript_module_forward(ptr::null_mut(), ptr::null_mut(), ptr::null_mut())
                .is_null()
        );

        let len = torchscript_last_error_length();
        assert!(len > 0, "expected a recorded error message");

        let mut buffer = vec![0u8; len + 1];
        let copied =
            torchscript_last_error_message(buffer.as_mut_ptr() as *mut c_char, buffer.len());
        assert_eq!(copied, len);
        assert_eq!(buffer[len], 0, "message must be null-terminated");

        let message = std::str::from_utf8(&buffer[..len]).expect("message must be UTF-8");
        assert!(message.contains("null module handle"), "got: {message}");
    }
}

#[test]
fn garbage_model_buffer_returns_null() {
    let junk = b"definitely not a torchscript archive";
    unsafe {
        let module =
            torchscript_module_load(junk.as_ptr() as *const c_char, junk.len() as c_longlong);
        assert!(module.is_null());
        assert!(torchscript_last_error_length() > 0);
    }
}

#[test]
fn element_count_matches_shape_product() {
    let data: Vec<f32> = (0..6).map(|v| v as f32).collect();
    let dims = [2i64, 3];

    unsafe {
        let tensor = torchscript_tensor_from_f32(data.as_ptr(), dims.as_ptr(), 2);
        assert!(!tensor.is_null());
        assert_eq!(torchscript_tensor_numel(tensor), 6);

        let out = torchscript_tensor_data_f32(tensor);
        assert!(!out.is_null());
        assert_eq!(slice::from_raw_parts(out, 6), data.as_slice());

        torchscript_tensor_free(tensor);
    }
}

#[test]
fn integer_tensors_truncate_toward_zero() {
    let data = [3.9f32, -3.9, 0.5, -0.5];
    let dims = [4i64];

    unsafe {
        let tensor = torchscript_tensor_from_f32_truncated(data.as_ptr(), dims.as_ptr(), 1);
        assert!(!tensor.is_null());
        assert_eq!(torchscript_tensor_numel(tensor), 4);

        let out = torchscript_tensor_data_i64(tensor);
        assert!(!out.is_null());
        assert_eq!(slice::from_raw_parts(out, 4), &[3, -3, 0, 0]);

        torchscript_tensor_free(tensor);
    }
}

#[test]
fn data_pointer_refuses_a_mismatched_element_type() {
    let data = [1.0f32, 2.0];
    let dims = [2i64];

    unsafe {
        let float_tensor = torchscript_tensor_from_f32(data.as_ptr(), dims.as_ptr(), 1);
        assert!(!float_tensor.is_null());
        assert!(torchscript_tensor_data_i64(float_tensor).is_null());

        let int_tensor = torchscript_tensor_from_f32_truncated(data.as_ptr(), dims.as_ptr(), 1);
        assert!(!int_tensor.is_null());
        assert!(torchscript_tensor_data_f32(int_tensor).is_null());

        torchscript_tensor_free(float_tensor);
        torchscript_tensor_free(int_tensor);
    }
}

#[test]
fn negative_dimension_is_rejected() {
    let data = [1.0f32, 2.0];
    let dims = [-2i64];

    unsafe {
        assert!(torchscript_tensor_from_f32(data.as_ptr(), dims.as_ptr(), 1).is_null());
        assert!(torchscript_last_error_length() > 0);
    }
}

#[test]
fn zero_width_tensors_are_valid() {
    let data: [f32; 0] = [];
    let dims = [4i64, 0];

    unsafe {
        let tensor = torchscript_tensor_from_f32(data.as_ptr(), dims.as_ptr(), 2);
        assert!(!tensor.is_null());
        assert_eq!(torchscript_tensor_numel(tensor), 0);
        torchscript_tensor_free(tensor);
    }
}
