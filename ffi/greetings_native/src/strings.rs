use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

/// Hands `text` over to the caller as a null-terminated buffer.
///
/// Returns null if `text` contains a nul byte.
pub(crate) fn into_c_string(text: String) -> *mut c_char {
    CString::new(text)
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// # Safety
///
/// `text` must be null or come from [`into_c_string`] and not be freed yet.
pub(crate) unsafe fn free_c_string(text: *mut c_char) {
    if text.is_null() {
        return;
    }
    drop(CString::from_raw(text));
}

/// Copies a caller-provided string. Invalid UTF-8 is replaced, null reads as
/// `None`.
///
/// # Safety
///
/// `text` must be null or point at a null-terminated buffer.
pub(crate) unsafe fn read_c_string(text: *const c_char) -> Option<String> {
    if text.is_null() {
        return None;
    }
    Some(CStr::from_ptr(text).to_string_lossy().into_owned())
}
