//! Conversions between host values and the library's flat representation.
//!
//! Text is UTF-8, null-terminated, with no length field. Arrays only travel
//! native-to-host and are bounded by the count stored next to them.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::slice;

use crate::entry_points::DropStringFn;
use crate::error::{GreetingsError, Result};
use crate::records::{Greeting, RawGreeting, RawGreetingSet, RawPerson};

/// Converts host text for a call into the library. Text with an embedded nul
/// cannot be represented and is rejected up front.
pub fn to_c_text(text: &str) -> Result<CString> {
    CString::new(text).map_err(|err| GreetingsError::InteriorNul {
        position: err.nul_position(),
    })
}

/// Converts a count for a call into the library.
pub fn to_c_count(count: usize) -> Result<c_int> {
    c_int::try_from(count).map_err(|_| GreetingsError::CountOverflow { count })
}

/// Copies native text into a host string.
///
/// # Safety
///
/// `text` must be null or point at a null-terminated buffer that stays valid
/// for the duration of this call.
pub unsafe fn read_c_text(text: *const c_char, entry_point: &'static str) -> Result<String> {
    if text.is_null() {
        return Err(GreetingsError::NullPointer { entry_point });
    }
    let text = unsafe { CStr::from_ptr(text) };
    Ok(text.to_str()?.to_owned())
}

/// Copies native text and hands the buffer straight back to the library.
/// The buffer is released exactly once, whether or not the copy succeeds.
///
/// # Safety
///
/// `text` must be null or a live buffer allocated by the library that owns
/// `release`, and must not be used again after this call.
pub unsafe fn take_c_text(
    text: *mut c_char,
    release: DropStringFn,
    entry_point: &'static str,
) -> Result<String> {
    let copied = unsafe { read_c_text(text, entry_point) };
    if !text.is_null() {
        unsafe { release(text) };
    }
    copied
}

/// # Safety
///
/// `raw.text` must be null or point at a valid null-terminated buffer.
pub unsafe fn read_greeting(raw: &RawGreeting, entry_point: &'static str) -> Result<Greeting> {
    let text = unsafe { read_c_text(raw.text, entry_point) }?;
    Ok(Greeting { text })
}

/// Borrows the array of a set as a slice of exactly `count` records.
///
/// # Safety
///
/// `raw.greetings` must point at `raw.count` initialised records that stay
/// valid for `'a`.
pub unsafe fn greeting_slice<'a>(
    raw: &'a RawGreetingSet,
    entry_point: &'static str,
) -> Result<&'a [RawGreeting]> {
    let count = usize::try_from(raw.count)
        .map_err(|_| GreetingsError::InvalidCount { count: raw.count })?;
    if count == 0 {
        return Ok(&[]);
    }
    if raw.greetings.is_null() {
        return Err(GreetingsError::NullPointer { entry_point });
    }
    Ok(unsafe { slice::from_raw_parts(raw.greetings, count) })
}

/// Eagerly copies every greeting of a set, in order.
///
/// # Safety
///
/// Same requirements as [`greeting_slice`], and every element's text must be
/// a valid null-terminated buffer.
pub unsafe fn read_greeting_set(
    raw: &RawGreetingSet,
    entry_point: &'static str,
) -> Result<Vec<Greeting>> {
    let greetings = unsafe { greeting_slice(raw, entry_point) }?;
    greetings
        .iter()
        .map(|greeting| unsafe { read_greeting(greeting, entry_point) })
        .collect()
}

/// A person converted for a call. `raw()` borrows from `self`, so the text
/// outlives the call it is passed to.
pub struct CPerson {
    first_name: CString,
    last_name: CString,
}

impl CPerson {
    pub fn new(first_name: &str, last_name: &str) -> Result<Self> {
        Ok(Self {
            first_name: to_c_text(first_name)?,
            last_name: to_c_text(last_name)?,
        })
    }

    pub fn raw(&self) -> RawPerson {
        RawPerson {
            first_name: self.first_name.as_ptr(),
            last_name: self.last_name.as_ptr(),
        }
    }
}
