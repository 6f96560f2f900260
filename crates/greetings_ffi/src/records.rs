//! Record layouts as the native library lays them out, and their host-side
//! counterparts.
//!
//! The `Raw*` structs below are matched to the library's records by field
//! order and field type alone. Names are free to differ and do. Nothing checks
//! this agreement at compile time or at run time: a field added, removed or
//! reordered on one side only shows up as corrupted data or a crash. The
//! layout tests here and the integration tests against the native crate are
//! the only guard.

use std::os::raw::{c_char, c_int};

/// Host-to-native only. The library reads it during the call and keeps no
/// reference to it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawPerson {
    pub first_name: *const c_char,
    pub last_name: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawGreeting {
    pub text: *const c_char,
}

/// `count` is the only record of how many elements `greetings` points at;
/// the array has no terminator.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawGreetingSet {
    pub greetings: *const RawGreeting,
    pub count: c_int,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
}

impl Person {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// A greeting copied out of native memory. Owned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Greeting {
    pub text: String,
}

impl Greeting {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}
