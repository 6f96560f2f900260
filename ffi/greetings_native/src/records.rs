//! Records shared with callers across the C ABI.
//!
//! Callers map these by field order and field type only. Reordering a field
//! or changing its type here breaks every binding silently.

use std::os::raw::{c_char, c_int};
use std::ptr;

use tracing::debug;

use crate::strings::{free_c_string, into_c_string};

/// Passed in by the caller. The library reads it and never frees it.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Person {
    pub first_name: *const c_char,
    pub last_name: *const c_char,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Greeting {
    pub text: *const c_char,
}

/// A contiguous array of greetings. `number_of_greetings` is the only record
/// of the array's extent.
#[repr(C)]
#[derive(Debug)]
pub struct GreetingSet {
    pub greetings: *mut Greeting,
    pub number_of_greetings: c_int,
}

impl Greeting {
    /// Allocates the text with the library's allocator.
    pub(crate) fn allocate(text: String) -> Self {
        Self {
            text: into_c_string(text),
        }
    }

    /// Frees text produced by [`Greeting::allocate`].
    ///
    /// # Safety
    ///
    /// The text must come from `allocate` and must not have been freed yet.
    pub(crate) unsafe fn free_text(&mut self) {
        free_c_string(self.text as *mut c_char);
        self.text = ptr::null();
    }
}

impl GreetingSet {
    pub(crate) fn allocate(texts: Vec<String>) -> *mut GreetingSet {
        let greetings: Box<[Greeting]> = texts.into_iter().map(Greeting::allocate).collect();
        let count = greetings.len();
        let set = GreetingSet {
            greetings: Box::into_raw(greetings) as *mut Greeting,
            number_of_greetings: count as c_int,
        };
        debug!(count, "greeting set allocated");
        Box::into_raw(Box::new(set))
    }

    /// Frees the set, its array, and the text of every element.
    ///
    /// # Safety
    ///
    /// `set` must come from [`GreetingSet::allocate`] and must not have been
    /// freed yet.
    pub(crate) unsafe fn free(set: *mut GreetingSet) {
        let set = Box::from_raw(set);
        let count = set.number_of_greetings.max(0) as usize;
        let slice = ptr::slice_from_raw_parts_mut(set.greetings, count);
        let mut greetings = Box::from_raw(slice);
        for greeting in greetings.iter_mut() {
            greeting.free_text();
        }
        debug!(count, "greeting set freed");
    }
}
