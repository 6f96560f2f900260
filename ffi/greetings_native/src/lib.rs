//! Native greetings library.
//!
//! Every function here is exported unmangled with the C calling convention and
//! is meant to be loaded dynamically by name. The entry points keep no shared
//! mutable state, so they are re-entrant and may be called from any thread.
//!
//! # Ownership
//!
//! | Entry point | Caller obligation |
//! |---|---|
//! | `render_greeting`, `greet` | free the returned text with `drop_string` |
//! | `get_greeting_by_value` | none, the text is static |
//! | `get_greeting_by_reference` | call `drop_greeting` exactly once |
//! | `render_greetings`, `render_greetings_in_parallel` | call `drop_greeting_set` exactly once |
//! | `call_me_back`, `send_greetings` | none, arguments are only valid during the callback |

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::ptr;

use rayon::prelude::*;
use tracing::debug;

mod records;
mod strings;

pub use records::{Greeting, GreetingSet, Person};

use strings::{free_c_string, into_c_string, read_c_string};

/// Callback receiving text owned by the library.
pub type GreetingCallback = extern "C" fn(*const c_char);

/// Callback receiving a set owned by the library.
pub type GreetingSetCallback = extern "C" fn(*const GreetingSet);

const HELLO_FROM_RUST: &CStr = c"Hello from Rust!";

fn render(name: &str) -> String {
    format!("Hello, {name}!")
}

fn default_greetings() -> Vec<String> {
    vec!["Hello!".to_string(), "Hello again!".to_string()]
}

/// Prints a greeting for `name` to stdout.
#[no_mangle]
pub extern "C" fn print_greeting(name: *const c_char) {
    if let Some(name) = unsafe { read_c_string(name) } {
        println!("{}", render(&name));
    }
}

/// Returns a greeting for `name`. Free the result with [`drop_string`].
#[no_mangle]
pub extern "C" fn render_greeting(name: *const c_char) -> *mut c_char {
    match unsafe { read_c_string(name) } {
        Some(name) => into_c_string(render(&name)),
        None => ptr::null_mut(),
    }
}

/// Greets a person by full name. Free the result with [`drop_string`].
#[no_mangle]
pub extern "C" fn greet(person: *const Person) -> *mut c_char {
    if person.is_null() {
        return ptr::null_mut();
    }
    let person = unsafe { &*person };
    let first_name = unsafe { read_c_string(person.first_name) };
    let last_name = unsafe { read_c_string(person.last_name) };
    match (first_name, last_name) {
        (Some(first), Some(last)) => into_c_string(render(&format!("{first} {last}"))),
        _ => ptr::null_mut(),
    }
}

#[no_mangle]
pub extern "C" fn get_greeting_by_value() -> Greeting {
    Greeting {
        text: HELLO_FROM_RUST.as_ptr(),
    }
}

/// Release with [`drop_greeting`].
#[no_mangle]
pub extern "C" fn get_greeting_by_reference() -> *mut Greeting {
    let greeting = Greeting::allocate("Hello from Rust!".to_string());
    debug!("greeting allocated");
    Box::into_raw(Box::new(greeting))
}

/// Release with [`drop_greeting_set`].
#[no_mangle]
pub extern "C" fn render_greetings() -> *mut GreetingSet {
    GreetingSet::allocate(default_greetings())
}

/// Renders `count` numbered greetings for `name` on the rayon pool.
///
/// Release with [`drop_greeting_set`].
#[no_mangle]
pub extern "C" fn render_greetings_in_parallel(count: c_int, name: *const c_char) -> *mut GreetingSet {
    let Some(name) = (unsafe { read_c_string(name) }) else {
        return ptr::null_mut();
    };
    let texts: Vec<String> = (1..=count)
        .into_par_iter()
        .map(|number| format!("Greeting number {number} for {name}"))
        .collect();
    GreetingSet::allocate(texts)
}

#[no_mangle]
pub extern "C" fn call_me_back(callback: Option<GreetingCallback>) {
    let Some(callback) = callback else {
        return;
    };
    let text = into_c_string("Hello there!".to_string());
    callback(text);
    unsafe { free_c_string(text) };
}

/// Hands a fresh set to `callback` and frees it once the callback returns.
#[no_mangle]
pub extern "C" fn send_greetings(callback: Option<GreetingSetCallback>) {
    let Some(callback) = callback else {
        return;
    };
    let set = GreetingSet::allocate(default_greetings());
    callback(set);
    unsafe { GreetingSet::free(set) };
}

/// Frees a greeting from [`get_greeting_by_reference`]. Null is ignored.
///
/// Calling this twice for the same greeting is a double free.
#[no_mangle]
pub extern "C" fn drop_greeting(greeting: *mut Greeting) {
    if greeting.is_null() {
        return;
    }
    let mut greeting = unsafe { Box::from_raw(greeting) };
    unsafe { greeting.free_text() };
    debug!("greeting freed");
}

/// Frees a set and everything it points at. Null is ignored.
///
/// Elements of the set must never be passed to [`drop_greeting`].
#[no_mangle]
pub extern "C" fn drop_greeting_set(set: *mut GreetingSet) {
    if set.is_null() {
        return;
    }
    unsafe { GreetingSet::free(set) };
}

/// Frees text from [`render_greeting`] or [`greet`]. Null is ignored.
#[no_mangle]
pub extern "C" fn drop_string(text: *mut c_char) {
    unsafe { free_c_string(text) };
}
