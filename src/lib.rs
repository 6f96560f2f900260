//! Command-line driver for the native greetings library.
//!
//! The bindings live in [`greetings_ffi`]; this crate adds logging setup and
//! the `greetings` CLI on top.

pub mod cli;
pub mod utils;

pub use greetings_ffi;
