//! The native library's exported functions as typed function pointers.

use std::os::raw::{c_char, c_int};

use tracing::debug;

use crate::error::Result;
use crate::library::NativeLibrary;
use crate::records::{RawGreeting, RawGreetingSet, RawPerson};

/// Host function the library calls with text it owns.
pub type TextCallback = extern "C" fn(*const c_char);

/// Host function the library calls with a set it owns.
pub type GreetingSetCallback = extern "C" fn(*const RawGreetingSet);

pub type PrintGreetingFn = unsafe extern "C" fn(*const c_char);
pub type RenderGreetingFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
pub type GreetFn = unsafe extern "C" fn(*const RawPerson) -> *mut c_char;
pub type GetGreetingByValueFn = unsafe extern "C" fn() -> RawGreeting;
pub type GetGreetingByReferenceFn = unsafe extern "C" fn() -> *mut RawGreeting;
pub type RenderGreetingsFn = unsafe extern "C" fn() -> *mut RawGreetingSet;
pub type RenderGreetingsInParallelFn =
    unsafe extern "C" fn(c_int, *const c_char) -> *mut RawGreetingSet;
pub type CallMeBackFn = unsafe extern "C" fn(Option<TextCallback>);
pub type SendGreetingsFn = unsafe extern "C" fn(Option<GreetingSetCallback>);
pub type DropGreetingFn = unsafe extern "C" fn(*mut RawGreeting);
pub type DropGreetingSetFn = unsafe extern "C" fn(*mut RawGreetingSet);
pub type DropStringFn = unsafe extern "C" fn(*mut c_char);

pub mod symbols {
    pub const PRINT_GREETING: &str = "print_greeting";
    pub const RENDER_GREETING: &str = "render_greeting";
    pub const GREET: &str = "greet";
    pub const GET_GREETING_BY_VALUE: &str = "get_greeting_by_value";
    pub const GET_GREETING_BY_REFERENCE: &str = "get_greeting_by_reference";
    pub const RENDER_GREETINGS: &str = "render_greetings";
    pub const RENDER_GREETINGS_IN_PARALLEL: &str = "render_greetings_in_parallel";
    pub const CALL_ME_BACK: &str = "call_me_back";
    pub const SEND_GREETINGS: &str = "send_greetings";
    pub const DROP_GREETING: &str = "drop_greeting";
    pub const DROP_GREETING_SET: &str = "drop_greeting_set";
    pub const DROP_STRING: &str = "drop_string";

    pub const ALL: [&str; 12] = [
        PRINT_GREETING,
        RENDER_GREETING,
        GREET,
        GET_GREETING_BY_VALUE,
        GET_GREETING_BY_REFERENCE,
        RENDER_GREETINGS,
        RENDER_GREETINGS_IN_PARALLEL,
        CALL_ME_BACK,
        SEND_GREETINGS,
        DROP_GREETING,
        DROP_GREETING_SET,
        DROP_STRING,
    ];
}

/// Every entry point the bindings call. Resolved once, all-or-nothing.
#[derive(Debug, Clone, Copy)]
pub struct EntryPoints {
    pub print_greeting: PrintGreetingFn,
    pub render_greeting: RenderGreetingFn,
    pub greet: GreetFn,
    pub get_greeting_by_value: GetGreetingByValueFn,
    pub get_greeting_by_reference: GetGreetingByReferenceFn,
    pub render_greetings: RenderGreetingsFn,
    pub render_greetings_in_parallel: RenderGreetingsInParallelFn,
    pub call_me_back: CallMeBackFn,
    pub send_greetings: SendGreetingsFn,
    pub drop_greeting: DropGreetingFn,
    pub drop_greeting_set: DropGreetingSetFn,
    pub drop_string: DropStringFn,
}

impl EntryPoints {
    /// Resolves every entry point from `library`. A missing symbol fails the
    /// whole resolution.
    ///
    /// # Safety
    ///
    /// `library` must export these symbols with exactly the signatures above,
    /// and must stay loaded for as long as the returned table is used.
    pub unsafe fn resolve(library: &NativeLibrary) -> Result<Self> {
        let entry_points = unsafe {
            Self {
                print_greeting: library.entry_point(symbols::PRINT_GREETING)?,
                render_greeting: library.entry_point(symbols::RENDER_GREETING)?,
                greet: library.entry_point(symbols::GREET)?,
                get_greeting_by_value: library.entry_point(symbols::GET_GREETING_BY_VALUE)?,
                get_greeting_by_reference: library
                    .entry_point(symbols::GET_GREETING_BY_REFERENCE)?,
                render_greetings: library.entry_point(symbols::RENDER_GREETINGS)?,
                render_greetings_in_parallel: library
                    .entry_point(symbols::RENDER_GREETINGS_IN_PARALLEL)?,
                call_me_back: library.entry_point(symbols::CALL_ME_BACK)?,
                send_greetings: library.entry_point(symbols::SEND_GREETINGS)?,
                drop_greeting: library.entry_point(symbols::DROP_GREETING)?,
                drop_greeting_set: library.entry_point(symbols::DROP_GREETING_SET)?,
                drop_string: library.entry_point(symbols::DROP_STRING)?,
            }
        };
        debug!(
            library = %library.path().display(),
            count = symbols::ALL.len(),
            "entry points resolved"
        );
        Ok(entry_points)
    }
}
