#![allow(dead_code)]

use std::ffi::c_void;
use std::mem::transmute;
use std::path::PathBuf;

use greetings_ffi::library::candidate_paths;
use greetings_ffi::{EntryPoints, Greetings, LoaderConfig};

/// Erases an exported function to an untyped address and back, the way a
/// dynamic loader hands symbols out.
macro_rules! erased {
    ($function:path) => {
        transmute::<*const c_void, _>($function as *const c_void)
    };
}

/// Bindings over the statically linked copy of the native crate.
pub fn linked() -> Greetings {
    let entry_points = unsafe {
        EntryPoints {
            print_greeting: erased!(greetings_native::print_greeting),
            render_greeting: erased!(greetings_native::render_greeting),
            greet: erased!(greetings_native::greet),
            get_greeting_by_value: erased!(greetings_native::get_greeting_by_value),
            get_greeting_by_reference: erased!(greetings_native::get_greeting_by_reference),
            render_greetings: erased!(greetings_native::render_greetings),
            render_greetings_in_parallel: erased!(greetings_native::render_greetings_in_parallel),
            call_me_back: erased!(greetings_native::call_me_back),
            send_greetings: erased!(greetings_native::send_greetings),
            drop_greeting: erased!(greetings_native::drop_greeting),
            drop_greeting_set: erased!(greetings_native::drop_greeting_set),
            drop_string: erased!(greetings_native::drop_string),
        }
    };
    unsafe { Greetings::from_entry_points(entry_points) }
}

/// The `cdylib` cargo built next to the test executable, if there is one.
pub fn built_library() -> Option<PathBuf> {
    candidate_paths(&LoaderConfig::default())
        .into_iter()
        .find(|candidate| candidate.is_file())
}
