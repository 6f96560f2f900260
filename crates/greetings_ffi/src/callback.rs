//! Bridge for host callbacks invoked by native code.
//!
//! The callback ABI carries no user data, so the bridge parks the host
//! handler in a thread-local slot for the duration of the outer native call
//! and hands the library a plain trampoline. The library invokes callbacks
//! synchronously on the calling thread, which is what makes the slot
//! reachable from the trampoline.
//!
//! Nothing may unwind into native code: the trampoline catches panics and
//! errors, records the first one, skips the handler for the rest of the call,
//! and the failure is returned once the native call is back.

use std::any::Any;
use std::cell::Cell;
use std::ffi::c_void;
use std::os::raw::c_char;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::warn;

use crate::error::{BoxError, GreetingsError, Result};
use crate::records::RawGreetingSet;

#[derive(Clone, Copy)]
struct ActiveHandler {
    frame: *mut c_void,
    dispatch: unsafe fn(*mut c_void, *const c_void),
}

thread_local! {
    static ACTIVE: Cell<Option<ActiveHandler>> = const { Cell::new(None) };
}

struct Frame<H> {
    handler: H,
    failure: Option<GreetingsError>,
}

/// Puts the previously active handler back, also when the native call
/// unwinds.
struct RestoreActive(Option<ActiveHandler>);

impl Drop for RestoreActive {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.set(self.0));
    }
}

/// Runs `call` with `handler` installed as the target of this thread's
/// trampolines.
///
/// `handler` receives the raw pointer the library passed to the trampoline.
/// The first error or panic it produces becomes the result of this function;
/// otherwise the value of `call` is returned.
pub(crate) fn with_handler<H, R>(handler: H, call: impl FnOnce() -> R) -> Result<R>
where
    H: FnMut(*const c_void) -> Result<(), BoxError>,
{
    let mut frame = Frame {
        handler,
        failure: None,
    };
    let installed = ActiveHandler {
        frame: (&mut frame as *mut Frame<H>).cast(),
        dispatch: dispatch::<H>,
    };

    let previous = ACTIVE.with(|active| active.replace(Some(installed)));
    let restore = RestoreActive(previous);
    let value = call();
    drop(restore);

    match frame.failure.take() {
        Some(failure) => Err(failure),
        None => Ok(value),
    }
}

unsafe fn dispatch<H>(frame: *mut c_void, payload: *const c_void)
where
    H: FnMut(*const c_void) -> Result<(), BoxError>,
{
    let frame = unsafe { &mut *frame.cast::<Frame<H>>() };
    if frame.failure.is_some() {
        return;
    }
    let handler = &mut frame.handler;
    frame.failure = match catch_unwind(AssertUnwindSafe(|| handler(payload))) {
        Ok(Ok(())) => None,
        Ok(Err(source)) => Some(GreetingsError::Callback { source }),
        Err(panic) => Some(GreetingsError::CallbackPanicked {
            message: panic_message(panic.as_ref()),
        }),
    };
}

fn invoke_active(payload: *const c_void) {
    match ACTIVE.with(Cell::get) {
        Some(active) => unsafe { (active.dispatch)(active.frame, payload) },
        None => warn!("native callback arrived with no active handler on this thread; ignored"),
    }
}

/// Passed to entry points taking a text callback.
pub(crate) extern "C" fn text_trampoline(text: *const c_char) {
    invoke_active(text.cast());
}

/// Passed to entry points taking a greeting set callback.
pub(crate) extern "C" fn greeting_set_trampoline(set: *const RawGreetingSet) {
    invoke_active(set.cast());
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
