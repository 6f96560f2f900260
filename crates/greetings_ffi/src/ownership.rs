//! Handles for records the native library owns.
//!
//! A native-owned record is `Live` from the moment an entry point returns it
//! until its release entry point runs, then `Released` for good. The handle
//! drives that transition exactly once: [`NativeOwned::release`] consumes the
//! handle, and dropping a live handle releases it, so every exit path out of
//! the owning scope frees the record and nothing can touch it afterwards.
//!
//! Releasing the same record twice is a double free inside the library. The
//! handles make that unrepresentable for records they own; raw pointers
//! obtained some other way carry no such protection. Handles are neither
//! `Send` nor `Sync`: one owner, one thread, one release.

use std::fmt;
use std::os::raw::c_int;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::{GreetingsError, Result};
use crate::marshal::{greeting_slice, read_c_text, read_greeting, read_greeting_set};
use crate::records::{Greeting, RawGreeting, RawGreetingSet};

/// `Released` is only ever seen inside the release path: `release` consumes
/// the handle and `Drop` runs last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseState {
    Live,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Greeting,
    GreetingSet,
    Text,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Greeting => "greeting",
            Self::GreetingSet => "greeting set",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// Acquire/release counters for native-owned records.
#[derive(Debug, Default)]
pub struct ReleaseMetrics {
    greetings_acquired: AtomicU64,
    greetings_released: AtomicU64,
    sets_acquired: AtomicU64,
    sets_released: AtomicU64,
    texts_acquired: AtomicU64,
    texts_released: AtomicU64,
}

impl ReleaseMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, kind: RecordKind) -> (&AtomicU64, &AtomicU64) {
        match kind {
            RecordKind::Greeting => (&self.greetings_acquired, &self.greetings_released),
            RecordKind::GreetingSet => (&self.sets_acquired, &self.sets_released),
            RecordKind::Text => (&self.texts_acquired, &self.texts_released),
        }
    }

    pub fn record_acquire(&self, kind: RecordKind) {
        self.counters(kind).0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_release(&self, kind: RecordKind) {
        self.counters(kind).1.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ReleaseSnapshot {
        ReleaseSnapshot {
            greetings_acquired: self.greetings_acquired.load(Ordering::Relaxed),
            greetings_released: self.greetings_released.load(Ordering::Relaxed),
            sets_acquired: self.sets_acquired.load(Ordering::Relaxed),
            sets_released: self.sets_released.load(Ordering::Relaxed),
            texts_acquired: self.texts_acquired.load(Ordering::Relaxed),
            texts_released: self.texts_released.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSnapshot {
    pub greetings_acquired: u64,
    pub greetings_released: u64,
    pub sets_acquired: u64,
    pub sets_released: u64,
    pub texts_acquired: u64,
    pub texts_released: u64,
}

impl ReleaseSnapshot {
    /// Records acquired but not yet released.
    pub fn outstanding(&self) -> u64 {
        let acquired = self.greetings_acquired + self.sets_acquired + self.texts_acquired;
        let released = self.greetings_released + self.sets_released + self.texts_released;
        acquired.saturating_sub(released)
    }

    /// Every acquired record was released exactly once.
    pub fn is_balanced(&self) -> bool {
        self.greetings_acquired == self.greetings_released
            && self.sets_acquired == self.sets_released
            && self.texts_acquired == self.texts_released
    }
}

/// A record owned by the native library, released through `release`.
pub struct NativeOwned<'lib, R> {
    ptr: NonNull<R>,
    state: ReleaseState,
    release: unsafe extern "C" fn(*mut R),
    kind: RecordKind,
    entry_point: &'static str,
    metrics: &'lib ReleaseMetrics,
}

/// A greeting returned by reference.
pub type GreetingRef<'lib> = NativeOwned<'lib, RawGreeting>;

/// A greeting set returned by reference.
pub type GreetingSetRef<'lib> = NativeOwned<'lib, RawGreetingSet>;

impl<'lib, R> NativeOwned<'lib, R> {
    /// Takes ownership of a record returned by `entry_point`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live record that `release` frees, and nothing
    /// else may release it.
    pub(crate) unsafe fn adopt(
        ptr: *mut R,
        release: unsafe extern "C" fn(*mut R),
        kind: RecordKind,
        entry_point: &'static str,
        metrics: &'lib ReleaseMetrics,
    ) -> Result<Self> {
        let ptr = NonNull::new(ptr).ok_or(GreetingsError::NullPointer { entry_point })?;
        metrics.record_acquire(kind);
        Ok(Self {
            ptr,
            state: ReleaseState::Live,
            release,
            kind,
            entry_point,
            metrics,
        })
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Returns the record to the library. The handle is gone afterwards.
    pub fn release(mut self) {
        self.release_once();
    }

    fn raw(&self) -> &R {
        // Live for as long as anyone outside can reach `self`.
        unsafe { self.ptr.as_ref() }
    }

    fn release_once(&mut self) {
        if self.state == ReleaseState::Released {
            return;
        }
        // Marked before the call so nothing reads the record once the library
        // starts freeing it.
        self.state = ReleaseState::Released;
        self.metrics.record_release(self.kind);
        unsafe { (self.release)(self.ptr.as_ptr()) };
        debug!(kind = %self.kind, "native record released");
    }
}

impl<R> Drop for NativeOwned<'_, R> {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl<R> fmt::Debug for NativeOwned<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeOwned")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("ptr", &self.ptr)
            .finish()
    }
}

impl NativeOwned<'_, RawGreeting> {
    pub fn text(&self) -> Result<String> {
        unsafe { read_c_text(self.raw().text, self.entry_point) }
    }

    /// Copies the greeting into a host-owned value.
    pub fn to_greeting(&self) -> Result<Greeting> {
        unsafe { read_greeting(self.raw(), self.entry_point) }
    }
}

impl NativeOwned<'_, RawGreetingSet> {
    /// Borrowed view, valid as long as this handle.
    pub fn view(&self) -> GreetingSetView<'_> {
        GreetingSetView {
            raw: self.raw(),
            entry_point: self.entry_point,
        }
    }

    pub fn len(&self) -> Result<usize> {
        self.view().len()
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.view().is_empty()
    }

    pub fn greetings(&self) -> Result<Vec<Greeting>> {
        self.view().greetings()
    }

    pub fn texts(&self) -> Result<Vec<String>> {
        self.view().texts()
    }
}

/// A greeting set the host may read but does not own.
///
/// Views handed to callbacks are valid for a single invocation only; the
/// library may free the set as soon as the callback returns. Copy out what
/// is needed with [`GreetingSetView::greetings`] or
/// [`GreetingSetView::texts`].
#[derive(Debug, Clone, Copy)]
pub struct GreetingSetView<'a> {
    raw: &'a RawGreetingSet,
    entry_point: &'static str,
}

impl<'a> GreetingSetView<'a> {
    /// # Safety
    ///
    /// `raw` must be a well-formed set that stays valid for `'a`.
    pub(crate) unsafe fn new(raw: &'a RawGreetingSet, entry_point: &'static str) -> Self {
        Self { raw, entry_point }
    }

    pub fn count(&self) -> c_int {
        self.raw.count
    }

    pub fn len(&self) -> Result<usize> {
        usize::try_from(self.raw.count).map_err(|_| GreetingsError::InvalidCount {
            count: self.raw.count,
        })
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copies every greeting, in order.
    pub fn greetings(&self) -> Result<Vec<Greeting>> {
        unsafe { read_greeting_set(self.raw, self.entry_point) }
    }

    pub fn texts(&self) -> Result<Vec<String>> {
        let greetings = unsafe { greeting_slice(self.raw, self.entry_point) }?;
        greetings
            .iter()
            .map(|greeting| unsafe { read_c_text(greeting.text, self.entry_point) })
            .collect()
    }
}
