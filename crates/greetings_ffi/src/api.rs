use std::ffi::c_void;
use std::mem;
use std::os::raw::c_char;
use std::path::Path;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::callback::{greeting_set_trampoline, text_trampoline, with_handler};
use crate::config::LoaderConfig;
use crate::entry_points::{EntryPoints, symbols};
use crate::error::{BoxError, GreetingsError, Result, error_chain};
use crate::library::NativeLibrary;
use crate::marshal::{CPerson, read_c_text, read_greeting, take_c_text, to_c_count, to_c_text};
use crate::ownership::{
    GreetingRef, GreetingSetRef, GreetingSetView, RecordKind, ReleaseMetrics, ReleaseSnapshot,
};
use crate::records::{Greeting, Person, RawGreetingSet};

/// Configuration slot for the global instance. Flips to `Consumed` under the
/// lock when the first load takes it; no configuration is accepted after.
#[derive(Debug)]
enum PendingConfig {
    Open(Option<LoaderConfig>),
    Consumed,
}

impl PendingConfig {
    fn install(&mut self, config: LoaderConfig) -> Result<()> {
        match self {
            Self::Open(pending) => {
                *pending = Some(config);
                Ok(())
            }
            Self::Consumed => Err(GreetingsError::AlreadyConfigured),
        }
    }

    fn consume(&mut self) -> Option<LoaderConfig> {
        match mem::replace(self, Self::Consumed) {
            Self::Open(pending) => pending,
            Self::Consumed => None,
        }
    }
}

static PENDING_CONFIG: Mutex<PendingConfig> = Mutex::new(PendingConfig::Open(None));
static GLOBAL: OnceCell<std::result::Result<Greetings, String>> = OnceCell::new();

/// Installs the configuration [`Greetings::global`] loads with. Must run
/// before the first call to `global`; afterwards it fails with
/// [`GreetingsError::AlreadyConfigured`].
pub fn configure(config: LoaderConfig) -> Result<()> {
    PENDING_CONFIG.lock().install(config)
}

/// Safe entry into the native greetings library.
///
/// Calls block until the library returns, including any callbacks it makes.
/// The bindings add no locking of their own; the library's entry points are
/// thread-safe, so a shared `Greetings` may be used from several threads.
/// Handles it returns stay on the thread that received them.
#[derive(Debug)]
pub struct Greetings {
    entry_points: EntryPoints,
    metrics: ReleaseMetrics,
    library: Option<NativeLibrary>,
}

impl Greetings {
    /// The process-wide instance, loaded on first use and never reloaded.
    ///
    /// Uses the configuration from [`configure`] if one was installed,
    /// otherwise [`LoaderConfig::from_env`]. A failed load is remembered and
    /// reported by every later call.
    pub fn global() -> Result<&'static Greetings> {
        let loaded = GLOBAL.get_or_init(|| {
            let pending = PENDING_CONFIG.lock().consume();
            let config = pending.unwrap_or_else(LoaderConfig::from_env);
            Greetings::load(&config).map_err(|err| {
                let reason = error_chain(&err);
                error!(%reason, "native greetings library failed to load");
                reason
            })
        });
        loaded.as_ref().map_err(|reason| GreetingsError::Unavailable {
            reason: reason.clone(),
        })
    }

    /// Locates, opens and resolves a private instance of the library.
    pub fn load(config: &LoaderConfig) -> Result<Self> {
        let library = NativeLibrary::locate(config)?;
        let entry_points = unsafe { EntryPoints::resolve(&library) }?;
        debug!(library = %library.path().display(), "native greetings library ready");
        Ok(Self {
            entry_points,
            metrics: ReleaseMetrics::new(),
            library: Some(library),
        })
    }

    /// Wraps entry points resolved elsewhere, e.g. from a statically linked
    /// copy of the library.
    ///
    /// # Safety
    ///
    /// Every pointer must have the documented signature and ownership
    /// behaviour, and stay callable for the lifetime of the returned value.
    pub unsafe fn from_entry_points(entry_points: EntryPoints) -> Self {
        Self {
            entry_points,
            metrics: ReleaseMetrics::new(),
            library: None,
        }
    }

    pub fn library_path(&self) -> Option<&Path> {
        self.library.as_ref().map(NativeLibrary::path)
    }

    pub fn metrics(&self) -> ReleaseSnapshot {
        self.metrics.snapshot()
    }

    pub fn print_greeting(&self, name: &str) -> Result<()> {
        let name = to_c_text(name)?;
        unsafe { (self.entry_points.print_greeting)(name.as_ptr()) };
        Ok(())
    }

    pub fn render_greeting(&self, name: &str) -> Result<String> {
        let name = to_c_text(name)?;
        let text = unsafe { (self.entry_points.render_greeting)(name.as_ptr()) };
        self.take_text(text, symbols::RENDER_GREETING)
    }

    pub fn greet(&self, person: &Person) -> Result<String> {
        let person = CPerson::new(&person.first_name, &person.last_name)?;
        let raw = person.raw();
        let text = unsafe { (self.entry_points.greet)(&raw) };
        self.take_text(text, symbols::GREET)
    }

    /// A greeting copied out by value. Nothing to release.
    pub fn greeting_by_value(&self) -> Result<Greeting> {
        let raw = unsafe { (self.entry_points.get_greeting_by_value)() };
        unsafe { read_greeting(&raw, symbols::GET_GREETING_BY_VALUE) }
    }

    pub fn greeting_by_reference(&self) -> Result<GreetingRef<'_>> {
        let raw = unsafe { (self.entry_points.get_greeting_by_reference)() };
        unsafe {
            GreetingRef::adopt(
                raw,
                self.entry_points.drop_greeting,
                RecordKind::Greeting,
                symbols::GET_GREETING_BY_REFERENCE,
                &self.metrics,
            )
        }
    }

    pub fn render_greetings(&self) -> Result<GreetingSetRef<'_>> {
        let raw = unsafe { (self.entry_points.render_greetings)() };
        unsafe { self.adopt_set(raw, symbols::RENDER_GREETINGS) }
    }

    /// `count` numbered greetings for `name`, rendered concurrently inside the
    /// library.
    pub fn render_greetings_in_parallel(
        &self,
        count: usize,
        name: &str,
    ) -> Result<GreetingSetRef<'_>> {
        let count = to_c_count(count)?;
        let name = to_c_text(name)?;
        let raw = unsafe { (self.entry_points.render_greetings_in_parallel)(count, name.as_ptr()) };
        unsafe { self.adopt_set(raw, symbols::RENDER_GREETINGS_IN_PARALLEL) }
    }

    /// Acquires a greeting, runs `f` on it and releases it on every exit
    /// path.
    pub fn with_greeting_by_reference<T>(&self, f: impl FnOnce(&GreetingRef<'_>) -> T) -> Result<T> {
        let greeting = self.greeting_by_reference()?;
        let value = f(&greeting);
        greeting.release();
        Ok(value)
    }

    /// Acquires the default greeting set, runs `f` on it and releases it on
    /// every exit path.
    pub fn with_greeting_set<T>(&self, f: impl FnOnce(&GreetingSetRef<'_>) -> T) -> Result<T> {
        let set = self.render_greetings()?;
        let value = f(&set);
        set.release();
        Ok(value)
    }

    /// Lets the library call `callback` with text it owns. The text is only
    /// valid during the invocation and is copied before `callback` sees it.
    ///
    /// The first error or panic from `callback` is returned after the library
    /// call completes; later invocations in the same call are skipped.
    pub fn call_me_back<F, E>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(&str) -> std::result::Result<(), E>,
        E: Into<BoxError>,
    {
        let handler = |payload: *const c_void| -> std::result::Result<(), BoxError> {
            let text = unsafe { read_c_text(payload.cast(), symbols::CALL_ME_BACK) }?;
            callback(&text).map_err(Into::into)
        };
        let call_me_back = self.entry_points.call_me_back;
        with_handler(handler, || unsafe { call_me_back(Some(text_trampoline)) })
    }

    /// Lets the library call `callback` with a greeting set it owns.
    ///
    /// The view is only valid during one invocation: the library frees the
    /// set as soon as `callback` returns, and the borrow checker keeps the
    /// view from escaping. Failures are deferred as for
    /// [`call_me_back`](Self::call_me_back).
    pub fn send_greetings<F, E>(&self, mut callback: F) -> Result<()>
    where
        F: FnMut(&GreetingSetView<'_>) -> std::result::Result<(), E>,
        E: Into<BoxError>,
    {
        let handler = |payload: *const c_void| -> std::result::Result<(), BoxError> {
            let raw = payload.cast::<RawGreetingSet>();
            if raw.is_null() {
                return Err(GreetingsError::NullPointer {
                    entry_point: symbols::SEND_GREETINGS,
                }
                .into());
            }
            let view = unsafe { GreetingSetView::new(&*raw, symbols::SEND_GREETINGS) };
            callback(&view).map_err(Into::into)
        };
        let send_greetings = self.entry_points.send_greetings;
        with_handler(handler, || unsafe { send_greetings(Some(greeting_set_trampoline)) })
    }

    fn take_text(&self, text: *mut c_char, entry_point: &'static str) -> Result<String> {
        if !text.is_null() {
            self.metrics.record_acquire(RecordKind::Text);
            self.metrics.record_release(RecordKind::Text);
        }
        unsafe { take_c_text(text, self.entry_points.drop_string, entry_point) }
    }

    unsafe fn adopt_set(
        &self,
        raw: *mut RawGreetingSet,
        entry_point: &'static str,
    ) -> Result<GreetingSetRef<'_>> {
        unsafe {
            GreetingSetRef::adopt(
                raw,
                self.entry_points.drop_greeting_set,
                RecordKind::GreetingSet,
                entry_point,
                &self.metrics,
            )
        }
    }
}
