//! Safe bindings to the native greetings library.
//!
//! The library is loaded at run time by logical name and talks in flat C
//! records. This crate owns the host half of that contract:
//!
//! - [`records`]: record layouts, matched to the library by field order only
//! - [`library`], [`platform`], [`config`]: finding and opening the library
//! - [`marshal`]: text and array conversion
//! - `callback`: native-to-host callbacks, with errors deferred past the
//!   native frame
//! - [`ownership`]: handles that release native records exactly once
//!
//! ```no_run
//! use greetings_ffi::{Greetings, Person};
//!
//! # fn main() -> greetings_ffi::Result<()> {
//! let greetings = Greetings::global()?;
//! assert_eq!(greetings.render_greeting("World")?, "Hello, World!");
//! assert_eq!(greetings.greet(&Person::new("John", "Smith"))?, "Hello, John Smith!");
//!
//! let set = greetings.render_greetings()?;
//! assert_eq!(set.texts()?, ["Hello!", "Hello again!"]);
//! set.release();
//! # Ok(())
//! # }
//! ```

pub mod api;
mod callback;
pub mod config;
pub mod entry_points;
pub mod error;
pub mod library;
pub mod marshal;
pub mod ownership;
pub mod platform;
pub mod records;

pub use api::{Greetings, configure};
pub use config::{DEFAULT_LIBRARY_NAME, LoaderConfig};
pub use entry_points::EntryPoints;
pub use error::{BoxError, GreetingsError, Result};
pub use library::NativeLibrary;
pub use ownership::{
    GreetingRef, GreetingSetRef, GreetingSetView, RecordKind, ReleaseMetrics, ReleaseSnapshot,
};
pub use records::{Greeting, Person};
