use std::os::raw::c_int;
use std::path::PathBuf;
use std::str::Utf8Error;

use thiserror::Error;

/// Error type accepted from callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = GreetingsError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum GreetingsError {
    #[error("unsupported platform `{os}` on `{arch}`")]
    UnsupportedPlatform {
        os: &'static str,
        arch: &'static str,
    },

    #[error("native library `{name}` not found (tried {})", .tried.join(", "))]
    LibraryNotFound { name: String, tried: Vec<String> },

    #[error("failed to load native library `{}`", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("entry point `{symbol}` not found in `{}`", .path.display())]
    MissingEntryPoint {
        symbol: &'static str,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("native library is unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("native library already loaded; configuration must be installed before first use")]
    AlreadyConfigured,

    #[error("text contains a nul byte at offset {position}")]
    InteriorNul { position: usize },

    #[error("native code returned text that is not valid UTF-8")]
    InvalidText(#[from] Utf8Error),

    #[error("`{entry_point}` returned a null pointer")]
    NullPointer { entry_point: &'static str },

    #[error("greeting set reports a negative count ({count})")]
    InvalidCount { count: c_int },

    #[error("count {count} does not fit in a C int")]
    CountOverflow { count: usize },

    #[error("callback failed")]
    Callback {
        #[source]
        source: BoxError,
    },

    #[error("callback panicked: {message}")]
    CallbackPanicked { message: String },

    #[error("failed to read loader configuration `{}`", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "toml-config")]
    #[error("failed to parse loader configuration")]
    ConfigParse(#[from] toml::de::Error),
}

/// Renders an error together with its source chain on one line.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}
