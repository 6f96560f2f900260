use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[cfg(feature = "toml-config")]
use crate::error::{GreetingsError, Result};

/// Logical name of the native library.
pub const DEFAULT_LIBRARY_NAME: &str = "greetings_native";

/// Exact path of the library file; bypasses the search.
pub const LIBRARY_PATH_ENV: &str = "GREETINGS_LIBRARY";

/// Extra search directories, separated like `PATH`.
pub const LIBRARY_DIR_ENV: &str = "GREETINGS_LIBRARY_DIR";

/// Where and under which name to look for the native library.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub library_name: String,
    pub library_path: Option<PathBuf>,
    pub search_dirs: Vec<PathBuf>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            library_name: DEFAULT_LIBRARY_NAME.to_string(),
            library_path: None,
            search_dirs: Vec::new(),
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `GREETINGS_LIBRARY` and `GREETINGS_LIBRARY_DIR`.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(
            env::var_os(LIBRARY_PATH_ENV).map(PathBuf::from),
            env::var_os(LIBRARY_DIR_ENV),
        )
    }

    fn with_env_overrides(
        mut self,
        library_path: Option<PathBuf>,
        search_dirs: Option<std::ffi::OsString>,
    ) -> Self {
        if let Some(path) = library_path.filter(|path| !path.as_os_str().is_empty()) {
            self.library_path = Some(path);
        }
        if let Some(dirs) = search_dirs {
            self.search_dirs
                .extend(env::split_paths(&dirs).filter(|dir| !dir.as_os_str().is_empty()));
        }
        self
    }

    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    #[cfg(feature = "toml-config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| GreetingsError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn with_library_name(mut self, name: impl Into<String>) -> Self {
        self.library_name = name.into();
        self
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    pub fn library_path(&self) -> Option<&Path> {
        self.library_path.as_deref()
    }
}
