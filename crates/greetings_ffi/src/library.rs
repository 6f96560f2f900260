//! Locating and opening the native library.

use std::env;
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::error::{GreetingsError, Result};
use crate::platform::{library_file_name, platform_dir};

/// An opened native library. Never unloaded while entry points resolved from
/// it are reachable.
#[derive(Debug)]
pub struct NativeLibrary {
    library: Library,
    path: PathBuf,
}

impl NativeLibrary {
    /// Opens the library file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let library = unsafe { Library::new(path) }.map_err(|source| GreetingsError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(library = %path.display(), "native library opened");
        Ok(Self {
            library,
            path: path.to_path_buf(),
        })
    }

    /// Finds and opens the library described by `config`.
    ///
    /// An explicit `library_path` is opened as-is. Otherwise every candidate
    /// from [`candidate_paths`] that exists on disk is tried in order, and the
    /// bare file name is handed to the system loader last.
    pub fn locate(config: &LoaderConfig) -> Result<Self> {
        if let Some(path) = config.library_path() {
            return Self::open(path);
        }

        let file_name = library_file_name(&config.library_name);
        let mut tried = Vec::new();
        for candidate in candidate_paths(config) {
            if !candidate.is_file() {
                tried.push(candidate.display().to_string());
                continue;
            }
            match Self::open(&candidate) {
                Ok(library) => return Ok(library),
                Err(err) => {
                    debug!(candidate = %candidate.display(), error = %err, "candidate rejected");
                    tried.push(candidate.display().to_string());
                }
            }
        }

        match unsafe { Library::new(&file_name) } {
            Ok(library) => {
                debug!(library = %file_name, "native library opened from system search path");
                Ok(Self {
                    library,
                    path: PathBuf::from(file_name),
                })
            }
            Err(err) => {
                debug!(library = %file_name, error = %err, "system loader failed");
                tried.push(file_name);
                Err(GreetingsError::LibraryNotFound {
                    name: config.library_name.clone(),
                    tried,
                })
            }
        }
    }

    /// Resolves `symbol` to a value of type `F`, normally a function pointer.
    ///
    /// # Safety
    ///
    /// `F` must match the exported item's real type, and the returned value
    /// must not be used after this library is dropped.
    pub unsafe fn entry_point<F: Copy>(&self, symbol: &'static str) -> Result<F> {
        let resolved = unsafe { self.library.get::<F>(symbol.as_bytes()) };
        resolved
            .map(|item| *item)
            .map_err(|source| GreetingsError::MissingEntryPoint {
                symbol,
                path: self.path.clone(),
                source,
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Files [`NativeLibrary::locate`] checks before falling back to the system
/// loader, in order.
pub fn candidate_paths(config: &LoaderConfig) -> Vec<PathBuf> {
    let file_name = library_file_name(&config.library_name);
    let platform = match platform_dir() {
        Ok(dir) => Some(dir),
        Err(err) => {
            debug!(error = %err, "skipping platform subdirectories");
            None
        }
    };

    let mut dirs: Vec<PathBuf> = config.search_dirs.clone();
    if let Ok(exe) = env::current_exe() {
        if let Some(exe_dir) = exe.parent() {
            dirs.push(exe_dir.to_path_buf());
            if let Some(parent) = exe_dir.parent() {
                dirs.push(parent.to_path_buf());
            }
        }
    }

    let mut candidates = Vec::with_capacity(dirs.len() * 2);
    for dir in dirs {
        if let Some(platform) = platform {
            candidates.push(dir.join(platform).join(&file_name));
        }
        candidates.push(dir.join(&file_name));
    }
    candidates
}
