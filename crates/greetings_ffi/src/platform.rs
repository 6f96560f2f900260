//! Platform naming used when locating the native library.

use std::env::consts::{ARCH, DLL_PREFIX, DLL_SUFFIX, OS};

use crate::error::{GreetingsError, Result};

/// Name of the per-platform subdirectory a packaged library lives in, e.g.
/// `linux-x86-64` or `darwin`.
pub fn platform_dir() -> Result<&'static str> {
    platform_dir_for(OS, ARCH)
}

pub(crate) fn platform_dir_for(os: &'static str, arch: &'static str) -> Result<&'static str> {
    let dir = match (os, arch) {
        ("macos", _) => "darwin",
        ("linux", "x86_64") => "linux-x86-64",
        ("linux", "x86") => "linux-x86",
        ("linux", "aarch64") => "linux-aarch64",
        ("windows", "x86_64") => "win32-x86-64",
        ("windows", "x86") => "win32-x86",
        ("windows", "aarch64") => "win32-aarch64",
        _ => return Err(GreetingsError::UnsupportedPlatform { os, arch }),
    };
    Ok(dir)
}

/// File name of a library called `name` on this platform.
pub fn library_file_name(name: &str) -> String {
    format!("{DLL_PREFIX}{name}{DLL_SUFFIX}")
}
