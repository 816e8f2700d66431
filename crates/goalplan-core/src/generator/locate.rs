//! Locating the `ollama` executable.
//!
//! Resolution order: an explicitly configured path, then the first match
//! on `PATH`, then a fixed per-platform install location.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const EXECUTABLE: &str = "ollama.exe";
#[cfg(not(windows))]
const EXECUTABLE: &str = "ollama";

/// Resolve the model executable to launch.
///
/// Never fails: when nothing is found the default location is returned and
/// the spawn error surfaces at invocation time.
pub fn resolve_binary(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var_os("PATH")
        .and_then(|paths| find_in_paths(&paths, EXECUTABLE))
        .unwrap_or_else(default_location)
}

/// Search a `PATH`-style list for an existing file named `name`.
pub fn find_in_paths(paths: &OsStr, name: &str) -> Option<PathBuf> {
    std::env::split_paths(paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Where the official installer puts the executable.
#[cfg(windows)]
pub fn default_location() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Programs")
        .join("Ollama")
        .join(EXECUTABLE)
}

/// Where the official installer puts the executable.
#[cfg(not(windows))]
pub fn default_location() -> PathBuf {
    PathBuf::from("/usr/local/bin").join(EXECUTABLE)
}
