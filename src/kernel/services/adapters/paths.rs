//! Platform directories.
//!
//! | kind  | Linux                                 | macOS                         | Windows          |
//! |-------|---------------------------------------|-------------------------------|------------------|
//! | data  | `$XDG_DATA_HOME` or `~/.local/share`  | `~/Library/Application Support` | `%APPDATA%`    |
//! | cache | `$XDG_CACHE_HOME` or `~/.cache`       | `~/Library/Caches`            | `%LOCALAPPDATA%` |

use std::path::PathBuf;

const APP_NAME: &str = "notedesk";
const DATA_DIR: &str = "data";
const LOG_DIR: &str = "logs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseDir {
    Data,
    Cache,
}

fn env_dir(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(target_os = "linux")]
fn base_dir(kind: BaseDir) -> Option<PathBuf> {
    let (xdg, fallback) = match kind {
        BaseDir::Data => ("XDG_DATA_HOME", ".local/share"),
        BaseDir::Cache => ("XDG_CACHE_HOME", ".cache"),
    };
    env_dir(xdg).or_else(|| env_dir("HOME").map(|home| home.join(fallback)))
}

#[cfg(target_os = "macos")]
fn base_dir(kind: BaseDir) -> Option<PathBuf> {
    let sub = match kind {
        BaseDir::Data => "Library/Application Support",
        BaseDir::Cache => "Library/Caches",
    };
    env_dir("HOME").map(|home| home.join(sub))
}

#[cfg(target_os = "windows")]
fn base_dir(kind: BaseDir) -> Option<PathBuf> {
    match kind {
        BaseDir::Data => env_dir("APPDATA"),
        BaseDir::Cache => env_dir("LOCALAPPDATA").or_else(|| env_dir("APPDATA")),
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn base_dir(_kind: BaseDir) -> Option<PathBuf> {
    None
}

/// Base directory for per-user caches; settings live below it.
pub fn get_cache_dir() -> Option<PathBuf> {
    base_dir(BaseDir::Cache)
}

/// Where the local core keeps its cache and remote mirror.
pub fn get_data_dir() -> Option<PathBuf> {
    base_dir(BaseDir::Data).map(|p| p.join(APP_NAME).join(DATA_DIR))
}

pub fn get_log_dir() -> Option<PathBuf> {
    base_dir(BaseDir::Data).map(|p| p.join(APP_NAME).join(LOG_DIR))
}

fn ensure_dir(dir: Option<PathBuf>, what: &str) -> std::io::Result<PathBuf> {
    let dir = dir.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("cannot determine {} directory", what),
        )
    })?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn ensure_data_dir() -> std::io::Result<PathBuf> {
    ensure_dir(get_data_dir(), "data")
}

pub fn ensure_log_dir() -> std::io::Result<PathBuf> {
    ensure_dir(get_log_dir(), "log")
}

#[cfg(test)]
#[path = "../../../../tests/unit/kernel/services/adapters/paths.rs"]
mod tests;
