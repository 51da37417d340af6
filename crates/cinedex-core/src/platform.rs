//! Where cinedex keeps its config and log files.

use std::path::PathBuf;

const APP_DIR: &str = "cinedex";

/// Overrides both directories; config lands in the root, data in `root/data`.
pub const HOME_ENV: &str = "CINEDEX_HOME";

fn override_root() -> Option<PathBuf> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub fn data_dir() -> PathBuf {
    match override_root() {
        Some(root) => root.join("data"),
        None => user_dir(".local/share", dirs::data_local_dir),
    }
}

pub fn config_dir() -> PathBuf {
    match override_root() {
        Some(root) => root,
        None => user_dir(".config", dirs::config_dir),
    }
}

// Unix (macOS included) always uses the XDG layout under $HOME.
#[cfg(unix)]
fn user_dir(xdg: &str, _native: fn() -> Option<PathBuf>) -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(xdg)
        .join(APP_DIR)
}

#[cfg(not(unix))]
fn user_dir(_xdg: &str, native: fn() -> Option<PathBuf>) -> PathBuf {
    native()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
