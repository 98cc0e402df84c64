// ABOUTME: Default filesystem locations for persisted settings
// ABOUTME: Resolves the Cellar directory and settings file from the environment

use std::env;
use std::path::PathBuf;

use crate::constants::{
    CELLAR_DIR_NAME, CELLAR_HOME, CELLAR_SETTINGS_PATH, HOME, SETTINGS_FILE_NAME, USERPROFILE,
};

/// Get the path to the Cellar directory
///
/// `CELLAR_HOME` wins, then `$HOME/.cellar` (useful for tests), then the
/// platform home directory reported by the `dirs` crate.
pub fn cellar_dir() -> PathBuf {
    resolve_cellar_dir(|name| env::var(name).ok())
}

/// Get the path to the default JSON settings file
pub fn settings_file() -> PathBuf {
    resolve_settings_file(|name| env::var(name).ok())
}

fn resolve_cellar_dir(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = lookup(CELLAR_HOME).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    let home = lookup(HOME)
        .or_else(|| lookup(USERPROFILE))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        // No home at all (minimal containers): stay relative to the working directory
        .unwrap_or_default();

    home.join(CELLAR_DIR_NAME)
}

fn resolve_settings_file(lookup: impl Fn(&str) -> Option<String>) -> PathBuf {
    match lookup(CELLAR_SETTINGS_PATH).filter(|v| !v.is_empty()) {
        Some(path) => PathBuf::from(path),
        None => resolve_cellar_dir(lookup).join(SETTINGS_FILE_NAME),
    }
}
