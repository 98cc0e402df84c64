// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Cellar

// Storage Location
pub const CELLAR_HOME: &str = "CELLAR_HOME";
pub const CELLAR_SETTINGS_PATH: &str = "CELLAR_SETTINGS_PATH";

// Logging
pub const CELLAR_LOG: &str = "CELLAR_LOG";
pub const RUST_LOG: &str = "RUST_LOG"; // Fallback

// System Environment Variables
pub const HOME: &str = "HOME";
pub const USERPROFILE: &str = "USERPROFILE"; // Windows

/// Default log filter when neither `CELLAR_LOG` nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Name of the directory holding Cellar state under the home directory
pub const CELLAR_DIR_NAME: &str = ".cellar";

/// File name of the default JSON settings store
pub const SETTINGS_FILE_NAME: &str = "settings.json";
