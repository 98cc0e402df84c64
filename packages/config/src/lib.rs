// ABOUTME: Configuration and environment handling for Cellar
// ABOUTME: Provides env var names, default storage paths and tracing initialization

pub mod constants;
pub mod logging;
pub mod paths;

// Re-export the common entry points
pub use logging::init_tracing;
pub use paths::{cellar_dir, settings_file};
