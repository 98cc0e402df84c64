// ABOUTME: Tracing subscriber setup shared by binaries and tests
// ABOUTME: Reads the log filter from CELLAR_LOG, then RUST_LOG, then falls back to info

use std::env;

use tracing_subscriber::EnvFilter;

use crate::constants::{CELLAR_LOG, DEFAULT_LOG_FILTER, RUST_LOG};

/// Initialize a global fmt subscriber for structured logging.
///
/// Safe to call more than once: later calls leave the first subscriber in
/// place and return `false`.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false) // Don't show module paths in logs
        .compact()
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    let directives = env::var(CELLAR_LOG)
        .or_else(|_| env::var(RUST_LOG))
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

    EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}
