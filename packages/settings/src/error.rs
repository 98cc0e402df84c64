// ABOUTME: Error types for the settings engine
// ABOUTME: Unsupported stored shapes, disposed registries, storage failures and runaway flushes

use cellar_reactive::ReactiveError;
use cellar_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    /// A stored value has a shape no setting can be decoded from
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error(transparent)]
    Reactive(#[from] ReactiveError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Settings did not settle after {0} flush rounds")]
    FlushLimitExceeded(usize),
}

impl SettingsError {
    /// True when the operation targeted a disposed registry
    pub fn is_disposed(&self) -> bool {
        matches!(self, SettingsError::Reactive(ReactiveError::Disposed))
    }
}

pub type SettingsResult<T> = Result<T, SettingsError>;
