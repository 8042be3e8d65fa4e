use thiserror::Error;

use super::tab::{TabId, WindowId};

// === StoreError ===

/// Errors raised by the persistent key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite operation failed.
    #[error("Store database error: {0}")]
    DatabaseError(String),
    /// A record could not be encoded before writing.
    #[error("Store serialization error: {0}")]
    SerializationError(String),
    /// The connection lock was poisoned by a panicking writer.
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

// === TabError ===

/// Errors reported by a [`TabHost`](crate::platform::TabHost) call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TabError {
    /// No live tab with the given id.
    #[error("Tab not found: {0}")]
    NotFound(TabId),
    /// No live window with the given id.
    #[error("Window not found: {0}")]
    WindowNotFound(WindowId),
    /// The browser side rejected the call or went away.
    #[error("Browser unavailable: {0}")]
    Unavailable(String),
    /// The browser did not answer in time.
    #[error("Browser call timed out after {0} ms")]
    Timeout(u64),
}

// === RegistryError ===

/// Errors related to the default-tab registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Index outside `[0, len)`.
    #[error("Default tab index out of range: {index} (len {len})")]
    OutOfRange { index: i64, len: usize },
    /// No entry carries the given id.
    #[error("Default tab not found: {0}")]
    UnknownId(String),
    /// The URL was empty after trimming.
    #[error("Invalid default tab url: {0:?}")]
    InvalidUrl(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// === RotationError ===

/// Errors related to the rotation cycle.
#[derive(Debug, Error)]
pub enum RotationError {
    /// Rotation period below one second or above one day.
    #[error("Invalid rotation interval: {0}s")]
    InvalidInterval(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

// === SettingsError ===

/// Errors related to host settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === RpcError ===

/// Errors produced while decoding or dispatching a protocol line.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The line was not valid JSON or did not match any known shape.
    #[error("parse error: {0}")]
    Parse(String),
    /// The `action` field named nothing we handle.
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Rotation(#[from] RotationError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
