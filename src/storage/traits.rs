//! Storage traits and error types
//!
//! This module defines the key-value interface every storage backend
//! implements, plus JSON helpers on top of it.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Key already written: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable key-value store
///
/// Keys are `/`-separated relative paths such as
/// `sellers/darkmarket/abc123/latest.json`. Implementations must be safe to
/// share between concurrent crawl runs, and a single `put`/`put_new` must
/// never be observed half-written.
pub trait KeyValueStore: Send + Sync {
    /// Writes a value, replacing any previous one
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Writes a value only if the key is unused
    ///
    /// Returns `StorageError::AlreadyExists` otherwise. Used for immutable
    /// snapshots.
    fn put_new(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Reads a value, `None` if absent
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Lists keys starting with `prefix`, sorted ascending
    fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

/// Checks a key is a clean relative path
///
/// Segments may contain ASCII letters, digits, `_`, `-` and `.`; empty
/// segments and `.`/`..` are rejected.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && key.split('/').all(|segment| {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        });

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Serializes a value as pretty JSON and writes it
pub fn put_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    store.put(key, &serde_json::to_vec_pretty(value)?)
}

/// Serializes a value as pretty JSON and writes it once
pub fn put_json_new<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> StorageResult<()> {
    store.put_new(key, &serde_json::to_vec_pretty(value)?)
}

/// Reads and deserializes a JSON value
pub fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> StorageResult<Option<T>> {
    match store.get(key)? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}
