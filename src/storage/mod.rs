//! Storage module for persisting records and seller snapshots
//!
//! This module provides the durable key-value store the crawler hands its
//! output to:
//! - `FileStore`: one file per key, atomic rename on write
//! - `SqliteStore`: a single `kv` table in a SQLite database
//!
//! Both support write-once puts for immutable snapshots.

mod file;
mod schema;
mod sqlite;
mod traits;

pub use file::FileStore;
pub use sqlite::SqliteStore;
pub use traits::{
    get_json, put_json, put_json_new, validate_key, KeyValueStore, StorageError, StorageResult,
};

use crate::config::{StorageBackend, StorageConfig};
use std::path::Path;
use std::sync::Arc;

/// File name of the SQLite database inside the storage directory
pub const SQLITE_FILE: &str = "darkline.db";

/// Opens the configured storage backend
///
/// `config.path` is a directory for both backends; the SQLite backend keeps
/// its database file inside it.
pub fn open_store(config: &StorageConfig) -> StorageResult<Arc<dyn KeyValueStore>> {
    let root = Path::new(&config.path);

    let store: Arc<dyn KeyValueStore> = match config.backend {
        StorageBackend::Files => Arc::new(FileStore::new(root)?),
        StorageBackend::Sqlite => Arc::new(SqliteStore::new(&root.join(SQLITE_FILE))?),
    };

    tracing::info!("Using {:?} storage at {}", config.backend, root.display());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_each_backend() {
        let dir = tempfile::TempDir::new().unwrap();

        for backend in [StorageBackend::Files, StorageBackend::Sqlite] {
            let config = StorageConfig {
                backend,
                path: dir.path().join(format!("{:?}", backend)).display().to_string(),
            };
            let store = open_store(&config).unwrap();
            put_json(store.as_ref(), "probe.json", &vec![1, 2, 3]).unwrap();
            let back: Option<Vec<i32>> = get_json(store.as_ref(), "probe.json").unwrap();
            assert_eq!(back, Some(vec![1, 2, 3]));
        }

        assert!(dir.path().join("Sqlite").join(SQLITE_FILE).exists());
    }
}
