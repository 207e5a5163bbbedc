//! File-backed key-value store
//!
//! Each key maps to a file below the root directory. Writes go to a
//! temporary file in the target directory and are renamed into place, so a
//! reader never observes a partial value.

use crate::storage::traits::{validate_key, KeyValueStore, StorageError, StorageResult};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Prefix of in-flight temporary files, hidden from `list_keys`
const TEMP_PREFIX: &str = ".tmp";

/// Key-value store over a directory tree
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed
    pub fn new(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }

    fn write_temp(&self, path: &Path, value: &[u8]) -> StorageResult<NamedTempFile> {
        let parent = path.parent().unwrap_or(&self.root);
        fs::create_dir_all(parent)?;

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(parent)?;
        temp.write_all(value)?;
        temp.as_file().sync_all()?;
        Ok(temp)
    }

    fn collect_keys(&self, dir: &Path, prefix: &str, keys: &mut Vec<String>) -> StorageResult<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(TEMP_PREFIX) {
                continue;
            }

            let key = if prefix.is_empty() {
                name.to_string()
            } else {
                format!("{}/{}", prefix, name)
            };

            if entry.file_type()?.is_dir() {
                self.collect_keys(&entry.path(), &key, keys)?;
            } else {
                keys.push(key);
            }
        }

        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn put(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let temp = self.write_temp(&path, value)?;
        temp.persist(&path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }

    fn put_new(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        let temp = self.write_temp(&path, value)?;
        temp.persist_noclobber(&path).map_err(|e| {
            if e.error.kind() == ErrorKind::AlreadyExists {
                StorageError::AlreadyExists(key.to_string())
            } else {
                StorageError::Io(e.error)
            }
        })?;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // Only walk the deepest directory the prefix fully names
        let dir_prefix = match prefix.rfind('/') {
            Some(idx) => &prefix[..idx],
            None => "",
        };
        let start = if dir_prefix.is_empty() {
            self.root.clone()
        } else {
            self.path_for(dir_prefix)?
        };

        let mut keys = Vec::new();
        self.collect_keys(&start, dir_prefix, &mut keys)?;
        keys.retain(|k| k.starts_with(prefix));
        keys.sort();
        Ok(keys)
    }
}
