//! File-based storage implementation for native platforms.

use super::{SnapshotStore, StorageError, StorageResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Stores each key as a text file in a directory.
pub struct FileStorage {
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Linux: `~/.local/share/drawsync/`
    /// On Windows: `%LOCALAPPDATA%\drawsync\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("drawsync"))
    }

    fn value_path(&self, key: &str) -> PathBuf {
        let safe_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
            .collect();
        self.base_path.join(format!("{}.txt", safe_key))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl SnapshotStore for FileStorage {
    fn save(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.value_path(key);
        // Readers see either the old or the new value, never a partial write.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            StorageError::Io(format!("Failed to replace {}: {}", path.display(), e))
        })
    }

    fn load(&self, key: &str) -> StorageResult<String> {
        let path = self.value_path(key);
        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.value_path(key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.value_path(key).exists())
    }
}
