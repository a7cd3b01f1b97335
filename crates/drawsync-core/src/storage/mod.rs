//! Storage abstraction for the persisted canvas.
//!
//! The client keeps exactly one durable value: the latest committed canvas,
//! encoded as a PNG data URL under [`CANVAS_KEY`]. Backends only need to
//! store and return opaque strings by key.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

/// Key holding the most recent full-canvas encoding.
pub const CANVAS_KEY: &str = "drawsync.canvas";

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for snapshot storage backends.
///
/// Each save overwrites the previous value for the key.
pub trait SnapshotStore: Send + Sync {
    /// Store a value, replacing any previous one.
    fn save(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Load a value, or `NotFound` if nothing was stored.
    fn load(&self, key: &str) -> StorageResult<String>;

    /// Delete a value. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check whether a value is stored.
    fn exists(&self, key: &str) -> StorageResult<bool>;
}
