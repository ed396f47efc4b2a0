//! Content-addressed image storage.
//!
//! Images are stored under names derived from their content (see [`crate::ingest::content_name`]),
//! so the store itself only deals in opaque names and byte payloads. Every name passed in is
//! treated as untrusted and checked with [`validate_name`] before it touches the filesystem.

use async_trait::async_trait;
use thiserror::Error;

pub mod local;

pub use local::LocalImageStore;

/// Errors returned by image store operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// No image is stored under the given name
    #[error("Image not found: {0}")]
    NotFound(String),

    /// The name could escape the store directory or refers to an internal file
    #[error("Invalid image name: {0:?}")]
    InvalidName(String),

    /// Underlying filesystem failure (permissions, disk full, ...)
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Trait for image storage backends
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Check whether an image is stored under `name`
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Store `bytes` under `name`, replacing any previous content
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()>;

    /// Retrieve the content stored under `name`
    async fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Snapshot of all stored image names, in no particular order
    async fn list(&self) -> Result<Vec<String>>;
}

/// Reject names that are empty, contain path separators or `..`, or are hidden.
///
/// Hidden names are reserved for in-progress writes.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) || name.contains("..") || name.contains('\0') {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
