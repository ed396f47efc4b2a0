//! Local filesystem image store.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use super::{ImageStore, Result, StorageError, validate_name};

/// Stores images as plain files in a single directory.
///
/// Writes go to a hidden temporary file first and are renamed into place, so readers never observe
/// a partially written image. Two concurrent writes of the same content both succeed and the last
/// rename wins, which is harmless since the bytes are identical.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    base_path: PathBuf,
}

impl LocalImageStore {
    /// Open a store rooted at `base_path`, creating the directory if it is missing.
    pub async fn open(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        debug!(path = %base_path.display(), "Opened image store");
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.base_path.join(name))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name)?;
        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()), err)]
    async fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        let full_path = self.path_for(name)?;

        // The directory may have been removed since the store was opened
        fs::create_dir_all(&self.base_path).await?;

        let tmp_path = self.base_path.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));
        let written = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(bytes).await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &full_path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name)?;
        match fs::read(&path).await {
            Ok(content) => Ok(content),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            // Non UTF-8 names can't have been written by us
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }

        Ok(names)
    }
}
