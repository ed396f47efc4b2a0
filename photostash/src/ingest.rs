//! Deduplicating image ingestion.
//!
//! An image is downloaded, hashed with MD5, and written to the store under `<hex digest>.jpg`
//! unless a file with that name already exists. Identical payloads therefore land in the store at
//! most once, no matter how many messages carry them. The content is never inspected: whatever
//! bytes come back are stored under the `.jpg` name.

use md5::{Digest, Md5};
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

use crate::storage::{ImageStore, StorageError};

/// Extension given to every stored image.
pub const IMAGE_EXTENSION: &str = "jpg";

/// What ingesting a payload did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The payload was new and has been written under this name
    Stored(String),
    /// A file with identical content already existed; nothing was written
    Duplicate(String),
}

impl IngestOutcome {
    pub fn name(&self) -> &str {
        match self {
            IngestOutcome::Stored(name) | IngestOutcome::Duplicate(name) => name,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    /// Transport failure or non-2xx response while downloading
    #[error("Failed to fetch image: {0}")]
    Fetch(reqwest::Error),

    #[error("Failed to store image: {0}")]
    Storage(#[from] StorageError),
}

impl From<reqwest::Error> for IngestError {
    fn from(e: reqwest::Error) -> Self {
        // Download URLs embed the bot token
        IngestError::Fetch(e.without_url())
    }
}

/// Name under which a payload is stored: the lowercase hex MD5 of the bytes plus `.jpg`.
pub fn content_name(bytes: &[u8]) -> String {
    let digest = Md5::digest(bytes);
    format!("{digest:x}.{IMAGE_EXTENSION}")
}

/// Downloads images and writes them to an [`ImageStore`] by content.
#[derive(Clone)]
pub struct Ingestor {
    client: Client,
    store: Arc<dyn ImageStore>,
}

impl Ingestor {
    /// Create an ingestor with a default HTTP client (no timeout).
    pub fn new(store: Arc<dyn ImageStore>) -> Self {
        Self {
            client: Client::new(),
            store,
        }
    }

    /// Fetch `source_url` and store its content unless it is already present.
    ///
    /// `correlation_id` only labels the operation in logs; it plays no part in deduplication.
    /// The URL is kept out of the span because download URLs embed the bot token.
    #[instrument(skip(self, source_url), err)]
    pub async fn ingest(&self, source_url: &Url, correlation_id: &str) -> Result<IngestOutcome, IngestError> {
        let response = self.client.get(source_url.clone()).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        debug!(size = bytes.len(), "Downloaded image");

        let name = content_name(&bytes);

        if self.store.exists(&name).await? {
            info!(image = %name, "Image already exists");
            return Ok(IngestOutcome::Duplicate(name));
        }

        self.store.write(&name, &bytes).await?;
        info!(image = %name, size = bytes.len(), "Saved image");

        Ok(IngestOutcome::Stored(name))
    }
}
