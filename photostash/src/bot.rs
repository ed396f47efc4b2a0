//! Turns incoming chat updates into ingested images.
//!
//! Every update is handled on its own and nothing it does can fail the caller: each step that
//! drops an update reports why through [`UpdateOutcome`], and the webhook handler only logs it.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::ingest::{IngestError, IngestOutcome, Ingestor};
use crate::telegram::{TelegramApi, TelegramError, Update};

/// Why an update was dropped, or what ingesting it did.
#[derive(Debug)]
pub enum UpdateOutcome {
    /// Not a photo message
    Ignored,
    /// Came from a chat other than the configured group
    ChatRejected { chat_id: i64 },
    /// A photo message with no size variants
    NoPhotos,
    /// The file reference could not be resolved to a download path
    LookupFailed(TelegramError),
    /// Download or write failed
    IngestFailed(IngestError),
    Ingested(IngestOutcome),
}

/// Webhook bot adapter: filters updates by group and ingests the largest photo variant.
pub struct PhotoBot {
    telegram: Arc<dyn TelegramApi>,
    ingestor: Ingestor,
    group_id: String,
}

impl PhotoBot {
    pub fn new(telegram: Arc<dyn TelegramApi>, ingestor: Ingestor, group_id: impl Into<String>) -> Self {
        Self {
            telegram,
            ingestor,
            group_id: group_id.into(),
        }
    }

    #[instrument(skip(self, update), fields(update_id = update.update_id))]
    pub async fn handle_update(&self, update: Update) -> UpdateOutcome {
        let Some(message) = update.message else {
            debug!("Update carries no message");
            return UpdateOutcome::Ignored;
        };
        let Some(photos) = message.photo else {
            debug!(chat_id = message.chat.id, "Message is not a photo");
            return UpdateOutcome::Ignored;
        };

        let chat_id = message.chat.id;
        info!(chat_id, "Received photo message");

        // Chat ids are compared as strings, matching how the group id is configured
        if chat_id.to_string() != self.group_id {
            info!(chat_id, "Message from unexpected chat");
            return UpdateOutcome::ChatRejected { chat_id };
        }

        // Variants are ordered smallest to largest
        let Some(largest) = photos.last() else {
            warn!(chat_id, "No photos found in the message");
            return UpdateOutcome::NoPhotos;
        };
        let file_id = largest.file_id.as_str();

        let file_url = match self.resolve_download_url(file_id).await {
            Ok(url) => url,
            Err(e) => {
                warn!(file_id, error = %e, "Failed to resolve photo for download");
                return UpdateOutcome::LookupFailed(e);
            }
        };

        match self.ingestor.ingest(&file_url, file_id).await {
            Ok(outcome) => UpdateOutcome::Ingested(outcome),
            Err(e) => {
                error!(file_id, error = %e, "Failed to download or save image");
                UpdateOutcome::IngestFailed(e)
            }
        }
    }

    async fn resolve_download_url(&self, file_id: &str) -> Result<url::Url, TelegramError> {
        let file = self.telegram.get_file(file_id).await?;
        let file_path = file.file_path.ok_or_else(|| TelegramError::MissingFilePath {
            file_id: file_id.to_string(),
        })?;
        debug!(file_path = %file_path, "Attempting to download image");
        self.telegram.file_url(&file_path)
    }
}
