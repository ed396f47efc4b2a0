//! The subset of Telegram Bot API objects this service reads.
//!
//! Unknown fields are ignored, so full platform payloads deserialize into these types.

use serde::{Deserialize, Serialize};

/// An incoming update delivered to the webhook.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    /// Available sizes of the photo, smallest first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

/// One size variant of a photo.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PhotoSize {
    /// Opaque reference used to download the file
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Result of `getFile`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct File {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Path relative to the file download base; absent once the link has expired
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

/// Envelope wrapping every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}
