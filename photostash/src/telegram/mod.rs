//! Telegram Bot API client.
//!
//! Only the three calls this service needs are implemented: `getFile` to resolve a photo to a
//! download path, and `setWebhook`/`deleteWebhook` for lifecycle management. They sit behind the
//! [`TelegramApi`] trait so the rest of the crate can be exercised against a mock server.
//!
//! The bot token is part of every URL built here, so URLs are never logged.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

pub mod types;

pub use types::{ApiResponse, Chat, File, Message, PhotoSize, Update};

/// Default Bot API base URL
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Telegram request failed: {0}")]
    Http(reqwest::Error),

    /// The API answered with `ok: false`
    #[error("Telegram API rejected {method}: {description}")]
    Api { method: &'static str, description: String },

    #[error("Telegram returned no file path for {file_id}")]
    MissingFilePath { file_id: String },

    #[error("Invalid Telegram URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        // Request URLs embed the bot token
        TelegramError::Http(e.without_url())
    }
}

pub type Result<T> = std::result::Result<T, TelegramError>;

/// Operations against the messaging platform.
#[async_trait]
pub trait TelegramApi: Send + Sync {
    /// Look up download metadata for a file reference.
    async fn get_file(&self, file_id: &str) -> Result<File>;

    /// Ask the platform to deliver updates to `url`.
    async fn set_webhook(&self, url: &str) -> Result<()>;

    /// Remove the webhook registration.
    async fn delete_webhook(&self) -> Result<()>;

    /// Absolute download URL for a path returned by [`TelegramApi::get_file`].
    fn file_url(&self, file_path: &str) -> Result<Url>;
}

/// The concrete implementation of `TelegramApi`, using `reqwest`.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_base: Url,
    token: String,
}

impl TelegramClient {
    pub fn new(api_base: Url, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base,
            token: token.into(),
        }
    }

    /// Build `<api_base>/<path>`.
    ///
    /// Formatting and re-parsing instead of `Url::join`: tokens look like `123:abc`, and a relative
    /// reference starting with `bot123:` would be read as a URL scheme.
    fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.api_base.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    fn method_url(&self, method: &str) -> Result<Url> {
        self.endpoint(&format!("bot{}/{}", self.token, method))
    }
}

/// Unwrap the `{ok, result, description}` envelope.
async fn parse_envelope<T: DeserializeOwned>(method: &'static str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let envelope: ApiResponse<T> = response.json().await?;

    match envelope {
        ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
        ApiResponse { description, .. } => Err(TelegramError::Api {
            method,
            description: description.unwrap_or_else(|| format!("HTTP {status}")),
        }),
    }
}

#[async_trait]
impl TelegramApi for TelegramClient {
    #[instrument(skip(self), err)]
    async fn get_file(&self, file_id: &str) -> Result<File> {
        let url = self.method_url("getFile")?;
        let response = self.client.get(url).query(&[("file_id", file_id)]).send().await?;
        let file: File = parse_envelope("getFile", response).await?;
        debug!(file_path = ?file.file_path, "Resolved file");
        Ok(file)
    }

    #[instrument(skip_all, err)]
    async fn set_webhook(&self, url: &str) -> Result<()> {
        let endpoint = self.method_url("setWebhook")?;
        let response = self.client.post(endpoint).form(&[("url", url)]).send().await?;
        let _: bool = parse_envelope("setWebhook", response).await?;
        Ok(())
    }

    #[instrument(skip_all, err)]
    async fn delete_webhook(&self) -> Result<()> {
        let endpoint = self.method_url("deleteWebhook")?;
        let response = self.client.post(endpoint).send().await?;
        let _: bool = parse_envelope("deleteWebhook", response).await?;
        Ok(())
    }

    fn file_url(&self, file_path: &str) -> Result<Url> {
        self.endpoint(&format!("file/bot{}/{}", self.token, file_path.trim_start_matches('/')))
    }
}
