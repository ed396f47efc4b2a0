use crate::storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// A collection that must not be empty has no entries
    #[error("No {resource} found")]
    Empty { resource: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Image storage error
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Empty { .. } => StatusCode::NOT_FOUND,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Storage(storage_err) => match storage_err {
                StorageError::NotFound(_) | StorageError::InvalidName(_) => StatusCode::NOT_FOUND,
                StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Empty { resource } => format!("No {resource} found"),
            // Names that fail validation are reported exactly like missing ones
            Error::Storage(StorageError::NotFound(_) | StorageError::InvalidName(_)) => "Image not found".to_string(),
            Error::Internal { .. } | Error::Storage(StorageError::Io(_)) => "An error occurred".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Storage(StorageError::Io(_)) | Error::Internal { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Storage(StorageError::InvalidName(_)) => {
                tracing::warn!("Rejected image name: {}", self);
            }
            Error::Empty { .. } | Error::Storage(_) => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
