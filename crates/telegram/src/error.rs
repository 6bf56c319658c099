//! Error types for the Bot API client.

use thiserror::Error;

/// Errors that can occur when talking to the Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered `ok: false`.
    #[error("API error {code}: {description}")]
    Api { code: i32, description: String },

    /// The API answered `ok: true` without a result.
    #[error("empty result from {0}")]
    EmptyResult(String),

    /// File metadata without a download path.
    #[error("file {0} has no download path")]
    NoFilePath(String),
}

impl TelegramError {
    /// The callback or message is too old to act on.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            TelegramError::Api { code: 400, description }
                if description.contains("query is too old")
                    || description.contains("message is not modified")
                    || description.contains("message to edit not found")
        )
    }
}
