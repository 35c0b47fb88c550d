use reqwest::StatusCode;
use thiserror::Error as ThisError;

use super::IsRetryable;

#[derive(Debug, ThisError)]
pub enum StorySyncError {
    #[error("Upstream error with status: {0}")]
    UpstreamStatus(StatusCode),

    /// The API answered with `error: true`.
    #[error("API rejected request: {0}")]
    ApiRejected(String),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("User not authenticated")]
    Unauthenticated,

    /// Network fetch failed and the local mirror is empty.
    #[error("Failed to fetch stories and no offline data available")]
    NoOfflineData,

    #[error("Deferred flush unavailable: {0}")]
    DeferredFlushUnavailable(String),

    /// A favorite was submitted without a story id.
    #[error("Story id is required")]
    MissingStoryId,

    #[error("Ractor error: {0}")]
    RactorError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl IsRetryable for StorySyncError {
    fn is_retryable(&self) -> bool {
        match self {
            StorySyncError::ReqwestError(e) => {
                e.status().is_none_or(|status| is_retryable_status(status))
            }
            StorySyncError::UpstreamStatus(status) => is_retryable_status(*status),
            _ => false,
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}
