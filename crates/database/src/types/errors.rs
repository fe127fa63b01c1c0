//! Error types for the store layer

use thiserror::Error;

/// Errors surfaced by the chat store repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("chat not found")]
    ChatNotFound,

    #[error("message not found")]
    MessageNotFound,

    #[error("participant not found")]
    ParticipantNotFound,

    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        StoreError::Database(error.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        StoreError::Database(format!("column decode failed: {error}"))
    }
}
