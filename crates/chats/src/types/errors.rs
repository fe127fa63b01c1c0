//! Error taxonomy for the chat service

use dispatch_database::StoreError;
use dispatch_users::DirectoryError;
use thiserror::Error;

/// Typed failures surfaced by chat service operations.
///
/// The REST facade maps these to HTTP status codes; the realtime gateway maps
/// them to scoped error events sent only to the initiating connection.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The client must fix the request before retrying.
    #[error("invalid request: {0}")]
    Validation(String),

    /// A referenced chat, message, or user does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Authenticated but lacking the role or membership for the operation.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// Duplicate operation, e.g. re-adding an already active participant.
    #[error("conflict: {0}")]
    Conflict(&'static str),

    /// Store or collaborator failure.
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl From<StoreError> for ChatError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ChatNotFound => ChatError::NotFound("chat"),
            StoreError::MessageNotFound => ChatError::NotFound("message"),
            StoreError::ParticipantNotFound => ChatError::NotFound("participant"),
            StoreError::Database(message) => ChatError::Upstream(message),
        }
    }
}

impl From<DirectoryError> for ChatError {
    fn from(error: DirectoryError) -> Self {
        match error {
            DirectoryError::Database(message) => ChatError::Upstream(message),
        }
    }
}
