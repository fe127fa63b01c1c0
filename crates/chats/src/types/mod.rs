//! Shared types for the chat service

pub mod errors;

pub use errors::ChatError;

use dispatch_database::{Chat, Mention, Message, MessageBody, Reaction, ReadReceipt};

/// Result alias used throughout the chat service.
pub type ChatResult<T> = Result<T, ChatError>;

/// A chat as it appears in a user's listing: annotated with the freshly
/// computed unread count and the caller's own read marker.
#[derive(Debug, Clone)]
pub struct ChatSummary {
    pub chat: Chat,
    /// Recomputed from message timestamps, not the cached participant counter.
    pub unread_count: i64,
    pub last_seen: String,
}

/// A fully materialized message: the row plus its reactions and read
/// receipts, and the public id of the owning chat for addressing.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub chat_public_id: String,
    pub message: Message,
    pub reactions: Vec<Reaction>,
    pub read_by: Vec<ReadReceipt>,
}

/// Input for creating a message, typed at the boundary.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    /// Message text; the caption for media messages.
    pub content: String,
    pub body: MessageBody,
    /// Public id of a message in the same chat this one replies to.
    pub reply_to: Option<String>,
    pub mentions: Vec<Mention>,
}

impl MessageDraft {
    /// Plain text draft, the common case.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            body: MessageBody::Text,
            reply_to: None,
            mentions: Vec::new(),
        }
    }
}

/// Metadata supplied when creating a group chat.
#[derive(Debug, Clone, Default)]
pub struct GroupMetadata {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_public: bool,
}

/// Chat-level settings flags.
#[derive(Debug, Clone, Copy)]
pub struct ChatSettings {
    /// Persisted for clients; the core does not act on it.
    pub approval_required: bool,
    pub only_admins_can_send: bool,
}
