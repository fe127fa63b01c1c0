//! Wire events exchanged over the realtime gateway.

use serde::{Deserialize, Serialize};

use dispatch_database::{FileData, Mention, MessageType};

use crate::payloads::MessagePayload;

/// Client events received from a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection to a user identity. Trusted from the upstream
    /// auth layer; no directory check is made here.
    Authenticate { user_id: i64 },
    /// Subscribe to a chat's room after a membership check.
    JoinChat { chat_id: String },
    /// Send a message. `temp_id` is a client-supplied correlation id echoed
    /// back in the delivery confirmation or error.
    SendMessage {
        chat_id: String,
        content: String,
        #[serde(default)]
        message_type: Option<MessageType>,
        #[serde(default)]
        reply_to: Option<String>,
        #[serde(default)]
        file_data: Option<FileData>,
        #[serde(default)]
        mentions: Vec<Mention>,
        #[serde(default)]
        temp_id: Option<String>,
    },
    EditMessage {
        message_id: String,
        content: String,
    },
    DeleteMessage {
        message_id: String,
    },
    AddReaction {
        message_id: String,
        emoji: String,
    },
    RemoveReaction {
        message_id: String,
    },
    MarkMessageRead {
        message_id: String,
        chat_id: String,
    },
    /// Ephemeral typing indicator; relayed, never persisted.
    TypingStart { chat_id: String },
    TypingStop { chat_id: String },
}

/// Server events pushed to connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Authenticated {
        user_id: i64,
    },
    JoinedChat {
        chat_id: String,
    },
    UserOnline {
        chat_id: String,
        user_id: i64,
    },
    UserOffline {
        chat_id: String,
        user_id: i64,
    },
    NewMessage {
        message: MessagePayload,
    },
    /// Delivery confirmation, sent to the sender only.
    MessageDelivered {
        message_id: String,
        temp_id: Option<String>,
    },
    /// Send failure, sent to the sender only.
    MessageError {
        error: String,
        temp_id: Option<String>,
    },
    MessageEdited {
        message: MessagePayload,
    },
    MessageDeleted {
        chat_id: String,
        message_id: String,
    },
    ReactionAdded {
        message: MessagePayload,
    },
    ReactionRemoved {
        message: MessagePayload,
    },
    MessageRead {
        chat_id: String,
        message_id: String,
        user_id: i64,
    },
    UserTyping {
        chat_id: String,
        user_id: i64,
        is_typing: bool,
    },
    /// Scoped error, sent to the initiating connection only; never broadcast.
    Error {
        message: String,
    },
}
