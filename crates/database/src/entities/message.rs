//! Message entity definitions

use serde::{Deserialize, Serialize};

/// A message within a chat.
///
/// Soft-deleted messages stay in the store so that `reply_to` and
/// `last_message_id` references keep resolving, but they are excluded from
/// listings and unread counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Database primary key
    pub id: i64,
    /// Publicly accessible id
    pub public_id: String,
    pub chat_id: i64,
    pub sender_id: i64,
    /// Message text; for media messages this holds the caption.
    pub content: String,
    pub message_type: MessageType,
    /// Public id of another message in the same chat (weak reference)
    pub reply_to: Option<String>,
    pub file_data: Option<FileData>,
    pub mentions: Vec<Mention>,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields required to insert a new message row.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub chat_id: i64,
    pub sender_id: i64,
    pub content: String,
    pub body: MessageBody,
    pub reply_to: Option<String>,
    pub mentions: Vec<Mention>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Photo,
    Video,
    Voice,
    File,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Photo => "photo",
            MessageType::Video => "video",
            MessageType::Voice => "voice",
            MessageType::File => "file",
            MessageType::System => "system",
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(
            self,
            MessageType::Photo | MessageType::Video | MessageType::Voice | MessageType::File
        )
    }
}

impl From<&str> for MessageType {
    fn from(s: &str) -> Self {
        match s {
            "photo" => MessageType::Photo,
            "video" => MessageType::Video,
            "voice" => MessageType::Voice,
            "file" => MessageType::File,
            "system" => MessageType::System,
            _ => MessageType::Text,
        }
    }
}

impl ToString for MessageType {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

/// Attachment metadata carried by media messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub file_name: String,
    pub original_name: String,
    pub size: i64,
    pub mime_type: String,
    pub url: String,
    /// Playback length in seconds for voice and video attachments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// A user mentioned within the message text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub user_id: i64,
    /// Character offset of the mention within `content`.
    pub position: i64,
}

/// Typed message payload: each kind carries exactly the fields it requires,
/// so a media message without its attachment is unrepresentable past the
/// boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    Text,
    Photo(FileData),
    Video(FileData),
    Voice(FileData),
    File(FileData),
    System,
}

impl MessageBody {
    /// Assemble a body from the loose wire shape, rejecting mismatched
    /// type/attachment combinations.
    pub fn from_parts(
        message_type: MessageType,
        file_data: Option<FileData>,
    ) -> Result<Self, String> {
        match (message_type, file_data) {
            (MessageType::Text, None) => Ok(MessageBody::Text),
            (MessageType::System, None) => Ok(MessageBody::System),
            (MessageType::Photo, Some(file)) => Ok(MessageBody::Photo(file)),
            (MessageType::Video, Some(file)) => Ok(MessageBody::Video(file)),
            (MessageType::Voice, Some(file)) => Ok(MessageBody::Voice(file)),
            (MessageType::File, Some(file)) => Ok(MessageBody::File(file)),
            (kind, Some(_)) => Err(format!(
                "{} messages do not carry file data",
                kind.as_str()
            )),
            (kind, None) => Err(format!("{} messages require file data", kind.as_str())),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            MessageBody::Text => MessageType::Text,
            MessageBody::Photo(_) => MessageType::Photo,
            MessageBody::Video(_) => MessageType::Video,
            MessageBody::Voice(_) => MessageType::Voice,
            MessageBody::File(_) => MessageType::File,
            MessageBody::System => MessageType::System,
        }
    }

    pub fn file_data(&self) -> Option<&FileData> {
        match self {
            MessageBody::Photo(file)
            | MessageBody::Video(file)
            | MessageBody::Voice(file)
            | MessageBody::File(file) => Some(file),
            MessageBody::Text | MessageBody::System => None,
        }
    }
}

/// A single user's reaction to a message. At most one row exists per
/// (message, user); a newer reaction replaces the prior emoji.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub reacted_at: String,
}

/// Read-receipt entry, append-only and unique per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub message_id: i64,
    pub user_id: i64,
    pub read_at: String,
}
