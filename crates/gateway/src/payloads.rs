//! Wire representations of chat entities, keyed by public ids.

use serde::{Deserialize, Serialize};

use dispatch_chats::{ChatSummary, MessageRecord};
use dispatch_database::{
    Chat, ChatStatus, ChatType, FileData, Mention, MessageType, Participant, ParticipantRole,
};

/// A fully populated message as sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: String,
    pub chat_id: String,
    pub sender_id: i64,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to: Option<String>,
    pub file_data: Option<FileData>,
    pub mentions: Vec<Mention>,
    pub reactions: Vec<ReactionPayload>,
    pub read_by: Vec<ReadReceiptPayload>,
    pub is_edited: bool,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub user_id: i64,
    pub emoji: String,
    pub reacted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadReceiptPayload {
    pub user_id: i64,
    pub read_at: String,
}

impl From<MessageRecord> for MessagePayload {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.message.public_id,
            chat_id: record.chat_public_id,
            sender_id: record.message.sender_id,
            content: record.message.content,
            message_type: record.message.message_type,
            reply_to: record.message.reply_to,
            file_data: record.message.file_data,
            mentions: record.message.mentions,
            reactions: record
                .reactions
                .into_iter()
                .map(|r| ReactionPayload {
                    user_id: r.user_id,
                    emoji: r.emoji,
                    reacted_at: r.reacted_at,
                })
                .collect(),
            read_by: record
                .read_by
                .into_iter()
                .map(|r| ReadReceiptPayload {
                    user_id: r.user_id,
                    read_at: r.read_at,
                })
                .collect(),
            is_edited: record.message.is_edited,
            is_deleted: record.message.is_deleted,
            created_at: record.message.created_at,
            updated_at: record.message.updated_at,
        }
    }
}

/// A chat as returned from creation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatPayload {
    pub id: String,
    pub chat_type: ChatType,
    pub status: ChatStatus,
    pub name: String,
    pub avatar_url: Option<String>,
    pub created_by: i64,
    pub is_public: bool,
    pub approval_required: bool,
    pub only_admins_can_send: bool,
    pub last_message_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Chat> for ChatPayload {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.public_id,
            chat_type: chat.chat_type,
            status: chat.status,
            name: chat.name,
            avatar_url: chat.avatar_url,
            created_by: chat.created_by,
            is_public: chat.is_public,
            approval_required: chat.approval_required,
            only_admins_can_send: chat.only_admins_can_send,
            last_message_id: chat.last_message_id,
            created_at: chat.created_at,
            updated_at: chat.updated_at,
        }
    }
}

/// A chat in the caller's listing, annotated with read-state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummaryPayload {
    #[serde(flatten)]
    pub chat: ChatPayload,
    pub unread_count: i64,
    pub last_seen: String,
}

impl From<ChatSummary> for ChatSummaryPayload {
    fn from(summary: ChatSummary) -> Self {
        Self {
            chat: ChatPayload::from(summary.chat),
            unread_count: summary.unread_count,
            last_seen: summary.last_seen,
        }
    }
}

/// A participant row as sent to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantPayload {
    pub user_id: i64,
    pub role: ParticipantRole,
    pub is_active: bool,
    pub unread_count: i64,
    pub last_seen: String,
    pub muted: bool,
    pub joined_at: String,
}

impl From<Participant> for ParticipantPayload {
    fn from(participant: Participant) -> Self {
        Self {
            user_id: participant.user_id,
            role: participant.role,
            is_active: participant.is_active,
            unread_count: participant.unread_count,
            last_seen: participant.last_seen,
            muted: participant.muted,
            joined_at: participant.joined_at,
        }
    }
}
