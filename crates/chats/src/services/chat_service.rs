//! Chat lifecycle and participant management.

use sqlx::SqlitePool;
use tracing::info;

use dispatch_database::{
    Chat, ChatRepository, ChatType, MessageRepository, NewChat, Participant,
    ParticipantRepository, ParticipantRole,
};
use dispatch_users::UserDirectory;

use crate::types::{ChatError, ChatResult, ChatSettings, ChatSummary, GroupMetadata};

/// Service for chat creation, listing, and participant management.
///
/// Role checks always read the current participant row; nothing is cached
/// across calls.
pub struct ChatService {
    chats: ChatRepository,
    participants: ParticipantRepository,
    messages: MessageRepository,
    directory: UserDirectory,
}

impl ChatService {
    /// Create a new chat service instance
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            chats: ChatRepository::new(pool.clone()),
            participants: ParticipantRepository::new(pool.clone()),
            messages: MessageRepository::new(pool.clone()),
            directory: UserDirectory::new(pool),
        }
    }

    /// Return the direct chat between two users, creating it on first
    /// contact. Idempotent: a second call returns the existing chat, in
    /// either argument order. Always refreshes the caller's read marker.
    pub async fn get_or_create_direct_chat(
        &self,
        user_id: i64,
        recipient_id: i64,
    ) -> ChatResult<Chat> {
        if user_id == recipient_id {
            return Err(ChatError::Validation(
                "cannot open a direct chat with yourself".to_string(),
            ));
        }

        let caller = self
            .directory
            .find_by_id(user_id)
            .await?
            .ok_or(ChatError::NotFound("user"))?;
        let recipient = self
            .directory
            .find_by_id(recipient_id)
            .await?
            .ok_or(ChatError::NotFound("user"))?;

        if let Some(chat) = self.chats.find_direct_chat(user_id, recipient_id).await? {
            let now = chrono::Utc::now().to_rfc3339();
            self.participants
                .touch_last_seen(chat.id, user_id, &now)
                .await?;
            return Ok(chat);
        }

        let chat = self
            .chats
            .create(&NewChat {
                chat_type: ChatType::Individual,
                name: format!("{} & {}", caller.display_name(), recipient.display_name()),
                avatar_url: None,
                created_by: user_id,
                is_public: false,
                approval_required: false,
                only_admins_can_send: false,
            })
            .await?;

        self.participants
            .add(chat.id, user_id, ParticipantRole::Member)
            .await?;
        self.participants
            .add(chat.id, recipient_id, ParticipantRole::Member)
            .await?;

        info!(
            chat_id = chat.id,
            user_id = user_id,
            recipient_id = recipient_id,
            "created direct chat"
        );

        Ok(chat)
    }

    /// Create a group chat with the creator as owner and the given users as
    /// members. Participant ids are deduplicated against the creator.
    pub async fn create_group_chat(
        &self,
        creator_id: i64,
        participant_ids: &[i64],
        metadata: GroupMetadata,
    ) -> ChatResult<Chat> {
        self.directory
            .find_by_id(creator_id)
            .await?
            .ok_or(ChatError::NotFound("user"))?;

        let mut member_ids: Vec<i64> = Vec::new();
        for &id in participant_ids {
            if id == creator_id || member_ids.contains(&id) {
                continue;
            }
            self.directory
                .find_by_id(id)
                .await?
                .ok_or(ChatError::NotFound("user"))?;
            member_ids.push(id);
        }

        let name = metadata
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "New Group".to_string());

        let chat = self
            .chats
            .create(&NewChat {
                chat_type: ChatType::Group,
                name,
                avatar_url: metadata.avatar_url,
                created_by: creator_id,
                is_public: metadata.is_public,
                approval_required: false,
                only_admins_can_send: false,
            })
            .await?;

        self.participants
            .add(chat.id, creator_id, ParticipantRole::Owner)
            .await?;
        for id in &member_ids {
            self.participants
                .add(chat.id, *id, ParticipantRole::Member)
                .await?;
        }

        info!(
            chat_id = chat.id,
            creator_id = creator_id,
            member_count = member_ids.len() + 1,
            "created group chat"
        );

        Ok(chat)
    }

    /// All active chats where the user is an active participant, most
    /// recently updated first, each annotated with a freshly computed unread
    /// count.
    pub async fn get_user_chats(&self, user_id: i64) -> ChatResult<Vec<ChatSummary>> {
        let chats = self.chats.find_chats_for_user(user_id).await?;

        let mut summaries = Vec::with_capacity(chats.len());
        for chat in chats {
            let participant = self
                .participants
                .find(chat.id, user_id)
                .await?
                .ok_or(ChatError::NotFound("participant"))?;
            let unread_count = self
                .messages
                .count_unread(chat.id, user_id, &participant.last_seen)
                .await?;
            summaries.push(ChatSummary {
                chat,
                unread_count,
                last_seen: participant.last_seen,
            });
        }

        Ok(summaries)
    }

    /// Resolve a chat and the caller's active membership in it. Gateway
    /// entry point for room joins.
    pub async fn membership(
        &self,
        chat_public_id: &str,
        user_id: i64,
    ) -> ChatResult<(Chat, Participant)> {
        let chat = self
            .chats
            .find_by_public_id(chat_public_id)
            .await?
            .ok_or(ChatError::NotFound("chat"))?;

        let participant = self
            .participants
            .find(chat.id, user_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(ChatError::Forbidden("not an active participant of this chat"))?;

        Ok((chat, participant))
    }

    /// Participants to consider for out-of-band notification of a new
    /// message: active, not muted, and not the sender.
    pub async fn notification_targets(
        &self,
        chat_public_id: &str,
        sender_id: i64,
    ) -> ChatResult<Vec<i64>> {
        let chat = self
            .chats
            .find_by_public_id(chat_public_id)
            .await?
            .ok_or(ChatError::NotFound("chat"))?;

        let participants = self.participants.find_for_chat(chat.id).await?;
        Ok(participants
            .into_iter()
            .filter(|p| p.is_active && !p.muted && p.user_id != sender_id)
            .map(|p| p.user_id)
            .collect())
    }

    /// Add a user to a chat. A previously removed participant is reactivated
    /// on their existing row with reset read-state; adding an already active
    /// participant is a conflict.
    pub async fn add_participant(
        &self,
        chat_public_id: &str,
        new_participant_id: i64,
        added_by: i64,
    ) -> ChatResult<Participant> {
        let chat = self
            .chats
            .find_by_public_id(chat_public_id)
            .await?
            .filter(|chat| chat.is_active())
            .ok_or(ChatError::NotFound("chat"))?;

        self.require_privileged(chat.id, added_by).await?;

        self.directory
            .find_by_id(new_participant_id)
            .await?
            .ok_or(ChatError::NotFound("user"))?;

        match self.participants.find(chat.id, new_participant_id).await? {
            Some(existing) if existing.is_active => {
                Err(ChatError::Conflict("participant already active"))
            }
            Some(_) => {
                self.participants
                    .reactivate(chat.id, new_participant_id)
                    .await?;
                self.participants
                    .find(chat.id, new_participant_id)
                    .await?
                    .ok_or(ChatError::NotFound("participant"))
            }
            None => Ok(self
                .participants
                .add(chat.id, new_participant_id, ParticipantRole::Member)
                .await?),
        }
    }

    /// Soft-remove a participant, preserving their history.
    pub async fn remove_participant(
        &self,
        chat_public_id: &str,
        participant_id: i64,
        removed_by: i64,
    ) -> ChatResult<()> {
        let chat = self
            .chats
            .find_by_public_id(chat_public_id)
            .await?
            .ok_or(ChatError::NotFound("chat"))?;

        self.require_privileged(chat.id, removed_by).await?;

        let target = self
            .participants
            .find(chat.id, participant_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(ChatError::NotFound("participant"))?;

        if target.role == ParticipantRole::Owner {
            return Err(ChatError::Forbidden("the chat owner cannot be removed"));
        }

        self.participants.deactivate(chat.id, participant_id).await?;
        Ok(())
    }

    /// Single-field update of the caller's own mute flag.
    pub async fn update_notification_settings(
        &self,
        chat_public_id: &str,
        user_id: i64,
        muted: bool,
    ) -> ChatResult<()> {
        let (chat, _participant) = self.membership(chat_public_id, user_id).await?;
        self.participants.set_muted(chat.id, user_id, muted).await?;
        Ok(())
    }

    /// Replace chat-level settings. Admin or owner only.
    pub async fn update_chat_settings(
        &self,
        chat_public_id: &str,
        user_id: i64,
        settings: ChatSettings,
    ) -> ChatResult<Chat> {
        let chat = self
            .chats
            .find_by_public_id(chat_public_id)
            .await?
            .ok_or(ChatError::NotFound("chat"))?;

        self.require_privileged(chat.id, user_id).await?;

        self.chats
            .update_settings(chat.id, settings.approval_required, settings.only_admins_can_send)
            .await?;

        self.chats
            .find_by_public_id(chat_public_id)
            .await?
            .ok_or(ChatError::NotFound("chat"))
    }

    /// Require an active admin or owner membership for the caller.
    async fn require_privileged(&self, chat_id: i64, user_id: i64) -> ChatResult<Participant> {
        let participant = self
            .participants
            .find(chat_id, user_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(ChatError::Forbidden("not an active participant of this chat"))?;

        if !participant.role.is_privileged() {
            return Err(ChatError::Forbidden(
                "only chat admins can manage participants",
            ));
        }

        Ok(participant)
    }
}
