//! Message lifecycle: send, edit, delete, react, and read-state.

use std::collections::HashMap;

use sqlx::SqlitePool;
use tracing::info;

use dispatch_database::{
    Chat, ChatRepository, Message, MessageRepository, NewMessage, Participant,
    ParticipantRepository, Reaction, ReadReceipt,
};

use crate::types::{ChatError, ChatResult, MessageDraft, MessageRecord};

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

/// Service for message operations within chats.
pub struct MessageService {
    chats: ChatRepository,
    participants: ParticipantRepository,
    messages: MessageRepository,
}

impl MessageService {
    /// Create a new message service instance
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            chats: ChatRepository::new(pool.clone()),
            participants: ParticipantRepository::new(pool.clone()),
            messages: MessageRepository::new(pool),
        }
    }

    /// One page of a chat's messages in chronological order.
    ///
    /// Requires an active membership; the chat itself may be archived. Side
    /// effect: refreshes the caller's read marker and resets their cached
    /// unread counter.
    pub async fn get_chat_messages(
        &self,
        chat_public_id: &str,
        user_id: i64,
        page: i64,
        limit: i64,
    ) -> ChatResult<Vec<MessageRecord>> {
        let chat = self
            .chats
            .find_by_public_id(chat_public_id)
            .await?
            .ok_or(ChatError::NotFound("chat"))?;
        self.require_active_participant(chat.id, user_id).await?;

        let limit = if limit <= 0 { DEFAULT_PAGE_SIZE } else { limit.min(MAX_PAGE_SIZE) };
        let page = page.max(1);
        let offset = (page - 1) * limit;

        let mut messages = self.messages.list_page(chat.id, limit, offset).await?;
        // Fetched newest-first for paging; clients read oldest-first.
        messages.reverse();
        let records = self.hydrate(&chat, messages).await?;

        let now = chrono::Utc::now().to_rfc3339();
        self.participants
            .touch_last_seen(chat.id, user_id, &now)
            .await?;
        self.participants.reset_unread(chat.id, user_id).await?;

        Ok(records)
    }

    /// Persist a message and maintain the chat summary: bumps
    /// `last_message_id`/`updated_at` and increments every other
    /// participant's cached unread counter in one statement.
    pub async fn create_message(
        &self,
        chat_public_id: &str,
        sender_id: i64,
        draft: MessageDraft,
    ) -> ChatResult<MessageRecord> {
        let chat = self
            .chats
            .find_by_public_id(chat_public_id)
            .await?
            .filter(|chat| chat.is_active())
            .ok_or(ChatError::NotFound("chat"))?;

        let sender = self
            .participants
            .find(chat.id, sender_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(ChatError::NotFound("participant"))?;

        if chat.is_group() && chat.only_admins_can_send && !sender.role.is_privileged() {
            return Err(ChatError::Forbidden(
                "only admins can send messages in this chat",
            ));
        }

        let content = draft.content.trim();
        if content.is_empty() {
            return Err(ChatError::Validation(
                "message content must not be empty".to_string(),
            ));
        }

        if let Some(reply_to) = &draft.reply_to {
            let target = self
                .messages
                .find_by_public_id(reply_to)
                .await?
                .ok_or(ChatError::NotFound("message"))?;
            if target.chat_id != chat.id {
                return Err(ChatError::Validation(
                    "reply target belongs to a different chat".to_string(),
                ));
            }
        }

        let message = self
            .messages
            .create(&NewMessage {
                chat_id: chat.id,
                sender_id,
                content: content.to_string(),
                body: draft.body,
                reply_to: draft.reply_to,
                mentions: draft.mentions,
            })
            .await?;

        let now = chrono::Utc::now().to_rfc3339();
        self.chats
            .touch_last_message(chat.id, &message.public_id, &now)
            .await?;
        self.participants
            .increment_unread_except(chat.id, sender_id)
            .await?;

        Ok(MessageRecord {
            chat_public_id: chat.public_id,
            message,
            reactions: Vec::new(),
            read_by: Vec::new(),
        })
    }

    /// Replace a message's content. Only the original sender may edit, and
    /// only while the message is not soft-deleted.
    pub async fn edit_message(
        &self,
        message_public_id: &str,
        user_id: i64,
        new_content: &str,
    ) -> ChatResult<MessageRecord> {
        let message = self.require_live_message(message_public_id).await?;

        if message.sender_id != user_id {
            return Err(ChatError::Forbidden("only the sender can edit a message"));
        }

        let content = new_content.trim();
        if content.is_empty() {
            return Err(ChatError::Validation(
                "message content must not be empty".to_string(),
            ));
        }

        let now = chrono::Utc::now().to_rfc3339();
        self.messages.edit_content(message.id, content, &now).await?;

        info!(message_id = message.id, user_id = user_id, "edited message");

        let updated = self
            .messages
            .find_by_public_id(message_public_id)
            .await?
            .ok_or(ChatError::NotFound("message"))?;
        self.record(updated).await
    }

    /// Soft-delete a message. Only the original sender may delete.
    pub async fn delete_message(
        &self,
        message_public_id: &str,
        user_id: i64,
    ) -> ChatResult<MessageRecord> {
        let message = self.require_live_message(message_public_id).await?;

        if message.sender_id != user_id {
            return Err(ChatError::Forbidden("only the sender can delete a message"));
        }

        let now = chrono::Utc::now().to_rfc3339();
        self.messages.soft_delete(message.id, &now).await?;

        let updated = self
            .messages
            .find_by_public_id(message_public_id)
            .await?
            .ok_or(ChatError::NotFound("message"))?;
        self.record(updated).await
    }

    /// Set the caller's reaction on a message, replacing any prior one: a
    /// user holds at most one reaction per message.
    pub async fn add_reaction(
        &self,
        message_public_id: &str,
        user_id: i64,
        emoji: &str,
    ) -> ChatResult<MessageRecord> {
        if emoji.trim().is_empty() {
            return Err(ChatError::Validation("emoji must not be empty".to_string()));
        }

        let message = self.require_live_message(message_public_id).await?;
        self.require_active_participant(message.chat_id, user_id).await?;

        let now = chrono::Utc::now().to_rfc3339();
        self.messages
            .upsert_reaction(message.id, user_id, emoji.trim(), &now)
            .await?;

        self.record(message).await
    }

    /// Remove the caller's reaction if present.
    pub async fn remove_reaction(
        &self,
        message_public_id: &str,
        user_id: i64,
    ) -> ChatResult<MessageRecord> {
        let message = self.require_live_message(message_public_id).await?;
        self.require_active_participant(message.chat_id, user_id).await?;

        self.messages.remove_reaction(message.id, user_id).await?;

        self.record(message).await
    }

    /// Append the caller to the message's read receipts. Idempotent: a
    /// repeat call leaves a single entry.
    pub async fn mark_message_read(
        &self,
        message_public_id: &str,
        user_id: i64,
    ) -> ChatResult<MessageRecord> {
        let message = self
            .messages
            .find_by_public_id(message_public_id)
            .await?
            .ok_or(ChatError::NotFound("message"))?;
        self.require_active_participant(message.chat_id, user_id).await?;

        let now = chrono::Utc::now().to_rfc3339();
        self.messages.mark_read(message.id, user_id, &now).await?;

        self.record(message).await
    }

    /// The authoritative unread count for a participant, recomputed from
    /// message timestamps. The cached participant counter plays no part.
    pub async fn get_unread_count(&self, chat_public_id: &str, user_id: i64) -> ChatResult<i64> {
        let chat = self
            .chats
            .find_by_public_id(chat_public_id)
            .await?
            .ok_or(ChatError::NotFound("chat"))?;
        let participant = self.require_active_participant(chat.id, user_id).await?;

        Ok(self
            .messages
            .count_unread(chat.id, user_id, &participant.last_seen)
            .await?)
    }

    async fn require_active_participant(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> ChatResult<Participant> {
        self.participants
            .find(chat_id, user_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(ChatError::Forbidden("not an active participant of this chat"))
    }

    /// Resolve a message that has not been soft-deleted.
    async fn require_live_message(&self, message_public_id: &str) -> ChatResult<Message> {
        self.messages
            .find_by_public_id(message_public_id)
            .await?
            .filter(|m| !m.is_deleted)
            .ok_or(ChatError::NotFound("message"))
    }

    /// Materialize a single message with its reactions and read receipts.
    async fn record(&self, message: Message) -> ChatResult<MessageRecord> {
        let chat = self
            .chats
            .find_by_id(message.chat_id)
            .await?
            .ok_or(ChatError::NotFound("chat"))?;
        let reactions = self.messages.reactions_for_message(message.id).await?;
        let read_by = self.messages.reads_for_message(message.id).await?;

        Ok(MessageRecord {
            chat_public_id: chat.public_id,
            message,
            reactions,
            read_by,
        })
    }

    /// Materialize a page of messages with two batched lookups.
    async fn hydrate(&self, chat: &Chat, messages: Vec<Message>) -> ChatResult<Vec<MessageRecord>> {
        let ids: Vec<i64> = messages.iter().map(|m| m.id).collect();
        let reactions = self.messages.reactions_for_messages(&ids).await?;
        let reads = self.messages.reads_for_messages(&ids).await?;

        let mut reactions_by_message: HashMap<i64, Vec<Reaction>> = HashMap::new();
        for reaction in reactions {
            reactions_by_message
                .entry(reaction.message_id)
                .or_default()
                .push(reaction);
        }
        let mut reads_by_message: HashMap<i64, Vec<ReadReceipt>> = HashMap::new();
        for read in reads {
            reads_by_message.entry(read.message_id).or_default().push(read);
        }

        Ok(messages
            .into_iter()
            .map(|message| MessageRecord {
                chat_public_id: chat.public_id.clone(),
                reactions: reactions_by_message.remove(&message.id).unwrap_or_default(),
                read_by: reads_by_message.remove(&message.id).unwrap_or_default(),
                message,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ChatService;
    use crate::testing::{create_test_pool, seed_user};
    use crate::types::{ChatSettings, GroupMetadata};

    async fn pause() {
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    #[tokio::test]
    async fn test_create_message_updates_chat_summary() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;

        let chat = chats.get_or_create_direct_chat(ana, ben).await.unwrap();
        pause().await;
        let record = messages
            .create_message(&chat.public_id, ana, MessageDraft::text("hello"))
            .await
            .unwrap();
        assert_eq!(record.chat_public_id, chat.public_id);
        assert_eq!(record.message.content, "hello");

        let summaries = chats.get_user_chats(ben).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(
            summaries[0].chat.last_message_id.as_deref(),
            Some(record.message.public_id.as_str())
        );
        assert_eq!(summaries[0].unread_count, 1);
    }

    #[tokio::test]
    async fn test_create_message_validation_and_authorization() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;
        let outsider = seed_user(&pool, "Cem", "Demir").await;

        let chat = chats.get_or_create_direct_chat(ana, ben).await.unwrap();

        let result = messages
            .create_message(&chat.public_id, ana, MessageDraft::text("   "))
            .await;
        assert!(matches!(result, Err(ChatError::Validation(_))));

        let result = messages
            .create_message(&chat.public_id, outsider, MessageDraft::text("hi"))
            .await;
        assert!(matches!(result, Err(ChatError::NotFound("participant"))));

        let result = messages
            .create_message("no-such-chat", ana, MessageDraft::text("hi"))
            .await;
        assert!(matches!(result, Err(ChatError::NotFound("chat"))));
    }

    #[tokio::test]
    async fn test_only_admins_can_send_is_enforced() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;

        let chat = chats
            .create_group_chat(ana, &[ben], GroupMetadata::default())
            .await
            .unwrap();
        chats
            .update_chat_settings(
                &chat.public_id,
                ana,
                ChatSettings {
                    approval_required: false,
                    only_admins_can_send: true,
                },
            )
            .await
            .unwrap();

        let result = messages
            .create_message(&chat.public_id, ben, MessageDraft::text("hi"))
            .await;
        assert!(matches!(result, Err(ChatError::Forbidden(_))));

        let record = messages
            .create_message(&chat.public_id, ana, MessageDraft::text("announcement"))
            .await
            .unwrap();
        assert_eq!(record.message.sender_id, ana);
    }

    #[tokio::test]
    async fn test_reply_to_must_stay_within_the_chat() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;
        let cem = seed_user(&pool, "Cem", "Demir").await;

        let chat_ab = chats.get_or_create_direct_chat(ana, ben).await.unwrap();
        let chat_ac = chats.get_or_create_direct_chat(ana, cem).await.unwrap();

        let original = messages
            .create_message(&chat_ab.public_id, ana, MessageDraft::text("original"))
            .await
            .unwrap();

        let mut cross = MessageDraft::text("reply");
        cross.reply_to = Some(original.message.public_id.clone());
        let result = messages
            .create_message(&chat_ac.public_id, ana, cross)
            .await;
        assert!(matches!(result, Err(ChatError::Validation(_))));

        let mut ok = MessageDraft::text("reply");
        ok.reply_to = Some(original.message.public_id.clone());
        let record = messages
            .create_message(&chat_ab.public_id, ben, ok)
            .await
            .unwrap();
        assert_eq!(
            record.message.reply_to.as_deref(),
            Some(original.message.public_id.as_str())
        );
    }

    #[tokio::test]
    async fn test_edit_is_sender_only_and_flags_edited() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;

        let chat = chats.get_or_create_direct_chat(ana, ben).await.unwrap();
        let record = messages
            .create_message(&chat.public_id, ana, MessageDraft::text("typo"))
            .await
            .unwrap();

        let result = messages
            .edit_message(&record.message.public_id, ben, "hijack")
            .await;
        assert!(matches!(result, Err(ChatError::Forbidden(_))));

        let edited = messages
            .edit_message(&record.message.public_id, ana, "fixed")
            .await
            .unwrap();
        assert_eq!(edited.message.content, "fixed");
        assert!(edited.message.is_edited);
    }

    #[tokio::test]
    async fn test_deleted_message_is_excluded_everywhere() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;

        let chat = chats.get_or_create_direct_chat(ana, ben).await.unwrap();
        pause().await;
        let record = messages
            .create_message(&chat.public_id, ana, MessageDraft::text("oops"))
            .await
            .unwrap();

        // Deleting is sender-only.
        let result = messages.delete_message(&record.message.public_id, ben).await;
        assert!(matches!(result, Err(ChatError::Forbidden(_))));

        let deleted = messages
            .delete_message(&record.message.public_id, ana)
            .await
            .unwrap();
        assert!(deleted.message.is_deleted);
        assert!(deleted.message.deleted_at.is_some());

        // Gone from listings and unread counts, and no further edits.
        let listing = messages
            .get_chat_messages(&chat.public_id, ben, 1, 50)
            .await
            .unwrap();
        assert!(listing.is_empty());
        let result = messages
            .edit_message(&record.message.public_id, ana, "resurrect")
            .await;
        assert!(matches!(result, Err(ChatError::NotFound("message"))));
    }

    #[tokio::test]
    async fn test_reaction_replacement_per_user() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;

        let chat = chats.get_or_create_direct_chat(ana, ben).await.unwrap();
        let record = messages
            .create_message(&chat.public_id, ana, MessageDraft::text("hello"))
            .await
            .unwrap();

        messages
            .add_reaction(&record.message.public_id, ben, "👍")
            .await
            .unwrap();
        let after = messages
            .add_reaction(&record.message.public_id, ben, "🔥")
            .await
            .unwrap();

        assert_eq!(after.reactions.len(), 1);
        assert_eq!(after.reactions[0].user_id, ben);
        assert_eq!(after.reactions[0].emoji, "🔥");

        let cleared = messages
            .remove_reaction(&record.message.public_id, ben)
            .await
            .unwrap();
        assert!(cleared.reactions.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;

        let chat = chats.get_or_create_direct_chat(ana, ben).await.unwrap();
        let record = messages
            .create_message(&chat.public_id, ana, MessageDraft::text("hello"))
            .await
            .unwrap();

        messages
            .mark_message_read(&record.message.public_id, ben)
            .await
            .unwrap();
        let again = messages
            .mark_message_read(&record.message.public_id, ben)
            .await
            .unwrap();

        let ben_reads: Vec<_> = again.read_by.iter().filter(|r| r.user_id == ben).collect();
        assert_eq!(ben_reads.len(), 1);
    }

    #[tokio::test]
    async fn test_unread_count_is_computed_not_cached() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;

        let chat = chats.get_or_create_direct_chat(ana, ben).await.unwrap();
        pause().await;
        messages
            .create_message(&chat.public_id, ana, MessageDraft::text("one"))
            .await
            .unwrap();
        messages
            .create_message(&chat.public_id, ana, MessageDraft::text("two"))
            .await
            .unwrap();

        // Corrupt the cached counter; the computed count must not care.
        sqlx::query("UPDATE chat_participants SET unread_count = 99 WHERE user_id = ?")
            .bind(ben)
            .execute(&pool)
            .await
            .unwrap();

        assert_eq!(messages.get_unread_count(&chat.public_id, ben).await.unwrap(), 2);

        // Reading the chat moves the marker and zeroes the count.
        messages
            .get_chat_messages(&chat.public_id, ben, 1, 50)
            .await
            .unwrap();
        assert_eq!(messages.get_unread_count(&chat.public_id, ben).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_non_participant_never_sees_chat_data() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;
        let outsider = seed_user(&pool, "Cem", "Demir").await;

        let chat = chats.get_or_create_direct_chat(ana, ben).await.unwrap();
        messages
            .create_message(&chat.public_id, ana, MessageDraft::text("secret"))
            .await
            .unwrap();

        let result = messages
            .get_chat_messages(&chat.public_id, outsider, 1, 50)
            .await;
        assert!(matches!(result, Err(ChatError::Forbidden(_))));

        let result = messages.get_unread_count(&chat.public_id, outsider).await;
        assert!(matches!(result, Err(ChatError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_pagination_returns_chronological_pages() {
        let (pool, _temp_dir) = create_test_pool().await;
        let chats = ChatService::new(pool.clone());
        let messages = MessageService::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;
        let ben = seed_user(&pool, "Ben", "Cole").await;

        let chat = chats.get_or_create_direct_chat(ana, ben).await.unwrap();
        for i in 1..=5 {
            messages
                .create_message(&chat.public_id, ana, MessageDraft::text(format!("m{i}")))
                .await
                .unwrap();
            pause().await;
        }

        let newest = messages
            .get_chat_messages(&chat.public_id, ben, 1, 2)
            .await
            .unwrap();
        let contents: Vec<_> = newest.iter().map(|r| r.message.content.as_str()).collect();
        assert_eq!(contents, vec!["m4", "m5"]);

        let older = messages
            .get_chat_messages(&chat.public_id, ben, 2, 2)
            .await
            .unwrap();
        let contents: Vec<_> = older.iter().map(|r| r.message.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3"]);
    }
}
