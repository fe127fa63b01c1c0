//! Repository for message data access operations.

use crate::entities::{FileData, Mention, Message, MessageType, NewMessage, Reaction, ReadReceipt};
use crate::types::StoreResult;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

const MESSAGE_COLUMNS: &str = "id, public_id, chat_id, sender_id, content, message_type, reply_to,
        file_name, file_original_name, file_size, file_mime_type, file_url, file_duration,
        mentions, is_edited, is_deleted, deleted_at, created_at, updated_at";

/// Repository for message database operations
pub struct MessageRepository {
    pool: SqlitePool,
}

fn message_from_row(row: &SqliteRow) -> StoreResult<Message> {
    let message_type: String = row.try_get("message_type")?;
    let mentions_json: String = row.try_get("mentions")?;
    let mentions: Vec<Mention> = serde_json::from_str(&mentions_json)?;

    let file_url: Option<String> = row.try_get("file_url")?;
    let file_data = match file_url {
        Some(url) => Some(FileData {
            file_name: row.try_get::<Option<String>, _>("file_name")?.unwrap_or_default(),
            original_name: row
                .try_get::<Option<String>, _>("file_original_name")?
                .unwrap_or_default(),
            size: row.try_get::<Option<i64>, _>("file_size")?.unwrap_or_default(),
            mime_type: row
                .try_get::<Option<String>, _>("file_mime_type")?
                .unwrap_or_default(),
            url,
            duration: row.try_get("file_duration")?,
        }),
        None => None,
    };

    Ok(Message {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        chat_id: row.try_get("chat_id")?,
        sender_id: row.try_get("sender_id")?,
        content: row.try_get("content")?,
        message_type: MessageType::from(message_type.as_str()),
        reply_to: row.try_get("reply_to")?,
        file_data,
        mentions,
        is_edited: row.try_get("is_edited")?,
        is_deleted: row.try_get("is_deleted")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn reaction_from_row(row: &SqliteRow) -> StoreResult<Reaction> {
    Ok(Reaction {
        message_id: row.try_get("message_id")?,
        user_id: row.try_get("user_id")?,
        emoji: row.try_get("emoji")?,
        reacted_at: row.try_get("reacted_at")?,
    })
}

fn read_from_row(row: &SqliteRow) -> StoreResult<ReadReceipt> {
    Ok(ReadReceipt {
        message_id: row.try_get("message_id")?,
        user_id: row.try_get("user_id")?,
        read_at: row.try_get("read_at")?,
    })
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new message row
    pub async fn create(&self, request: &NewMessage) -> StoreResult<Message> {
        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();
        let message_type = request.body.message_type();
        let file = request.body.file_data();
        let mentions_json = serde_json::to_string(&request.mentions)?;

        let result = sqlx::query(
            "INSERT INTO messages (public_id, chat_id, sender_id, content, message_type, reply_to,
                                   file_name, file_original_name, file_size, file_mime_type,
                                   file_url, file_duration, mentions, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.chat_id)
        .bind(request.sender_id)
        .bind(&request.content)
        .bind(message_type.to_string())
        .bind(&request.reply_to)
        .bind(file.map(|f| f.file_name.clone()))
        .bind(file.map(|f| f.original_name.clone()))
        .bind(file.map(|f| f.size))
        .bind(file.map(|f| f.mime_type.clone()))
        .bind(file.map(|f| f.url.clone()))
        .bind(file.and_then(|f| f.duration))
        .bind(&mentions_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let message_id = result.last_insert_rowid();

        info!(
            message_id = message_id,
            public_id = %public_id,
            chat_id = request.chat_id,
            sender_id = request.sender_id,
            message_type = %message_type.to_string(),
            "created new message"
        );

        Ok(Message {
            id: message_id,
            public_id,
            chat_id: request.chat_id,
            sender_id: request.sender_id,
            content: request.content.clone(),
            message_type,
            reply_to: request.reply_to.clone(),
            file_data: file.cloned(),
            mentions: request.mentions.clone(),
            is_edited: false,
            is_deleted: false,
            deleted_at: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Find a message by its public id. Soft-deleted messages are returned;
    /// callers decide whether the deletion flag matters.
    pub async fn find_by_public_id(&self, public_id: &str) -> StoreResult<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    /// One page of non-deleted messages, newest first
    pub async fn list_page(
        &self,
        chat_id: i64,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE chat_id = ? AND is_deleted = 0
             ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(chat_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(message_from_row).collect()
    }

    /// Replace the content of a message and flag it as edited
    pub async fn edit_content(&self, message_id: i64, content: &str, now: &str) -> StoreResult<()> {
        sqlx::query("UPDATE messages SET content = ?, is_edited = 1, updated_at = ? WHERE id = ?")
            .bind(content)
            .bind(now)
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Soft delete: the row is kept so replies and chat summaries keep
    /// resolving.
    pub async fn soft_delete(&self, message_id: i64, now: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE messages SET is_deleted = 1, deleted_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(now)
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        info!(message_id = message_id, "soft deleted message");
        Ok(())
    }

    /// Set or replace a user's reaction. The unique (message, user) key makes
    /// a second reaction from the same user overwrite the first.
    pub async fn upsert_reaction(
        &self,
        message_id: i64,
        user_id: i64,
        emoji: &str,
        now: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO message_reactions (message_id, user_id, emoji, reacted_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (message_id, user_id)
             DO UPDATE SET emoji = excluded.emoji, reacted_at = excluded.reacted_at",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(emoji)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a user's reaction if present
    pub async fn remove_reaction(&self, message_id: i64, user_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM message_reactions WHERE message_id = ? AND user_id = ?")
            .bind(message_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All reactions on a message
    pub async fn reactions_for_message(&self, message_id: i64) -> StoreResult<Vec<Reaction>> {
        let rows = sqlx::query(
            "SELECT message_id, user_id, emoji, reacted_at FROM message_reactions
             WHERE message_id = ? ORDER BY reacted_at ASC",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(reaction_from_row).collect()
    }

    /// Reactions for a batch of messages in one query
    pub async fn reactions_for_messages(&self, message_ids: &[i64]) -> StoreResult<Vec<Reaction>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; message_ids.len()].join(", ");
        let sql = format!(
            "SELECT message_id, user_id, emoji, reacted_at FROM message_reactions
             WHERE message_id IN ({placeholders}) ORDER BY reacted_at ASC"
        );

        let mut query = sqlx::query(&sql);
        for id in message_ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(reaction_from_row).collect()
    }

    /// Record that a user has read a message. Idempotent: a repeat call for
    /// the same (message, user) leaves a single row.
    pub async fn mark_read(&self, message_id: i64, user_id: i64, now: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at) VALUES (?, ?, ?)",
        )
        .bind(message_id)
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All read receipts on a message
    pub async fn reads_for_message(&self, message_id: i64) -> StoreResult<Vec<ReadReceipt>> {
        let rows = sqlx::query(
            "SELECT message_id, user_id, read_at FROM message_reads
             WHERE message_id = ? ORDER BY read_at ASC",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(read_from_row).collect()
    }

    /// Read receipts for a batch of messages in one query
    pub async fn reads_for_messages(&self, message_ids: &[i64]) -> StoreResult<Vec<ReadReceipt>> {
        if message_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; message_ids.len()].join(", ");
        let sql = format!(
            "SELECT message_id, user_id, read_at FROM message_reads
             WHERE message_id IN ({placeholders}) ORDER BY read_at ASC"
        );

        let mut query = sqlx::query(&sql);
        for id in message_ids {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(read_from_row).collect()
    }

    /// The authoritative unread count: non-deleted messages from other
    /// senders newer than the participant's read marker.
    pub async fn count_unread(
        &self,
        chat_id: i64,
        user_id: i64,
        last_seen: &str,
    ) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages
             WHERE chat_id = ? AND sender_id != ? AND is_deleted = 0 AND created_at > ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(last_seen)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
