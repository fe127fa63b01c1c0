//! Repository for chat data access operations.

use crate::entities::{Chat, ChatStatus, ChatType, NewChat};
use crate::types::StoreResult;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

/// Repository for chat database operations
pub struct ChatRepository {
    pool: SqlitePool,
}

fn chat_from_row(row: &SqliteRow) -> StoreResult<Chat> {
    let chat_type: String = row.try_get("chat_type")?;
    let status: String = row.try_get("status")?;

    Ok(Chat {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        chat_type: ChatType::from(chat_type.as_str()),
        status: ChatStatus::from(status.as_str()),
        name: row.try_get("name")?,
        avatar_url: row.try_get("avatar_url")?,
        created_by: row.try_get("created_by")?,
        is_public: row.try_get("is_public")?,
        approval_required: row.try_get("approval_required")?,
        only_admins_can_send: row.try_get("only_admins_can_send")?,
        last_message_id: row.try_get("last_message_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl ChatRepository {
    /// Create a new chat repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new chat row
    pub async fn create(&self, request: &NewChat) -> StoreResult<Chat> {
        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO chats (public_id, chat_type, status, name, avatar_url, created_by,
                                is_public, approval_required, only_admins_can_send,
                                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.chat_type.to_string())
        .bind(ChatStatus::Active.to_string())
        .bind(&request.name)
        .bind(&request.avatar_url)
        .bind(request.created_by)
        .bind(request.is_public)
        .bind(request.approval_required)
        .bind(request.only_admins_can_send)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let chat_id = result.last_insert_rowid();

        info!(
            chat_id = chat_id,
            public_id = %public_id,
            created_by = request.created_by,
            chat_type = %request.chat_type.to_string(),
            "created new chat"
        );

        Ok(Chat {
            id: chat_id,
            public_id,
            chat_type: request.chat_type,
            status: ChatStatus::Active,
            name: request.name.clone(),
            avatar_url: request.avatar_url.clone(),
            created_by: request.created_by,
            is_public: request.is_public,
            approval_required: request.approval_required,
            only_admins_can_send: request.only_admins_can_send,
            last_message_id: None,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Find a chat by public id. Deleted chats are invisible.
    pub async fn find_by_public_id(&self, public_id: &str) -> StoreResult<Option<Chat>> {
        let row = sqlx::query(
            "SELECT id, public_id, chat_type, status, name, avatar_url, created_by,
                    is_public, approval_required, only_admins_can_send, last_message_id,
                    created_at, updated_at
             FROM chats WHERE public_id = ? AND status != 'deleted'",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(chat_from_row).transpose()
    }

    /// Find a chat by row id, regardless of status. Internal resolution for
    /// entities that reference chats by id.
    pub async fn find_by_id(&self, chat_id: i64) -> StoreResult<Option<Chat>> {
        let row = sqlx::query(
            "SELECT id, public_id, chat_type, status, name, avatar_url, created_by,
                    is_public, approval_required, only_admins_can_send, last_message_id,
                    created_at, updated_at
             FROM chats WHERE id = ?",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(chat_from_row).transpose()
    }

    /// Replace the chat's settings flags
    pub async fn update_settings(
        &self,
        chat_id: i64,
        approval_required: bool,
        only_admins_can_send: bool,
    ) -> StoreResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE chats SET approval_required = ?, only_admins_can_send = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(approval_required)
        .bind(only_admins_can_send)
        .bind(&now)
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Find the active direct chat containing exactly these two users.
    pub async fn find_direct_chat(&self, user_id: i64, recipient_id: i64) -> StoreResult<Option<Chat>> {
        let row = sqlx::query(
            "SELECT c.id, c.public_id, c.chat_type, c.status, c.name, c.avatar_url, c.created_by,
                    c.is_public, c.approval_required, c.only_admins_can_send, c.last_message_id,
                    c.created_at, c.updated_at
             FROM chats c
             JOIN chat_participants p1 ON c.id = p1.chat_id AND p1.user_id = ?
             JOIN chat_participants p2 ON c.id = p2.chat_id AND p2.user_id = ?
             WHERE c.chat_type = 'individual' AND c.status = 'active'
             LIMIT 1",
        )
        .bind(user_id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(chat_from_row).transpose()
    }

    /// All active chats where the user is an active participant, most
    /// recently updated first.
    pub async fn find_chats_for_user(&self, user_id: i64) -> StoreResult<Vec<Chat>> {
        let rows = sqlx::query(
            "SELECT c.id, c.public_id, c.chat_type, c.status, c.name, c.avatar_url, c.created_by,
                    c.is_public, c.approval_required, c.only_admins_can_send, c.last_message_id,
                    c.created_at, c.updated_at
             FROM chats c
             JOIN chat_participants p ON c.id = p.chat_id
             WHERE p.user_id = ? AND p.is_active = 1 AND c.status = 'active'
             ORDER BY c.updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(chat_from_row).collect()
    }

    /// Record the newest message on the chat summary. `last_message_id` and
    /// the unread counters are independent writes; readers must not assume
    /// atomicity across the two.
    pub async fn touch_last_message(
        &self,
        chat_id: i64,
        message_public_id: &str,
        now: &str,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE chats SET last_message_id = ?, updated_at = ? WHERE id = ?")
            .bind(message_public_id)
            .bind(now)
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
