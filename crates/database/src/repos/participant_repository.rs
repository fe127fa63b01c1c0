//! Repository for participant data access operations.

use crate::entities::{Participant, ParticipantRole};
use crate::types::StoreResult;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

/// Repository for chat participant rows.
///
/// The `UNIQUE (chat_id, user_id)` constraint keeps the one-row-per-user
/// invariant; removal and re-adding operate on the same row.
pub struct ParticipantRepository {
    pool: SqlitePool,
}

fn participant_from_row(row: &SqliteRow) -> StoreResult<Participant> {
    let role: String = row.try_get("role")?;

    Ok(Participant {
        id: row.try_get("id")?,
        chat_id: row.try_get("chat_id")?,
        user_id: row.try_get("user_id")?,
        role: ParticipantRole::from(role.as_str()),
        is_active: row.try_get("is_active")?,
        unread_count: row.try_get("unread_count")?,
        last_seen: row.try_get("last_seen")?,
        muted: row.try_get("muted")?,
        joined_at: row.try_get("joined_at")?,
    })
}

impl ParticipantRepository {
    /// Create a new participant repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new participant row
    pub async fn add(
        &self,
        chat_id: i64,
        user_id: i64,
        role: ParticipantRole,
    ) -> StoreResult<Participant> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO chat_participants (chat_id, user_id, role, is_active, unread_count,
                                            last_seen, muted, joined_at)
             VALUES (?, ?, ?, 1, 0, ?, 0, ?)",
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(role.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(
            chat_id = chat_id,
            user_id = user_id,
            role = %role.to_string(),
            "added participant to chat"
        );

        Ok(Participant {
            id: result.last_insert_rowid(),
            chat_id,
            user_id,
            role,
            is_active: true,
            unread_count: 0,
            last_seen: now.clone(),
            muted: false,
            joined_at: now,
        })
    }

    /// Find the participant row for a user in a chat
    pub async fn find(&self, chat_id: i64, user_id: i64) -> StoreResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT id, chat_id, user_id, role, is_active, unread_count, last_seen, muted, joined_at
             FROM chat_participants WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(participant_from_row).transpose()
    }

    /// All participant rows for a chat, in join order
    pub async fn find_for_chat(&self, chat_id: i64) -> StoreResult<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT id, chat_id, user_id, role, is_active, unread_count, last_seen, muted, joined_at
             FROM chat_participants WHERE chat_id = ? ORDER BY joined_at ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(participant_from_row).collect()
    }

    /// User ids of all currently active participants
    pub async fn active_user_ids(&self, chat_id: i64) -> StoreResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT user_id FROM chat_participants WHERE chat_id = ? AND is_active = 1",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Bring a previously removed participant back, resetting their
    /// read-state. Reuses the existing row rather than inserting a duplicate.
    pub async fn reactivate(&self, chat_id: i64, user_id: i64) -> StoreResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE chat_participants
             SET is_active = 1, role = 'member', unread_count = 0, last_seen = ?
             WHERE chat_id = ? AND user_id = ?",
        )
        .bind(&now)
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        info!(chat_id = chat_id, user_id = user_id, "reactivated participant");
        Ok(())
    }

    /// Soft removal: the row is kept for history
    pub async fn deactivate(&self, chat_id: i64, user_id: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE chat_participants SET is_active = 0 WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        info!(chat_id = chat_id, user_id = user_id, "deactivated participant");
        Ok(())
    }

    /// Single-field update of the read marker
    pub async fn touch_last_seen(&self, chat_id: i64, user_id: i64, now: &str) -> StoreResult<()> {
        sqlx::query(
            "UPDATE chat_participants SET last_seen = ? WHERE chat_id = ? AND user_id = ?",
        )
        .bind(now)
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reset the cached unread counter
    pub async fn reset_unread(&self, chat_id: i64, user_id: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE chat_participants SET unread_count = 0 WHERE chat_id = ? AND user_id = ?",
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Single-field update of the caller's mute flag
    pub async fn set_muted(&self, chat_id: i64, user_id: i64, muted: bool) -> StoreResult<()> {
        sqlx::query("UPDATE chat_participants SET muted = ? WHERE chat_id = ? AND user_id = ?")
            .bind(muted)
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Bump the cached unread counter for every participant other than the
    /// sender in one statement. Applies regardless of `is_active`.
    pub async fn increment_unread_except(&self, chat_id: i64, sender_id: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE chat_participants SET unread_count = unread_count + 1
             WHERE chat_id = ? AND user_id != ?",
        )
        .bind(chat_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
