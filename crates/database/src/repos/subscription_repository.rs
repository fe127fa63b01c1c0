//! Repository for push subscription data access operations.

use crate::entities::{NewPushSubscription, PushSubscription};
use crate::types::StoreResult;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::info;

/// Repository for stored push endpoints, one per user.
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

fn subscription_from_row(row: &SqliteRow) -> StoreResult<PushSubscription> {
    Ok(PushSubscription {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        endpoint: row.try_get("endpoint")?,
        auth_key: row.try_get("auth_key")?,
        p256dh_key: row.try_get("p256dh_key")?,
        created_at: row.try_get("created_at")?,
    })
}

impl SubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store or replace the user's subscription endpoint
    pub async fn upsert_for_user(
        &self,
        user_id: i64,
        request: &NewPushSubscription,
    ) -> StoreResult<PushSubscription> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO push_subscriptions (user_id, endpoint, auth_key, p256dh_key, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (user_id)
             DO UPDATE SET endpoint = excluded.endpoint, auth_key = excluded.auth_key,
                           p256dh_key = excluded.p256dh_key, created_at = excluded.created_at",
        )
        .bind(user_id)
        .bind(&request.endpoint)
        .bind(&request.auth_key)
        .bind(&request.p256dh_key)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        info!(user_id = user_id, "stored push subscription");

        self.find_by_user(user_id)
            .await?
            .ok_or_else(|| crate::StoreError::Database("subscription vanished after upsert".into()))
    }

    /// Look up the stored subscription for a user
    pub async fn find_by_user(&self, user_id: i64) -> StoreResult<Option<PushSubscription>> {
        let row = sqlx::query(
            "SELECT id, user_id, endpoint, auth_key, p256dh_key, created_at
             FROM push_subscriptions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(subscription_from_row).transpose()
    }

    /// Drop the stored subscription, e.g. after the provider reports the
    /// endpoint permanently gone.
    pub async fn delete_for_user(&self, user_id: i64) -> StoreResult<()> {
        sqlx::query("DELETE FROM push_subscriptions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        info!(user_id = user_id, "removed push subscription");
        Ok(())
    }
}
