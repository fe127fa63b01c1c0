//! Dispatch User Directory
//!
//! Identity records live in an upstream system; the chat core only ever asks
//! "who is user N". This crate is that narrow lookup surface.

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

/// A user identity record as seen by the chat core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub public_id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub occupation: Option<String>,
}

impl UserProfile {
    /// Human-readable name used in push payloads and chat titles.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Errors surfaced by directory lookups.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for DirectoryError {
    fn from(error: sqlx::Error) -> Self {
        DirectoryError::Database(error.to_string())
    }
}

/// Lookup-by-id service over the users table.
#[derive(Clone)]
pub struct UserDirectory {
    pool: SqlitePool,
}

impl UserDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve a user id; `None` when the id does not exist.
    pub async fn find_by_id(&self, user_id: i64) -> Result<Option<UserProfile>, DirectoryError> {
        let row = sqlx::query(
            "SELECT id, public_id, first_name, last_name, role, occupation
             FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(UserProfile {
                id: row.try_get("id")?,
                public_id: row.try_get("public_id")?,
                first_name: row.try_get("first_name")?,
                last_name: row.try_get("last_name")?,
                role: row.try_get("role")?,
                occupation: row.try_get("occupation")?,
            })),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let config = dispatch_config::DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
        };

        let pool = dispatch_database::prepare_database(&config).await.unwrap();
        dispatch_database::run_migrations(&pool).await.unwrap();
        (pool, temp_dir)
    }

    async fn seed_user(pool: &SqlitePool, first_name: &str, last_name: &str) -> i64 {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (public_id, first_name, last_name, role, occupation, created_at, updated_at)
             VALUES (?, ?, ?, 'responder', 'paramedic', ?, ?)",
        )
        .bind(cuid2::cuid())
        .bind(first_name)
        .bind(last_name)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_find_by_id_resolves_existing_user() {
        let (pool, _temp_dir) = create_test_pool().await;
        let directory = UserDirectory::new(pool.clone());
        let ana = seed_user(&pool, "Ana", "Berg").await;

        let profile = directory.find_by_id(ana).await.unwrap().unwrap();
        assert_eq!(profile.id, ana);
        assert_eq!(profile.display_name(), "Ana Berg");
        assert_eq!(profile.role, "responder");
        assert_eq!(profile.occupation.as_deref(), Some("paramedic"));
    }

    #[tokio::test]
    async fn test_find_by_id_returns_none_for_unknown_user() {
        let (pool, _temp_dir) = create_test_pool().await;
        let directory = UserDirectory::new(pool);

        assert!(directory.find_by_id(424242).await.unwrap().is_none());
    }
}
