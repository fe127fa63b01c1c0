//! Dispatch Chat Service
//!
//! The messaging core: chat and message lifecycle, authorization rules, and
//! unread accounting. Pure logic over the chat store; no transport awareness.

pub mod services;
pub mod types;

pub use services::{ChatService, MessageService};
pub use types::{
    ChatError, ChatResult, ChatSettings, ChatSummary, GroupMetadata, MessageDraft, MessageRecord,
};

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    /// Create a migrated throwaway database for service tests.
    pub async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let config = dispatch_config::DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
        };

        let pool = dispatch_database::prepare_database(&config)
            .await
            .expect("failed to create test database");
        dispatch_database::run_migrations(&pool)
            .await
            .expect("failed to migrate test database");

        (pool, temp_dir)
    }

    /// Insert a directory user and return its id.
    pub async fn seed_user(pool: &SqlitePool, first_name: &str, last_name: &str) -> i64 {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (public_id, first_name, last_name, role, occupation, created_at, updated_at)
             VALUES (?, ?, ?, 'user', NULL, ?, ?)",
        )
        .bind(cuid2::cuid())
        .bind(first_name)
        .bind(last_name)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("failed to seed user")
        .last_insert_rowid()
    }
}
