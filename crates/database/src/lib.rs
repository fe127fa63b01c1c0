//! Dispatch Chat Store
//!
//! Persistence layer for the Dispatch backend: connection management,
//! migrations, and repositories over the chat, participant, message, and
//! push-subscription tables.

use sqlx::SqlitePool;

use dispatch_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{
    ChatRepository, MessageRepository, ParticipantRepository, SubscriptionRepository,
};

// Re-export entities
pub use entities::{
    chat::{Chat, ChatStatus, ChatType, NewChat},
    message::{
        FileData, Mention, Message, MessageBody, MessageType, NewMessage, Reaction, ReadReceipt,
    },
    participant::{Participant, ParticipantRole},
    subscription::{NewPushSubscription, PushSubscription},
};

// Re-export types
pub use types::{errors::StoreError, StoreResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> StoreResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

    Ok(pool)
}
