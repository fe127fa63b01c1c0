//! Shared application state for the gateway

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use dispatch_chats::{ChatService, MessageService};
use dispatch_config::PushConfig;
use dispatch_database::SubscriptionRepository;
use dispatch_push::{PushDispatcher, WebPushProvider};
use dispatch_users::UserDirectory;

use crate::websocket::RealtimeState;

/// Shared application state containing all services
pub struct GatewayState {
    /// Database connection pool
    pub pool: SqlitePool,
    /// Chat lifecycle and participant management
    pub chat_service: ChatService,
    /// Message lifecycle
    pub message_service: MessageService,
    /// Identity lookups
    pub directory: UserDirectory,
    /// Stored push endpoints
    pub subscriptions: SubscriptionRepository,
    /// Out-of-band delivery for offline participants
    pub push: PushDispatcher<WebPushProvider>,
    /// Connection and room registry
    pub realtime: RealtimeState,
    /// Deep-link base used in push payloads
    pub link_base: String,
}

impl GatewayState {
    /// Create a new gateway state with all services initialized
    pub fn new(pool: SqlitePool, push_config: &PushConfig) -> anyhow::Result<Arc<Self>> {
        let provider =
            WebPushProvider::new(Duration::from_secs(push_config.request_timeout_seconds))?;

        Ok(Arc::new(Self {
            chat_service: ChatService::new(pool.clone()),
            message_service: MessageService::new(pool.clone()),
            directory: UserDirectory::new(pool.clone()),
            subscriptions: SubscriptionRepository::new(pool.clone()),
            push: PushDispatcher::new(pool.clone(), provider, push_config.enabled),
            realtime: RealtimeState::new(),
            link_base: push_config.link_base.clone().unwrap_or_default(),
            pool,
        }))
    }
}
