//! Push subscription entity definitions

use serde::{Deserialize, Serialize};

/// A user's stored push endpoint. One row per user; replaced on re-subscribe
/// and pruned when the delivery provider reports the endpoint gone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: i64,
    pub user_id: i64,
    pub endpoint: String,
    pub auth_key: String,
    pub p256dh_key: String,
    pub created_at: String,
}

/// Fields required to store a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPushSubscription {
    pub endpoint: String,
    pub auth_key: String,
    pub p256dh_key: String,
}
