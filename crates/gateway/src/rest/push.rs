//! Push subscription REST endpoints

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::put,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use dispatch_database::NewPushSubscription;

use crate::error::GatewayResult;
use crate::rest::require_user_id;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub endpoint: String,
    pub auth_key: String,
    pub p256dh_key: String,
}

/// Create push subscription routes
pub fn create_push_routes() -> Router<Arc<GatewayState>> {
    Router::new().route(
        "/api/push/subscription",
        put(store_subscription).delete(remove_subscription),
    )
}

async fn store_subscription(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<SubscriptionRequest>,
) -> GatewayResult<StatusCode> {
    let user_id = require_user_id(&headers)?;

    state
        .subscriptions
        .upsert_for_user(
            user_id,
            &NewPushSubscription {
                endpoint: payload.endpoint,
                auth_key: payload.auth_key,
                p256dh_key: payload.p256dh_key,
            },
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_subscription(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> GatewayResult<StatusCode> {
    let user_id = require_user_id(&headers)?;

    state.subscriptions.delete_for_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
