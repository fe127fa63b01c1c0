//! REST facade: thin HTTP endpoints mirroring the chat service.

pub mod chat;
pub mod health;
pub mod message;
pub mod participant;
pub mod push;

use axum::http::HeaderMap;
use axum::Router;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::state::GatewayState;

/// Create all REST routes
pub fn create_rest_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .merge(health::create_health_routes())
        .merge(chat::create_chat_routes())
        .merge(message::create_message_routes())
        .merge(participant::create_participant_routes())
        .merge(push::create_push_routes())
}

/// Resolve the caller's identity from the trusted upstream auth header.
pub(crate) fn require_user_id(headers: &HeaderMap) -> Result<i64, GatewayError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok())
        .ok_or_else(|| {
            GatewayError::Unauthenticated("missing or invalid x-user-id header".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_require_user_id_parses_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("42"));
        assert_eq!(require_user_id(&headers).unwrap(), 42);
    }

    #[test]
    fn test_require_user_id_rejects_missing_or_malformed() {
        let headers = HeaderMap::new();
        assert!(require_user_id(&headers).is_err());

        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", HeaderValue::from_static("not-a-number"));
        assert!(require_user_id(&headers).is_err());
    }
}
