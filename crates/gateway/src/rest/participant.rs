//! Participant REST endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::GatewayResult;
use crate::payloads::ParticipantPayload;
use crate::rest::require_user_id;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    pub user_id: i64,
}

/// Create participant routes
pub fn create_participant_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/chats/:chat_id/participants", post(add_participant))
        .route(
            "/api/chats/:chat_id/participants/:user_id",
            axum::routing::delete(remove_participant),
        )
}

async fn add_participant(
    Path(chat_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<AddParticipantRequest>,
) -> GatewayResult<impl IntoResponse> {
    let caller = require_user_id(&headers)?;

    let participant = state
        .chat_service
        .add_participant(&chat_id, payload.user_id, caller)
        .await?;
    Ok((StatusCode::CREATED, Json(ParticipantPayload::from(participant))))
}

async fn remove_participant(
    Path((chat_id, user_id)): Path<(String, i64)>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> GatewayResult<StatusCode> {
    let caller = require_user_id(&headers)?;

    state
        .chat_service
        .remove_participant(&chat_id, user_id, caller)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
