//! Chat REST endpoints

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use dispatch_chats::{ChatSettings, GroupMetadata};

use crate::error::GatewayResult;
use crate::payloads::{ChatPayload, ChatSummaryPayload};
use crate::rest::require_user_id;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct DirectChatRequest {
    pub recipient_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct GroupChatRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    pub participant_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ChatSettingsRequest {
    pub approval_required: bool,
    pub only_admins_can_send: bool,
}

#[derive(Debug, Deserialize)]
pub struct NotificationSettingsRequest {
    pub muted: bool,
}

/// Create chat routes
pub fn create_chat_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/api/chats", get(list_chats))
        .route("/api/chats/direct", post(get_or_create_direct_chat))
        .route("/api/chats/group", post(create_group_chat))
        .route("/api/chats/:chat_id/settings", put(update_chat_settings))
        .route(
            "/api/chats/:chat_id/notifications",
            put(update_notification_settings),
        )
        .route("/api/chats/:chat_id/unread", get(get_unread_count))
}

async fn list_chats(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> GatewayResult<Json<Vec<ChatSummaryPayload>>> {
    let user_id = require_user_id(&headers)?;

    let summaries = state.chat_service.get_user_chats(user_id).await?;
    Ok(Json(summaries.into_iter().map(Into::into).collect()))
}

async fn get_or_create_direct_chat(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<DirectChatRequest>,
) -> GatewayResult<Json<ChatPayload>> {
    let user_id = require_user_id(&headers)?;

    let chat = state
        .chat_service
        .get_or_create_direct_chat(user_id, payload.recipient_id)
        .await?;
    Ok(Json(ChatPayload::from(chat)))
}

async fn create_group_chat(
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<GroupChatRequest>,
) -> GatewayResult<impl IntoResponse> {
    let user_id = require_user_id(&headers)?;

    let chat = state
        .chat_service
        .create_group_chat(
            user_id,
            &payload.participant_ids,
            GroupMetadata {
                name: payload.name,
                avatar_url: payload.avatar_url,
                is_public: payload.is_public,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ChatPayload::from(chat))))
}

async fn update_chat_settings(
    Path(chat_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatSettingsRequest>,
) -> GatewayResult<Json<ChatPayload>> {
    let user_id = require_user_id(&headers)?;

    let chat = state
        .chat_service
        .update_chat_settings(
            &chat_id,
            user_id,
            ChatSettings {
                approval_required: payload.approval_required,
                only_admins_can_send: payload.only_admins_can_send,
            },
        )
        .await?;
    Ok(Json(ChatPayload::from(chat)))
}

async fn update_notification_settings(
    Path(chat_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<NotificationSettingsRequest>,
) -> GatewayResult<StatusCode> {
    let user_id = require_user_id(&headers)?;

    state
        .chat_service
        .update_notification_settings(&chat_id, user_id, payload.muted)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_unread_count(
    Path(chat_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> GatewayResult<Json<serde_json::Value>> {
    let user_id = require_user_id(&headers)?;

    let unread_count = state
        .message_service
        .get_unread_count(&chat_id, user_id)
        .await?;
    Ok(Json(json!({ "unread_count": unread_count })))
}
