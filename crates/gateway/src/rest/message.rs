//! Message REST endpoints

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use dispatch_chats::MessageDraft;
use dispatch_database::{FileData, Mention, MessageBody, MessageType};

use crate::error::{GatewayError, GatewayResult};
use crate::payloads::MessagePayload;
use crate::rest::require_user_id;
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub content: String,
    #[serde(default)]
    pub message_type: Option<MessageType>,
    #[serde(default)]
    pub reply_to: Option<String>,
    #[serde(default)]
    pub file_data: Option<FileData>,
    #[serde(default)]
    pub mentions: Vec<Mention>,
}

#[derive(Debug, Deserialize)]
pub struct EditMessageRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub emoji: String,
}

/// Create message routes
pub fn create_message_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route(
            "/api/chats/:chat_id/messages",
            get(list_messages).post(create_message),
        )
        .route(
            "/api/messages/:message_id",
            put(edit_message).delete(delete_message),
        )
        .route(
            "/api/messages/:message_id/reactions",
            post(add_reaction).delete(remove_reaction),
        )
        .route("/api/messages/:message_id/read", post(mark_message_read))
}

async fn list_messages(
    Path(chat_id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> GatewayResult<Json<Vec<MessagePayload>>> {
    let user_id = require_user_id(&headers)?;

    let records = state
        .message_service
        .get_chat_messages(
            &chat_id,
            user_id,
            query.page.unwrap_or(1),
            query.limit.unwrap_or(0),
        )
        .await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

async fn create_message(
    Path(chat_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<CreateMessageRequest>,
) -> GatewayResult<impl IntoResponse> {
    let user_id = require_user_id(&headers)?;

    let body = MessageBody::from_parts(
        payload.message_type.unwrap_or(MessageType::Text),
        payload.file_data,
    )
    .map_err(GatewayError::InvalidRequest)?;

    let record = state
        .message_service
        .create_message(
            &chat_id,
            user_id,
            MessageDraft {
                content: payload.content,
                body,
                reply_to: payload.reply_to,
                mentions: payload.mentions,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(MessagePayload::from(record))))
}

async fn edit_message(
    Path(message_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<EditMessageRequest>,
) -> GatewayResult<Json<MessagePayload>> {
    let user_id = require_user_id(&headers)?;

    let record = state
        .message_service
        .edit_message(&message_id, user_id, &payload.content)
        .await?;
    Ok(Json(MessagePayload::from(record)))
}

async fn delete_message(
    Path(message_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> GatewayResult<Json<MessagePayload>> {
    let user_id = require_user_id(&headers)?;

    let record = state
        .message_service
        .delete_message(&message_id, user_id)
        .await?;
    Ok(Json(MessagePayload::from(record)))
}

async fn add_reaction(
    Path(message_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
    Json(payload): Json<ReactionRequest>,
) -> GatewayResult<Json<MessagePayload>> {
    let user_id = require_user_id(&headers)?;

    let record = state
        .message_service
        .add_reaction(&message_id, user_id, &payload.emoji)
        .await?;
    Ok(Json(MessagePayload::from(record)))
}

async fn remove_reaction(
    Path(message_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> GatewayResult<Json<MessagePayload>> {
    let user_id = require_user_id(&headers)?;

    let record = state
        .message_service
        .remove_reaction(&message_id, user_id)
        .await?;
    Ok(Json(MessagePayload::from(record)))
}

async fn mark_message_read(
    Path(message_id): Path<String>,
    State(state): State<Arc<GatewayState>>,
    headers: HeaderMap,
) -> GatewayResult<Json<MessagePayload>> {
    let user_id = require_user_id(&headers)?;

    let record = state
        .message_service
        .mark_message_read(&message_id, user_id)
        .await?;
    Ok(Json(MessagePayload::from(record)))
}
