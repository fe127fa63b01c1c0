//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use dispatch_chats::ChatError;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("authentication required: {0}")]
    Unauthenticated(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Chat(error) => match error {
                ChatError::Validation(_) => StatusCode::BAD_REQUEST,
                ChatError::NotFound(_) => StatusCode::NOT_FOUND,
                ChatError::Forbidden(_) => StatusCode::FORBIDDEN,
                ChatError::Conflict(_) => StatusCode::CONFLICT,
                ChatError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "gateway request failed");
        }
        let body = json!({
            "error": status.as_str(),
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<dispatch_database::StoreError> for GatewayError {
    fn from(error: dispatch_database::StoreError) -> Self {
        GatewayError::Chat(ChatError::from(error))
    }
}
