use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lions_types::ForumError;
use thiserror::Error;
use tracing::error;

/// Everything a handler can fail with: the forum taxonomy plus the outcomes
/// that only exist at the HTTP boundary.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Forum(#[from] ForumError),

    #[error("login required")]
    Unauthorized,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("missing or invalid CSRF token")]
    Csrf,

    #[error("background task failed")]
    Join(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Forum(ForumError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Forum(ForumError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Forum(ForumError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Forum(ForumError::Storage(_)) | Self::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Csrf => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Storage details stay in the log.
        let message = match &self {
            Self::Forum(ForumError::Storage(e)) => {
                error!("Storage failure: {:#}", e);
                "something went wrong, please try again".to_string()
            }
            Self::Join(_) => "something went wrong, please try again".to_string(),
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
