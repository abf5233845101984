//! Request extractors whose rejections speak the forum's error taxonomy.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Request, rejection::JsonRejection},
    http::StatusCode,
};
use axum_extra::headers::{ContentLength, HeaderMapExt};
use lions_avatar::MAX_AVATAR_BYTES;
use lions_types::ForumError;
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `Json<T>` that answers malformed bodies with a 400 validation error
/// instead of axum's plain-text 422.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Forum(ForumError::validation(format!("invalid input: {}", rejection.body_text())))
    }
}

fn too_large() -> ApiError {
    ApiError::Forum(ForumError::validation(format!(
        "avatar larger than {} bytes",
        MAX_AVATAR_BYTES
    )))
}

/// Raw avatar body plus its declared size. An oversized `Content-Length` is
/// refused before the body is read; a body that outgrows the route limit
/// gets the same validation error.
#[derive(Debug)]
pub struct AvatarBody {
    pub declared: u64,
    pub bytes: Bytes,
}

impl<S> FromRequest<S> for AvatarBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let declared = req.headers().typed_get::<ContentLength>().map(|ContentLength(len)| len);
        if declared.is_some_and(|len| len > MAX_AVATAR_BYTES) {
            return Err(too_large());
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                too_large()
            } else {
                ApiError::Forum(ForumError::validation(rejection.body_text()))
            }
        })?;

        Ok(Self {
            declared: declared.unwrap_or(bytes.len() as u64),
            bytes,
        })
    }
}
