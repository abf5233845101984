use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use lions_db::SessionUser;
use subtle::ConstantTimeEq;

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "session_id";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The optional signed-in user, attached to every request. `None` is a
/// perfectly normal anonymous visitor.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<SessionUser>);

impl Viewer {
    pub fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|s| s.user.id)
    }
}

/// Session token from the `session_id` cookie, falling back to an
/// `Authorization: Bearer` header for non-browser clients.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty());
    if from_cookie.is_some() {
        return from_cookie;
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
        .filter(|t| !t.is_empty())
}

/// Constant-time comparison of the presented CSRF token against the
/// session's. An empty token never matches.
pub fn csrf_matches(presented: &str, expected: &str) -> bool {
    !presented.is_empty() && bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
}

/// Resolve the session (if any) and attach a [`Viewer`].
pub async fn resolve_viewer(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let viewer = match session_token(req.headers()) {
        Some(token) => db_call(&state, move |db| db.resolve_session(&token)).await?,
        None => None,
    };
    req.extensions_mut().insert(Viewer(viewer));
    Ok(next.run(req).await)
}

/// Gate for state-changing routes: needs a live session and the session's
/// CSRF token in the `X-CSRF-Token` header. Attaches the [`SessionUser`].
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<Viewer>()
        .and_then(|v| v.0.clone())
        .ok_or(ApiError::Unauthorized)?;

    let presented = req
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !csrf_matches(presented, &user.csrf_token) {
        return Err(ApiError::Csrf);
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
