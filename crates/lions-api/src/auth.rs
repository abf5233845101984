use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use lions_avatar::AvatarStore;
use lions_db::{Database, NewSession};
use lions_types::api::{LoginRequest, MeResponse, RegisterRequest, SessionResponse};
use lions_types::{ForumError, ForumResult};
use time::Duration;
use tracing::info;

use crate::db_call;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{SESSION_COOKIE, Viewer, session_token};
use crate::password::{hash_password, verify_password};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub avatars: AvatarStore,
    /// Adds `Secure` to the session cookie; enable behind HTTPS.
    pub cookie_secure: bool,
}

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 32;
const PASSWORD_MIN: usize = 8;

/// Trimmed (email, username) after the registration rules have passed.
fn validate_registration(req: &RegisterRequest) -> ForumResult<(String, String)> {
    let email = req.email.trim();
    let username = req.username.trim();

    if email.is_empty() || username.is_empty() || req.password.is_empty() {
        return Err(ForumError::validation("email, username and password are required"));
    }
    if !email.contains('@') {
        return Err(ForumError::validation("email address looks invalid"));
    }
    let name_len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&name_len) {
        return Err(ForumError::validation(format!(
            "username must be {}-{} characters",
            USERNAME_MIN, USERNAME_MAX
        )));
    }
    // Usernames end up in profile URLs verbatim.
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        return Err(ForumError::validation("username may only use letters, digits, '_', '-' and '.'"));
    }
    if req.password.chars().count() < PASSWORD_MIN {
        return Err(ForumError::validation(format!(
            "password must be at least {} characters",
            PASSWORD_MIN
        )));
    }

    Ok((email.to_string(), username.to_string()))
}

pub(crate) fn session_cookie(session: &NewSession, secure: bool) -> Cookie<'static> {
    let max_age = (session.expires_at - chrono::Utc::now().timestamp()).max(0);
    Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .max_age(Duration::seconds(max_age))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn cleared_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    cookie.make_removal();
    cookie
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, username) = validate_registration(&req)?;
    let password = req.password;

    // A duplicate email/username fails at insert time, before any session
    // is created.
    let name = username.clone();
    let (user_id, session) = db_call(&state, move |db| {
        let hash = hash_password(&password)?;
        let user_id = db.create_user(&email, &name, &hash)?;
        let session = db.create_session(user_id)?;
        Ok::<_, ApiError>((user_id, session))
    })
    .await?;

    let jar = CookieJar::new().add(session_cookie(&session, state.cookie_secure));
    Ok((
        StatusCode::CREATED,
        jar,
        Json(SessionResponse {
            user_id,
            username,
            csrf_token: session.csrf_token,
            expires_at: session.expires_at,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_string();
    let password = req.password;

    let (user, session) = db_call(&state, move |db| -> Result<_, ApiError> {
        let user = db
            .get_credentials_by_email(&email)?
            .ok_or(ApiError::InvalidCredentials)?;
        if !verify_password(&user.password_hash, &password) {
            return Err(ApiError::InvalidCredentials);
        }
        let session = db.create_session(user.id)?;
        Ok((user, session))
    })
    .await?;

    info!("User {} logged in", user.id);

    let jar = CookieJar::new().add(session_cookie(&session, state.cookie_secure));
    Ok((
        jar,
        Json(SessionResponse {
            user_id: user.id,
            username: user.username,
            csrf_token: session.csrf_token,
            expires_at: session.expires_at,
        }),
    ))
}

/// Drops the session behind the presented token, if any, and clears the
/// cookie. Safe to call when already signed out.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = session_token(&headers) {
        db_call(&state, move |db| db.destroy_session(&token)).await?;
    }
    Ok((
        StatusCode::NO_CONTENT,
        CookieJar::new().add(cleared_cookie(state.cookie_secure)),
    ))
}

pub async fn me(Extension(viewer): Extension<Viewer>) -> Result<impl IntoResponse, ApiError> {
    let session = viewer.0.ok_or(ApiError::Unauthorized)?;
    Ok(Json(MeResponse {
        user: session.user,
        csrf_token: session.csrf_token,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(email: &str, username: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn registration_fields_are_trimmed() {
        let (email, username) = validate_registration(&req("  ada@lions.test ", " ada_l ", "longenough")).unwrap();
        assert_eq!(email, "ada@lions.test");
        assert_eq!(username, "ada_l");
    }

    #[test]
    fn registration_rules() {
        let bad = [
            req("", "ada", "longenough"),
            req("ada@lions.test", "  ", "longenough"),
            req("not-an-email", "ada", "longenough"),
            req("ada@lions.test", "ad", "longenough"),
            req("ada@lions.test", "ada lovelace", "longenough"),
            req("ada@lions.test", "ada", "short"),
        ];
        for r in &bad {
            assert!(matches!(validate_registration(r), Err(ForumError::Validation(_))), "{:?}", r);
        }
    }

    #[test]
    fn cookie_attributes() {
        let session = NewSession {
            token: "tok".into(),
            csrf_token: "csrf".into(),
            expires_at: chrono::Utc::now().timestamp() + 3600,
        };
        let cookie = session_cookie(&session, true);
        assert_eq!(cookie.name(), "session_id");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(true));
        let max_age = cookie.max_age().unwrap().whole_seconds();
        assert!((3590..=3600).contains(&max_age));

        let header = session_cookie(&session, false).to_string();
        assert!(header.starts_with("session_id=tok"));
        assert!(header.contains("HttpOnly"));
        assert!(!header.contains("Secure"));

        let cleared = cleared_cookie(false);
        assert_eq!(cleared.value(), "");
        assert!(cleared.to_string().contains("Max-Age=0"));
    }
}
