//! Session manager.
//!
//! Sessions are opaque random tokens mapped to a user id with an absolute
//! expiry. There is no background sweeper: an expired row is treated as absent
//! and deleted the next time somebody presents its token.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use lions_types::ForumResult;
use lions_types::models::User;
use rand::RngCore;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use crate::Database;
use crate::models::{USER_COLUMNS, UserRow};

pub const SESSION_TTL_DAYS: i64 = 7;

const TOKEN_BYTES: usize = 32;

/// Freshly created session. `token` goes into the cookie, `csrf_token` into
/// forms and the `X-CSRF-Token` header.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub token: String,
    pub csrf_token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

/// The user behind a live session.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user: User,
    pub csrf_token: String,
    pub expires_at: i64,
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl Database {
    pub fn create_session(&self, user_id: i64) -> ForumResult<NewSession> {
        let session = NewSession {
            token: generate_token(),
            csrf_token: generate_token(),
            expires_at: (Utc::now() + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        };

        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO sessions (token, user_id, csrf_token, expires_at) VALUES (?1, ?2, ?3, ?4)",
                params![session.token, user_id, session.csrf_token, session.expires_at],
            )?;
            Ok(())
        })?;

        debug!("Created session for user {}", user_id);
        Ok(session)
    }

    /// Resolve a token to its user.
    ///
    /// Unknown and expired tokens both yield `Ok(None)`; an expired row is
    /// deleted on the way out. One read, at most one delete.
    pub fn resolve_session(&self, token: &str) -> ForumResult<Option<SessionUser>> {
        if token.is_empty() {
            return Ok(None);
        }

        let found = self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, s.csrf_token, s.expires_at
                 FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
                USER_COLUMNS
            );
            Ok(conn
                .query_row(&sql, [token], |row| {
                    Ok((UserRow::from_row(row)?, row.get::<_, String>(8)?, row.get::<_, i64>(9)?))
                })
                .optional()?)
        })?;

        let Some((user, csrf_token, expires_at)) = found else {
            return Ok(None);
        };

        if expires_at < Utc::now().timestamp() {
            self.destroy_session(token)?;
            debug!("Purged expired session for user {}", user.id);
            return Ok(None);
        }

        Ok(Some(SessionUser {
            user: user.into_user(),
            csrf_token,
            expires_at,
        }))
    }

    /// Idempotent: deleting a token that is not there is fine.
    pub fn destroy_session(&self, token: &str) -> ForumResult<()> {
        self.with_conn_mut(|conn| {
            conn.execute("DELETE FROM sessions WHERE token = ?1", [token])?;
            Ok(())
        })?;
        Ok(())
    }
}
