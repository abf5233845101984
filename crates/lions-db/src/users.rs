use lions_types::{ForumError, ForumResult};
use lions_types::models::User;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::models::{USER_COLUMNS, UserRow};
use crate::{Database, UNIQUE_VIOLATION, is_constraint};

pub const MAX_DISPLAY_NAME_CHARS: usize = 50;
pub const MAX_BIO_CHARS: usize = 280;

impl Database {
    /// Inserts a user and returns its id.
    ///
    /// Email and username uniqueness is left to the table constraints; a
    /// duplicate surfaces as `Conflict` rather than being pre-checked.
    pub fn create_user(&self, email: &str, username: &str, password_hash: &str) -> ForumResult<i64> {
        let result = self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (email, username, password_hash) VALUES (?1, ?2, ?3)",
                params![email, username, password_hash],
            )?;
            Ok(conn.last_insert_rowid())
        });

        match result {
            Ok(id) => {
                info!("Registered user {} ({})", id, username);
                Ok(id)
            }
            Err(e) if is_constraint(&e, UNIQUE_VIOLATION) => {
                Err(ForumError::Conflict("email or username already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Row used by login, including the stored password hash.
    pub fn get_credentials_by_email(&self, email: &str) -> ForumResult<Option<UserRow>> {
        Ok(self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users u WHERE u.email = ?1", USER_COLUMNS);
            Ok(conn.query_row(&sql, [email], UserRow::from_row).optional()?)
        })?)
    }

    pub fn get_user_by_id(&self, id: i64) -> ForumResult<User> {
        self.with_conn(|conn| query_user(conn, "u.id = ?1", id))?
            .map(UserRow::into_user)
            .ok_or(ForumError::NotFound("user"))
    }

    pub fn update_profile(&self, user_id: i64, display_name: &str, bio: &str) -> ForumResult<()> {
        let name_len = display_name.chars().count();
        if name_len == 0 || name_len > MAX_DISPLAY_NAME_CHARS {
            return Err(ForumError::validation(format!(
                "display name must be 1-{} characters",
                MAX_DISPLAY_NAME_CHARS
            )));
        }
        if bio.chars().count() > MAX_BIO_CHARS {
            return Err(ForumError::validation(format!("bio must be at most {} characters", MAX_BIO_CHARS)));
        }

        let updated = self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "UPDATE users SET display_name = ?1, bio = ?2 WHERE id = ?3",
                params![display_name, bio, user_id],
            )?)
        })?;
        if updated == 0 {
            return Err(ForumError::NotFound("user"));
        }
        Ok(())
    }

    pub fn update_avatar(&self, user_id: i64, avatar_path: &str) -> ForumResult<()> {
        let updated = self.with_conn_mut(|conn| {
            Ok(conn.execute(
                "UPDATE users SET avatar_path = ?1 WHERE id = ?2",
                params![avatar_path, user_id],
            )?)
        })?;
        if updated == 0 {
            return Err(ForumError::NotFound("user"));
        }
        Ok(())
    }
}

pub(crate) fn query_user(
    conn: &Connection,
    predicate: &str,
    param: impl rusqlite::ToSql,
) -> anyhow::Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users u WHERE {}", USER_COLUMNS, predicate);
    Ok(conn.query_row(&sql, [param], UserRow::from_row).optional()?)
}
