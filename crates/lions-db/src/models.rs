/// Database row types that carry columns the rest of the app must not see
/// (password hashes, raw session tokens). Everything else maps straight onto
/// `lions_types::models`.
use chrono::{DateTime, NaiveDateTime, Utc};
use lions_types::models::User;
use rusqlite::Row;
use tracing::warn;

pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_path: String,
    pub created_at: String,
}

/// Column list matching [`UserRow::from_row`].
pub(crate) const USER_COLUMNS: &str =
    "u.id, u.email, u.username, u.password_hash, u.display_name, u.bio, u.avatar_path, u.created_at";

impl UserRow {
    /// Reads the first eight columns in [`USER_COLUMNS`] order.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            username: row.get(2)?,
            password_hash: row.get(3)?,
            display_name: row.get(4)?,
            bio: row.get(5)?,
            avatar_path: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    pub fn into_user(self) -> User {
        let created_at = parse_timestamp(&self.created_at);
        User {
            id: self.id,
            email: self.email,
            username: self.username,
            display_name: self.display_name,
            bio: self.bio,
            avatar_path: self.avatar_path,
            created_at,
        }
    }
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC; anything unreadable is logged and mapped to the epoch.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}
