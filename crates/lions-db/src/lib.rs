pub mod filter;
pub mod migrations;
pub mod models;
pub mod posts;
pub mod profile;
pub mod reactions;
pub mod sessions;
pub mod users;

use anyhow::Result;
use rusqlite::{Connection, ffi};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub use filter::PostFilter;
pub use sessions::{NewSession, SessionUser};

/// Handle to the forum's SQLite store.
///
/// A single connection sits behind a mutex; callers on the async runtime are
/// expected to reach it through `spawn_blocking`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }

    /// Same lock as [`with_conn`](Self::with_conn), but hands out `&mut` so the
    /// closure can open a transaction.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
        f(&mut conn)
    }

    /// Round-trip a trivial statement; used by the storage health check.
    pub fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
    }
}

/// True when `err` came from SQLite rejecting a write with the given
/// extended constraint code.
pub(crate) fn is_constraint(err: &anyhow::Error, extended_code: std::os::raw::c_int) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.extended_code == extended_code
    )
}

pub(crate) const UNIQUE_VIOLATION: std::os::raw::c_int = ffi::SQLITE_CONSTRAINT_UNIQUE;
pub(crate) const FOREIGN_KEY_VIOLATION: std::os::raw::c_int = ffi::SQLITE_CONSTRAINT_FOREIGNKEY;
