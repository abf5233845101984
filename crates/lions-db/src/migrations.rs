use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub const LATEST_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Forum DB: running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                email           TEXT NOT NULL UNIQUE,
                username        TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                display_name    TEXT NOT NULL DEFAULT '',
                bio             TEXT NOT NULL DEFAULT '',
                avatar_path     TEXT NOT NULL DEFAULT '',
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- expires_at is unix seconds
            CREATE TABLE sessions (
                token       TEXT PRIMARY KEY,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                csrf_token  TEXT NOT NULL,
                expires_at  INTEGER NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_sessions_user ON sessions(user_id);

            CREATE TABLE categories (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                name    TEXT NOT NULL UNIQUE
            );

            CREATE TABLE posts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title       TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_posts_author ON posts(user_id, created_at);

            CREATE TABLE post_categories (
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                PRIMARY KEY (post_id, category_id)
            );

            CREATE TABLE comments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created_at);
            CREATE INDEX idx_comments_author ON comments(user_id, created_at);

            CREATE TABLE post_reactions (
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                value       INTEGER NOT NULL CHECK (value IN (-1, 1)),
                PRIMARY KEY (user_id, post_id)
            );

            CREATE INDEX idx_post_reactions_post ON post_reactions(post_id);

            CREATE TABLE comment_reactions (
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                comment_id  INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
                value       INTEGER NOT NULL CHECK (value IN (-1, 1)),
                PRIMARY KEY (user_id, comment_id)
            );

            CREATE INDEX idx_comment_reactions_comment ON comment_reactions(comment_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )
        .inspect_err(|_| {
            // A failed statement leaves the batch's transaction open.
            if !conn.is_autocommit() {
                let _ = conn.execute_batch("ROLLBACK;");
            }
        })?;
    }

    info!("Database migrations complete");
    Ok(())
}
