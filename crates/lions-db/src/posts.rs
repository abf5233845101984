use lions_types::models::{Category, CommentView, PostDetail};
use lions_types::{ForumError, ForumResult};
use rusqlite::{OptionalExtension, TransactionBehavior, params};
use tracing::info;

use crate::models::parse_timestamp;
use crate::{Database, FOREIGN_KEY_VIOLATION, is_constraint};

/// Splits a comma-separated category field into trimmed, non-empty,
/// de-duplicated names, keeping first-seen order.
pub fn parse_category_names(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

impl Database {
    /// Creates a post and links it to its categories, creating any category
    /// name not seen before. Returns the new post id.
    pub fn create_post(&self, user_id: i64, title: &str, content: &str, categories: &str) -> ForumResult<i64> {
        if title.trim().is_empty() || content.trim().is_empty() {
            return Err(ForumError::validation("title and content required"));
        }
        let names = parse_category_names(categories);

        let post_id = self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO posts (user_id, title, content) VALUES (?1, ?2, ?3)",
                params![user_id, title, content],
            )?;
            let post_id = tx.last_insert_rowid();

            for name in &names {
                tx.execute("INSERT OR IGNORE INTO categories (name) VALUES (?1)", [name])?;
                let category_id: i64 =
                    tx.query_row("SELECT id FROM categories WHERE name = ?1", [name], |r| r.get(0))?;
                tx.execute(
                    "INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?1, ?2)",
                    params![post_id, category_id],
                )?;
            }

            tx.commit()?;
            Ok(post_id)
        })?;

        info!("User {} created post {} ({} categories)", user_id, post_id, names.len());
        Ok(post_id)
    }

    pub fn list_categories(&self) -> ForumResult<Vec<Category>> {
        Ok(self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| Ok(Category { id: row.get(0)?, name: row.get(1)? }))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?)
    }

    /// A single post with its categories and reaction counts.
    pub fn get_post(&self, post_id: i64) -> ForumResult<PostDetail> {
        let post = self.with_conn(|conn| {
            let post = conn
                .query_row(
                    "SELECT p.id, p.title, p.content, u.username, u.avatar_path, p.created_at,
                            (SELECT COUNT(*) FROM post_reactions r WHERE r.post_id = p.id AND r.value = 1),
                            (SELECT COUNT(*) FROM post_reactions r WHERE r.post_id = p.id AND r.value = -1)
                     FROM posts p
                     JOIN users u ON u.id = p.user_id
                     WHERE p.id = ?1",
                    [post_id],
                    |row| {
                        Ok(PostDetail {
                            id: row.get(0)?,
                            title: row.get(1)?,
                            content: row.get(2)?,
                            author: row.get(3)?,
                            author_avatar: row.get(4)?,
                            created_at: parse_timestamp(&row.get::<_, String>(5)?),
                            categories: Vec::new(),
                            likes: row.get(6)?,
                            dislikes: row.get(7)?,
                        })
                    },
                )
                .optional()?;

            let Some(mut post) = post else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT c.name
                 FROM categories c
                 JOIN post_categories pc ON pc.category_id = c.id
                 WHERE pc.post_id = ?1
                 ORDER BY c.name",
            )?;
            post.categories = stmt
                .query_map([post_id], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;

            Ok(Some(post))
        })?;

        post.ok_or(ForumError::NotFound("post"))
    }

    /// Comments on a post, oldest first, each with its reaction counts.
    pub fn list_post_comments(&self, post_id: i64) -> ForumResult<Vec<CommentView>> {
        // Counts come from correlated subqueries so this stays one statement
        // regardless of how many comments there are.
        Ok(self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, u.username, u.avatar_path, c.content, c.created_at,
                        (SELECT COUNT(*) FROM comment_reactions r WHERE r.comment_id = c.id AND r.value = 1),
                        (SELECT COUNT(*) FROM comment_reactions r WHERE r.comment_id = c.id AND r.value = -1)
                 FROM comments c
                 JOIN users u ON u.id = c.user_id
                 WHERE c.post_id = ?1
                 ORDER BY c.created_at ASC, c.id ASC",
            )?;
            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(CommentView {
                        id: row.get(0)?,
                        author: row.get(1)?,
                        author_avatar: row.get(2)?,
                        content: row.get(3)?,
                        created_at: parse_timestamp(&row.get::<_, String>(4)?),
                        likes: row.get(5)?,
                        dislikes: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?)
    }

    pub fn add_comment(&self, post_id: i64, user_id: i64, content: &str) -> ForumResult<i64> {
        if post_id <= 0 || content.trim().is_empty() {
            return Err(ForumError::validation("comment needs a post and some content"));
        }

        let result = self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, user_id, content) VALUES (?1, ?2, ?3)",
                params![post_id, user_id, content],
            )?;
            Ok(conn.last_insert_rowid())
        });

        match result {
            Ok(id) => Ok(id),
            Err(e) if is_constraint(&e, FOREIGN_KEY_VIOLATION) => Err(ForumError::NotFound("post")),
            Err(e) => Err(e.into()),
        }
    }
}
