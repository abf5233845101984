use lions_types::models::{AuthoredComment, AuthoredPost, Page, PageRequest, ProfileCounts, User};
use lions_types::{ForumError, ForumResult};
use rusqlite::params;

use crate::Database;
use crate::models::{UserRow, parse_timestamp};
use crate::users::query_user;

impl Database {
    pub fn load_profile(&self, username: &str) -> ForumResult<User> {
        self.with_conn(|conn| query_user(conn, "u.username = ?1", username))?
            .map(UserRow::into_user)
            .ok_or(ForumError::NotFound("user"))
    }

    /// Post, comment and received-like totals for one user.
    ///
    /// Likes are counted over the user's posts only; likes on their comments
    /// are not included.
    pub fn profile_counts(&self, user_id: i64) -> ForumResult<ProfileCounts> {
        Ok(self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM posts WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM comments WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM post_reactions r
                       JOIN posts p ON p.id = r.post_id
                      WHERE p.user_id = ?1 AND r.value = 1)",
                [user_id],
                |row| {
                    Ok(ProfileCounts {
                        posts: row.get(0)?,
                        comments: row.get(1)?,
                        likes: row.get(2)?,
                    })
                },
            )?)
        })?)
    }

    pub fn list_user_posts(&self, user_id: i64, req: PageRequest) -> ForumResult<Page<AuthoredPost>> {
        let (items, total) = self.with_conn(|conn| {
            let total: i64 =
                conn.query_row("SELECT COUNT(*) FROM posts WHERE user_id = ?1", [user_id], |r| r.get(0))?;

            let mut stmt = conn.prepare(
                "SELECT id, title, created_at
                 FROM posts
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let items = stmt
                .query_map(params![user_id, req.limit, req.offset()], |row| {
                    Ok(AuthoredPost {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        created_at: parse_timestamp(&row.get::<_, String>(2)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok((items, total))
        })?;

        Ok(Page::new(items, req, total))
    }

    pub fn list_user_comments(&self, user_id: i64, req: PageRequest) -> ForumResult<Page<AuthoredComment>> {
        let (items, total) = self.with_conn(|conn| {
            let total: i64 =
                conn.query_row("SELECT COUNT(*) FROM comments WHERE user_id = ?1", [user_id], |r| r.get(0))?;

            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, p.title, c.content, c.created_at
                 FROM comments c
                 JOIN posts p ON p.id = c.post_id
                 WHERE c.user_id = ?1
                 ORDER BY c.created_at DESC, c.id DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let items = stmt
                .query_map(params![user_id, req.limit, req.offset()], |row| {
                    Ok(AuthoredComment {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        post_title: row.get(2)?,
                        content: row.get(3)?,
                        created_at: parse_timestamp(&row.get::<_, String>(4)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok((items, total))
        })?;

        Ok(Page::new(items, req, total))
    }
}
