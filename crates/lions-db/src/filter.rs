//! Front-page listing with composable filters.
//!
//! Each active filter contributes an optional join and one predicate; the
//! listing query is built by folding the filters in order, so adding a new
//! filter never means writing another variant of the whole statement.

use lions_types::ForumResult;
use lions_types::models::PostSummary;
use rusqlite::params_from_iter;

use crate::Database;
use crate::models::parse_timestamp;

/// Maximum number of posts on the front page.
pub const LISTING_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    /// Post is tagged with this category id.
    ByCategory(i64),
    /// Post was written by this user.
    ByAuthor(i64),
    /// This user liked (+1) the post.
    LikedBy(i64),
}

impl PostFilter {
    /// Builds the filter list from raw query parameters.
    ///
    /// `mine` and `liked` need a viewer and are dropped for anonymous
    /// requests. An empty `cat` means no category filter; an id that does not
    /// parse can never match a category row, so it narrows to nothing.
    pub fn from_params(cat: Option<&str>, mine: bool, liked: bool, viewer: Option<i64>) -> Vec<Self> {
        let mut filters = Vec::new();

        if let Some(raw) = cat.map(str::trim).filter(|c| !c.is_empty()) {
            filters.push(Self::ByCategory(raw.parse().unwrap_or(0)));
        }
        if let Some(viewer) = viewer {
            if mine {
                filters.push(Self::ByAuthor(viewer));
            }
            if liked {
                filters.push(Self::LikedBy(viewer));
            }
        }

        filters
    }

    fn param(&self) -> i64 {
        match *self {
            Self::ByCategory(id) | Self::ByAuthor(id) | Self::LikedBy(id) => id,
        }
    }

    /// Join (if any) and predicate for this filter. `alias` keeps joins from
    /// different filters apart, `slot` is the bound parameter number.
    fn clause(&self, alias: usize, slot: usize) -> (Option<String>, String) {
        match self {
            Self::ByCategory(_) => (
                Some(format!("JOIN post_categories f{alias} ON f{alias}.post_id = p.id")),
                format!("f{alias}.category_id = ?{slot}"),
            ),
            Self::ByAuthor(_) => (None, format!("p.user_id = ?{slot}")),
            Self::LikedBy(_) => (
                Some(format!("JOIN post_reactions f{alias} ON f{alias}.post_id = p.id")),
                format!("f{alias}.user_id = ?{slot} AND f{alias}.value = 1"),
            ),
        }
    }
}

/// A parameterized listing statement.
#[derive(Debug)]
pub struct ListingQuery {
    pub sql: String,
    pub params: Vec<i64>,
}

pub fn compose(filters: &[PostFilter]) -> ListingQuery {
    let mut joins = Vec::new();
    let mut predicates = Vec::new();
    let mut params = Vec::with_capacity(filters.len() + 1);

    for (alias, filter) in filters.iter().enumerate() {
        params.push(filter.param());
        let (join, predicate) = filter.clause(alias, params.len());
        joins.extend(join);
        predicates.push(predicate);
    }

    params.push(LISTING_LIMIT);
    let limit_slot = params.len();

    let mut sql = String::from(
        "SELECT p.id, p.title, u.username, u.avatar_path, p.created_at,
                COALESCE(GROUP_CONCAT(c.name, ', '), '')
         FROM posts p
         JOIN users u ON u.id = p.user_id
         LEFT JOIN post_categories pc ON pc.post_id = p.id
         LEFT JOIN categories c ON c.id = pc.category_id",
    );
    for join in &joins {
        sql.push_str("\n         ");
        sql.push_str(join);
    }
    if !predicates.is_empty() {
        sql.push_str("\n         WHERE ");
        sql.push_str(&predicates.join(" AND "));
    }
    sql.push_str(&format!(
        "\n         GROUP BY p.id
         ORDER BY p.created_at DESC, p.id DESC
         LIMIT ?{limit_slot}"
    ));

    ListingQuery { sql, params }
}

impl Database {
    /// Newest posts first, narrowed by every filter in `filters`.
    pub fn list_posts(&self, filters: &[PostFilter]) -> ForumResult<Vec<PostSummary>> {
        let query = compose(filters);

        let rows = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&query.sql)?;
            let rows = stmt
                .query_map(params_from_iter(query.params.iter()), |row| {
                    Ok(PostSummary {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        author: row.get(2)?,
                        author_avatar: row.get(3)?,
                        created_at: parse_timestamp(&row.get::<_, String>(4)?),
                        categories: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        Ok(rows)
    }
}
