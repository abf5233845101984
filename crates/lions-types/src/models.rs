use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ForumError, ForumResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_path: String,
    pub created_at: DateTime<Utc>,
}

/// What other people get to see of a user. No email.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar_path: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            username: u.username.clone(),
            display_name: u.display_name.clone(),
            bio: u.bio.clone(),
            avatar_path: u.avatar_path.clone(),
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

// -- Posts & comments --

/// One row of the front-page listing.
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub author_avatar: String,
    pub created_at: DateTime<Utc>,
    /// Category names joined with ", ".
    pub categories: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: String,
    pub author_avatar: String,
    pub created_at: DateTime<Utc>,
    pub categories: Vec<String>,
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub author: String,
    pub author_avatar: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: i64,
    pub dislikes: i64,
}

// -- Reactions --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Post,
    Comment,
}

impl ReactionKind {
    pub fn parse(kind: &str) -> ForumResult<Self> {
        match kind {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            other => Err(ForumError::validation(format!("unknown reaction target '{}'", other))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Like,
    Dislike,
}

impl Vote {
    pub fn from_value(v: i64) -> ForumResult<Self> {
        match v {
            1 => Ok(Self::Like),
            -1 => Ok(Self::Dislike),
            other => Err(ForumError::validation(format!("reaction value must be 1 or -1, got {}", other))),
        }
    }

    pub fn value(self) -> i64 {
        match self {
            Self::Like => 1,
            Self::Dislike => -1,
        }
    }
}

/// Per (user, target) vote state after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionState {
    Unvoted,
    Liked,
    Disliked,
}

impl From<Option<Vote>> for ReactionState {
    fn from(vote: Option<Vote>) -> Self {
        match vote {
            None => Self::Unvoted,
            Some(Vote::Like) => Self::Liked,
            Some(Vote::Dislike) => Self::Disliked,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionCounts {
    pub likes: i64,
    pub dislikes: i64,
}

// -- Profiles --

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProfileCounts {
    pub posts: i64,
    pub comments: i64,
    /// +1 reactions received on the user's posts. Comment likes are not counted.
    pub likes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthoredPost {
    pub id: i64,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthoredComment {
    pub id: i64,
    pub post_id: i64,
    pub post_title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Pagination --

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl PageRequest {
    /// `page < 1` becomes 1; a missing or non-positive limit falls back to the
    /// default and anything above the maximum is clamped.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = match limit {
            Some(l) if l >= 1 => l.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, limit }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, req: PageRequest, total: i64) -> Self {
        Self {
            items,
            page: req.page,
            limit: req.limit,
            total,
            has_prev: req.page > 1,
            has_next: total > req.page.saturating_mul(req.limit),
        }
    }
}
