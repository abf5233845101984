use serde::{Deserialize, Serialize};

use crate::models::{
    AuthoredComment, AuthoredPost, Category, CommentView, Page, PostDetail, PostSummary,
    ProfileCounts, PublicUser, ReactionState, User,
};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by register and login. The session token itself only travels in
/// the cookie.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: i64,
    pub username: String,
    pub csrf_token: String,
    pub expires_at: i64,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub csrf_token: String,
}

// -- Posts --

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub categories: Vec<Category>,
    pub posts: Vec<PostSummary>,
    pub filter_cat: Option<String>,
    pub filter_mine: bool,
    pub filter_liked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    /// Comma-separated category names.
    #[serde(default)]
    pub categories: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub post: PostDetail,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub content: String,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactRequest {
    pub kind: String,
    pub id: i64,
    pub v: i64,
}

#[derive(Debug, Serialize)]
pub struct ReactResponse {
    pub state: ReactionState,
    pub likes: i64,
    pub dislikes: i64,
}

// -- Profiles --

#[derive(Debug, Serialize)]
pub struct PageLinks {
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: PublicUser,
    pub counts: ProfileCounts,
    pub is_owner: bool,
    /// "posts" or "comments"; exactly one of the two pages below is present.
    pub tab: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<Page<AuthoredPost>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Page<AuthoredComment>>,
    pub links: PageLinks,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsRequest {
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_path: String,
}
