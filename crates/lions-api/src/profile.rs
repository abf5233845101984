use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use lions_db::SessionUser;
use lions_types::api::{AvatarResponse, PageLinks, ProfileResponse, SettingsRequest};
use lions_types::models::{PageRequest, PublicUser};
use serde::Deserialize;
use tracing::{error, info};

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiError;
use crate::extract::{ApiJson, AvatarBody};
use crate::middleware::Viewer;

/// `?page=N&limit=M`. Values that are not numbers are ignored rather than
/// rejected.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    fn to_request(&self) -> PageRequest {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        PageRequest::new(parse(&self.page), parse(&self.limit))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Posts,
    Comments,
}

impl Tab {
    fn as_str(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Comments => "comments",
        }
    }
}

fn page_links(username: &str, tab: Tab, req: PageRequest, has_prev: bool, has_next: bool) -> PageLinks {
    let link = |page: i64| format!("/u/{}/{}?page={}&limit={}", username, tab.as_str(), page, req.limit);
    PageLinks {
        prev_url: has_prev.then(|| link(req.page - 1)),
        next_url: has_next.then(|| link(req.page + 1)),
    }
}

async fn load_profile(
    state: AppState,
    viewer: Viewer,
    username: String,
    tab: Tab,
    query: PageQuery,
) -> Result<ProfileResponse, ApiError> {
    let req = query.to_request();
    let viewer_id = viewer.user_id();

    db_call(&state, move |db| {
        let user = db.load_profile(&username)?;
        let counts = db.profile_counts(user.id)?;

        let (posts, comments, links) = match tab {
            Tab::Posts => {
                let page = db.list_user_posts(user.id, req)?;
                let links = page_links(&user.username, tab, req, page.has_prev, page.has_next);
                (Some(page), None, links)
            }
            Tab::Comments => {
                let page = db.list_user_comments(user.id, req)?;
                let links = page_links(&user.username, tab, req, page.has_prev, page.has_next);
                (None, Some(page), links)
            }
        };

        Ok::<_, ApiError>(ProfileResponse {
            profile: PublicUser::from(&user),
            counts,
            is_owner: viewer_id == Some(user.id),
            tab: tab.as_str(),
            posts,
            comments,
            links,
        })
    })
    .await
}

/// GET /u/{username} and /u/{username}/posts
pub async fn profile_posts(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(load_profile(state, viewer, username, Tab::Posts, query).await?))
}

/// GET /u/{username}/comments
pub async fn profile_comments(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(load_profile(state, viewer, username, Tab::Comments, query).await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    ApiJson(req): ApiJson<SettingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.user.id;
    db_call(&state, move |db| {
        db.update_profile(user_id, req.display_name.trim(), req.bio.trim())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /me/avatar: raw JPEG or PNG body. The declared size comes from
/// `Content-Length` and is checked before the body is read.
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    AvatarBody { declared, bytes: body }: AvatarBody,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.user.id;

    // Decode and resample are CPU-bound; keep them off the async workers.
    let jpeg = tokio::task::spawn_blocking(move || lions_avatar::process(&body, declared))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Join(e)
        })??;

    let avatar_path = state.avatars.save(user_id, &jpeg).await?;

    // The file is already in place; if this update fails the file is orphaned
    // until the next successful upload overwrites it.
    let path = avatar_path.clone();
    db_call(&state, move |db| db.update_avatar(user_id, &path)).await?;

    info!("User {} updated their avatar", user_id);
    Ok(Json(AvatarResponse { avatar_path }))
}
