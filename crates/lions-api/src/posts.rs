use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use lions_db::{PostFilter, SessionUser};
use lions_types::api::{CreateCommentRequest, CreatePostRequest, CreatedResponse, HomeResponse, PostResponse};
use serde::Deserialize;

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::Viewer;

/// `?cat=<id>&mine=1&liked=1`
#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    pub cat: Option<String>,
    pub mine: Option<String>,
    pub liked: Option<String>,
}

fn flag(value: &Option<String>) -> bool {
    value.as_deref() == Some("1")
}

pub async fn home(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    Query(query): Query<HomeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mine = flag(&query.mine);
    let liked = flag(&query.liked);
    let filters = PostFilter::from_params(query.cat.as_deref(), mine, liked, viewer.user_id());

    let (categories, posts) = db_call(&state, move |db| {
        let categories = db.list_categories()?;
        let posts = db.list_posts(&filters)?;
        Ok::<_, ApiError>((categories, posts))
    })
    .await?;

    Ok(Json(HomeResponse {
        categories,
        posts,
        filter_cat: query.cat,
        filter_mine: mine,
        filter_liked: liked,
    }))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = db_call(&state, |db| db.list_categories()).await?;
    Ok(Json(categories))
}

pub async fn create_post(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    ApiJson(req): ApiJson<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = user.user.id;
    let id = db_call(&state, move |db| {
        db.create_post(author, req.title.trim(), req.content.trim(), &req.categories)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

pub async fn view_post(State(state): State<AppState>, Path(post_id): Path<i64>) -> Result<impl IntoResponse, ApiError> {
    let (post, comments) = db_call(&state, move |db| {
        let post = db.get_post(post_id)?;
        let comments = db.list_post_comments(post_id)?;
        Ok::<_, ApiError>((post, comments))
    })
    .await?;

    Ok(Json(PostResponse { post, comments }))
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Extension(user): Extension<SessionUser>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let author = user.user.id;
    let id = db_call(&state, move |db| db.add_comment(post_id, author, req.content.trim())).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}
