use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, header},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use lions_avatar::{MAX_AVATAR_BYTES, storage::PUBLIC_PREFIX};
use lions_types::ForumError;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::middleware::{require_auth, resolve_viewer};
use crate::{db_call, posts, profile, reactions};

/// Bodies past the avatar cap are cut off while buffering; `AvatarBody`
/// reports that as a validation error.
const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES as usize;

const AVATAR_CACHE_CONTROL: &str = "public, max-age=86400";

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(posts::home))
        .route("/health", get(health))
        .route("/dbcheck", get(db_check))
        .route("/categories", get(posts::list_categories))
        .route("/posts/{id}", get(posts::view_post))
        .route("/u/{username}", get(profile::profile_posts))
        .route("/u/{username}/posts", get(profile::profile_posts))
        .route("/u/{username}/comments", get(profile::profile_comments))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let protected_routes = Router::new()
        .route("/posts", post(posts::create_post))
        .route("/posts/{id}/comments", post(posts::add_comment))
        .route("/react", post(reactions::react))
        .route("/me/settings", post(profile::update_settings))
        .route(
            "/me/avatar",
            post(profile::upload_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .route_layer(middleware::from_fn(require_auth));

    let avatars = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static(AVATAR_CACHE_CONTROL),
        ))
        .service(ServeDir::new(state.avatars.dir()));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn_with_state(state.clone(), resolve_viewer))
        .nest_service(PUBLIC_PREFIX, avatars)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn db_check(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    db_call(&state, |db| db.ping().map_err(ForumError::Storage)).await?;
    Ok("db ok")
}
