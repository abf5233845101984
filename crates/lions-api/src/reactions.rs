use axum::{Extension, Json, extract::State, response::IntoResponse};
use lions_db::SessionUser;
use lions_types::api::{ReactRequest, ReactResponse};
use lions_types::models::{ReactionKind, Vote};

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiError;
use crate::extract::ApiJson;

/// POST /react with `{kind: "post"|"comment", id, v: 1|-1}`.
pub async fn react(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    ApiJson(req): ApiJson<ReactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Input is fully validated before the store is touched.
    let kind = ReactionKind::parse(&req.kind)?;
    let vote = Vote::from_value(req.v)?;
    let target_id = req.id;
    let user_id = user.user.id;

    let (reaction_state, counts) = db_call(&state, move |db| {
        let new_state = db.apply_reaction(user_id, kind, target_id, vote)?;
        let counts = db.reaction_counts(kind, target_id)?;
        Ok::<_, ApiError>((new_state, counts))
    })
    .await?;

    Ok(Json(ReactResponse {
        state: reaction_state,
        likes: counts.likes,
        dislikes: counts.dislikes,
    }))
}
