use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use warbler_types::Identity;
use warbler_types::api::LikeResponse;
use warbler_types::models::MessageId;

use crate::error::ApiError;
use crate::{AppState, run_blocking};

/// POST /users/add_like/{message_id}: liking twice is a no-op.
pub async fn add_like(
    State(state): State<AppState>,
    Path(message_id): Path<MessageId>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let (changed, like_count) = run_blocking(move || {
        let changed = state.warbler.add_like(identity, message_id)?;
        Ok((changed, state.warbler.like_count(message_id)?))
    })
    .await?;

    Ok(Json(LikeResponse {
        message_id,
        liked: true,
        changed,
        like_count,
    }))
}

/// POST /users/remove_like/{message_id}
pub async fn remove_like(
    State(state): State<AppState>,
    Path(message_id): Path<MessageId>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let (changed, like_count) = run_blocking(move || {
        let changed = state.warbler.remove_like(identity, message_id)?;
        Ok((changed, state.warbler.like_count(message_id)?))
    })
    .await?;

    Ok(Json(LikeResponse {
        message_id,
        liked: false,
        changed,
        like_count,
    }))
}
