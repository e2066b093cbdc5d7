use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use warbler_types::api::{FollowResponse, ProfileUpdateRequest, UserProfileResponse, UserSearchQuery};
use warbler_types::{Identity, UserId};

use crate::error::{ApiError, ServiceError};
use crate::guard::Denial;
use crate::{AppState, parse_body, run_blocking};

/// GET /users?q=: public user search.
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let users = run_blocking(move || state.warbler.search_users(query.q.as_deref())).await?;
    Ok(Json(users))
}

/// GET /users/{user_id}: profile with messages and counters.
pub async fn show_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = run_blocking(move || {
        let Some(user) = state.warbler.user(user_id)? else {
            return Ok(None);
        };

        let counts = state.warbler.db().profile_counts(user_id)?;
        Ok(Some(UserProfileResponse {
            user,
            messages: state.warbler.messages_for_user(user_id)?,
            following_count: counts.following,
            followers_count: counts.followers,
            likes_count: counts.likes,
        }))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(profile))
}

/// GET /users/{user_id}/following: signed-in users only.
pub async fn show_following(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let users = run_blocking(move || state.warbler.following(identity, user_id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(users))
}

/// GET /users/{user_id}/followers: signed-in users only.
pub async fn show_followers(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let users = run_blocking(move || state.warbler.followers(identity, user_id))
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(users))
}

/// GET /users/{user_id}/likes: messages the user has liked.
pub async fn show_likes(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = run_blocking(move || {
        if state.warbler.user(user_id)?.is_none() {
            return Ok(None);
        }
        Ok(Some(state.warbler.liked_messages(user_id)?))
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(messages))
}

/// POST /users/follow/{user_id}
pub async fn follow(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let changed = run_blocking(move || state.warbler.follow(identity, user_id)).await?;
    Ok(Json(FollowResponse {
        user_id,
        following: true,
        changed,
    }))
}

/// POST /users/stop-following/{user_id}
pub async fn stop_following(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let changed = run_blocking(move || state.warbler.unfollow(identity, user_id)).await?;
    Ok(Json(FollowResponse {
        user_id,
        following: false,
        changed,
    }))
}

/// POST /users/profile: edit the signed-in user's own profile.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // Visitors are turned away before their body is even looked at.
    let owner = own_id(identity)?;
    let req: ProfileUpdateRequest = parse_body(&body)?;

    let user = run_blocking(move || state.warbler.update_profile(identity, owner, &req)).await?;
    Ok(Json(user))
}

/// POST /users/delete: delete the signed-in user's account.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = own_id(identity)?;
    run_blocking(move || state.warbler.delete_account(identity, owner)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn own_id(identity: Identity) -> Result<UserId, ApiError> {
    identity
        .user_id()
        .ok_or(ApiError::Service(ServiceError::Denied(Denial::Anonymous)))
}
