use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use warbler_types::api::{MessageResponse, NewMessageRequest};
use warbler_types::models::MessageId;
use warbler_types::{Identity, Message};

use crate::error::{ApiError, ServiceError};
use crate::guard::{Action, authorize};
use crate::service::Warbler;
use crate::{AppState, parse_body, run_blocking};

/// GET /: the caller's timeline; empty for visitors.
pub async fn home(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let messages = run_blocking(move || state.warbler.timeline(identity)).await?;
    Ok(Json(messages))
}

/// POST /messages/new
pub async fn new_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // Visitors are turned away before their body is even looked at.
    authorize(identity, Action::PostMessage).map_err(ServiceError::from)?;
    let req: NewMessageRequest = parse_body(&body)?;

    let response = run_blocking(move || {
        let message = state.warbler.post_message(identity, &req.text)?;
        describe(&state.warbler, message)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /messages/{message_id}
pub async fn show_message(
    State(state): State<AppState>,
    Path(message_id): Path<MessageId>,
) -> Result<impl IntoResponse, ApiError> {
    let response = run_blocking(move || {
        state
            .warbler
            .message(message_id)?
            .map(|message| describe(&state.warbler, message))
            .transpose()
    })
    .await?
    .ok_or(ApiError::NotFound)?;

    Ok(Json(response))
}

/// POST /messages/{message_id}/delete: author only.
pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<MessageId>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || state.warbler.delete_message(identity, message_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn describe(warbler: &Warbler, message: Message) -> Result<MessageResponse, ServiceError> {
    Ok(MessageResponse {
        author: warbler.user(message.user_id)?,
        like_count: warbler.like_count(message.id)?,
        message,
    })
}
