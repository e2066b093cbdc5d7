use axum::{Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use warbler_types::User;
use warbler_types::api::{AuthResponse, LoginRequest, SignupRequest};

use crate::error::ApiError;
use crate::middleware::create_token;
use crate::{AppState, parse_body, run_blocking};

/// POST /signup: create the account and log it in.
pub async fn signup(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: SignupRequest = parse_body(&body)?;
    let app = state.clone();
    let user = run_blocking(move || app.warbler.signup(&req)).await?;

    info!("New signup: {}", user);
    let token = issue_token(&state, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

/// POST /login: 401 for an unknown username or a wrong password.
pub async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: LoginRequest = parse_body(&body)?;
    let app = state.clone();
    let user = run_blocking(move || app.warbler.authenticate(&req.username, &req.password))
        .await?
        .ok_or(ApiError::BadCredentials)?;

    let token = issue_token(&state, &user)?;
    Ok(Json(AuthResponse { user, token }))
}

fn issue_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    create_token(&state.jwt_secret, state.token_ttl_days, user.id, &user.username)
        .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))
}
