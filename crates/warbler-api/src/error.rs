use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

use warbler_db::DbError;
use warbler_types::api::ErrorResponse;

use crate::guard::Denial;

pub const ACCESS_UNAUTHORIZED: &str = "Access unauthorized.";

/// Failure of a guarded operation.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("access unauthorized: {0}")]
    Denied(#[from] Denial),

    /// Rejected by a database constraint; the transaction was rolled back.
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("database error: {0}")]
    Database(DbError),

    #[error("password hashing failed: {0}")]
    Password(anyhow::Error),
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Integrity(msg) => ServiceError::Integrity(msg),
            other => ServiceError::Database(other),
        }
    }
}

/// Errors as seen by HTTP clients.
#[derive(Debug)]
pub enum ApiError {
    Service(ServiceError),
    BadCredentials,
    BadRequest(String),
    NotFound,
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // Deny by redirecting home, without saying whether the target exists.
            ApiError::Service(ServiceError::Denied(reason)) => {
                warn!("Denied: {}", reason);
                (
                    StatusCode::FOUND,
                    [(header::LOCATION, "/")],
                    Json(ErrorResponse {
                        error: ACCESS_UNAUTHORIZED.into(),
                    }),
                )
                    .into_response()
            }
            ApiError::Service(ServiceError::Integrity(msg)) => {
                warn!("Integrity violation: {}", msg);
                error_body(StatusCode::CONFLICT, "Request conflicts with existing data.")
            }
            ApiError::Service(e) => {
                error!("{}", e);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
            }
            ApiError::BadCredentials => error_body(StatusCode::UNAUTHORIZED, "Invalid credentials."),
            ApiError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, &msg),
            ApiError::NotFound => error_body(StatusCode::NOT_FOUND, "Not found."),
            ApiError::Internal(msg) => {
                error!("{}", msg);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong.")
            }
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}
