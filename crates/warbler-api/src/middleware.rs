use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;

use warbler_types::api::Claims;
use warbler_types::{Identity, UserId};

use crate::AppState;

/// Resolve the caller's identity from an optional `Authorization: Bearer`
/// token and attach it to the request. A missing, malformed or expired token
/// makes the caller a visitor; it is up to each operation to deny visitors.
pub async fn identify(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let identity = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| identity_from_token(token, &state.jwt_secret))
        .unwrap_or_default();

    req.extensions_mut().insert(identity);
    next.run(req).await
}

pub fn identity_from_token(token: &str, secret: &str) -> Identity {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => Identity::User(data.claims.sub),
        Err(e) => {
            debug!("Ignoring bad bearer token: {}", e);
            Identity::Visitor
        }
    }
}

pub fn create_token(secret: &str, ttl_days: i64, user_id: UserId, username: &str) -> anyhow::Result<String> {
    let exp = chrono::Duration::try_days(ttl_days)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| anyhow::anyhow!("token lifetime of {} days is out of range", ttl_days))?;

    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: exp.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
