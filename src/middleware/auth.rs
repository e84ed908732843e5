use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use thiserror::Error;

use super::connection::Db;
use crate::app::AppState;
use crate::database::models::Identity;
use crate::error::ApiError;

/// Why a request was turned away. Both variants render the same 401 body.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no bearer token supplied")]
    MissingToken,

    #[error("bearer token rejected")]
    InvalidToken,
}

/// Admin resolved from a verified bearer token
#[derive(Clone, Debug)]
pub struct AuthenticatedAdmin(pub Identity);

/// Authentication gate: verify the bearer token, then resolve it to an active admin.
///
/// Runs after `connection_stage`, so the store handle is already in the request.
pub async fn auth_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers())?;
    let admin_id = state.tokens.verify(token).map_err(|e| {
        tracing::debug!("Token rejected: {}", e);
        AuthError::InvalidToken
    })?;

    let Db(store) = request
        .extensions()
        .get::<Db>()
        .cloned()
        .ok_or_else(|| ApiError::internal_server_error("Connection stage did not run"))?;

    let identity = store
        .find_identity(admin_id)
        .await?
        .filter(|identity| identity.is_active)
        .ok_or_else(|| {
            tracing::debug!("Token subject {} is unknown or inactive", admin_id);
            AuthError::InvalidToken
        })?;

    request.extensions_mut().insert(AuthenticatedAdmin(identity));
    Ok(next.run(request).await)
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(AuthError::InvalidToken)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}
