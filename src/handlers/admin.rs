//! `/api/admin`: registration, login and the signed-in admin's profile.

use axum::{extract::State, Extension};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::app::AppState;
use crate::auth::credentials::{self, CredentialError, Registration};
use crate::database::models::{Identity, IdentityPatch};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthenticatedAdmin, Db, Validated};
use crate::validation::rules;

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterRequest {
    #[validate(custom(function = "rules::username_length"))]
    pub username: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LoginRequest {
    /// Username or email
    #[validate(custom(function = "rules::login_handle"))]
    pub username: String,
    #[validate(length(min = 1, message = "Username and password are required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProfileRequest {
    #[validate(custom(function = "rules::username_length"))]
    pub username: Option<String>,
    #[validate(email(message = "A valid email address is required"))]
    pub email: Option<String>,
}

impl From<ProfileRequest> for IdentityPatch {
    fn from(request: ProfileRequest) -> Self {
        IdentityPatch {
            username: request.username.map(|u| u.trim().to_string()),
            email: request.email.map(|e| e.trim().to_lowercase()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Session {
    pub admin: Identity,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub admin: Identity,
}

/// POST /api/admin/register
pub async fn register(
    State(state): State<AppState>,
    Extension(Db(store)): Extension<Db>,
    Validated(body): Validated<RegisterRequest>,
) -> ApiResult<Session> {
    if !state.config.security.allow_registration {
        return Err(CredentialError::RegistrationClosed.into());
    }

    let registration = Registration {
        username: body.username,
        email: body.email,
        password: body.password,
    };
    let admin = credentials::register(store.as_ref(), registration, state.config.security.bcrypt_cost).await?;
    let token = state.tokens.issue(admin.id)?;

    Ok(ApiResponse::created(Session { admin, token }).with_message("Admin registered successfully"))
}

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    Extension(Db(store)): Extension<Db>,
    Validated(body): Validated<LoginRequest>,
) -> ApiResult<Session> {
    let admin = credentials::authenticate(store.as_ref(), &body.username, &body.password, state.clock.now()).await?;
    let token = state.tokens.issue(admin.id)?;

    tracing::info!("Admin {} signed in", admin.id);
    Ok(ApiResponse::success(Session { admin, token }).with_message("Login successful"))
}

/// POST /api/admin/logout
///
/// Tokens are stateless; the client discards its copy.
pub async fn logout(Extension(AuthenticatedAdmin(admin)): Extension<AuthenticatedAdmin>) -> ApiResult<Value> {
    tracing::info!("Admin {} signed out", admin.id);
    Ok(ApiResponse::success(json!({})).with_message("Logout successful"))
}

/// GET /api/admin/profile
pub async fn profile_get(Extension(AuthenticatedAdmin(admin)): Extension<AuthenticatedAdmin>) -> ApiResult<Profile> {
    Ok(ApiResponse::success(Profile { admin }))
}

/// PUT /api/admin/profile
pub async fn profile_put(
    Extension(Db(store)): Extension<Db>,
    Extension(AuthenticatedAdmin(admin)): Extension<AuthenticatedAdmin>,
    Validated(body): Validated<ProfileRequest>,
) -> ApiResult<Profile> {
    let updated = store
        .update_identity(admin.id, body.into())
        .await
        .map_err(CredentialError::from)?
        .ok_or_else(|| ApiError::not_found("Admin not found"))?;

    Ok(ApiResponse::success(Profile { admin: updated }).with_message("Profile updated successfully"))
}
