use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The only role an identity can hold.
pub const ADMIN_ROLE: &str = "admin";

/// The authenticated admin principal.
///
/// `password_hash` is never serialized, so an `Identity` can be returned
/// from any handler without leaking credentials.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for inserting a new identity; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Partial profile update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityPatch {
    pub username: Option<String>,
    pub email: Option<String>,
}
