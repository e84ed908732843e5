//! Admin registration and password login.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::database::models::{Identity, NewIdentity};
use crate::database::{CredentialStore, DatabaseError};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("an admin with this username or email already exists")]
    Conflict,

    /// Unknown handle, wrong password and inactive account are indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("registration is disabled")]
    RegistrationClosed,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Database(DatabaseError),
}

impl From<DatabaseError> for CredentialError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(_) => CredentialError::Conflict,
            other => CredentialError::Database(other),
        }
    }
}

/// Salted bcrypt hash, computed off the async executor.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, CredentialError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| CredentialError::Hashing(e.to_string()))?
        .map_err(|e| CredentialError::Hashing(e.to_string()))
}

/// Compare a candidate password against the stored hash. A corrupt hash never matches.
pub async fn verify_password(identity: &Identity, candidate: &str) -> bool {
    let hash = identity.password_hash.clone();
    let candidate = candidate.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Hash the password and insert the identity.
///
/// Uniqueness is enforced by the store at insert time, so of two concurrent
/// registrations for the same username or email exactly one succeeds.
pub async fn register<S>(store: &S, registration: Registration, cost: u32) -> Result<Identity, CredentialError>
where
    S: CredentialStore + ?Sized,
{
    let password_hash = hash_password(&registration.password, cost).await?;
    let identity = store
        .insert_identity(NewIdentity {
            username: registration.username.trim().to_string(),
            email: registration.email.trim().to_lowercase(),
            password_hash,
        })
        .await?;

    tracing::info!("Registered admin {} ({})", identity.username, identity.id);
    Ok(identity)
}

/// Resolve `handle` as a username or email, check the password and stamp `last_login`.
pub async fn authenticate<S>(
    store: &S,
    handle: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<Identity, CredentialError>
where
    S: CredentialStore + ?Sized,
{
    let handle = handle.trim();
    let identity = match store.find_by_username_or_email(handle).await? {
        Some(identity) => identity,
        None => match store.find_by_username_or_email(&handle.to_lowercase()).await? {
            Some(identity) => identity,
            None => return Err(CredentialError::InvalidCredentials),
        },
    };

    if !identity.is_active || !verify_password(&identity, password).await {
        tracing::debug!("Rejected login for {}", handle);
        return Err(CredentialError::InvalidCredentials);
    }

    store
        .record_login(identity.id, now)
        .await?
        .ok_or(CredentialError::InvalidCredentials)
}
