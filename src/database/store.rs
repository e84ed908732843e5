use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::models::{
    Identity, IdentityPatch, NewIdentity, NewProject, Project, ProjectPage, ProjectPatch,
    ProjectQuery,
};

/// Errors from data-access calls on a ready store
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persisted admin identities.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an active-or-inactive identity whose username or email equals `handle`.
    async fn find_by_username_or_email(&self, handle: &str) -> Result<Option<Identity>, DatabaseError>;

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, DatabaseError>;

    /// Insert atomically; a duplicate username or email yields `DatabaseError::Conflict`.
    async fn insert_identity(&self, new: NewIdentity) -> Result<Identity, DatabaseError>;

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Identity>, DatabaseError>;

    /// Same uniqueness guarantee as `insert_identity`.
    async fn update_identity(&self, id: Uuid, patch: IdentityPatch) -> Result<Option<Identity>, DatabaseError>;
}

/// Project records.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_published(&self, query: ProjectQuery) -> Result<ProjectPage, DatabaseError>;

    async fn find_published(&self, id: Uuid) -> Result<Option<Project>, DatabaseError>;

    async fn create_project(&self, new: NewProject) -> Result<Project, DatabaseError>;

    async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> Result<Option<Project>, DatabaseError>;

    /// Returns whether a row was removed.
    async fn delete_project(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

/// Everything a ready connection handle can do.
pub trait Store: CredentialStore + ProjectStore {}

impl<T: CredentialStore + ProjectStore> Store for T {}
