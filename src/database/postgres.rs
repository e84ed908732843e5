use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::connection::{ConnectionError, Connector, StoreHandle};
use super::models::{
    Identity, IdentityPatch, NewIdentity, NewProject, Pagination, Project, ProjectPage,
    ProjectPatch, ProjectQuery, ProjectStatus, ADMIN_ROLE,
};
use super::store::{CredentialStore, DatabaseError, ProjectStore};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS admins (
        id            UUID PRIMARY KEY,
        username      TEXT NOT NULL UNIQUE,
        email         TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        role          TEXT NOT NULL DEFAULT 'admin',
        is_active     BOOLEAN NOT NULL DEFAULT TRUE,
        last_login    TIMESTAMPTZ,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS projects (
        id           UUID PRIMARY KEY,
        title        TEXT NOT NULL,
        description  TEXT NOT NULL,
        technologies TEXT[] NOT NULL DEFAULT '{}',
        images       TEXT[] NOT NULL DEFAULT '{}',
        image        TEXT,
        github_url   TEXT,
        live_url     TEXT,
        featured     BOOLEAN NOT NULL DEFAULT FALSE,
        status       TEXT NOT NULL DEFAULT 'draft',
        sort_order   INTEGER NOT NULL DEFAULT 0,
        created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at   TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS projects_status_order_idx ON projects (status, sort_order)",
    "CREATE INDEX IF NOT EXISTS projects_featured_idx ON projects (featured)",
];

const IDENTITY_COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, last_login, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, title, description, technologies, images, image, github_url, \
     live_url, featured, status, sort_order, created_at, updated_at";

/// Opens a `PgPool` against `DATABASE_URL` and bootstraps the schema.
pub struct PgConnector {
    url: String,
    max_connections: u32,
    acquire_timeout: Duration,
}

impl PgConnector {
    pub fn new(url: impl Into<String>, max_connections: u32, acquire_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            max_connections,
            acquire_timeout,
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self) -> Result<StoreHandle, ConnectionError> {
        if self.url.is_empty() {
            return Err(ConnectionError::NotConfigured);
        }

        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .acquire_timeout(self.acquire_timeout)
            .connect(&self.url)
            .await
            .map_err(|e| ConnectionError::Unreachable(e.to_string()))?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| ConnectionError::Bootstrap(e.to_string()))?;
        }

        Ok(Arc::new(PgStore::new(pool)))
    }

    fn target(&self) -> String {
        redact(&self.url)
    }
}

/// Host, port and database name only; credentials never reach the logs.
fn redact(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(url) => format!(
            "{}://{}{}{}",
            url.scheme(),
            url.host_str().unwrap_or("localhost"),
            url.port().map(|p| format!(":{}", p)).unwrap_or_default(),
            url.path()
        ),
        Err(_) => "<invalid database url>".to_string(),
    }
}

/// Map unique violations onto `Conflict`; everything else stays a sqlx error.
fn map_write_error(err: sqlx::Error) -> DatabaseError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DatabaseError::Conflict(db.constraint().unwrap_or("unique").to_string())
        }
        _ => DatabaseError::Sqlx(err),
    }
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_username_or_email(&self, handle: &str) -> Result<Option<Identity>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM admins WHERE username = $1 OR email = $1 LIMIT 1",
            IDENTITY_COLUMNS
        );
        let identity = sqlx::query_as::<_, Identity>(&sql)
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        Ok(identity)
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, DatabaseError> {
        let sql = format!("SELECT {} FROM admins WHERE id = $1", IDENTITY_COLUMNS);
        let identity = sqlx::query_as::<_, Identity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(identity)
    }

    async fn insert_identity(&self, new: NewIdentity) -> Result<Identity, DatabaseError> {
        // The UNIQUE constraints decide races between concurrent registrations.
        let sql = format!(
            "INSERT INTO admins (id, username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            IDENTITY_COLUMNS
        );
        sqlx::query_as::<_, Identity>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.username)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(ADMIN_ROLE)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Identity>, DatabaseError> {
        let sql = format!(
            "UPDATE admins SET last_login = $2 WHERE id = $1 RETURNING {}",
            IDENTITY_COLUMNS
        );
        let identity = sqlx::query_as::<_, Identity>(&sql)
            .bind(id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;
        Ok(identity)
    }

    async fn update_identity(&self, id: Uuid, patch: IdentityPatch) -> Result<Option<Identity>, DatabaseError> {
        let sql = format!(
            "UPDATE admins SET username = COALESCE($2, username), email = COALESCE($3, email), \
             updated_at = now() WHERE id = $1 RETURNING {}",
            IDENTITY_COLUMNS
        );
        sqlx::query_as::<_, Identity>(&sql)
            .bind(id)
            .bind(patch.username)
            .bind(patch.email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn list_published(&self, query: ProjectQuery) -> Result<ProjectPage, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM projects WHERE status = $1 AND (NOT $2 OR featured) \
             ORDER BY sort_order ASC, created_at DESC LIMIT $3 OFFSET $4",
            PROJECT_COLUMNS
        );
        let projects = sqlx::query_as::<_, Project>(&sql)
            .bind(ProjectStatus::Published.as_str())
            .bind(query.featured_only)
            .bind(i64::from(query.limit))
            .bind(query.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM projects WHERE status = $1 AND (NOT $2 OR featured)")
                .bind(ProjectStatus::Published.as_str())
                .bind(query.featured_only)
                .fetch_one(&self.pool)
                .await?;

        Ok(ProjectPage {
            projects,
            pagination: Pagination::new(&query, total.max(0) as u64),
        })
    }

    async fn find_published(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM projects WHERE id = $1 AND status = $2",
            PROJECT_COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(ProjectStatus::Published.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn create_project(&self, new: NewProject) -> Result<Project, DatabaseError> {
        let sql = format!(
            "INSERT INTO projects (id, title, description, technologies, images, image, \
             github_url, live_url, featured, status, sort_order) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) RETURNING {}",
            PROJECT_COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.title)
            .bind(&new.description)
            .bind(&new.technologies)
            .bind(&new.images)
            .bind(&new.image)
            .bind(&new.github_url)
            .bind(&new.live_url)
            .bind(new.featured)
            .bind(new.status.as_str())
            .bind(new.order)
            .fetch_one(&self.pool)
            .await?;
        Ok(project)
    }

    async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> Result<Option<Project>, DatabaseError> {
        let sql = format!(
            "UPDATE projects SET \
             title = COALESCE($2, title), \
             description = COALESCE($3, description), \
             technologies = COALESCE($4, technologies), \
             image = COALESCE($5, image), \
             github_url = COALESCE($6, github_url), \
             live_url = COALESCE($7, live_url), \
             featured = COALESCE($8, featured), \
             status = COALESCE($9, status), \
             sort_order = COALESCE($10, sort_order), \
             updated_at = now() \
             WHERE id = $1 RETURNING {}",
            PROJECT_COLUMNS
        );
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(patch.title)
            .bind(patch.description)
            .bind(patch.technologies)
            .bind(patch.image)
            .bind(patch.github_url)
            .bind(patch.live_url)
            .bind(patch.featured)
            .bind(patch.status.map(|s| s.as_str()))
            .bind(patch.order)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
