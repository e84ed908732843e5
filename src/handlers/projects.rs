// handlers/projects.rs - /api/projects resource
//
// Reads are public and only ever see published projects. Writes go through
// the protected pipeline, so every handler below a write route can assume a
// verified admin and a payload that already passed ProjectInput's rules.

use axum::{
    extract::{Path, Query, State},
    Extension,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::database::models::{NewProject, Project, ProjectPage, ProjectPatch, ProjectQuery, ProjectStatus};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthenticatedAdmin, Db, Validated};
use crate::validation::{rules, FieldViolation};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub featured: Option<String>,
    pub limit: Option<String>,
    pub page: Option<String>,
}

impl From<ListParams> for ProjectQuery {
    fn from(params: ListParams) -> Self {
        ProjectQuery::new(
            params.featured.as_deref() == Some("true"),
            params.limit.and_then(|v| v.trim().parse().ok()),
            params.page.and_then(|v| v.trim().parse().ok()),
        )
    }
}

/// Create and update payload. Every field is optional at this level;
/// creation additionally requires `title` and `description`.
/// `null` links deserialize to `None` and are left alone like blank ones.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInput {
    #[validate(custom(function = "rules::title_length"))]
    pub title: Option<String>,
    #[validate(custom(function = "rules::description_length"))]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "At least one technology must be specified"))]
    pub technologies: Option<Vec<String>>,
    #[validate(custom(function = "rules::github_url"))]
    pub github_url: Option<String>,
    #[validate(custom(function = "rules::live_url"))]
    pub live_url: Option<String>,
    #[validate(custom(function = "rules::image_url"))]
    pub image: Option<String>,
    pub featured: Option<bool>,
    #[validate(custom(function = "rules::accepted_status"))]
    pub status: Option<String>,
    #[validate(range(min = 0, message = "Order must be a non-negative integer"))]
    pub order: Option<i32>,
}

impl ProjectInput {
    fn status(&self) -> Option<ProjectStatus> {
        self.status.as_deref().and_then(ProjectStatus::from_label)
    }

    fn into_new_project(self) -> Result<NewProject, ApiError> {
        let status = self.status().unwrap_or(ProjectStatus::Draft);
        let image = non_blank(self.image);

        let mut missing = Vec::new();
        let title = required(self.title, "title", "Title is required", &mut missing);
        let description = required(self.description, "description", "Description is required", &mut missing);
        if !missing.is_empty() {
            return Err(missing.into());
        }

        Ok(NewProject {
            title,
            description,
            technologies: self.technologies.unwrap_or_default(),
            images: image.iter().cloned().collect(),
            image,
            github_url: non_blank(self.github_url),
            live_url: non_blank(self.live_url),
            featured: self.featured.unwrap_or(false),
            status,
            order: self.order.unwrap_or(0),
        })
    }

    fn into_patch(self) -> ProjectPatch {
        let status = self.status();
        ProjectPatch {
            title: self.title.map(|t| t.trim().to_string()),
            description: self.description.map(|d| d.trim().to_string()),
            technologies: self.technologies,
            image: non_blank(self.image),
            github_url: non_blank(self.github_url),
            live_url: non_blank(self.live_url),
            featured: self.featured,
            status,
            order: self.order,
        }
    }
}

/// Blank strings count as "not provided".
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(
    value: Option<String>,
    field: &str,
    message: &str,
    missing: &mut Vec<FieldViolation>,
) -> String {
    match non_blank(value) {
        Some(value) => value,
        None => {
            missing.push(FieldViolation {
                field: field.to_string(),
                message: message.to_string(),
            });
            String::new()
        }
    }
}

/// Malformed ids can never name a project, so they are plain 404s.
fn project_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| project_not_found())
}

fn project_not_found() -> ApiError {
    ApiError::not_found("Project not found")
}

#[derive(Debug, Serialize)]
pub struct ProjectBody {
    pub project: Project,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
}

/// GET /api/projects
pub async fn list(Extension(Db(store)): Extension<Db>, Query(params): Query<ListParams>) -> ApiResult<ProjectPage> {
    let page = store.list_published(params.into()).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/projects/:id
pub async fn show(Extension(Db(store)): Extension<Db>, Path(id): Path<String>) -> ApiResult<ProjectBody> {
    let id = project_id(&id)?;
    let project = store.find_published(id).await?.ok_or_else(project_not_found)?;
    Ok(ApiResponse::success(ProjectBody { project }))
}

/// POST /api/projects
pub async fn create(
    Extension(Db(store)): Extension<Db>,
    Extension(AuthenticatedAdmin(admin)): Extension<AuthenticatedAdmin>,
    Validated(input): Validated<ProjectInput>,
) -> ApiResult<ProjectBody> {
    let project = store.create_project(input.into_new_project()?).await?;

    tracing::info!("Admin {} created project {} ({})", admin.id, project.id, project.status);
    Ok(ApiResponse::created(ProjectBody { project }).with_message("Project created successfully"))
}

/// PUT /api/projects/:id
pub async fn update(
    Extension(Db(store)): Extension<Db>,
    Extension(AuthenticatedAdmin(admin)): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
    Validated(input): Validated<ProjectInput>,
) -> ApiResult<ProjectBody> {
    let id = project_id(&id)?;
    let project = store
        .update_project(id, input.into_patch())
        .await?
        .ok_or_else(project_not_found)?;

    tracing::info!("Admin {} updated project {}", admin.id, project.id);
    Ok(ApiResponse::success(ProjectBody { project }).with_message("Project updated successfully"))
}

/// DELETE /api/projects/:id
pub async fn delete(
    Extension(Db(store)): Extension<Db>,
    Extension(AuthenticatedAdmin(admin)): Extension<AuthenticatedAdmin>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    let id = project_id(&id)?;
    if !store.delete_project(id).await? {
        return Err(project_not_found());
    }

    tracing::info!("Admin {} deleted project {}", admin.id, id);
    Ok(ApiResponse::success(Deleted { id }).with_message("Project deleted successfully"))
}
