use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub images: Vec<String>,
    pub image: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: bool,
    pub status: String,
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored project lifecycle. Only `Published` projects are publicly visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Draft,
    Published,
    Archived,
}

impl ProjectStatus {
    /// Every spelling the API accepts for `status`.
    pub const ACCEPTED: &'static [&'static str] = &[
        "draft",
        "published",
        "archived",
        "Draft",
        "Published",
        "Archived",
        "Completed",
        "In Progress",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Published => "published",
            ProjectStatus::Archived => "archived",
        }
    }

    /// Map a client-facing label onto the stored status.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "draft" | "Draft" | "In Progress" => Some(ProjectStatus::Draft),
            "published" | "Published" | "Completed" => Some(ProjectStatus::Published),
            "archived" | "Archived" => Some(ProjectStatus::Archived),
            _ => None,
        }
    }
}

/// Fully resolved insert, produced by the create handler.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub images: Vec<String>,
    pub image: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: bool,
    pub status: ProjectStatus,
    pub order: i32,
}

/// Partial update. `None` leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub image: Option<String>,
    pub github_url: Option<String>,
    pub live_url: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<ProjectStatus>,
    pub order: Option<i32>,
}

/// Public listing filter and page window.
#[derive(Debug, Clone, Copy)]
pub struct ProjectQuery {
    pub featured_only: bool,
    pub limit: u32,
    pub page: u32,
}

impl ProjectQuery {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(featured_only: bool, limit: Option<u32>, page: Option<u32>) -> Self {
        Self {
            featured_only,
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
            page: page.unwrap_or(1).max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_projects: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(query: &ProjectQuery, total: u64) -> Self {
        let total_pages = total.div_ceil(u64::from(query.limit));
        Self {
            current_page: query.page,
            total_pages,
            total_projects: total,
            has_next: u64::from(query.page) < total_pages,
            has_prev: query.page > 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectPage {
    pub projects: Vec<Project>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_map_to_stored_values() {
        assert_eq!(ProjectStatus::from_label("Completed"), Some(ProjectStatus::Published));
        assert_eq!(ProjectStatus::from_label("In Progress"), Some(ProjectStatus::Draft));
        assert_eq!(ProjectStatus::from_label("Archived"), Some(ProjectStatus::Archived));
        assert_eq!(ProjectStatus::from_label("shipped"), None);
        for label in ProjectStatus::ACCEPTED {
            assert!(ProjectStatus::from_label(label).is_some(), "{label}");
        }
    }

    #[test]
    fn query_clamps_limit_and_page() {
        let q = ProjectQuery::new(false, Some(0), Some(0));
        assert_eq!((q.limit, q.page), (1, 1));
        let q = ProjectQuery::new(false, Some(500), None);
        assert_eq!(q.limit, ProjectQuery::MAX_LIMIT);
        let q = ProjectQuery::new(false, Some(10), Some(3));
        assert_eq!(q.offset(), 20);
    }

    #[test]
    fn pagination_math() {
        let q = ProjectQuery::new(false, Some(10), Some(2));
        let p = Pagination::new(&q, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);

        let p = Pagination::new(&ProjectQuery::new(false, None, None), 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }
}
