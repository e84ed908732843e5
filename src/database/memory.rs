use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use super::connection::{ConnectionError, Connector, StoreHandle};
use super::models::{
    Identity, IdentityPatch, NewIdentity, NewProject, Pagination, Project, ProjectPage,
    ProjectPatch, ProjectQuery, ProjectStatus, ADMIN_ROLE,
};
use super::store::{CredentialStore, DatabaseError, ProjectStore};

/// Hands out one in-process store, selected with `DATABASE_URL=memory://`.
pub struct MemoryConnector {
    store: Arc<MemoryStore>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// The store every `connect()` hands out.
    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<StoreHandle, ConnectionError> {
        Ok(self.store.clone())
    }

    fn target(&self) -> String {
        "memory://".to_string()
    }
}

#[derive(Default)]
struct Tables {
    admins: HashMap<Uuid, Identity>,
    projects: HashMap<Uuid, Project>,
}

/// In-process store. Every write happens under one lock, so uniqueness
/// checks and inserts are atomic with respect to each other.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable an admin account. `false` when no such admin exists.
    pub fn set_active(&self, id: Uuid, active: bool) -> bool {
        match self.tables().admins.get_mut(&id) {
            Some(identity) => {
                identity.is_active = active;
                identity.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn conflict_in(tables: &Tables, skip: Option<Uuid>, username: Option<&str>, email: Option<&str>) -> bool {
    tables.admins.values().any(|existing| {
        Some(existing.id) != skip
            && (username == Some(existing.username.as_str()) || email == Some(existing.email.as_str()))
    })
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_username_or_email(&self, handle: &str) -> Result<Option<Identity>, DatabaseError> {
        Ok(self
            .tables()
            .admins
            .values()
            .find(|identity| identity.username == handle || identity.email == handle)
            .cloned())
    }

    async fn find_identity(&self, id: Uuid) -> Result<Option<Identity>, DatabaseError> {
        Ok(self.tables().admins.get(&id).cloned())
    }

    async fn insert_identity(&self, new: NewIdentity) -> Result<Identity, DatabaseError> {
        let mut tables = self.tables();
        if conflict_in(&tables, None, Some(&new.username), Some(&new.email)) {
            return Err(DatabaseError::Conflict("admins_username_or_email".to_string()));
        }

        let now = Utc::now();
        let identity = Identity {
            id: Uuid::new_v4(),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            role: ADMIN_ROLE.to_string(),
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        tables.admins.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<Identity>, DatabaseError> {
        let mut tables = self.tables();
        Ok(tables.admins.get_mut(&id).map(|identity| {
            identity.last_login = Some(at);
            identity.clone()
        }))
    }

    async fn update_identity(&self, id: Uuid, patch: IdentityPatch) -> Result<Option<Identity>, DatabaseError> {
        let mut tables = self.tables();
        if !tables.admins.contains_key(&id) {
            return Ok(None);
        }
        if conflict_in(&tables, Some(id), patch.username.as_deref(), patch.email.as_deref()) {
            return Err(DatabaseError::Conflict("admins_username_or_email".to_string()));
        }

        let identity = match tables.admins.get_mut(&id) {
            Some(identity) => identity,
            None => return Ok(None),
        };
        if let Some(username) = patch.username {
            identity.username = username;
        }
        if let Some(email) = patch.email {
            identity.email = email;
        }
        identity.updated_at = Utc::now();
        Ok(Some(identity.clone()))
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn list_published(&self, query: ProjectQuery) -> Result<ProjectPage, DatabaseError> {
        let tables = self.tables();
        let mut matching: Vec<&Project> = tables
            .projects
            .values()
            .filter(|p| p.status == ProjectStatus::Published.as_str())
            .filter(|p| !query.featured_only || p.featured)
            .collect();
        matching.sort_by(|a, b| a.order.cmp(&b.order).then(b.created_at.cmp(&a.created_at)));

        let total = matching.len() as u64;
        let projects = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(ProjectPage {
            projects,
            pagination: Pagination::new(&query, total),
        })
    }

    async fn find_published(&self, id: Uuid) -> Result<Option<Project>, DatabaseError> {
        Ok(self
            .tables()
            .projects
            .get(&id)
            .filter(|p| p.status == ProjectStatus::Published.as_str())
            .cloned())
    }

    async fn create_project(&self, new: NewProject) -> Result<Project, DatabaseError> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            technologies: new.technologies,
            images: new.images,
            image: new.image,
            github_url: new.github_url,
            live_url: new.live_url,
            featured: new.featured,
            status: new.status.as_str().to_string(),
            order: new.order,
            created_at: now,
            updated_at: now,
        };
        self.tables().projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn update_project(&self, id: Uuid, patch: ProjectPatch) -> Result<Option<Project>, DatabaseError> {
        let mut tables = self.tables();
        let project = match tables.projects.get_mut(&id) {
            Some(project) => project,
            None => return Ok(None),
        };

        if let Some(title) = patch.title {
            project.title = title;
        }
        if let Some(description) = patch.description {
            project.description = description;
        }
        if let Some(technologies) = patch.technologies {
            project.technologies = technologies;
        }
        if let Some(image) = patch.image {
            project.image = Some(image);
        }
        if let Some(github_url) = patch.github_url {
            project.github_url = Some(github_url);
        }
        if let Some(live_url) = patch.live_url {
            project.live_url = Some(live_url);
        }
        if let Some(featured) = patch.featured {
            project.featured = featured;
        }
        if let Some(status) = patch.status {
            project.status = status.as_str().to_string();
        }
        if let Some(order) = patch.order {
            project.order = order;
        }
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.tables().projects.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_identity(username: &str, email: &str) -> NewIdentity {
        NewIdentity {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
        }
    }

    fn new_project(title: &str, status: ProjectStatus, order: i32) -> NewProject {
        NewProject {
            title: title.to_string(),
            description: "A description long enough".to_string(),
            technologies: vec!["rust".to_string()],
            images: vec![],
            image: None,
            github_url: None,
            live_url: None,
            featured: false,
            status,
            order,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_username_or_email() {
        let store = MemoryStore::new();
        store.insert_identity(new_identity("admin", "a@example.com")).await.unwrap();

        let dup_name = store.insert_identity(new_identity("admin", "b@example.com")).await;
        assert!(matches!(dup_name, Err(DatabaseError::Conflict(_))));
        let dup_mail = store.insert_identity(new_identity("other", "a@example.com")).await;
        assert!(matches!(dup_mail, Err(DatabaseError::Conflict(_))));
    }

    #[tokio::test]
    async fn finds_by_username_or_email() {
        let store = MemoryStore::new();
        let created = store.insert_identity(new_identity("admin", "a@example.com")).await.unwrap();

        let by_name = store.find_by_username_or_email("admin").await.unwrap().unwrap();
        let by_mail = store.find_by_username_or_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
        assert_eq!(by_mail.id, created.id);
        assert!(store.find_by_username_or_email("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn profile_update_keeps_uniqueness() {
        let store = MemoryStore::new();
        let first = store.insert_identity(new_identity("first", "1@example.com")).await.unwrap();
        store.insert_identity(new_identity("second", "2@example.com")).await.unwrap();

        let clash = IdentityPatch {
            username: Some("second".to_string()),
            email: None,
        };
        assert!(matches!(
            store.update_identity(first.id, clash).await,
            Err(DatabaseError::Conflict(_))
        ));

        // Re-submitting your own username is not a conflict.
        let same = IdentityPatch {
            username: Some("first".to_string()),
            email: Some("new@example.com".to_string()),
        };
        let updated = store.update_identity(first.id, same).await.unwrap().unwrap();
        assert_eq!(updated.email, "new@example.com");
    }

    #[tokio::test]
    async fn lists_only_published_in_order() {
        let store = MemoryStore::new();
        store.create_project(new_project("second", ProjectStatus::Published, 2)).await.unwrap();
        store.create_project(new_project("first", ProjectStatus::Published, 1)).await.unwrap();
        store.create_project(new_project("hidden", ProjectStatus::Draft, 0)).await.unwrap();

        let page = store.list_published(ProjectQuery::new(false, None, None)).await.unwrap();
        let titles: Vec<&str> = page.projects.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert_eq!(page.pagination.total_projects, 2);
    }

    #[tokio::test]
    async fn patch_leaves_absent_fields_untouched() {
        let store = MemoryStore::new();
        let created = store.create_project(new_project("title", ProjectStatus::Draft, 0)).await.unwrap();

        let patch = ProjectPatch {
            title: Some("renamed".to_string()),
            ..Default::default()
        };
        let updated = store.update_project(created.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.description, created.description);
        assert_eq!(updated.status, "draft");

        assert!(store.update_project(Uuid::new_v4(), ProjectPatch::default()).await.unwrap().is_none());
        assert!(store.delete_project(created.id).await.unwrap());
        assert!(!store.delete_project(created.id).await.unwrap());
    }
}
