pub mod identity;
pub mod project;

pub use identity::{Identity, IdentityPatch, NewIdentity, ADMIN_ROLE};
pub use project::{
    NewProject, Pagination, Project, ProjectPage, ProjectPatch, ProjectQuery, ProjectStatus,
};
