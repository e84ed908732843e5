pub mod auth;
pub mod connection;
pub mod response;
pub mod validate;

pub use auth::{auth_gate, AuthError, AuthenticatedAdmin};
pub use connection::{connection_stage, Db};
pub use response::{ApiResponse, ApiResult};
pub use validate::Validated;
