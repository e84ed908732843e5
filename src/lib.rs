pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod pipeline;
pub mod uploads;
pub mod validation;

pub use app::{router, AppState};
pub use config::AppConfig;

#[cfg(test)]
pub mod testing;
