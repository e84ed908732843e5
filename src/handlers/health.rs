use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::app::AppState;
use crate::database::ConnectionState;
use crate::error::ApiError;

/// GET /api/health - uptime and connection state, never touches the database
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let connection = state.connections.state();
    let degraded = connection == ConnectionState::Failed;
    let status = if degraded { "degraded" } else { "ok" };

    let mut data = json!({
        "status": status,
        "timestamp": state.clock.now(),
        "uptimeSecs": state.started_at.elapsed().as_secs(),
        "environment": state.config.environment.as_str(),
        "database": connection.as_str(),
        "connectionAttempts": state.connections.attempts(),
    });
    if let Some(err) = state.connections.last_error() {
        data["lastError"] = json!(err.to_string());
    }

    let code = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(json!({ "success": !degraded, "data": data })))
}

/// GET /
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "success": true,
        "data": {
            "name": "Folio API",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": state.config.environment.as_str(),
            "endpoints": {
                "health": "/api/health (public)",
                "admin": "/api/admin/register, /api/admin/login (public); /api/admin/logout, /api/admin/profile (protected)",
                "projects": "/api/projects[/:id] (GET public, POST/PUT/DELETE protected)",
                "upload": "/api/upload/image, /api/upload/images (protected)",
                "uploads": "/uploads/:filename (public)",
            }
        }
    }))
}

/// Unknown routes
pub async fn fallback(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {} not found", uri.path()))
}
