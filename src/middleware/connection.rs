use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::database::StoreHandle;
use crate::error::ApiError;

/// Ready store handle, injected by `connection_stage`
#[derive(Clone)]
pub struct Db(pub StoreHandle);

/// First pipeline stage: make sure the shared connection is ready before any
/// handler runs. Requests arriving during a cold start all wait on the same
/// attempt; a failed attempt surfaces as a 500.
pub async fn connection_stage(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let handle = state.connections.acquire().await.map_err(|e| {
        tracing::error!(
            "Connection stage failed for {} {}: {}",
            request.method(),
            request.uri().path(),
            e
        );
        ApiError::from(e)
    })?;

    request.extensions_mut().insert(Db(handle));
    Ok(next.run(request).await)
}
