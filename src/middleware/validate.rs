use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use crate::error::ApiError;
use crate::validation::violations;

/// JSON body that has passed `T`'s `Validate` rules.
///
/// Runs after the auth gate on protected routes, so an unauthenticated
/// request is rejected before its payload is ever inspected.
#[derive(Debug)]
pub struct Validated<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for Validated<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::invalid_json(rejection.body_text()))?;

        let value: T = serde_json::from_value(payload)
            .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?;

        if let Err(errors) = value.validate() {
            let violations = violations(&errors);
            let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
            tracing::debug!("Validation failed for fields {:?}", fields);
            return Err(violations.into());
        }

        Ok(Validated(value))
    }
}
