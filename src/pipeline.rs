//! Ordered request stages.
//!
//! Public routes: connection → validation → handler.
//! Protected routes: connection → auth → validation → handler.
//!
//! Connection and auth become `route_layer`s built from the stage lists below;
//! validation is the `Validated<T>` extractor and the handler is the route
//! itself, both of which axum runs after every layer. A stage that rejects
//! short-circuits everything after it.

use axum::{middleware::from_fn_with_state, Router};

use crate::app::AppState;
use crate::middleware::{auth_gate, connection_stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connection,
    Auth,
    Validation,
    Handler,
}

pub struct RequestPipeline {
    state: AppState,
}

impl RequestPipeline {
    pub const PUBLIC: &'static [Stage] = &[Stage::Connection, Stage::Validation, Stage::Handler];

    pub const PROTECTED: &'static [Stage] = &[
        Stage::Connection,
        Stage::Auth,
        Stage::Validation,
        Stage::Handler,
    ];

    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Routes that need a ready store but no identity.
    pub fn public(&self, routes: Router<AppState>) -> Router<AppState> {
        self.apply(Self::PUBLIC, routes)
    }

    /// Routes that need a ready store and a verified admin.
    pub fn protected(&self, routes: Router<AppState>) -> Router<AppState> {
        self.apply(Self::PROTECTED, routes)
    }

    /// Wrap `routes` so `stages` run in list order.
    ///
    /// Each `route_layer` call wraps the ones before it, so the list is
    /// applied back to front to leave the first stage outermost.
    pub fn apply(&self, stages: &[Stage], routes: Router<AppState>) -> Router<AppState> {
        stages.iter().rev().fold(routes, |routes, stage| match stage {
            Stage::Connection => routes.route_layer(from_fn_with_state(self.state.clone(), connection_stage)),
            Stage::Auth => routes.route_layer(from_fn_with_state(self.state.clone(), auth_gate)),
            // Extractor and route, not layers
            Stage::Validation | Stage::Handler => routes,
        })
    }
}
