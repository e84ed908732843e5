use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::auth::TokenService;
use crate::clock::Clock;
use crate::config::{AppConfig, ConfigError};
use crate::database::{self, ConnectionCache, Connector};
use crate::handlers::{admin, health, projects, upload};
use crate::pipeline::RequestPipeline;

/// Shared, cheaply cloneable application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub connections: Arc<ConnectionCache>,
    pub tokens: Arc<TokenService>,
    pub clock: Arc<dyn Clock>,
    pub started_at: Instant,
}

impl AppState {
    /// State backed by the connector `DATABASE_URL` selects.
    pub fn new(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let connector = database::connector_for(&config.database);
        Self::with_connector(config, connector, clock)
    }

    pub fn with_connector(
        config: AppConfig,
        connector: Arc<dyn Connector>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        let tokens = TokenService::new(&config.security.jwt_secret, Arc::clone(&clock))?;
        let connections = ConnectionCache::new(connector, config.database.connect_timeout());

        Ok(Self {
            config: Arc::new(config),
            connections: Arc::new(connections),
            tokens: Arc::new(tokens),
            clock,
            started_at: Instant::now(),
        })
    }
}

pub fn router(state: AppState) -> Router {
    let pipeline = RequestPipeline::new(state.clone());
    let config = Arc::clone(&state.config);

    // Outermost first
    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.server.cors_origins))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(DefaultBodyLimit::max(config.server.max_request_size_bytes));

    Router::new()
        // Outside the pipeline: must answer even when the database is down
        .route("/", get(health::root))
        .route("/api/health", get(health::health))
        .merge(pipeline.public(public_routes()))
        .merge(pipeline.protected(protected_routes()))
        .merge(pipeline.protected(upload_routes(config.uploads.body_limit())))
        .nest_service("/uploads", ServeDir::new(&config.uploads.dir))
        .fallback(health::fallback)
        .layer(middleware)
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/register", post(admin::register))
        .route("/api/admin/login", post(admin::login))
        .route("/api/projects", get(projects::list))
        .route("/api/projects/:id", get(projects::show))
}

fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/logout", post(admin::logout))
        .route("/api/admin/profile", get(admin::profile_get).put(admin::profile_put))
        .route("/api/projects", post(projects::create))
        .route(
            "/api/projects/:id",
            axum::routing::put(projects::update).delete(projects::delete),
        )
}

/// Multipart bodies get their own ceiling; per-file size and count are enforced while streaming.
fn upload_routes(body_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/api/upload/image", post(upload::upload_image))
        .route("/api/upload/images", post(upload::upload_images))
        .layer(DefaultBodyLimit::max(body_limit))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
}
