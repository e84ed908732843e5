pub mod connection;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

use std::sync::Arc;

pub use connection::{ConnectionCache, ConnectionError, ConnectionState, Connector, StoreHandle};
pub use memory::{MemoryConnector, MemoryStore};
pub use postgres::{PgConnector, PgStore};
pub use store::{CredentialStore, DatabaseError, ProjectStore, Store};

use crate::config::DatabaseConfig;

/// Pick the connector for the configured database URI scheme.
pub fn connector_for(config: &DatabaseConfig) -> Arc<dyn Connector> {
    if config.url.starts_with("memory:") {
        Arc::new(MemoryConnector::new())
    } else {
        Arc::new(PgConnector::new(
            config.url.clone(),
            config.max_connections,
            config.connect_timeout(),
        ))
    }
}
