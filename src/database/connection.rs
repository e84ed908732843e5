use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::Store;

/// The single shared store handle handed to every data-access call.
pub type StoreHandle = Arc<dyn Store>;

/// Errors from establishing the connection. Cloned to every waiter of an attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("database URI is not configured")]
    NotConfigured,

    #[error("connection attempt timed out after {0:?}")]
    Timeout(Duration),

    #[error("database unreachable: {0}")]
    Unreachable(String),

    #[error("schema bootstrap failed: {0}")]
    Bootstrap(String),
}

/// Opens the underlying connection. One call is one network attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<StoreHandle, ConnectionError>;

    /// Redacted description of the target, safe for logs.
    fn target(&self) -> String;
}

/// Observable lifecycle of the cached handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Absent,
    Pending,
    Ready,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Absent => "absent",
            ConnectionState::Pending => "pending",
            ConnectionState::Ready => "ready",
            ConnectionState::Failed => "failed",
        }
    }
}

type Attempt = Shared<BoxFuture<'static, Result<StoreHandle, ConnectionError>>>;

enum Slot {
    Absent,
    Pending { generation: u64, attempt: Attempt },
    Ready(StoreHandle),
    Failed(ConnectionError),
}

struct Inner {
    slot: Slot,
    generation: u64,
}

/// Process-wide, lazily created store handle with single-flight initialization.
///
/// Concurrent callers that find an attempt in flight await that same attempt.
/// A failed attempt is not cached: the next `acquire` starts a fresh one.
pub struct ConnectionCache {
    connector: Arc<dyn Connector>,
    timeout: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl ConnectionCache {
    pub fn new(connector: Arc<dyn Connector>, timeout: Duration) -> Self {
        Self {
            connector,
            timeout,
            inner: Arc::new(Mutex::new(Inner {
                slot: Slot::Absent,
                generation: 0,
            })),
        }
    }

    pub fn state(&self) -> ConnectionState {
        match lock(&self.inner).slot {
            Slot::Absent => ConnectionState::Absent,
            Slot::Pending { .. } => ConnectionState::Pending,
            Slot::Ready(_) => ConnectionState::Ready,
            Slot::Failed(_) => ConnectionState::Failed,
        }
    }

    /// Error from the most recent attempt, while the cache sits in `Failed`.
    pub fn last_error(&self) -> Option<ConnectionError> {
        match &lock(&self.inner).slot {
            Slot::Failed(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// Number of connection attempts started so far.
    pub fn attempts(&self) -> u64 {
        lock(&self.inner).generation
    }

    pub async fn acquire(&self) -> Result<StoreHandle, ConnectionError> {
        let attempt = {
            let mut inner = lock(&self.inner);
            let in_flight = match &inner.slot {
                Slot::Ready(handle) => return Ok(Arc::clone(handle)),
                Slot::Pending { attempt, .. } => Some(attempt.clone()),
                Slot::Absent | Slot::Failed(_) => None,
            };
            match in_flight {
                Some(attempt) => {
                    debug!("Joining in-flight connection attempt");
                    attempt
                }
                None => self.start_attempt(&mut inner),
            }
        };

        attempt.await
    }

    fn start_attempt(&self, inner: &mut Inner) -> Attempt {
        inner.generation += 1;
        let generation = inner.generation;
        let connector = Arc::clone(&self.connector);
        let shared_inner = Arc::clone(&self.inner);
        let timeout = self.timeout;

        info!("Connecting to {} (attempt {})", connector.target(), generation);

        let attempt = async move {
            let outcome = match tokio::time::timeout(timeout, connector.connect()).await {
                Ok(result) => result,
                Err(_) => Err(ConnectionError::Timeout(timeout)),
            };
            settle(&shared_inner, generation, &outcome);
            outcome
        }
        .boxed()
        .shared();

        inner.slot = Slot::Pending {
            generation,
            attempt: attempt.clone(),
        };

        // Drive the attempt to completion even if every waiter goes away.
        tokio::spawn(attempt.clone());
        attempt
    }
}

fn settle(inner: &Mutex<Inner>, generation: u64, outcome: &Result<StoreHandle, ConnectionError>) {
    let mut inner = lock(inner);
    if !matches!(inner.slot, Slot::Pending { generation: g, .. } if g == generation) {
        return;
    }

    inner.slot = match outcome {
        Ok(handle) => {
            info!("Database connection ready");
            Slot::Ready(Arc::clone(handle))
        }
        Err(e) => {
            warn!("Database connection failed: {}", e);
            Slot::Failed(e.clone())
        }
    };
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
