use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::database::connection::{ConnectionError, Connector, StoreHandle};
use crate::database::memory::MemoryStore;

/// Connector that waits before handing out a fresh in-memory store.
pub struct SlowConnector {
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowConnector {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for SlowConnector {
    async fn connect(&self) -> Result<StoreHandle, ConnectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Arc::new(MemoryStore::new()))
    }

    fn target(&self) -> String {
        "slow-memory".to_string()
    }
}

/// Connector whose first `failures` attempts fail after a short delay.
pub struct FlakyConnector {
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyConnector {
    pub fn failing_first(failures: usize) -> Self {
        Self {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FlakyConnector {
    async fn connect(&self) -> Result<StoreHandle, ConnectionError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        if call < self.failures {
            return Err(ConnectionError::Unreachable("connection refused".to_string()));
        }
        Ok(Arc::new(MemoryStore::new()))
    }

    fn target(&self) -> String {
        "flaky-memory".to_string()
    }
}
