//! List-store backends for the job queue.
//!
//! The queue only needs four list primitives, so any store offering an atomic
//! blocking pop can back it:
//! - Memory store (in-process, for tests and single-process runs)
//! - Redis store (durable, shared by competing consumers)
//!
//! # Configuration
//!
//! ```toml
//! [queue]
//! backend = "redis"  # or "memory"
//! namespace = "jobs"
//!
//! [queue.redis]
//! url = "redis://127.0.0.1:6379"
//! pool_size = 4
//! connection_timeout = 5
//! ```

mod memory;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

pub use self::memory::MemoryListStore;
pub use self::redis::RedisListStore;

use crate::config::settings::{QueueBackend, QueueConfig};
use crate::jobs::error::StoreError;

/// Trait for durable FIFO list operations.
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Append a value to the tail of `key` (RPUSH).
    async fn push_back(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Pop the head of `key`, waiting at most `wait` for one to arrive (BLPOP).
    async fn pop_front_blocking(
        &self,
        key: &str,
        wait: Duration,
    ) -> Result<Option<String>, StoreError>;

    /// Read an inclusive index range without removing anything (LRANGE).
    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError>;

    /// Number of entries in `key` (LLEN).
    async fn len(&self, key: &str) -> Result<usize, StoreError>;
}

/// Build the store selected by configuration.
pub async fn connect(config: &QueueConfig) -> Result<Arc<dyn ListStore>, StoreError> {
    let store: Arc<dyn ListStore> = match config.backend {
        QueueBackend::Memory => Arc::new(MemoryListStore::new()),
        QueueBackend::Redis => Arc::new(RedisListStore::new(&config.redis).await?),
    };
    Ok(store)
}
