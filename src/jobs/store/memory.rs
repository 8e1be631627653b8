//! In-process list store with blocking pops.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::ListStore;
use crate::jobs::error::StoreError;

/// Lists kept in memory. Pops are atomic under the mutex, so several consumers
/// can compete for the same key just like they would against Redis.
#[derive(Default)]
pub struct MemoryListStore {
    lists: Mutex<HashMap<String, VecDeque<String>>>,
    pushed: Notify,
}

impl MemoryListStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, VecDeque<String>>>, StoreError> {
        self.lists
            .lock()
            .map_err(|e| StoreError::Operation(e.to_string()))
    }

    fn try_pop(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut lists = self.lock()?;
        Ok(lists.get_mut(key).and_then(VecDeque::pop_front))
    }
}

/// Resolve a Redis-style index (negative counts from the tail) against `len`.
fn resolve_index(index: isize, len: usize) -> isize {
    if index < 0 { len as isize + index } else { index }
}

#[async_trait]
impl ListStore for MemoryListStore {
    async fn push_back(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.lock()?
            .entry(key.to_string())
            .or_default()
            .push_back(value);
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn pop_front_blocking(
        &self,
        key: &str,
        wait: Duration,
    ) -> Result<Option<String>, StoreError> {
        let deadline = Instant::now() + wait;
        loop {
            // Register interest before checking so a push between the check
            // and the await is not missed.
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(value) = self.try_pop(key)? {
                return Ok(Some(value));
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        let lists = self.lock()?;
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        let len = list.len();
        let start = resolve_index(start, len).max(0);
        let stop = resolve_index(stop, len).min(len as isize - 1);
        if len == 0 || start > stop {
            return Ok(Vec::new());
        }
        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.lock()?.get(key).map_or(0, VecDeque::len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_fifo_order() {
        let store = MemoryListStore::new();
        for value in ["a", "b", "c"] {
            store.push_back("q", value.to_string()).await.unwrap();
        }
        let wait = Duration::from_millis(10);
        assert_eq!(store.pop_front_blocking("q", wait).await.unwrap().as_deref(), Some("a"));
        assert_eq!(store.pop_front_blocking("q", wait).await.unwrap().as_deref(), Some("b"));
        assert_eq!(store.len("q").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pop_times_out_on_empty_list() {
        let store = MemoryListStore::new();
        let popped = store
            .pop_front_blocking("empty", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn test_blocked_pop_wakes_on_push() {
        let store = Arc::new(MemoryListStore::new());
        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .pop_front_blocking("q", Duration::from_secs(5))
                    .await
                    .unwrap()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.push_back("q", "late".to_string()).await.unwrap();

        let popped = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("pop should wake up")
            .unwrap();
        assert_eq!(popped.as_deref(), Some("late"));
    }

    #[tokio::test]
    async fn test_range_matches_lrange_semantics() {
        let store = MemoryListStore::new();
        for value in ["a", "b", "c", "d"] {
            store.push_back("l", value.to_string()).await.unwrap();
        }
        assert_eq!(store.range("l", 0, 1).await.unwrap(), vec!["a", "b"]);
        assert_eq!(store.range("l", 0, -1).await.unwrap().len(), 4);
        assert_eq!(store.range("l", 2, 100).await.unwrap(), vec!["c", "d"]);
        assert!(store.range("l", 3, 1).await.unwrap().is_empty());
        assert!(store.range("missing", 0, 10).await.unwrap().is_empty());
        // Reads are non-destructive.
        assert_eq!(store.len("l").await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let store = MemoryListStore::new();
        store.push_back("jobs:main", "m".to_string()).await.unwrap();
        store.push_back("jobs:dlq", "d".to_string()).await.unwrap();
        assert_eq!(store.len("jobs:main").await.unwrap(), 1);
        assert_eq!(store.len("jobs:dlq").await.unwrap(), 1);
    }
}
