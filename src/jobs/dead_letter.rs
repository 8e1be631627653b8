//! Append-only store for messages that failed terminally.

use std::sync::Arc;

use crate::jobs::error::JobResult;
use crate::jobs::store::ListStore;
use crate::jobs::types::Message;

/// Dead-letter list kept next to the main queue list.
///
/// Entries are never removed by this type; purging is an operator task.
#[derive(Clone)]
pub struct DeadLetterStore {
    store: Arc<dyn ListStore>,
    key: String,
}

impl DeadLetterStore {
    pub fn new(store: Arc<dyn ListStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Persist a terminally failed message.
    pub async fn append(&self, message: &Message) -> JobResult<()> {
        let encoded = message.to_json()?;
        self.store.push_back(&self.key, encoded).await?;
        Ok(())
    }

    /// Return up to `limit` of the oldest entries without removing them.
    pub async fn peek(&self, limit: usize) -> JobResult<Vec<Message>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let stop = isize::try_from(limit - 1).unwrap_or(isize::MAX);
        let raw = self.store.range(&self.key, 0, stop).await?;

        raw.iter()
            .map(|item| Message::from_json(item).map_err(Into::into))
            .collect()
    }

    pub async fn len(&self) -> JobResult<usize> {
        Ok(self.store.len(&self.key).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::store::MemoryListStore;

    fn dlq() -> DeadLetterStore {
        DeadLetterStore::new(Arc::new(MemoryListStore::new()), "t:dlq")
    }

    fn failed(job: &str) -> Message {
        let mut message = Message::new(job, Default::default(), 1);
        message.record_failure("boom");
        message
    }

    #[tokio::test]
    async fn test_peek_returns_oldest_first() {
        let dlq = dlq();
        for job in ["first", "second", "third"] {
            dlq.append(&failed(job)).await.unwrap();
        }

        let entries = dlq.peek(2).await.unwrap();
        assert_eq!(
            entries.iter().map(|m| m.job.as_str()).collect::<Vec<_>>(),
            vec!["first", "second"]
        );
        assert_eq!(entries[0].last_error, "boom");
    }

    #[tokio::test]
    async fn test_peek_is_idempotent() {
        let dlq = dlq();
        dlq.append(&failed("a")).await.unwrap();
        dlq.append(&failed("b")).await.unwrap();

        let first = dlq.peek(10).await.unwrap();
        let second = dlq.peek(10).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(dlq.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_peek_zero_limit_is_empty() {
        let dlq = dlq();
        dlq.append(&failed("a")).await.unwrap();
        assert!(dlq.peek(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_peek_rejects_corrupt_entries() {
        let store = Arc::new(MemoryListStore::new());
        store.push_back("t:dlq", "{not json".to_string()).await.unwrap();
        let dlq = DeadLetterStore::new(store, "t:dlq");
        assert!(dlq.peek(5).await.is_err());
    }
}
