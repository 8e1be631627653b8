//! Queue behavior exercised end to end against the in-memory store.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::error::{JobError, JobResult};
use super::queue::{JobQueue, QueueOptions};
use super::store::{ListStore, MemoryListStore};
use super::types::{JobContext, JobHandler, Message, Payload, RegisteredJob};

const WAIT: Duration = Duration::from_millis(20);

/// Fails its first `failures` calls, then succeeds.
struct Flaky {
    failures: u32,
    calls: AtomicU32,
    attempts_seen: Mutex<Vec<u32>>,
}

impl Flaky {
    fn new(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicU32::new(0),
            attempts_seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// `message.attempts` as observed on each call.
    fn attempts_seen(&self) -> Vec<u32> {
        self.attempts_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobHandler for Flaky {
    async fn handle(&self, _ctx: &JobContext, message: &mut Message) -> JobResult<()> {
        self.attempts_seen.lock().unwrap().push(message.attempts);
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(JobError::failed("boom"));
        }
        message.metadata.insert("done".into(), json!(true));
        Ok(())
    }
}

/// Ignores its context, sleeps, then records a side effect.
struct Stubborn {
    finished: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl JobHandler for Stubborn {
    async fn handle(&self, _ctx: &JobContext, _message: &mut Message) -> JobResult<()> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        self.finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Blocks until cancelled.
struct Sleeper;

#[async_trait]
impl JobHandler for Sleeper {
    async fn handle(&self, ctx: &JobContext, _message: &mut Message) -> JobResult<()> {
        ctx.cancellation_token.cancelled().await;
        Err(JobError::failed("cancelled"))
    }
}

fn setup(namespace: &str) -> (Arc<JobQueue>, Arc<MemoryListStore>) {
    let store = Arc::new(MemoryListStore::new());
    let queue = Arc::new(JobQueue::new(
        store.clone(),
        QueueOptions {
            namespace: namespace.to_string(),
            wait_time: WAIT,
        },
    ));
    (queue, store)
}

/// Drain the main list one message at a time.
async fn drain(queue: &JobQueue) -> usize {
    let token = CancellationToken::new();
    let mut processed = 0;
    while queue.process_next(&token).await.unwrap() {
        processed += 1;
    }
    processed
}

#[tokio::test]
async fn test_enqueue_unregistered_job_writes_nothing() {
    let (queue, store) = setup("t1");

    let err = queue.enqueue("missing", Payload::new()).await.unwrap_err();

    assert!(matches!(err, JobError::NotRegistered(ref name) if name == "missing"));
    assert_eq!(store.len("t1:main").await.unwrap(), 0);
}

#[tokio::test]
async fn test_enqueue_applies_registered_policy() {
    let (queue, store) = setup("t2");
    queue
        .register(RegisteredJob::new("echo", Flaky::new(0)).with_max_retries(7))
        .unwrap();

    let mut payload = Payload::new();
    payload.insert("k".into(), json!("v"));
    let message = queue.enqueue("echo", payload).await.unwrap();

    assert!(!message.id.is_empty());
    assert_eq!(message.attempts, 0);
    assert_eq!(message.max_retries, 7);

    let stored = store.range("t2:main", 0, -1).await.unwrap();
    let decoded = Message::from_json(&stored[0]).unwrap();
    assert_eq!(decoded.id, message.id);
    assert_eq!(decoded.payload["k"], json!("v"));
}

#[tokio::test]
async fn test_success_leaves_no_trace() {
    let (queue, _store) = setup("t3");
    let handler = Flaky::new(0);
    queue
        .register(RegisteredJob::new("echo", handler.clone()))
        .unwrap();
    queue.enqueue("echo", Payload::new()).await.unwrap();

    assert_eq!(drain(&queue).await, 1);

    assert_eq!(handler.calls(), 1);
    assert_eq!(queue.pending().await.unwrap(), 0);
    assert!(queue.read_dlq(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_always_failing_job_is_dead_lettered_after_max_retries() {
    let (queue, _store) = setup("t4");
    let handler = Flaky::new(u32::MAX);
    queue
        .register(RegisteredJob::new("fail", handler.clone()).with_max_retries(2))
        .unwrap();
    let original = queue.enqueue("fail", Payload::new()).await.unwrap();

    assert_eq!(drain(&queue).await, 2);

    assert_eq!(handler.calls(), 2);
    assert_eq!(queue.pending().await.unwrap(), 0);
    let dlq = queue.read_dlq(10).await.unwrap();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].id, original.id);
    assert_eq!(dlq[0].attempts, 2);
    assert_eq!(dlq[0].last_error, "boom");
}

#[tokio::test]
async fn test_transient_failures_recover_within_budget() {
    let (queue, _store) = setup("t5");
    let handler = Flaky::new(2);
    queue
        .register(RegisteredJob::new("flaky", handler.clone()).with_max_retries(3))
        .unwrap();
    queue.enqueue("flaky", Payload::new()).await.unwrap();

    assert_eq!(drain(&queue).await, 3);

    assert_eq!(handler.calls(), 3);
    // Two recorded failures before the success that discards the message.
    assert_eq!(handler.attempts_seen(), vec![0, 1, 2]);
    assert!(queue.read_dlq(10).await.unwrap().is_empty());
    assert_eq!(queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn test_requeue_goes_to_the_tail() {
    let (queue, store) = setup("t6");
    queue
        .register(RegisteredJob::new("fail", Flaky::new(1)).with_max_retries(3))
        .unwrap();
    queue
        .register(RegisteredJob::new("echo", Flaky::new(0)))
        .unwrap();
    let failing = queue.enqueue("fail", Payload::new()).await.unwrap();
    let other = queue.enqueue("echo", Payload::new()).await.unwrap();

    let token = CancellationToken::new();
    assert!(queue.process_next(&token).await.unwrap());

    let order: Vec<String> = store
        .range("t6:main", 0, -1)
        .await
        .unwrap()
        .iter()
        .map(|raw| Message::from_json(raw).unwrap().id)
        .collect();
    assert_eq!(order, vec![other.id, failing.id.clone()]);

    let requeued = Message::from_json(&store.range("t6:main", 1, 1).await.unwrap()[0]).unwrap();
    assert_eq!(requeued.attempts, 1);
    assert_eq!(requeued.last_error, "boom");
}

#[tokio::test]
async fn test_dlq_peek_is_non_destructive() {
    let (queue, _store) = setup("t7");
    queue
        .register(RegisteredJob::new("fail", Flaky::new(u32::MAX)).with_max_retries(1))
        .unwrap();
    queue.enqueue("fail", Payload::new()).await.unwrap();
    drain(&queue).await;

    let first = queue.read_dlq(10).await.unwrap();
    let second = queue.read_dlq(10).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
    assert!(queue.read_dlq(0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_undecodable_entry_is_dead_lettered_without_retry() {
    let (queue, store) = setup("t8");
    store
        .push_back("t8:main", "not json".to_string())
        .await
        .unwrap();

    assert_eq!(drain(&queue).await, 1);

    let dlq = queue.read_dlq(10).await.unwrap();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].payload["raw"], json!("not json"));
    assert!(!dlq[0].last_error.is_empty());
    assert_eq!(queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unregistered_job_at_dequeue_is_dead_lettered() {
    let (queue, store) = setup("t9");
    let stray = Message::new("ghost", Payload::new(), 3);
    store
        .push_back("t9:main", stray.to_json().unwrap())
        .await
        .unwrap();

    drain(&queue).await;

    let dlq = queue.read_dlq(10).await.unwrap();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].id, stray.id);
    assert_eq!(dlq[0].attempts, 0);
    assert_eq!(dlq[0].last_error, "unregistered job");
}

#[tokio::test]
async fn test_timeout_counts_as_failure() {
    let (queue, _store) = setup("t10");
    queue
        .register(
            RegisteredJob::new("slow", Arc::new(Sleeper))
                .with_max_retries(1)
                .with_timeout(Duration::from_millis(30)),
        )
        .unwrap();
    queue.enqueue("slow", Payload::new()).await.unwrap();

    drain(&queue).await;

    let dlq = queue.read_dlq(10).await.unwrap();
    assert_eq!(dlq.len(), 1);
    assert_eq!(dlq[0].attempts, 1);
    assert!(dlq[0].last_error.contains("timeout"));
}

#[tokio::test]
async fn test_timeout_cuts_off_handler_that_ignores_context() {
    let (queue, _store) = setup("t10b");
    let handler = Arc::new(Stubborn {
        finished: std::sync::atomic::AtomicBool::new(false),
    });
    queue
        .register(
            RegisteredJob::new("stubborn", handler.clone())
                .with_max_retries(1)
                .with_timeout(Duration::from_millis(30)),
        )
        .unwrap();
    queue.enqueue("stubborn", Payload::new()).await.unwrap();

    let started = std::time::Instant::now();
    assert!(queue.process_next(&CancellationToken::new()).await.unwrap());

    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!handler.finished.load(Ordering::SeqCst));
    let dlq = queue.read_dlq(10).await.unwrap();
    assert_eq!(dlq.len(), 1);
    assert!(dlq[0].last_error.contains("timeout"));
}

#[tokio::test]
async fn test_concurrent_enqueues_are_all_stored() {
    let (queue, _store) = setup("t11");
    queue
        .register(RegisteredJob::new("echo", Flaky::new(0)))
        .unwrap();

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.enqueue("echo", Payload::new()).await })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap().id);
    }

    assert_eq!(ids.len(), 100);
    assert_eq!(queue.pending().await.unwrap(), 100);
}

#[tokio::test]
async fn test_consume_stops_on_cancel() {
    let (queue, _store) = setup("t12");
    let token = CancellationToken::new();
    let consumer = {
        let queue = Arc::clone(&queue);
        let token = token.clone();
        tokio::spawn(async move { queue.consume(token).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    token.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .expect("consumer should stop within one wait period")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_in_flight_handler_sees_shutdown() {
    let (queue, _store) = setup("t13");
    queue
        .register(RegisteredJob::new("slow", Arc::new(Sleeper)).with_max_retries(5))
        .unwrap();
    queue.enqueue("slow", Payload::new()).await.unwrap();

    let token = CancellationToken::new();
    let consumer = {
        let queue = Arc::clone(&queue);
        let token = token.clone();
        tokio::spawn(async move { queue.consume(token).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    token.cancel();

    tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .expect("consumer should stop after the handler returns")
        .unwrap()
        .unwrap();
    // The cancelled attempt is recorded and requeued for a later run.
    assert_eq!(queue.pending().await.unwrap(), 1);
}

#[tokio::test]
async fn test_competing_consumers_process_each_message_once() {
    let (queue, _store) = setup("t14");
    let handler = Flaky::new(0);
    queue
        .register(RegisteredJob::new("echo", handler.clone()))
        .unwrap();
    for _ in 0..50 {
        queue.enqueue("echo", Payload::new()).await.unwrap();
    }

    let token = CancellationToken::new();
    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            let token = token.clone();
            tokio::spawn(async move { queue.consume(token).await })
        })
        .collect();

    tokio::time::timeout(Duration::from_secs(2), async {
        while handler.calls() < 50 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("all messages should be handled");
    token.cancel();
    for consumer in consumers {
        consumer.await.unwrap().unwrap();
    }

    assert_eq!(handler.calls(), 50);
    assert_eq!(queue.pending().await.unwrap(), 0);
}

#[tokio::test]
async fn test_enqueue_fn_does_not_outlive_queue() {
    let (queue, _store) = setup("t15");
    queue
        .register(RegisteredJob::new("echo", Flaky::new(0)))
        .unwrap();
    let enqueue = queue.enqueue_fn();

    enqueue("echo".to_string(), Payload::new()).await.unwrap();
    assert_eq!(queue.pending().await.unwrap(), 1);

    drop(queue);
    assert!(enqueue("echo".to_string(), Payload::new()).await.is_err());
}
