//! Redis list store using a bb8 connection pool.

use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, AsyncConnectionConfig, Client, RedisError};
use tokio::sync::Mutex;

use super::ListStore;
use crate::config::settings::RedisQueueConfig;
use crate::jobs::error::StoreError;

type RedisPool = Pool<Client>;

/// Extra time granted to a blocking pop's reply on top of the server-side wait.
const BLOCKING_RESPONSE_GRACE: Duration = Duration::from_secs(2);

/// Redis-backed lists.
///
/// Plain commands share the bb8 pool. Blocking pops run on dedicated
/// connections whose response timeout outlasts the BLPOP wait, so a client
/// timeout can never discard a reply carrying an already-popped message.
pub struct RedisListStore {
    client: Client,
    pool: RedisPool,
    blocking: Mutex<Vec<MultiplexedConnection>>,
}

impl RedisListStore {
    pub async fn new(config: &RedisQueueConfig) -> Result<Self, StoreError> {
        let client =
            Client::open(config.url.as_str()).map_err(|e| StoreError::Connection(e.to_string()))?;

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(Duration::from_secs(config.connection_timeout))
            .build(client.clone())
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            pool,
            blocking: Mutex::new(Vec::new()),
        })
    }

    async fn get_conn(&self) -> Result<PooledConnection<'_, Client>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn checkout_blocking(&self, wait: Duration) -> Result<MultiplexedConnection, StoreError> {
        if let Some(conn) = self.blocking.lock().await.pop() {
            return Ok(conn);
        }
        let config = AsyncConnectionConfig::new()
            .set_response_timeout(Some(wait + BLOCKING_RESPONSE_GRACE));
        self.client
            .get_multiplexed_async_connection_with_config(&config)
            .await
            .map_err(classify)
    }
}

/// Map a redis error onto the store taxonomy.
fn classify(error: RedisError) -> StoreError {
    if error.is_timeout() {
        StoreError::Timeout(error.to_string())
    } else if error.is_connection_dropped() || error.is_connection_refusal() {
        StoreError::Connection(error.to_string())
    } else {
        StoreError::Operation(error.to_string())
    }
}

#[async_trait]
impl ListStore for RedisListStore {
    async fn push_back(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref
            .rpush::<_, _, ()>(key, value)
            .await
            .map_err(classify)
    }

    async fn pop_front_blocking(
        &self,
        key: &str,
        wait: Duration,
    ) -> Result<Option<String>, StoreError> {
        let mut conn = self.checkout_blocking(wait).await?;

        // BLPOP takes whole or fractional seconds; zero would block forever.
        let timeout = wait.as_secs_f64().max(0.01);
        let result: Result<Option<(String, String)>, RedisError> =
            conn.blpop(key, timeout).await;

        match result {
            Ok(popped) => {
                self.blocking.lock().await.push(conn);
                Ok(popped.map(|(_, value)| value))
            }
            // The connection is dropped on error; a fresh one is opened next time.
            Err(e) => Err(classify(e)),
        }
    }

    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref.lrange(key, start, stop).await.map_err(classify)
    }

    async fn len(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn: PooledConnection<'_, Client> = self.get_conn().await?;

        let conn_ref: &mut MultiplexedConnection = &mut conn;
        conn_ref.llen(key).await.map_err(classify)
    }
}
