//! Redis Message Repository 実装
//!
//! 全インスタンスが共有する Redis のリストにメッセージを保存します。
//!
//! - 追加: `LPUSH` と `LTRIM` をアトミックなパイプラインで実行（保持件数の上限付き）
//! - 取得: `LRANGE 0 N-1`（`LPUSH` なので先頭が最新）

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use hibiki_shared::time::Clock;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{
    domain::{ChatDraft, Message, MessageRepository, PersistenceError, Timestamp},
    infrastructure::dto::storage::StoredMessageDto,
};

pub struct RedisMessageRepository {
    /// Reconnects on its own after a dropped connection.
    connection: ConnectionManager,
    key: String,
    retention: usize,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

impl RedisMessageRepository {
    /// Connect to Redis. Failing here aborts start-up.
    pub async fn connect(
        client: &redis::Client,
        key: String,
        retention: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, PersistenceError> {
        let connection = ConnectionManager::new(client.clone())
            .await
            .map_err(map_redis_error)?;
        tracing::info!("Message store connected (list '{}')", key);

        Ok(Self {
            connection,
            key,
            retention: retention.max(1),
            clock,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<(), PersistenceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PersistenceError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for RedisMessageRepository {
    async fn append(&self, draft: ChatDraft) -> Result<Message, PersistenceError> {
        self.ensure_open()?;

        let message = Message::from_draft(draft, Timestamp::new(self.clock.now_millis()));
        let record = serde_json::to_string(&StoredMessageDto::from(message.clone()))
            .map_err(|e| PersistenceError::Rejected(e.to_string()))?;

        let mut connection = self.connection.clone();
        let _: () = redis::pipe()
            .atomic()
            .lpush(&self.key, record)
            .ignore()
            .ltrim(&self.key, 0, retention_stop(self.retention))
            .ignore()
            .query_async(&mut connection)
            .await
            .map_err(map_redis_error)?;

        Ok(message)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Message>, PersistenceError> {
        self.ensure_open()?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut connection = self.connection.clone();
        let records: Vec<String> = connection
            .lrange(&self.key, 0, retention_stop(limit))
            .await
            .map_err(map_redis_error)?;

        Ok(records
            .iter()
            .filter_map(|record| match decode_record(record) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::warn!("Skipping unreadable stored message: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!("Message store handle released");
        }
    }
}

/// Last index kept by `LTRIM`/`LRANGE` for `count` entries.
fn retention_stop(count: usize) -> isize {
    isize::try_from(count).unwrap_or(isize::MAX) - 1
}

fn decode_record(record: &str) -> Result<Message, String> {
    let dto: StoredMessageDto = serde_json::from_str(record).map_err(|e| e.to_string())?;
    Message::try_from(dto).map_err(|e| e.to_string())
}

fn map_redis_error(e: redis::RedisError) -> PersistenceError {
    if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
    {
        PersistenceError::Unavailable(e.to_string())
    } else {
        PersistenceError::Rejected(e.to_string())
    }
}
