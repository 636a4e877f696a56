//! InMemory Message Repository 実装
//!
//! ドメイン層が定義する `MessageRepository` trait の具体的な実装。
//! `VecDeque<Message>` をインメモリ DB として使用し、保持件数を超えた古いメッセージは
//! 追記のたびに先頭から捨てます。
//!
//! 同じプロセス内の複数インスタンスは `shared_log()` のハンドルを共有することで
//! 1 つのストアに書き込みます。`close()` は自分のハンドルだけを閉じます。

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use hibiki_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{ChatDraft, Message, MessageRepository, PersistenceError, Timestamp};

/// Storage shared between repository handles.
pub type SharedMessageLog = Arc<Mutex<VecDeque<Message>>>;

/// インメモリ Message Repository 実装
pub struct InMemoryMessageRepository {
    /// Oldest first.
    log: SharedMessageLog,
    /// Maximum number of messages kept; older ones are dropped on append.
    retention: usize,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

impl InMemoryMessageRepository {
    pub fn new(log: SharedMessageLog, retention: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            log,
            retention: retention.max(1),
            clock,
            closed: AtomicBool::new(false),
        }
    }

    /// Empty storage to hand to one or more repositories.
    pub fn shared_log() -> SharedMessageLog {
        Arc::new(Mutex::new(VecDeque::new()))
    }

    fn ensure_open(&self) -> Result<(), PersistenceError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PersistenceError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn append(&self, draft: ChatDraft) -> Result<Message, PersistenceError> {
        self.ensure_open()?;

        let mut log = self.log.lock().await;
        let message = Message::from_draft(draft, Timestamp::new(self.clock.now_millis()));
        log.push_back(message.clone());
        while log.len() > self.retention {
            log.pop_front();
        }
        Ok(message)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Message>, PersistenceError> {
        self.ensure_open()?;

        let log = self.log.lock().await;
        Ok(log.iter().rev().take(limit).cloned().collect())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("In-memory message repository handle closed");
        }
    }
}
