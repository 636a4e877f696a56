//! UseCase: 履歴取得

use std::{sync::Arc, time::Duration};

use tokio::time::timeout;

use crate::domain::{Message, MessageRepository, PersistenceError};

use super::error::GetHistoryError;

/// Number of messages served by the history endpoint.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// 履歴取得のユースケース
pub struct GetHistoryUseCase {
    repository: Arc<dyn MessageRepository>,
    dependency_timeout: Duration,
}

impl GetHistoryUseCase {
    pub fn new(repository: Arc<dyn MessageRepository>, dependency_timeout: Duration) -> Self {
        Self {
            repository,
            dependency_timeout,
        }
    }

    /// 直近 `limit` 件を新しい順に返す
    pub async fn execute(&self, limit: usize) -> Result<Vec<Message>, GetHistoryError> {
        let messages = timeout(self.dependency_timeout, self.repository.recent(limit))
            .await
            .map_err(|_| PersistenceError::Timeout(self.dependency_timeout))??;
        Ok(messages)
    }
}
