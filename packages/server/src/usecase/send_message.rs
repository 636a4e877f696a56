//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 永続化が成功してから publish する順序（durability before delivery）
//!
//! ### なぜこのテストが必要か
//! - publish されたメッセージは必ずストアに存在しなければならない
//! - 依存先が応答しない場合でも呼び出し側が無期限に待たないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：append → publish の順で呼ばれる
//! - 異常系：append 失敗時は publish されない、publish 失敗時はエラーを返す
//! - エッジケース：ストアが応答しない（タイムアウト）

use std::{sync::Arc, time::Duration};

use tokio::time::timeout;

use crate::domain::{
    BridgeError, BroadcastBridge, BroadcastEnvelope, ChatDraft, DisplayName, InstanceId, Message,
    MessageBody, MessageRepository, PersistenceError,
};

use super::error::SendMessageError;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（ストアの抽象化）
    repository: Arc<dyn MessageRepository>,
    /// BroadcastBridge（インスタンス間配信の抽象化）
    bridge: Arc<dyn BroadcastBridge>,
    instance_id: InstanceId,
    /// Bound on each dependency call.
    dependency_timeout: Duration,
}

impl SendMessageUseCase {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        bridge: Arc<dyn BroadcastBridge>,
        instance_id: InstanceId,
        dependency_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            bridge,
            instance_id,
            dependency_timeout,
        }
    }

    /// メッセージを永続化し、成功した場合のみ publish する
    ///
    /// Local delivery happens later, when the bridge hands the message back
    /// to this instance's subscription.
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - 永続化と publish が完了したメッセージ
    /// * `Err(SendMessageError::Persistence)` - 永続化失敗。publish はしていない
    /// * `Err(SendMessageError::Bridge)` - 永続化済みだが publish 失敗
    pub async fn execute(
        &self,
        display_name: DisplayName,
        body: MessageBody,
    ) -> Result<Message, SendMessageError> {
        let draft = ChatDraft::new(display_name, body, self.instance_id.clone());

        // 1. ストアに追記（これが成功するまで publish しない）
        let message = timeout(self.dependency_timeout, self.repository.append(draft))
            .await
            .map_err(|_| PersistenceError::Timeout(self.dependency_timeout))??;

        // 2. ブリッジに publish
        let envelope = BroadcastEnvelope::Chat(message.clone());
        timeout(self.dependency_timeout, self.bridge.publish(&envelope))
            .await
            .map_err(|_| BridgeError::Timeout(self.dependency_timeout))??;

        Ok(message)
    }
}
