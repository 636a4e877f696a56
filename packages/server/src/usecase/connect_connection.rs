//! UseCase: 接続の受け入れ（Admit）
//!
//! ### どのような状況を想定しているか
//! - 正常系：新しい接続をレジストリに登録し、system エンベロープで挨拶する
//! - 異常系：ドレイン中は受け入れない

use std::{net::SocketAddr, sync::Arc};

use hibiki_shared::time::Clock;

use crate::{
    domain::{AdmissionGate, Connection, ConnectionId, InstanceId, Timestamp},
    infrastructure::{hub::HubHandle, registry::PusherChannel},
};

use super::error::ConnectError;

/// 接続受け入れのユースケース
pub struct ConnectConnectionUseCase {
    hub: HubHandle,
    admission: AdmissionGate,
    instance_id: InstanceId,
    clock: Arc<dyn Clock>,
}

impl ConnectConnectionUseCase {
    pub fn new(
        hub: HubHandle,
        admission: AdmissionGate,
        instance_id: InstanceId,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            hub,
            admission,
            instance_id,
            clock,
        }
    }

    /// Whether a handshake should be attempted at all.
    pub fn is_admitting(&self) -> bool {
        self.admission.is_open()
    }

    /// 接続を登録する
    ///
    /// # Arguments
    ///
    /// * `remote_addr` - クライアントのアドレス
    /// * `channel` - クライアントへの送信用チャンネル
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectionId)` - 登録した接続の ID
    /// * `Err(ConnectError::Draining)` - ドレイン中のため拒否
    pub fn execute(
        &self,
        remote_addr: SocketAddr,
        channel: PusherChannel,
    ) -> Result<ConnectionId, ConnectError> {
        if !self.admission.is_open() {
            return Err(ConnectError::Draining);
        }

        let connection = Connection::new(
            ConnectionId::generate(),
            remote_addr,
            self.instance_id.clone(),
            Timestamp::new(self.clock.now_millis()),
        );
        let id = connection.id;
        self.hub.admit(connection, channel);

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{dto::websocket::OutboundEnvelope, hub::ConnectionHub, registry::PushFrame};
    use hibiki_shared::time::FixedClock;
    use tokio::sync::mpsc;

    fn create_usecase(admission: AdmissionGate) -> (ConnectConnectionUseCase, HubHandle) {
        let instance_id = InstanceId::new("A".to_string()).unwrap();
        let (hub, _task) = ConnectionHub::spawn(instance_id.clone());
        let usecase = ConnectConnectionUseCase::new(
            hub.clone(),
            admission,
            instance_id,
            Arc::new(FixedClock::new(5000)),
        );
        (usecase, hub)
    }

    #[tokio::test]
    async fn test_connect_sends_welcome_notice() {
        // テスト項目: 接続が登録され、受け入れたインスタンスの ID を含む挨拶が届く
        // given (前提条件):
        let (usecase, _hub) = create_usecase(AdmissionGate::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = usecase.execute("10.0.0.1:5555".parse().unwrap(), tx);

        // then (期待する結果):
        assert!(result.is_ok());
        let frame = rx.recv().await.unwrap();
        let PushFrame::Text(text) = frame else {
            panic!("expected text frame");
        };
        assert_eq!(
            serde_json::from_str::<OutboundEnvelope>(&text).unwrap(),
            OutboundEnvelope::System {
                text: "Connected to instance A".to_string(),
                instance_id: "A".to_string(),
                issued_at: 5000,
            }
        );
    }

    #[tokio::test]
    async fn test_connect_rejected_while_draining() {
        // テスト項目: ドレイン中は接続が拒否され、レジストリは変化しない
        // given (前提条件):
        let admission = AdmissionGate::new();
        admission.close();
        let (usecase, hub) = create_usecase(admission);
        let (tx, _rx) = mpsc::unbounded_channel();

        // when (操作):
        let result = usecase.execute("10.0.0.1:5555".parse().unwrap(), tx);

        // then (期待する結果):
        assert_eq!(result, Err(ConnectError::Draining));
        assert!(!usecase.is_admitting());
        assert_eq!(hub.stats().accepted_total, 0);
    }
}
