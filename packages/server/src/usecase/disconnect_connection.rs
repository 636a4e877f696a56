//! UseCase: 接続の除去（Remove）
//!
//! close とエラーの両方の経路から呼ばれるため、何度呼んでも安全（冪等）。

use crate::{domain::ConnectionId, infrastructure::hub::HubHandle};

/// 接続除去のユースケース
pub struct DisconnectConnectionUseCase {
    hub: HubHandle,
}

impl DisconnectConnectionUseCase {
    pub fn new(hub: HubHandle) -> Self {
        Self { hub }
    }

    pub fn execute(&self, connection_id: ConnectionId) {
        self.hub.remove(connection_id);
    }
}
