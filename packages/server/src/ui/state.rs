//! Shared application state.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::task::TaskTracker;

use crate::{
    domain::InstanceId,
    infrastructure::bridge::BridgeHealth,
    usecase::{
        ConnectConnectionUseCase, DisconnectConnectionUseCase, GetHistoryUseCase,
        GetMetricsUseCase, SendMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    pub instance_id: InstanceId,
    /// ConnectConnectionUseCase（接続受け入れのユースケース）
    pub connect_usecase: Arc<ConnectConnectionUseCase>,
    /// DisconnectConnectionUseCase（接続除去のユースケース）
    pub disconnect_usecase: Arc<DisconnectConnectionUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// GetHistoryUseCase（履歴取得のユースケース）
    pub get_history_usecase: Arc<GetHistoryUseCase>,
    /// GetMetricsUseCase（インスタンス状態取得のユースケース）
    pub get_metrics_usecase: Arc<GetMetricsUseCase>,
    pub bridge_health: watch::Receiver<BridgeHealth>,
    /// Every socket handler runs inside this tracker so the drain can wait for them.
    pub connections: TaskTracker,
}
