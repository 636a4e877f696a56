//! UseCase: ドレイン（接続を閉じてから終了する）
//!
//! ### どのような状況を想定しているか
//! - 正常系：全接続に shutdown 通知と 1001 close を送り、猶予期間内に完了する
//! - 異常系：クライアントが close に応答しなくても猶予期間で打ち切る
//! - エッジケース：二重のシグナル（2 回目は何もしない）

use std::{sync::Arc, time::Duration};

use hibiki_shared::time::Clock;
use tokio::time::{Instant, timeout_at};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    domain::{
        AdmissionGate, BroadcastBridge, BroadcastEnvelope, InstanceId, MessageRepository,
        SystemNotice, Timestamp,
    },
    infrastructure::hub::HubHandle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every connection task finished before the deadline.
    Completed { notified: usize },
    /// The deadline passed with connection tasks still running.
    DeadlineExceeded { notified: usize },
    AlreadyDraining,
}

/// Runs the shutdown sequence once per process.
pub struct DrainController {
    admission: AdmissionGate,
    hub: HubHandle,
    supervisor: CancellationToken,
    repository: Arc<dyn MessageRepository>,
    bridge: Arc<dyn BroadcastBridge>,
    connections: TaskTracker,
    instance_id: InstanceId,
    clock: Arc<dyn Clock>,
    grace_period: Duration,
}

impl DrainController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        admission: AdmissionGate,
        hub: HubHandle,
        supervisor: CancellationToken,
        repository: Arc<dyn MessageRepository>,
        bridge: Arc<dyn BroadcastBridge>,
        connections: TaskTracker,
        instance_id: InstanceId,
        clock: Arc<dyn Clock>,
        grace_period: Duration,
    ) -> Self {
        Self {
            admission,
            hub,
            supervisor,
            repository,
            bridge,
            connections,
            instance_id,
            clock,
            grace_period,
        }
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// ドレインを実行する
    ///
    /// Returns no later than `grace_period` after it is called.
    pub async fn drain(&self) -> DrainOutcome {
        // 1. 新規受け入れを停止（最初の呼び出しだけが先へ進む）
        if !self.admission.close() {
            return DrainOutcome::AlreadyDraining;
        }
        let deadline = Instant::now() + self.grace_period;
        tracing::info!(
            "Draining instance {} (grace period {:?})",
            self.instance_id,
            self.grace_period
        );

        // 2. shutdown 通知と 1001 close を全接続へ
        let notice = BroadcastEnvelope::System(SystemNotice::shutdown(
            &self.instance_id,
            Timestamp::new(self.clock.now_millis()),
        ));
        let notified = timeout_at(deadline, self.hub.drain(notice))
            .await
            .unwrap_or_default();
        tracing::info!("Sent shutdown notice to {} connection(s)", notified);

        // 3. ブリッジ購読を止め、ストアとブリッジのハンドルを解放
        self.supervisor.cancel();
        let released = timeout_at(deadline, async {
            self.bridge.close().await;
            self.repository.close().await;
        })
        .await;
        if released.is_err() {
            tracing::warn!("Releasing store and bridge handles did not finish before the deadline");
        }

        // 4. 接続タスクの終了を待つ
        self.connections.close();
        match timeout_at(deadline, self.connections.wait()).await {
            Ok(()) => {
                tracing::info!("Drain completed");
                DrainOutcome::Completed { notified }
            }
            Err(_) => {
                tracing::warn!(
                    "Drain deadline reached with {} connection task(s) still running",
                    self.connections.len()
                );
                DrainOutcome::DeadlineExceeded { notified }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Connection, ConnectionId, MockBroadcastBridge, MockMessageRepository};
    use crate::infrastructure::{
        dto::websocket::OutboundEnvelope,
        hub::ConnectionHub,
        registry::{GOING_AWAY_CLOSE_CODE, PushFrame},
    };
    use hibiki_shared::time::FixedClock;
    use tokio::sync::mpsc;

    struct Fixture {
        controller: DrainController,
        hub: HubHandle,
        admission: AdmissionGate,
        supervisor: CancellationToken,
        tracker: TaskTracker,
    }

    fn fixture(grace_period: Duration) -> Fixture {
        let instance_id = InstanceId::new("A".to_string()).unwrap();
        let (hub, _task) = ConnectionHub::spawn(instance_id.clone());
        let admission = AdmissionGate::new();
        let supervisor = CancellationToken::new();
        let tracker = TaskTracker::new();

        let mut repository = MockMessageRepository::new();
        repository.expect_close().times(1).returning(|| ());
        let mut bridge = MockBroadcastBridge::new();
        bridge.expect_close().times(1).returning(|| ());

        let controller = DrainController::new(
            admission.clone(),
            hub.clone(),
            supervisor.clone(),
            Arc::new(repository),
            Arc::new(bridge),
            tracker.clone(),
            instance_id,
            Arc::new(FixedClock::new(9000)),
            grace_period,
        );
        Fixture {
            controller,
            hub,
            admission,
            supervisor,
            tracker,
        }
    }

    fn admit(hub: &HubHandle) -> mpsc::UnboundedReceiver<PushFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        hub.admit(
            Connection::new(
                ConnectionId::generate(),
                "127.0.0.1:1".parse().unwrap(),
                InstanceId::new("A".to_string()).unwrap(),
                Timestamp::new(1),
            ),
            tx,
        );
        rx
    }

    #[tokio::test]
    async fn test_drain_notifies_and_closes_connections() {
        // テスト項目: 全接続に shutdown 通知と 1001 close が送られ、ドレインが完了する
        // given (前提条件):
        let f = fixture(Duration::from_secs(2));
        let mut clients: Vec<_> = (0..3).map(|_| admit(&f.hub)).collect();
        for rx in clients.iter_mut() {
            assert!(matches!(rx.recv().await, Some(PushFrame::Text(_)))); // welcome
        }
        // Connection tasks exit once they see the close frame.
        for mut rx in clients {
            f.tracker.spawn(async move {
                let mut frames = Vec::new();
                while let Some(frame) = rx.recv().await {
                    let done = matches!(frame, PushFrame::Close(_));
                    frames.push(frame);
                    if done {
                        break;
                    }
                }
                frames
            });
        }

        // when (操作):
        let outcome = f.controller.drain().await;

        // then (期待する結果):
        assert_eq!(outcome, DrainOutcome::Completed { notified: 3 });
        assert!(!f.admission.is_open());
        assert!(f.supervisor.is_cancelled());
    }

    #[tokio::test]
    async fn test_drain_frames_are_notice_then_going_away() {
        // テスト項目: 各接続には shutdown 通知、続いて 1001 close の順で届く
        // given (前提条件):
        let f = fixture(Duration::from_millis(500));
        let mut rx = admit(&f.hub);
        assert!(matches!(rx.recv().await, Some(PushFrame::Text(_))));

        // when (操作):
        let outcome = f.controller.drain().await;

        // then (期待する結果):
        assert_eq!(outcome, DrainOutcome::Completed { notified: 1 });
        let Some(PushFrame::Text(text)) = rx.recv().await else {
            panic!("expected shutdown notice");
        };
        assert_eq!(
            serde_json::from_str::<OutboundEnvelope>(&text).unwrap(),
            OutboundEnvelope::System {
                text: "Instance A is shutting down, please reconnect".to_string(),
                instance_id: "A".to_string(),
                issued_at: 9000,
            }
        );
        let Some(PushFrame::Close(reason)) = rx.recv().await else {
            panic!("expected close frame");
        };
        assert_eq!(reason.code, GOING_AWAY_CLOSE_CODE);
    }

    #[tokio::test]
    async fn test_drain_bounded_by_grace_period() {
        // テスト項目: close に応答しない接続があっても猶予期間で打ち切られる
        // given (前提条件):
        let f = fixture(Duration::from_millis(200));
        let _rx = admit(&f.hub);
        f.tracker.spawn(std::future::pending::<()>());

        // when (操作):
        let started = Instant::now();
        let outcome = f.controller.drain().await;

        // then (期待する結果):
        assert_eq!(outcome, DrainOutcome::DeadlineExceeded { notified: 1 });
        assert!(started.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_second_drain_is_noop() {
        // テスト項目: 2 回目のドレインは何もせずに戻る
        // given (前提条件):
        let f = fixture(Duration::from_millis(200));

        // when (操作):
        let first = f.controller.drain().await;
        let second = f.controller.drain().await;

        // then (期待する結果):
        assert_eq!(first, DrainOutcome::Completed { notified: 0 });
        assert_eq!(second, DrainOutcome::AlreadyDraining);
    }
}
