//! Shutdown drain, in-process.

mod common;

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use common::{TestCluster, collect_until_close, connect};
use hibiki_server::{
    config::DEFAULT_RETENTION,
    domain::{ChatDraft, Message, MessageRepository, PersistenceError},
    infrastructure::{dto::websocket::OutboundEnvelope, repository::InMemoryMessageRepository},
    usecase::DrainOutcome,
};
use hibiki_shared::time::SystemClock;
use tokio_tungstenite::{connect_async, tungstenite};

#[tokio::test]
async fn test_drain_notifies_and_closes_with_going_away() {
    // テスト項目: シャットダウン時に全接続へ通知と 1001 close が送られ、猶予期間内に終了する
    // given (前提条件):
    let cluster = TestCluster::new();
    let a = cluster.start("A").await;
    let (mut first, _) = connect(&a).await;
    let (mut second, _) = connect(&a).await;

    // when (操作):
    let started = Instant::now();
    let shutdown = tokio::spawn(a.shutdown());

    // then (期待する結果):
    for ws in [&mut first, &mut second] {
        let (envelopes, close) = collect_until_close(ws).await;
        assert_eq!(envelopes.len(), 1);
        assert!(matches!(
            &envelopes[0],
            OutboundEnvelope::System { text, instance_id, .. }
                if text == "Instance A is shutting down, please reconnect" && instance_id == "A"
        ));
        let close = close.expect("close frame");
        assert_eq!(u16::from(close.code), 1001);
        assert_eq!(close.reason.as_str(), "server shutting down");
    }

    let outcome = shutdown.await.unwrap().unwrap();
    assert_eq!(outcome, DrainOutcome::Completed { notified: 2 });
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_drain_does_not_affect_other_instances() {
    // テスト項目: 1 つのインスタンスのドレイン中も他インスタンスの配信は継続する
    // given (前提条件):
    let cluster = TestCluster::new();
    let a = cluster.start("A").await;
    let b = cluster.start("B").await;
    let (_on_a, _) = connect(&a).await;
    let (mut on_b, _) = connect(&b).await;
    let (mut other_on_b, _) = connect(&b).await;

    // when (操作):
    a.shutdown().await.unwrap();
    common::send_chat(&mut on_b, None, "after drain").await;

    // then (期待する結果):
    let envelope = common::next_envelope(&mut other_on_b).await;
    assert_eq!(common::chat_body(&envelope), Some("after drain"));
}

/// Store handle that takes a while to release.
struct SlowCloseRepository {
    inner: InMemoryMessageRepository,
    close_delay: Duration,
}

#[async_trait]
impl MessageRepository for SlowCloseRepository {
    async fn append(&self, draft: ChatDraft) -> Result<Message, PersistenceError> {
        self.inner.append(draft).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Message>, PersistenceError> {
        self.inner.recent(limit).await
    }

    async fn close(&self) {
        tokio::time::sleep(self.close_delay).await;
        self.inner.close().await;
    }
}

#[tokio::test]
async fn test_upgrade_rejected_while_draining() {
    // テスト項目: ドレイン中の新規接続は 503 で拒否され、health は draining を報告する
    // given (前提条件):
    let cluster = TestCluster::new();
    let repository = Arc::new(SlowCloseRepository {
        inner: InMemoryMessageRepository::new(
            cluster.log.clone(),
            DEFAULT_RETENTION,
            Arc::new(SystemClock),
        ),
        close_delay: Duration::from_millis(800),
    });
    let mut a = cluster.start_with_repository("A", repository).await;
    let (mut existing, _) = connect(&a).await;

    // when (操作):
    a.signal_shutdown();
    let (envelopes, close) = collect_until_close(&mut existing).await;
    let rejected = connect_async(a.ws_url()).await;
    let health: serde_json::Value = reqwest::get(a.http_url("/api/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(envelopes.len(), 1);
    assert!(close.is_some());
    match rejected {
        Err(tungstenite::Error::Http(response)) => {
            assert_eq!(response.status().as_u16(), 503);
        }
        Err(other) => panic!("expected HTTP 503, got {:?}", other),
        Ok(_) => panic!("upgrade should be rejected while draining"),
    }
    assert_eq!(health["draining"], true);

    let outcome = a.shutdown().await.unwrap();
    assert!(matches!(outcome, DrainOutcome::Completed { notified: 1 }));
}

#[tokio::test]
async fn test_drain_with_many_connections_stays_within_grace_period() {
    // テスト項目: 多数の接続があってもドレインは猶予期間内に終わる
    // given (前提条件):
    let cluster = TestCluster::new();
    let a = cluster.start("A").await;
    let mut clients = Vec::new();
    for _ in 0..100 {
        clients.push(connect(&a).await.0);
    }

    // when (操作):
    let started = Instant::now();
    let outcome = a.shutdown().await.unwrap();

    // then (期待する結果):
    assert!(matches!(
        outcome,
        DrainOutcome::Completed { notified: 100 } | DrainOutcome::DeadlineExceeded { notified: 100 }
    ));
    assert!(started.elapsed() < Duration::from_millis(2500));
}

#[tokio::test]
async fn test_idle_client_does_not_hold_up_drain() {
    // テスト項目: 何も読まず close にも応答しないクライアントがいても、猶予期間内に終了し他の接続は 1001 close を受け取る
    // given (前提条件):
    let cluster = TestCluster::new();
    let a = cluster.start("A").await;
    // 挨拶だけ受け取り、以降は一切読まない
    let (_idle, _) = connect(&a).await;
    let (mut cooperative, _) = connect(&a).await;

    // when (操作):
    let started = Instant::now();
    let shutdown = tokio::spawn(a.shutdown());
    let (envelopes, close) = collect_until_close(&mut cooperative).await;
    let outcome = shutdown.await.unwrap().unwrap();

    // then (期待する結果):
    assert_eq!(envelopes.len(), 1);
    let close = close.expect("close frame");
    assert_eq!(u16::from(close.code), 1001);
    assert!(matches!(
        outcome,
        DrainOutcome::Completed { notified: 2 } | DrainOutcome::DeadlineExceeded { notified: 2 }
    ));
    assert!(started.elapsed() < Duration::from_secs(3));
}
