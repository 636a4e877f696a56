//! Load harness against in-process instances.

use std::{sync::Arc, time::Duration};

use hibiki_client::load::{LoadConfig, run_load};
use hibiki_server::{
    bootstrap::{Backends, build_server},
    config::{DEFAULT_RETENTION, DEFAULT_TOPIC_CAPACITY, ServerConfig},
    domain::InstanceId,
    infrastructure::{
        bridge::InMemoryBroadcastBridge,
        repository::InMemoryMessageRepository,
    },
};
use hibiki_shared::time::{Clock, SystemClock};
use tokio::net::TcpListener;

#[tokio::test]
async fn test_load_run_reports_exact_delivery() {
    // テスト項目: 2 インスタンスに分散した全接続がプローブをちょうど 1 回受信する
    // given (前提条件):
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let log = InMemoryMessageRepository::shared_log();
    let topic = InMemoryBroadcastBridge::topic(DEFAULT_TOPIC_CAPACITY);
    let mut urls = Vec::new();
    for id in ["A", "B"] {
        let config = ServerConfig::new(InstanceId::new(id.to_string()).unwrap());
        let backends = Backends::in_memory(
            log.clone(),
            topic.clone(),
            DEFAULT_RETENTION,
            clock.clone(),
        );
        let server = build_server(&config, backends, clock.clone()).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        urls.push(format!("ws://{}/ws", listener.local_addr().unwrap()));
        tokio::spawn(server.serve(listener, std::future::pending()));
    }

    // when (操作):
    let report = run_load(LoadConfig {
        urls,
        connections: 40,
        connect_timeout: Duration::from_secs(3),
        delivery_timeout: Duration::from_millis(500),
    })
    .await
    .unwrap();

    // then (期待する結果):
    assert_eq!(report.connections, 40);
    assert_eq!(report.delivered, 40);
    assert_eq!(report.missing, 0);
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.per_instance["A"], 20);
    assert_eq!(report.per_instance["B"], 20);
    assert!(report.is_exact());
}

#[tokio::test]
async fn test_load_run_without_urls_fails() {
    // テスト項目: URL が無い場合はエラーになる
    // given (前提条件):
    let config = LoadConfig {
        urls: Vec::new(),
        connections: 1,
        connect_timeout: Duration::from_secs(1),
        delivery_timeout: Duration::from_secs(1),
    };

    // when (操作):
    let result = run_load(config).await;

    // then (期待する結果):
    assert!(result.is_err());
}
