//! Server execution logic.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{Router, routing::get};
use thiserror::Error;
use tokio::{net::TcpListener, task::JoinHandle, time::Instant};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::usecase::{DrainController, DrainOutcome};

use super::{
    handler::{get_messages, get_metrics, health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// One broadcaster instance, ready to serve.
///
/// Built by [`crate::bootstrap::build_server`].
///
/// # Example
///
/// ```ignore
/// let server = build_server(&config, backends, clock).await?;
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    drain: Arc<DrainController>,
    hub_task: JoinHandle<()>,
    supervisor_task: JoinHandle<()>,
}

impl Server {
    pub(crate) fn new(
        state: Arc<AppState>,
        drain: Arc<DrainController>,
        hub_task: JoinHandle<()>,
        supervisor_task: JoinHandle<()>,
    ) -> Self {
        Self {
            state,
            drain,
            hub_task,
            supervisor_task,
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/metrics", get(get_metrics))
            .route("/api/messages", get(get_messages))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind to `host:port` and serve until Ctrl+C or SIGTERM, then drain.
    pub async fn run(self, host: String, port: u16) -> Result<DrainOutcome, ServerError> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.clone(),
                source,
            })?;

        tracing::info!(
            "Instance {} listening on {}",
            self.state.instance_id,
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}/ws", bind_addr);

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `signal` resolves, then drain.
    ///
    /// Returns no later than the grace period after the signal.
    pub async fn serve<F>(self, listener: TcpListener, signal: F) -> Result<DrainOutcome, ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let stop = CancellationToken::new();
        let stop_listener = stop.clone();
        let app = self.router();
        let mut serving = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { stop_listener.cancelled().await })
            .await
        });

        tokio::select! {
            result = &mut serving => {
                self.supervisor_task.abort();
                return Err(match result {
                    Ok(Ok(())) => std::io::Error::other("listener stopped before shutdown").into(),
                    Ok(Err(e)) => e.into(),
                    Err(e) => std::io::Error::other(e).into(),
                });
            }
            () = signal => {}
        }

        let deadline = Instant::now() + self.drain.grace_period();
        let outcome = self.drain.drain().await;
        tracing::info!("Drain finished: {:?}", outcome);

        stop.cancel();
        if tokio::time::timeout_at(deadline, &mut serving).await.is_err() {
            tracing::warn!("Listener did not stop before the deadline");
            serving.abort();
        }
        if tokio::time::timeout_at(deadline, self.supervisor_task).await.is_err() {
            tracing::warn!("Bridge supervisor did not stop before the deadline");
        }
        self.hub_task.abort();

        tracing::info!("Server shutdown complete");
        Ok(outcome)
    }
}
