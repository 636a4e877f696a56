//! WebSocket connection handlers.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::{
    infrastructure::{
        dto::conversion::{InboundCommand, decode_inbound_frame},
        registry::{CloseReason, PushFrame},
    },
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
) -> Result<impl IntoResponse, StatusCode> {
    if !state.connect_usecase.is_admitting() {
        tracing::info!("Rejecting upgrade from {}: instance is draining", remote_addr);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let connections = state.connections.clone();
    Ok(ws.on_upgrade(move |socket| {
        connections.track_future(handle_socket(socket, state, remote_addr))
    }))
}

fn close_message(reason: CloseReason) -> Message {
    Message::Close(Some(CloseFrame {
        code: reason.code,
        reason: reason.reason.into(),
    }))
}

/// Spawns a task that drains the connection's outbound channel into the WebSocket sink.
///
/// Ends after a close frame has been written, when the channel closes, or
/// when the socket rejects a write.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<PushFrame>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                PushFrame::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                PushFrame::Close(reason) => {
                    let _ = sender.send(close_message(reason)).await;
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, remote_addr: SocketAddr) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel();

    // Admission is re-checked here: the drain may have started during the handshake.
    let connection_id = match state.connect_usecase.execute(remote_addr, tx) {
        Ok(id) => id,
        Err(e) => {
            tracing::info!("Connection from {} refused: {}", remote_addr, e);
            let _ = sender.send(close_message(CloseReason::going_away())).await;
            return;
        }
    };

    let span = tracing::info_span!(
        "connection",
        instance = %state.instance_id,
        id = %connection_id,
        remote = %remote_addr,
    );
    tracing::info!(parent: &span, "Connection admitted");

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(
        async move {
            while let Some(msg) = receiver.next().await {
                let msg = match msg {
                    Ok(msg) => msg,
                    Err(e) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                };

                match msg {
                    Message::Text(text) => match decode_inbound_frame(text.as_str()) {
                        Ok(InboundCommand::Chat { display_name, body }) => {
                            if let Err(e) = state_clone
                                .send_message_usecase
                                .execute(display_name, body)
                                .await
                            {
                                tracing::warn!("Message not delivered: {}", e);
                            }
                        }
                        Ok(InboundCommand::Ignored) => {
                            tracing::debug!("Ignoring frame with unknown tag");
                        }
                        Err(e) => {
                            tracing::warn!("Dropping undecodable frame: {}", e);
                        }
                    },
                    Message::Close(_) => {
                        tracing::debug!("Client requested close");
                        break;
                    }
                    // Ping/pong is answered by the WebSocket protocol layer
                    _ => {}
                }
            }
        }
        .instrument(span.clone()),
    );

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    state.disconnect_usecase.execute(connection_id);
    tracing::info!(parent: &span, "Connection closed");
}
