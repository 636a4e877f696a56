//! Chat session over one WebSocket connection.

use futures_util::{SinkExt, StreamExt};
use hibiki_server::infrastructure::dto::websocket::{InboundFrame, OutboundEnvelope};
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::{error::ClientError, formatter::MessageFormatter};

use super::ui::redisplay_prompt;

/// JSON text of a chat frame.
pub fn chat_frame(display_name: Option<&str>, body: &str) -> String {
    let frame = InboundFrame::Chat {
        display_name: display_name.map(str::to_string),
        body: body.to_string(),
    };
    serde_json::to_string(&frame).unwrap_or_default()
}

/// How the read side of a session ended.
enum ReadEnd {
    /// Server closed or the socket failed
    Lost,
    /// Read loop ended without a transport problem
    Finished,
}

/// Run one chat session. `Ok` means the user exited.
pub async fn run_chat_session(url: &str, display_name: Option<&str>) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url).await?;

    let prompt_name = display_name.unwrap_or("anonymous").to_string();
    tracing::info!("Connected to {}", url);
    println!(
        "\nYou are '{}'. Type messages and press Enter to send. Press Ctrl+C to exit.\n",
        prompt_name
    );

    let (mut write, mut read) = ws_stream.split();

    // Spawn a task to handle incoming messages
    let name_for_read = prompt_name.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let formatted = match serde_json::from_str::<OutboundEnvelope>(text.as_str()) {
                        Ok(envelope) => MessageFormatter::format_envelope(&envelope),
                        Err(_) => MessageFormatter::format_raw_message(text.as_str()),
                    };
                    print!("{}", formatted);
                    redisplay_prompt(&name_for_read);
                }
                Ok(Message::Binary(data)) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                    redisplay_prompt(&name_for_read);
                }
                Ok(Message::Close(frame)) => {
                    match frame {
                        Some(frame) => tracing::info!(
                            "Server closed the connection ({}: {})",
                            u16::from(frame.code),
                            frame.reason.as_str()
                        ),
                        None => tracing::info!("Server closed the connection"),
                    }
                    return ReadEnd::Lost;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return ReadEnd::Lost;
                }
                _ => {}
            }
        }
        ReadEnd::Finished
    });

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let prompt = format!("{}> ", prompt_name);
    std::thread::spawn(move || {
        let mut editor = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match editor.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        editor.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            // Channel closed, exit thread
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    tracing::info!("Input closed");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Spawn a task to send each input line as a chat frame
    let display_name = display_name.map(str::to_string);
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = input_rx.recv().await {
            let frame = chat_frame(display_name.as_deref(), &line);
            if let Err(e) = write.send(Message::Text(frame.into())).await {
                tracing::warn!("Failed to send message: {}", e);
                return Err(ClientError::ConnectionError(e.to_string()));
            }
        }
        // User exit: say goodbye properly
        let _ = write.send(Message::Close(None)).await;
        Ok(())
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            match read_result {
                Ok(ReadEnd::Finished) => Ok(()),
                Ok(ReadEnd::Lost) | Err(_) => {
                    Err(ClientError::ConnectionError("Connection lost".to_string()))
                }
            }
        }
        write_result = &mut write_task => {
            read_task.abort();
            write_result.unwrap_or_else(|e| Err(ClientError::ConnectionError(e.to_string())))
        }
    }
}
