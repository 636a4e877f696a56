//! Chat execution logic with reconnection support.
//!
//! A shutdown notice from a draining instance ends the session with an
//! error, so the client reconnects; behind a load balancer that lands it on
//! another instance.

use std::time::Duration;

use crate::error::ClientError;

use super::session::run_chat_session;

pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// Run the chat client until the user exits or reconnection gives up
pub async fn run_chat(url: String, display_name: Option<String>) -> Result<(), ClientError> {
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} (attempt {}/{})",
            url,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_chat_session(&url, display_name.as_deref()).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                // If connection ended normally (user exit), don't reconnect
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                reconnect_count += 1;

                if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    return Err(e);
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL.as_secs(),
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );

                tokio::time::sleep(RECONNECT_INTERVAL).await;
            }
        }
    }
}
