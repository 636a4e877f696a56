//! Message formatting utilities for client display.

use hibiki_server::infrastructure::dto::websocket::OutboundEnvelope;
use hibiki_shared::time::timestamp_to_rfc3339;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format an envelope received from the server
    pub fn format_envelope(envelope: &OutboundEnvelope) -> String {
        match envelope {
            OutboundEnvelope::System {
                text,
                instance_id,
                issued_at,
            } => Self::format_system_notice(text, instance_id, *issued_at),
            OutboundEnvelope::Chat {
                display_name,
                body,
                instance_id,
                issued_at,
            } => Self::format_chat_message(display_name, body, instance_id, *issued_at),
        }
    }

    /// Format a system notice
    ///
    /// # Arguments
    ///
    /// * `text` - Notice text
    /// * `instance_id` - Instance that issued the notice
    /// * `issued_at` - Unix timestamp (milliseconds)
    pub fn format_system_notice(text: &str, instance_id: &str, issued_at: i64) -> String {
        format!(
            "\n* {} [{} at {}]\n",
            text,
            instance_id,
            timestamp_to_rfc3339(issued_at)
        )
    }

    /// Format a chat message
    ///
    /// # Arguments
    ///
    /// * `from` - Display name of the sender
    /// * `body` - The message body
    /// * `instance_id` - Instance that accepted the message
    /// * `sent_at` - Unix timestamp when the message was persisted (milliseconds)
    pub fn format_chat_message(from: &str, body: &str, instance_id: &str, sent_at: i64) -> String {
        format!(
            "\n\n------------------------------------------------------------\n\
             @{}: {}\n\
             sent at {} via {}\n\
             ------------------------------------------------------------\n",
            from,
            body,
            timestamp_to_rfc3339(sent_at),
            instance_id
        )
    }

    /// Format text that could not be decoded as an envelope
    pub fn format_raw_message(text: &str) -> String {
        format!("\n{}\n", text)
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\nReceived {} bytes of binary data\n", byte_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_system_notice() {
        // テスト項目: system エンベロープに本文とインスタンス ID が表示される
        // given (前提条件):
        let envelope = OutboundEnvelope::System {
            text: "Connected to instance A".to_string(),
            instance_id: "A".to_string(),
            issued_at: 1672531200000,
        };

        // when (操作):
        let result = MessageFormatter::format_envelope(&envelope);

        // then (期待する結果):
        assert_eq!(
            result,
            "\n* Connected to instance A [A at 2023-01-01T00:00:00.000Z]\n"
        );
    }

    #[test]
    fn test_format_chat_message() {
        // テスト項目: chat エンベロープに送信者、本文、受け付けたインスタンスが表示される
        // given (前提条件):
        let envelope = OutboundEnvelope::Chat {
            display_name: "alice".to_string(),
            body: "hi".to_string(),
            instance_id: "B".to_string(),
            issued_at: 1672531200123,
        };

        // when (操作):
        let result = MessageFormatter::format_envelope(&envelope);

        // then (期待する結果):
        assert!(result.contains("@alice: hi\n"));
        assert!(result.contains("sent at 2023-01-01T00:00:00.123Z via B\n"));
    }

    #[test]
    fn test_format_binary_message() {
        // テスト項目: バイナリメッセージはバイト数のみ表示される
        // given (前提条件):
        // when (操作):
        let result = MessageFormatter::format_binary_message(42);

        // then (期待する結果):
        assert_eq!(result, "\nReceived 42 bytes of binary data\n");
    }
}
