//! Value objects.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

use super::error::ValueObjectError;

/// Display name used when a client does not provide one.
pub const ANONYMOUS_DISPLAY_NAME: &str = "Anonymous";

/// Maximum number of characters accepted in a message body.
pub const MAX_BODY_LENGTH: usize = 4000;

/// Opaque identifier of one accepted client socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable logical name of a running instance.
///
/// Attached to system notices and stored messages for observability only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyInstanceId);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for InstanceId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Free-text sender name. Absent or blank names become [`ANONYMOUS_DISPLAY_NAME`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn from_optional(value: Option<String>) -> Self {
        match value {
            Some(name) if !name.trim().is_empty() => Self(name.trim().to_string()),
            _ => Self::anonymous(),
        }
    }

    pub fn anonymous() -> Self {
        Self(ANONYMOUS_DISPLAY_NAME.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Body text of a chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageBody(String);

impl MessageBody {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyBody);
        }
        let length = value.chars().count();
        if length > MAX_BODY_LENGTH {
            return Err(ValueObjectError::BodyTooLong {
                length,
                max: MAX_BODY_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageBody {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix epoch milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_is_trimmed() {
        // テスト項目: インスタンス ID の前後の空白が取り除かれる
        // given (前提条件):
        let raw = "  chat-7f9c  ".to_string();

        // when (操作):
        let result = InstanceId::new(raw);

        // then (期待する結果):
        assert_eq!(result.unwrap().as_str(), "chat-7f9c");
    }

    #[test]
    fn test_instance_id_rejects_blank() {
        // テスト項目: 空白のみのインスタンス ID はエラーになる
        // given (前提条件):
        let raw = "   ".to_string();

        // when (操作):
        let result = InstanceId::new(raw);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyInstanceId));
    }

    #[test]
    fn test_display_name_defaults_to_anonymous() {
        // テスト項目: 表示名が無い、または空白の場合は匿名ラベルになる
        // given (前提条件):
        let absent = None;
        let blank = Some("   ".to_string());

        // when (操作):
        let from_absent = DisplayName::from_optional(absent);
        let from_blank = DisplayName::from_optional(blank);

        // then (期待する結果):
        assert_eq!(from_absent.as_str(), ANONYMOUS_DISPLAY_NAME);
        assert_eq!(from_blank.as_str(), ANONYMOUS_DISPLAY_NAME);
    }

    #[test]
    fn test_display_name_keeps_given_name() {
        // テスト項目: 指定された表示名はそのまま使われる
        // given (前提条件):
        let name = Some(" alice ".to_string());

        // when (操作):
        let result = DisplayName::from_optional(name);

        // then (期待する結果):
        assert_eq!(result.as_str(), "alice");
    }

    #[test]
    fn test_message_body_rejects_empty() {
        // テスト項目: 空白のみの本文はエラーになる
        // given (前提条件):
        let body = " \n ".to_string();

        // when (操作):
        let result = MessageBody::new(body);

        // then (期待する結果):
        assert_eq!(result, Err(ValueObjectError::EmptyBody));
    }

    #[test]
    fn test_message_body_length_limit_counts_characters() {
        // テスト項目: 本文の長さ制限はバイト数ではなく文字数で判定される
        // given (前提条件):
        let at_limit = "あ".repeat(MAX_BODY_LENGTH);
        let over_limit = "a".repeat(MAX_BODY_LENGTH + 1);

        // when (操作):
        let ok = MessageBody::new(at_limit);
        let err = MessageBody::new(over_limit);

        // then (期待する結果):
        assert!(ok.is_ok());
        assert_eq!(
            err,
            Err(ValueObjectError::BodyTooLong {
                length: MAX_BODY_LENGTH + 1,
                max: MAX_BODY_LENGTH,
            })
        );
    }

    #[test]
    fn test_connection_ids_are_unique() {
        // テスト項目: 生成される接続 ID は毎回異なる
        // given (前提条件):

        // when (操作):
        let first = ConnectionId::generate();
        let second = ConnectionId::generate();

        // then (期待する結果):
        assert_ne!(first, second);
    }
}
