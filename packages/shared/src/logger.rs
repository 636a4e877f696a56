//! Logging setup utilities for the Hibiki binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, colored output for local development.
    #[default]
    Pretty,
    /// One JSON object per line, for aggregating logs across many instances.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}' (expected 'pretty' or 'json')")),
        }
    }
}

/// Build the default filter directive used when `RUST_LOG` is not set.
///
/// Covers the Hibiki library crates and the running binary.
pub fn default_filter(binary_name: &str, default_log_level: &str) -> String {
    [
        "hibiki_shared",
        "hibiki_server",
        "hibiki_client",
        &binary_name.replace('-', "_"),
    ]
    .iter()
    .map(|target| format!("{target}={default_log_level}"))
    .collect::<Vec<_>>()
    .join(",")
}

/// Initialize the tracing subscriber with the specified default log level.
///
/// The log level can be overridden using the `RUST_LOG` environment variable.
///
/// # Examples
///
/// ```no_run
/// use hibiki_shared::logger::{LogFormat, setup_logger};
///
/// setup_logger("hibiki-server", "debug", LogFormat::Pretty);
/// ```
pub fn setup_logger(binary_name: &str, default_log_level: &str, format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter(binary_name, default_log_level).into());

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_covers_crates_and_binary() {
        // テスト項目: デフォルトのフィルタがライブラリとバイナリの両方を含む
        // given (前提条件):
        let binary_name = "hibiki-server";

        // when (操作):
        let filter = default_filter(binary_name, "debug");

        // then (期待する結果):
        assert!(filter.contains("hibiki_server=debug"));
        assert!(filter.contains("hibiki_shared=debug"));
        assert!(filter.contains("hibiki_client=debug"));
        assert!(!filter.contains('-'));
    }

    #[test]
    fn test_log_format_from_str() {
        // テスト項目: ログ形式の文字列が正しく解釈される
        // given (前提条件):

        // when (操作):
        let json = "JSON".parse::<LogFormat>();
        let pretty = "pretty".parse::<LogFormat>();
        let unknown = "xml".parse::<LogFormat>();

        // then (期待する結果):
        assert_eq!(json, Ok(LogFormat::Json));
        assert_eq!(pretty, Ok(LogFormat::Pretty));
        assert!(unknown.is_err());
    }
}
