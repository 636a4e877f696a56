//! Hibiki broadcast server instance.
//!
//! Every instance started against the same Redis forms one broadcast
//! channel: a message sent to any of them reaches every client of all of them.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hibiki-server
//! cargo run --bin hibiki-server -- --backend redis --redis-url redis://127.0.0.1:6379 --port 3001
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use hibiki_server::{
    bootstrap::{Backends, build_server},
    config::{
        Backend, DEFAULT_CHANNEL, DEFAULT_MESSAGE_KEY, DEFAULT_REDIS_URL, ServerConfig,
        resolve_instance_id,
    },
};
use hibiki_shared::{
    logger::{LogFormat, setup_logger},
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "hibiki-server")]
#[command(about = "Multi-instance WebSocket broadcast server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HIBIKI_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "HIBIKI_PORT", default_value = "8080")]
    port: u16,

    /// Instance id reported to clients; defaults to the host name
    #[arg(long, env = "INSTANCE_ID")]
    instance_id: Option<String>,

    /// Store and bridge implementation
    #[arg(long, env = "HIBIKI_BACKEND", value_enum, default_value_t = Backend::Memory)]
    backend: Backend,

    #[arg(long, env = "REDIS_URL", default_value = DEFAULT_REDIS_URL)]
    redis_url: String,

    /// Redis list holding the message log
    #[arg(long, env = "HIBIKI_MESSAGE_KEY", default_value = DEFAULT_MESSAGE_KEY)]
    message_key: String,

    /// Redis pub/sub channel shared by all instances
    #[arg(long, env = "HIBIKI_CHANNEL", default_value = DEFAULT_CHANNEL)]
    channel: String,

    /// Number of messages kept in the log
    #[arg(long, env = "HIBIKI_RETENTION", default_value = "10000")]
    retention: usize,

    /// Envelopes buffered per subscriber of the in-memory bridge
    #[arg(long, env = "HIBIKI_TOPIC_CAPACITY", default_value = "1024")]
    topic_capacity: usize,

    /// Upper bound from shutdown signal to exit
    #[arg(long, env = "HIBIKI_GRACE_PERIOD_MS", default_value = "10000")]
    grace_period_ms: u64,

    /// Upper bound on each store or bridge call
    #[arg(long, env = "HIBIKI_DEPENDENCY_TIMEOUT_MS", default_value = "2000")]
    dependency_timeout_ms: u64,

    /// Log output format (pretty or json)
    #[arg(long, env = "HIBIKI_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let hostname = std::env::var("HOSTNAME").ok();
        ServerConfig {
            host: self.host,
            port: self.port,
            instance_id: resolve_instance_id(self.instance_id, hostname),
            backend: self.backend,
            redis_url: self.redis_url,
            message_key: self.message_key,
            channel: self.channel,
            retention: self.retention,
            topic_capacity: self.topic_capacity,
            grace_period: Duration::from_millis(self.grace_period_ms),
            dependency_timeout: Duration::from_millis(self.dependency_timeout_ms),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info", args.log_format);

    let config = args.into_config();
    tracing::info!(
        "Starting instance {} with {:?} backend",
        config.instance_id,
        config.backend
    );

    // Initialize dependencies in order:
    // 1. Clock
    // 2. Backends (store and bridge)
    // 3. Server (hub, bridge supervisor, use cases)

    // 1. Clock
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // 2. Backends
    let backends = match Backends::connect(&config, clock.clone()).await {
        Ok(backends) => backends,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    // 3. Server
    let server = match build_server(&config, backends, clock).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    match server.run(config.host, config.port).await {
        Ok(outcome) => {
            tracing::info!("Exiting after drain ({:?})", outcome);
            // Exit right away; nothing left may hold the process past the grace period.
            std::process::exit(0);
        }
        Err(e) => {
            tracing::error!("Server error: {}", e);
            std::process::exit(1);
        }
    }
}
