//! Hibiki command line client.
//!
//! `chat` connects to one instance and sends messages typed at the prompt,
//! reconnecting on disconnection (max 5 attempts with 5 second interval).
//! `load` opens many connections across instances and checks that one
//! message reaches every one of them exactly once.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hibiki-client -- chat --display-name alice
//! cargo run --bin hibiki-client -- load -n 5000 -u ws://127.0.0.1:3001/ws -u ws://127.0.0.1:3002/ws
//! ```

use std::time::Duration;

use clap::{Parser, Subcommand};
use hibiki_client::{
    chat::run_chat,
    load::{LoadConfig, run_load},
};
use hibiki_shared::logger::{LogFormat, setup_logger};

#[derive(Parser, Debug)]
#[command(name = "hibiki-client")]
#[command(about = "Chat and load client for Hibiki broadcast servers", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log output format (pretty or json)
    #[arg(long, global = true, env = "HIBIKI_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat on one instance
    Chat {
        /// WebSocket server URL
        #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
        url: String,

        /// Name shown to other clients; anonymous when omitted
        #[arg(short = 'd', long)]
        display_name: Option<String>,
    },
    /// Fan-out check with many connections
    Load {
        /// Instance URLs, used round-robin
        #[arg(short = 'u', long = "url", default_value = "ws://127.0.0.1:8080/ws")]
        urls: Vec<String>,

        /// Number of connections to open
        #[arg(short = 'n', long, default_value = "100")]
        connections: usize,

        /// Timeout for each upgrade and welcome notice, in milliseconds
        #[arg(long, default_value = "5000")]
        connect_timeout_ms: u64,

        /// How long every connection waits for the marker message, in milliseconds
        #[arg(long, default_value = "5000")]
        delivery_timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info", args.log_format);

    match args.command {
        Command::Chat { url, display_name } => {
            if let Err(e) = run_chat(url, display_name).await {
                tracing::error!("Client error: {}", e);
                std::process::exit(1);
            }
        }
        Command::Load {
            urls,
            connections,
            connect_timeout_ms,
            delivery_timeout_ms,
        } => {
            let config = LoadConfig {
                urls,
                connections,
                connect_timeout: Duration::from_millis(connect_timeout_ms),
                delivery_timeout: Duration::from_millis(delivery_timeout_ms),
            };
            match run_load(config).await {
                Ok(report) => {
                    println!(
                        "connections={} delivered={} missing={} duplicates={}",
                        report.connections, report.delivered, report.missing, report.duplicates
                    );
                    for (instance_id, count) in &report.per_instance {
                        println!("  {}: {} connection(s)", instance_id, count);
                    }
                    if !report.is_exact() {
                        std::process::exit(2);
                    }
                }
                Err(e) => {
                    tracing::error!("Load run failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
