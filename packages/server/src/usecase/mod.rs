//! UseCase layer.
//!
//! Each use case drives domain types through the infrastructure seams:
//! - `connect_connection` / `disconnect_connection`: Admit and Remove
//! - `send_message`: persist, then publish
//! - `get_history` / `get_metrics`: read paths for the HTTP plumbing
//! - `drain`: the bounded shutdown sequence

pub mod connect_connection;
pub mod disconnect_connection;
pub mod drain;
pub mod error;
pub mod get_history;
pub mod get_metrics;
pub mod send_message;

pub use connect_connection::ConnectConnectionUseCase;
pub use disconnect_connection::DisconnectConnectionUseCase;
pub use drain::{DrainController, DrainOutcome};
pub use error::{ConnectError, GetHistoryError, SendMessageError};
pub use get_history::{DEFAULT_HISTORY_LIMIT, GetHistoryUseCase};
pub use get_metrics::{GetMetricsUseCase, InstanceSnapshot};
pub use send_message::SendMessageUseCase;
