//! Interactive chat client with reconnection support.

mod runner;
mod session;
mod ui;

pub use runner::{MAX_RECONNECT_ATTEMPTS, RECONNECT_INTERVAL, run_chat};
pub use session::chat_frame;
