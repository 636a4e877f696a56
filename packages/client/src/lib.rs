//! Hibiki command line clients.
//!
//! - `chat`: interactive client for one instance
//! - `load`: fan-out check across many connections and instances

pub mod chat;
pub mod error;
pub mod formatter;
pub mod load;
