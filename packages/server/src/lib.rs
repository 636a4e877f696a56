//! Hibiki server library.
//!
//! Many stateless instances, each holding its own set of WebSocket
//! connections, behave as one broadcast channel: a message accepted on any
//! instance is persisted, published on the shared bridge and delivered to
//! every connection on every instance.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// wiring
pub mod bootstrap;
pub mod config;
