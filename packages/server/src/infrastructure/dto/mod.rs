//! Data Transfer Objects (DTOs).
//!
//! DTOs are organized by protocol:
//! - `websocket`: inbound client frames and outbound envelopes (also the bridge payload)
//! - `http`: HTTP API response DTOs
//! - `storage`: records kept in the shared message store

pub mod conversion;
pub mod http;
pub mod storage;
pub mod websocket;
