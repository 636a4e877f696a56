//! Infrastructure layer: wire formats, the local connection registry and the
//! concrete store and bridge behind the domain traits.

pub mod bridge;
pub mod dto;
pub mod hub;
pub mod registry;
pub mod repository;
