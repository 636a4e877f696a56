//! `MessageRepository` implementations.
//!
//! - `inmemory`: process-local store, shared by cloning its handle
//! - `redis_list`: Redis list shared by every instance

pub mod inmemory;
pub mod redis_list;

pub use inmemory::InMemoryMessageRepository;
pub use redis_list::RedisMessageRepository;
