//! Redis access layer shared by the gateway and all services.
//!
//! [`RedisClient`] wraps `redis::aio::ConnectionManager` with the operations
//! the rest of the workspace needs (key-value, atomic counters, Lua scripts,
//! prefix sweeps). [`Cache`] layers a namespaced, TTL-bounded query cache on
//! top of it.

mod cache;
mod client;

pub use cache::Cache;
pub use client::RedisClient;

pub type Result<T> = std::result::Result<T, redis::RedisError>;
