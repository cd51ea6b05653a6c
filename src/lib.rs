//! Ripple - social content backend.
//!
//! A front-facing gateway admits, authenticates and routes client traffic to
//! the identity, post and media services; the services keep denormalized
//! caches and cross-entity state consistent through a topic-routed event bus
//! instead of synchronous coupling.

pub mod auth;
pub mod bus;
pub mod gateway;
pub mod identity;
pub mod limiter;
pub mod media;
pub mod posts;
pub mod utils;
