// ============================================================================
// Event Bus
// ============================================================================
//
// Topic-routed pub/sub between services over a single durable exchange.
// Publishing is fire-and-forget; consumers bind anonymous exclusive queues so
// every process instance receives its own copy of each matching event, and
// acknowledge only after the handler succeeds (at-least-once delivery, so
// handlers must be idempotent).
//
// ============================================================================

pub mod client;
pub mod consumer;
pub mod events;

pub use client::EventBus;
pub use consumer::{spawn_consumer, EventHandler};
pub use events::{Event, EventDecodeError, MediaDeleted, PostCreated, PostDeleted};
