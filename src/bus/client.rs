// ============================================================================
// Event bus client
// ============================================================================
//
// Owns the AMQP connection and channel as an explicitly managed resource:
// established lazily on first use, re-established through the same accessor
// whenever the channel is gone. Callers never manage connection lifecycle.
//
// ============================================================================

use crate::bus::events::Event;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::{FieldTable, ShortString};
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use ripple_config::BusConfig;
use ripple_error::AppError;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct EventBus {
    amqp_url: String,
    exchange: String,
    state: Mutex<Option<(Connection, Channel)>>,
}

impl EventBus {
    pub fn new(config: &BusConfig) -> Self {
        Self {
            amqp_url: config.amqp_url.clone(),
            exchange: config.exchange.clone(),
            state: Mutex::new(None),
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// Establish the connection eagerly. Used at startup so a service that
    /// cannot reach the bus fails fast instead of limping along deaf.
    pub async fn ensure_connected(&self) -> Result<(), lapin::Error> {
        self.channel().await.map(|_| ())
    }

    /// Scoped accessor: returns a live channel, connecting and declaring the
    /// exchange first if the previous channel is absent or dead.
    async fn channel(&self) -> Result<Channel, lapin::Error> {
        let mut state = self.state.lock().await;

        if let Some((connection, channel)) = state.as_ref() {
            if connection.status().connected() && channel.status().connected() {
                return Ok(channel.clone());
            }
        }

        tracing::info!(exchange = %self.exchange, "establishing event bus connection");
        let connection =
            Connection::connect(&self.amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .exchange_declare(
                &self.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        let handle = channel.clone();
        *state = Some((connection, channel));
        Ok(handle)
    }

    /// Publish an event under its routing key.
    ///
    /// Fire-and-forget from the caller's perspective: once the broker has the
    /// message, delivery is the bus's responsibility.
    pub async fn publish(&self, event: &Event) -> Result<(), AppError> {
        let payload = event.encode()?;
        let channel = self.channel().await?;

        channel
            .basic_publish(
                &self.exchange,
                event.routing_key(),
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_content_type(ShortString::from("application/json")),
            )
            .await?;

        tracing::info!(routing_key = event.routing_key(), "event published");
        Ok(())
    }

    /// Publish from a background task so the caller's response never waits on
    /// bus connectivity. Failures are logged; listener-side idempotency covers
    /// the resulting gaps.
    pub fn publish_background(self: &Arc<Self>, event: Event) {
        let bus = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = bus.publish(&event).await {
                tracing::error!(
                    routing_key = event.routing_key(),
                    error = %e,
                    "failed to publish event"
                );
            }
        });
    }
}
