// ============================================================================
// Event consumer loop
// ============================================================================
//
// One long-lived task per subscription. Each session walks
// Disconnected → Connecting → Bound → Consuming; any transport failure drops
// the session back to Disconnected and the loop reconnects with capped
// exponential backoff. A process must never end up permanently deaf to
// events.
//
// Per message: decode-validate, invoke the handler, ack only on success.
// A failed handler prevents acknowledgment so the broker redelivers (first
// failure requeues; a redelivered failure is dead-lettered instead of
// spinning hot). Malformed or unknown events are dead-lettered immediately.
//
// ============================================================================

use crate::bus::events::Event;
use async_trait::async_trait;
use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties, ExchangeKind};
use ripple_config::BusConfig;
use ripple_error::AppError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
/// A session that survives this long is considered healthy and resets the
/// backoff.
const HEALTHY_SESSION: Duration = Duration::from_secs(30);

/// Handler invoked once per delivered event.
///
/// At-least-once delivery means the same event can arrive more than once;
/// implementations must treat duplicates as no-ops, never as errors.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: Event) -> Result<(), AppError>;
}

/// Spawn a consumer loop bound to `routing_key` for the lifetime of the
/// process. Returns the task handle so callers can detect an unexpected exit.
pub fn spawn_consumer<H: EventHandler>(
    config: BusConfig,
    routing_key: &'static str,
    handler: Arc<H>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = INITIAL_BACKOFF;
        loop {
            let session_start = Instant::now();
            match run_session(&config, routing_key, handler.clone()).await {
                Ok(()) => {
                    tracing::warn!(routing_key, "consumer stream ended, reconnecting");
                }
                Err(e) => {
                    tracing::error!(routing_key, error = %e, "consumer session failed");
                }
            }

            if session_start.elapsed() >= HEALTHY_SESSION {
                backoff = INITIAL_BACKOFF;
            }
            tracing::info!(
                routing_key,
                backoff_secs = backoff.as_secs(),
                "reconnecting consumer"
            );
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    })
}

/// One connect-bind-consume session. Returns when the delivery stream closes
/// or errors; the outer loop handles reconnection.
async fn run_session<H: EventHandler>(
    config: &BusConfig,
    routing_key: &str,
    handler: Arc<H>,
) -> Result<(), lapin::Error> {
    // Connecting
    let connection =
        Connection::connect(&config.amqp_url, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;

    // Bound: exchange + anonymous exclusive queue + binding. The exclusive
    // queue gives this process its own copy of every matching event
    // (broadcast, not load-shared).
    channel
        .exchange_declare(
            &config.exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    let queue = channel
        .queue_declare(
            "",
            QueueDeclareOptions {
                exclusive: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .queue_bind(
            queue.name().as_str(),
            &config.exchange,
            routing_key,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;

    // Consuming
    let mut consumer = channel
        .basic_consume(
            queue.name().as_str(),
            "",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    tracing::info!(
        routing_key,
        queue = %queue.name(),
        "listening for events"
    );

    while let Some(delivery) = consumer.next().await {
        let delivery = delivery?;

        let event = match Event::decode(delivery.routing_key.as_str(), &delivery.data) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    routing_key = %delivery.routing_key,
                    error = %e,
                    "discarding undecodable event"
                );
                delivery
                    .acker
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await?;
                continue;
            }
        };

        match handler.handle(event).await {
            Ok(()) => {
                delivery.acker.ack(BasicAckOptions::default()).await?;
            }
            Err(e) => {
                // Never silently dropped: requeue a first failure for retry,
                // dead-letter once redelivery has also failed. The loop keeps
                // running for subsequent messages either way.
                let requeue = !delivery.redelivered;
                tracing::error!(
                    routing_key,
                    error = %e,
                    requeue,
                    "event handler failed"
                );
                delivery
                    .acker
                    .nack(BasicNackOptions {
                        requeue,
                        ..Default::default()
                    })
                    .await?;
            }
        }
    }

    Ok(())
}
