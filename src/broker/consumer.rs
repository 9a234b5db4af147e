//! Event consumer and router.
//!
//! Owns the message lifecycle for the duration of a delivery: decode the
//! envelope, dispatch to the handler registered for the kind, translate the
//! outcome to ack / nack-with-requeue. Deliveries are processed concurrently
//! in spawned tasks, bounded by the channel prefetch window.

use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use metrics::counter;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::connection::BrokerClient;
use super::{EventHandler, HandlerOutcome};
use crate::domain::events::{DomainEvent, EventKind};
use crate::error::AppError;

const CONSUMER_TAG: &str = "links-service";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Decodes a raw payload into a domain event.
///
/// # Errors
///
/// Returns [`AppError::Validation`] for anything that is not a well-formed
/// event envelope; such messages can never succeed.
pub fn decode_event(payload: &[u8]) -> Result<DomainEvent, AppError> {
    serde_json::from_slice(payload).map_err(|e| {
        AppError::bad_request(
            "Malformed event payload",
            json!({ "source": e.to_string() }),
        )
    })
}

/// Decodes and routes one payload through the handler registry.
///
/// Exactly one handler runs per message; a payload that fails to decode or
/// names a kind with no registered handler is a fatal outcome.
pub async fn dispatch(
    payload: &[u8],
    handlers: &HashMap<EventKind, Arc<dyn EventHandler>>,
) -> HandlerOutcome {
    let event = match decode_event(payload) {
        Ok(event) => event,
        Err(e) => return HandlerOutcome::Fatal(e),
    };

    let kind = event.kind();
    match handlers.get(&kind) {
        Some(handler) => {
            debug!(%kind, "Dispatching event");
            handler.handle(event).await
        }
        None => HandlerOutcome::Fatal(AppError::bad_request(
            "No handler registered for event kind",
            json!({ "kind": kind.as_str() }),
        )),
    }
}

/// Consumer driving one durable queue.
pub struct EventConsumer {
    broker: Arc<BrokerClient>,
    queue: String,
    prefetch: u16,
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl EventConsumer {
    pub fn new(broker: Arc<BrokerClient>, queue: impl Into<String>, prefetch: u16) -> Self {
        Self {
            broker,
            queue: queue.into(),
            prefetch,
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for an event kind. The same handler instance may
    /// be registered under several kinds; a later registration for the same
    /// kind replaces the earlier one.
    pub fn register(mut self, kind: EventKind, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    /// Consumes the queue until the process shuts down.
    ///
    /// Whenever the delivery stream errors or ends, the loop re-opens a
    /// channel (reconnecting the broker connection if needed) and resumes.
    /// Unacknowledged in-flight messages are redelivered by the broker.
    pub async fn run(self) -> Result<(), AppError> {
        let Self {
            broker,
            queue,
            prefetch,
            handlers,
        } = self;
        let handlers = Arc::new(handlers);

        loop {
            match consume_once(&broker, &queue, prefetch, &handlers).await {
                Ok(()) => {
                    warn!("Delivery stream ended, reconnecting in {:?}", RECONNECT_DELAY)
                }
                Err(e) => warn!(
                    "Consumer setup failed ({}), reconnecting in {:?}",
                    e, RECONNECT_DELAY
                ),
            }

            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }
}

/// Opens a channel, declares the queue, and drains deliveries until the
/// stream ends or errors.
async fn consume_once(
    broker: &BrokerClient,
    queue: &str,
    prefetch: u16,
    handlers: &Arc<HashMap<EventKind, Arc<dyn EventHandler>>>,
) -> Result<(), AppError> {
    let channel = broker.create_channel().await?;

    channel
        .queue_declare(
            queue,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    channel
        .basic_qos(prefetch, BasicQosOptions::default())
        .await?;

    let mut consumer = channel
        .basic_consume(
            queue,
            CONSUMER_TAG,
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    info!("Consuming events from queue '{}' (prefetch {})", queue, prefetch);

    while let Some(delivery) = consumer.next().await {
        match delivery {
            Ok(delivery) => {
                let handlers = Arc::clone(handlers);
                tokio::spawn(async move {
                    process_delivery(delivery, &handlers).await;
                });
            }
            Err(e) => {
                error!("Consumer stream error: {}", e);
                break;
            }
        }
    }

    Ok(())
}

/// Processes one delivery end to end and settles it with the broker.
async fn process_delivery(
    delivery: Delivery,
    handlers: &HashMap<EventKind, Arc<dyn EventHandler>>,
) {
    let outcome = dispatch(&delivery.data, handlers).await;
    counter!("events_processed_total", "outcome" => outcome.label()).increment(1);

    match outcome {
        HandlerOutcome::Success => {
            if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
                error!("Failed to ack message: {}", e);
            }
        }
        HandlerOutcome::Retry(cause) => {
            warn!("Event processing failed, requeueing: {}", cause);
            requeue(&delivery).await;
        }
        HandlerOutcome::Fatal(cause) => {
            // No dead-letter routing exists; even unprocessable messages go
            // back to the queue and will redeliver indefinitely.
            error!("Unprocessable event, requeueing: {}", cause);
            requeue(&delivery).await;
        }
    }
}

async fn requeue(delivery: &Delivery) {
    let options = BasicNackOptions {
        requeue: true,
        ..Default::default()
    };

    if let Err(e) = delivery.acker.nack(options).await {
        error!("Failed to nack message: {}", e);
    }
}
