//! Outbound event publishing.

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::connection::BrokerClient;
use crate::domain::events::DomainEvent;
use crate::error::AppError;

/// Trait for emitting domain events onto the durable queue.
///
/// Callers on the synchronous request path publish fire-and-forget: spawn the
/// future, log the failure, never let it affect the response.
///
/// # Implementations
///
/// - [`AmqpEventPublisher`] - RabbitMQ-backed publisher
/// - [`crate::test_utils::RecordingPublisher`] - in-memory recorder for tests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Enqueues one event.
    ///
    /// Waits for the enqueue itself, not for any broker durability
    /// confirmation beyond it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] when the broker rejects the publish
    /// or the channel is unusable.
    async fn publish(&self, event: &DomainEvent) -> Result<(), AppError>;
}

/// RabbitMQ publisher writing persistent JSON messages to one durable queue.
///
/// The channel is opened once and cached; a failed publish drops it so the
/// next call re-opens a channel (reconnecting the underlying connection if
/// needed via [`BrokerClient`]).
pub struct AmqpEventPublisher {
    broker: Arc<BrokerClient>,
    queue: String,
    channel: Mutex<Option<Channel>>,
}

impl AmqpEventPublisher {
    /// Creates the publisher and declares the durable queue.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] if the channel cannot be opened or
    /// the queue cannot be declared.
    pub async fn new(broker: Arc<BrokerClient>, queue: impl Into<String>) -> Result<Self, AppError> {
        let publisher = Self {
            broker,
            queue: queue.into(),
            channel: Mutex::new(None),
        };

        publisher.ensure_channel().await?;

        Ok(publisher)
    }

    async fn ensure_channel(&self) -> Result<Channel, AppError> {
        let mut guard = self.channel.lock().await;

        if let Some(channel) = guard.as_ref() {
            if channel.status().connected() {
                return Ok(channel.clone());
            }
        }

        let channel = self.broker.create_channel().await?;
        channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        *guard = Some(channel.clone());
        Ok(channel)
    }
}

#[async_trait]
impl EventPublisher for AmqpEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), AppError> {
        let payload = serde_json::to_vec(event).map_err(|e| {
            AppError::internal(
                "Failed to serialize event",
                json!({ "source": e.to_string() }),
            )
        })?;

        let channel = self.ensure_channel().await?;

        let published = channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_delivery_mode(2) // persistent
                    .with_content_type("application/json".into()),
            )
            .await;

        match published {
            Ok(_confirm) => {
                debug!(kind = %event.kind(), queue = %self.queue, "Published event");
                Ok(())
            }
            Err(e) => {
                // Drop the cached channel so the next publish starts clean.
                *self.channel.lock().await = None;
                Err(e.into())
            }
        }
    }
}
