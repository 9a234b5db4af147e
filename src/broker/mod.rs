//! AMQP messaging: connection lifecycle, publishing, and the consumer/router.
//!
//! The consumer side drives the per-message state machine
//! `Received → Processing → {Acknowledged | Rejected-Requeue}`. Handlers
//! report a three-outcome result; the router owns the translation to broker
//! acknowledgment primitives so no handler ever touches the channel.

mod connection;
mod consumer;
mod handlers;
mod publisher;

pub use connection::BrokerClient;
pub use consumer::{EventConsumer, decode_event, dispatch};
pub use handlers::{AccountReconciliationHandler, RedirectStatsHandler};
pub use publisher::{AmqpEventPublisher, EventPublisher};

#[cfg(test)]
pub use publisher::MockEventPublisher;

use crate::domain::events::DomainEvent;
use crate::error::AppError;
use async_trait::async_trait;

/// Outcome of processing a single delivery.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Processed; the message is acknowledged and removed from the queue.
    Success,
    /// Failed in a way that may succeed on redelivery (store unavailable).
    Retry(AppError),
    /// Can never succeed (malformed or unroutable message). Still requeued —
    /// there is no dead-letter routing — but logged and counted separately.
    Fatal(AppError),
}

impl HandlerOutcome {
    /// Classifies a service result: permanent (validation) failures are
    /// fatal, everything else is worth retrying.
    pub fn from_result(result: Result<(), AppError>) -> Self {
        match result {
            Ok(()) => HandlerOutcome::Success,
            Err(e) if e.is_retryable() => HandlerOutcome::Retry(e),
            Err(e) => HandlerOutcome::Fatal(e),
        }
    }

    /// Stable label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            HandlerOutcome::Success => "success",
            HandlerOutcome::Retry(_) => "retry",
            HandlerOutcome::Fatal(_) => "fatal",
        }
    }
}

/// A processor for decoded domain events.
///
/// One handler runs per message; the same handler instance may be registered
/// under several event kinds (account reconciliation covers both merge and
/// deletion). Handlers must tolerate redelivery: the broker may hand them a
/// message that was already processed but never acknowledged.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Processes one decoded event and reports the outcome.
    async fn handle(&self, event: DomainEvent) -> HandlerOutcome;
}
