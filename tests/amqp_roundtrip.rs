//! Integration test against a live RabbitMQ broker.
//!
//! Requires a broker at `AMQP_URL` (default `amqp://localhost:5672`):
//!
//! ```bash
//! cargo test --test amqp_roundtrip -- --ignored
//! ```

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use url_shortener_links::broker::{
    AmqpEventPublisher, BrokerClient, EventConsumer, EventHandler, EventPublisher, HandlerOutcome,
};
use url_shortener_links::domain::events::{DomainEvent, EventKind, UserDeletedEvent};

struct ForwardingHandler {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

#[async_trait]
impl EventHandler for ForwardingHandler {
    async fn handle(&self, event: DomainEvent) -> HandlerOutcome {
        let _ = self.tx.send(event);
        HandlerOutcome::Success
    }
}

#[tokio::test]
#[ignore = "requires a running RabbitMQ broker"]
async fn publish_consume_roundtrip() {
    let amqp_url =
        std::env::var("AMQP_URL").unwrap_or_else(|_| "amqp://localhost:5672".to_string());
    // Unique queue per run so parallel test invocations don't interfere.
    let queue = format!("links.events.test.{}", std::process::id());

    let broker = Arc::new(BrokerClient::connect(&amqp_url).await);
    let publisher = AmqpEventPublisher::new(Arc::clone(&broker), queue.clone())
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let consumer = EventConsumer::new(Arc::clone(&broker), queue.clone(), 4).register(
        EventKind::UserDeleted,
        Arc::new(ForwardingHandler { tx }),
    );
    let consumer_task = tokio::spawn(consumer.run());

    let event = DomainEvent::UserDeleted(UserDeletedEvent { user_id: 42 });
    publisher.publish(&event).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for delivery")
        .expect("consumer channel closed");

    assert_eq!(received, event);

    consumer_task.abort();
}
