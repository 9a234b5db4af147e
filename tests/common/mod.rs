#![allow(dead_code)]

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use url_shortener_links::broker::EventHandler;
use url_shortener_links::domain::events::{DomainEvent, EventKind, LinkRedirectEvent};
use url_shortener_links::test_utils::RecordingPublisher;

pub const CHROME_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Serialized `LINK_REDIRECT` envelope as it would arrive from the broker.
pub fn redirect_event_payload(
    stats_id: i64,
    ip: Option<&str>,
    user_agent: Option<&str>,
    timestamp: DateTime<Utc>,
) -> Vec<u8> {
    let event = DomainEvent::LinkRedirect(LinkRedirectEvent {
        link_id: None,
        link_stats_id: Some(stats_id),
        user_agent: user_agent.map(str::to_string),
        ip: ip.map(str::to_string),
        timestamp,
    });

    serde_json::to_vec(&event).unwrap()
}

/// Handler registry with a single entry.
pub fn registry(
    kind: EventKind,
    handler: Arc<dyn EventHandler>,
) -> HashMap<EventKind, Arc<dyn EventHandler>> {
    let mut handlers = HashMap::new();
    handlers.insert(kind, handler);
    handlers
}

/// Waits until the recorder has seen `count` events or panics.
pub async fn wait_for_published(publisher: &RecordingPublisher, count: usize) {
    for _ in 0..100 {
        if publisher.published().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {} published events, saw {}",
        count,
        publisher.published().len()
    );
}

/// Re-serializes a recorded event back into broker payload bytes.
pub fn to_payload(event: &DomainEvent) -> Vec<u8> {
    serde_json::to_vec(event).unwrap()
}
