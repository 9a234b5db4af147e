//! End-to-end tests for account reconciliation: merge and deletion events
//! rewriting link ownership in bulk.

use std::collections::HashMap;
use std::sync::Arc;

use url_shortener_links::application::services::ReconciliationService;
use url_shortener_links::broker::{
    AccountReconciliationHandler, EventHandler, HandlerOutcome, dispatch,
};
use url_shortener_links::domain::events::EventKind;
use url_shortener_links::test_utils::InMemoryStore;

fn pipeline(store: &InMemoryStore) -> HashMap<EventKind, Arc<dyn EventHandler>> {
    let service = Arc::new(ReconciliationService::new(Arc::new(store.clone())));
    let handler: Arc<dyn EventHandler> = Arc::new(AccountReconciliationHandler::new(service));

    let mut handlers = HashMap::new();
    handlers.insert(EventKind::AccountsMerged, Arc::clone(&handler));
    handlers.insert(EventKind::UserDeleted, handler);
    handlers
}

fn merged_payload(source: i64, target: i64) -> Vec<u8> {
    format!(
        r#"{{ "pattern": "USER_ACCOUNTS_MERGED", "data": {{ "sourceUserId": {}, "targetUserId": {} }} }}"#,
        source, target
    )
    .into_bytes()
}

fn deleted_payload(user: i64) -> Vec<u8> {
    format!(
        r#"{{ "pattern": "USER_DELETED", "data": {{ "userId": {} }} }}"#,
        user
    )
    .into_bytes()
}

#[tokio::test]
async fn merge_moves_every_link_to_target_user() {
    let store = InMemoryStore::new();
    store.seed_link(10, "aaa111", "https://a.example.com");
    store.seed_link(10, "bbb222", "https://b.example.com");
    store.seed_link(10, "ccc333", "https://c.example.com");
    store.seed_link(20, "ddd444", "https://d.example.com");

    let handlers = pipeline(&store);

    let outcome = dispatch(&merged_payload(10, 20), &handlers).await;
    assert!(matches!(outcome, HandlerOutcome::Success));

    assert!(store.links_owned_by(10).is_empty());
    assert_eq!(store.links_owned_by(20).len(), 4);
}

#[tokio::test]
async fn merge_is_idempotent_under_redelivery() {
    let store = InMemoryStore::new();
    store.seed_link(10, "aaa111", "https://a.example.com");
    store.seed_link(10, "bbb222", "https://b.example.com");

    let handlers = pipeline(&store);

    dispatch(&merged_payload(10, 20), &handlers).await;
    let outcome = dispatch(&merged_payload(10, 20), &handlers).await;

    // The rerun matches zero rows and still succeeds.
    assert!(matches!(outcome, HandlerOutcome::Success));
    assert!(store.links_owned_by(10).is_empty());
    assert_eq!(store.links_owned_by(20).len(), 2);
}

#[tokio::test]
async fn deletion_removes_links_and_cascades_stats() {
    let store = InMemoryStore::new();
    let (_link, stats_id) = store.seed_link(5, "aaa111", "https://a.example.com");
    store.seed_link(5, "bbb222", "https://b.example.com");
    store.seed_link(6, "ccc333", "https://c.example.com");

    let handlers = pipeline(&store);

    let outcome = dispatch(&deleted_payload(5), &handlers).await;
    assert!(matches!(outcome, HandlerOutcome::Success));

    assert!(store.links_owned_by(5).is_empty());
    assert_eq!(store.links_owned_by(6).len(), 1);
    assert!(store.stats(stats_id).is_none());
}

#[tokio::test]
async fn deletion_is_idempotent_under_redelivery() {
    let store = InMemoryStore::new();
    store.seed_link(5, "aaa111", "https://a.example.com");

    let handlers = pipeline(&store);

    dispatch(&deleted_payload(5), &handlers).await;
    let outcome = dispatch(&deleted_payload(5), &handlers).await;

    assert!(matches!(outcome, HandlerOutcome::Success));
    assert!(store.links_owned_by(5).is_empty());
}

#[tokio::test]
async fn store_failure_requeues_then_redelivery_succeeds() {
    let store = InMemoryStore::new();
    store.seed_link(10, "aaa111", "https://a.example.com");

    let handlers = pipeline(&store);

    store.fail_next_operation("store down");
    let outcome = dispatch(&merged_payload(10, 20), &handlers).await;
    assert!(matches!(outcome, HandlerOutcome::Retry(_)));
    assert_eq!(store.links_owned_by(10).len(), 1);

    let outcome = dispatch(&merged_payload(10, 20), &handlers).await;
    assert!(matches!(outcome, HandlerOutcome::Success));
    assert_eq!(store.links_owned_by(20).len(), 1);
}
