//! Event handlers bridging the router to the application services.
//!
//! Handlers stay thin: unwrap the event variant, delegate to the service,
//! classify the result. Acknowledgment is the router's business.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::{EventHandler, HandlerOutcome};
use crate::application::services::{ReconciliationService, StatsService};
use crate::domain::events::DomainEvent;
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::error::AppError;

fn wrong_kind(expected: &str, got: &DomainEvent) -> HandlerOutcome {
    HandlerOutcome::Fatal(AppError::bad_request(
        "Handler received unexpected event kind",
        json!({ "expected": expected, "got": got.kind().as_str() }),
    ))
}

/// Consumes `LINK_REDIRECT` events: enrich with user-agent and geo data, then
/// atomically bump the counter and append the history record.
///
/// Not idempotent: a redelivery after a confirmed success counts the redirect
/// again. There is no idempotency key on the wire.
pub struct RedirectStatsHandler<S: StatsRepository> {
    stats_service: Arc<StatsService<S>>,
}

impl<S: StatsRepository> RedirectStatsHandler<S> {
    pub fn new(stats_service: Arc<StatsService<S>>) -> Self {
        Self { stats_service }
    }
}

#[async_trait]
impl<S: StatsRepository + 'static> EventHandler for RedirectStatsHandler<S> {
    async fn handle(&self, event: DomainEvent) -> HandlerOutcome {
        let redirect = match event {
            DomainEvent::LinkRedirect(redirect) => redirect,
            other => return wrong_kind("LINK_REDIRECT", &other),
        };

        HandlerOutcome::from_result(self.stats_service.handle_link_redirect(&redirect).await)
    }
}

/// Consumes `USER_ACCOUNTS_MERGED` and `USER_DELETED` events: bulk ownership
/// rewrite or cascade deletion.
///
/// Both operations are naturally idempotent — a rerun matches zero rows — so
/// redelivery is harmless here.
pub struct AccountReconciliationHandler<L: LinkRepository> {
    reconciliation_service: Arc<ReconciliationService<L>>,
}

impl<L: LinkRepository> AccountReconciliationHandler<L> {
    pub fn new(reconciliation_service: Arc<ReconciliationService<L>>) -> Self {
        Self {
            reconciliation_service,
        }
    }
}

#[async_trait]
impl<L: LinkRepository + 'static> EventHandler for AccountReconciliationHandler<L> {
    async fn handle(&self, event: DomainEvent) -> HandlerOutcome {
        match event {
            DomainEvent::AccountsMerged(merge) => HandlerOutcome::from_result(
                self.reconciliation_service
                    .migrate_user_links(merge.source_user_id, merge.target_user_id)
                    .await
                    .map(|_| ()),
            ),
            DomainEvent::UserDeleted(deletion) => HandlerOutcome::from_result(
                self.reconciliation_service
                    .delete_user_links(deletion.user_id)
                    .await
                    .map(|_| ()),
            ),
            other => wrong_kind("USER_ACCOUNTS_MERGED | USER_DELETED", &other),
        }
    }
}
