//! Redirect analytics service.

use serde_json::json;
use std::sync::Arc;

use crate::domain::entities::{LinkStats, NewRedirect};
use crate::domain::events::LinkRedirectEvent;
use crate::domain::repositories::StatsRepository;
use crate::error::AppError;
use crate::infrastructure::geo::GeoLookup;
use crate::utils::user_agent;

/// Service applying redirect events to the stats store.
///
/// Enrichment never fails the event: a missing user-agent leaves the client
/// fields unset, and a failed geo lookup leaves the country unset. Only the
/// atomic store update can fail, which is what triggers a requeue upstream.
pub struct StatsService<S: StatsRepository> {
    stats_repository: Arc<S>,
    geo: Arc<dyn GeoLookup>,
}

impl<S: StatsRepository> StatsService<S> {
    /// Creates a new stats service.
    pub fn new(stats_repository: Arc<S>, geo: Arc<dyn GeoLookup>) -> Self {
        Self {
            stats_repository,
            geo,
        }
    }

    /// Records one redirect: resolve the stats row, enrich the record, then
    /// atomically increment the counter and append the record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] when the event carries neither a link
    /// id nor a stats id. Returns [`AppError::NotFound`] when no stats row
    /// matches. Returns [`AppError::Dependency`] on store errors; the caller
    /// requeues the event in that case.
    pub async fn handle_link_redirect(&self, event: &LinkRedirectEvent) -> Result<(), AppError> {
        let stats = self.resolve_stats(event).await?;
        let record = self.build_record(event).await;

        self.stats_repository
            .increment_and_append(stats.id, record)
            .await
    }

    /// Resolves the stats row the event refers to, by stats id when present,
    /// by link id otherwise.
    async fn resolve_stats(&self, event: &LinkRedirectEvent) -> Result<LinkStats, AppError> {
        let found = if let Some(stats_id) = event.link_stats_id {
            self.stats_repository.find_by_id(stats_id).await?
        } else if let Some(link_id) = event.link_id {
            self.stats_repository.find_by_link_id(link_id).await?
        } else {
            return Err(AppError::bad_request(
                "Redirect event carries neither linkId nor linkStatsId",
                json!({}),
            ));
        };

        found.ok_or_else(|| {
            AppError::not_found(
                "Link stats not found for redirect event",
                json!({
                    "link_id": event.link_id,
                    "link_stats_id": event.link_stats_id,
                }),
            )
        })
    }

    async fn build_record(&self, event: &LinkRedirectEvent) -> NewRedirect {
        let mut record = NewRedirect::bare(event.timestamp);

        if let Some(ua) = event.user_agent.as_deref() {
            let info = user_agent::classify(ua);
            record.browser = info.browser;
            record.os = info.os;
            record.device = info.device;
            record.is_mobile = Some(info.is_mobile);
            record.is_tablet = Some(info.is_tablet);
        }

        if let Some(ip) = event.ip.as_deref() {
            // IP is stored verbatim; the country is best-effort.
            record.ip = Some(ip.to_string());
            record.country = self.geo.country_for_ip(ip).await;
        }

        record
    }
}
