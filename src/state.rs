//! Wired application state.
//!
//! Bundles the fully constructed services over their PostgreSQL
//! repositories. The event consumer takes its handlers from here, and an
//! embedding HTTP gateway (out of scope for this crate) would take the link
//! service.

use sqlx::PgPool;
use std::sync::Arc;

use crate::application::services::{LinkService, ReconciliationService, StatsService};
use crate::broker::EventPublisher;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::geo::GeoLookup;
use crate::infrastructure::persistence::{PgLinkRepository, PgStatsRepository};

#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService<PgLinkRepository, PgStatsRepository>>,
    pub stats_service: Arc<StatsService<PgStatsRepository>>,
    pub reconciliation_service: Arc<ReconciliationService<PgLinkRepository>>,
}

impl AppState {
    /// Wires services over PostgreSQL repositories and the given
    /// collaborators.
    pub fn new(
        pool: Arc<PgPool>,
        cache: Arc<dyn CacheService>,
        publisher: Arc<dyn EventPublisher>,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        let link_repository = Arc::new(PgLinkRepository::new(Arc::clone(&pool)));
        let stats_repository = Arc::new(PgStatsRepository::new(Arc::clone(&pool)));

        let link_service = Arc::new(LinkService::new(
            Arc::clone(&link_repository),
            Arc::clone(&stats_repository),
            cache,
            publisher,
        ));
        let stats_service = Arc::new(StatsService::new(Arc::clone(&stats_repository), geo));
        let reconciliation_service = Arc::new(ReconciliationService::new(link_repository));

        Self {
            link_service,
            stats_service,
            reconciliation_service,
        }
    }
}
