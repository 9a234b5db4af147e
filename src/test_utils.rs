//! Test utilities.
//!
//! In-memory implementations of the store, publisher, and geo traits, usable
//! from both unit and integration tests. Always compiled so `tests/` can
//! reach them.

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};

use crate::broker::EventPublisher;
use crate::domain::entities::{Link, LinkRedirect, LinkStats, NewLink, NewRedirect, OwnerTotals};
use crate::domain::events::DomainEvent;
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::error::AppError;
use crate::infrastructure::geo::GeoLookup;

#[derive(Default)]
struct StoreState {
    links: Vec<Link>,
    stats: Vec<LinkStats>,
    redirects: Vec<LinkRedirect>,
    next_link_id: i64,
    next_stats_id: i64,
    next_redirect_id: i64,
    fail_next: Option<String>,
}

/// In-memory persistence store implementing both repository traits.
///
/// Clones share state, so the same store can back a link repository and a
/// stats repository in one test. Mirrors the real store's semantics: links
/// are created with their stats row, deletions cascade, bulk operations
/// report affected counts.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the store to fail the next repository operation.
    pub fn fail_next_operation(&self, error_message: &str) {
        self.state.lock().unwrap().fail_next = Some(error_message.to_string());
    }

    fn check_failure(&self) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = state.fail_next.take() {
            return Err(AppError::dependency(message, json!({})));
        }
        Ok(())
    }

    /// Seeds a link with its stats row, returning `(link_id, stats_id)`.
    pub fn seed_link(&self, user_id: i64, short_code: &str, target_url: &str) -> (i64, i64) {
        let mut state = self.state.lock().unwrap();

        state.next_link_id += 1;
        state.next_stats_id += 1;
        let link_id = state.next_link_id;
        let stats_id = state.next_stats_id;

        state.links.push(Link::new(
            link_id,
            user_id,
            short_code.to_string(),
            target_url.to_string(),
            chrono::Utc::now(),
        ));
        state.stats.push(LinkStats {
            id: stats_id,
            link_id,
            redirects_count: 0,
        });

        (link_id, stats_id)
    }

    pub fn stats(&self, stats_id: i64) -> Option<LinkStats> {
        self.state
            .lock()
            .unwrap()
            .stats
            .iter()
            .find(|s| s.id == stats_id)
            .cloned()
    }

    pub fn redirects(&self, stats_id: i64) -> Vec<LinkRedirect> {
        self.state
            .lock()
            .unwrap()
            .redirects
            .iter()
            .filter(|r| r.link_stats_id == stats_id)
            .cloned()
            .collect()
    }

    pub fn links_owned_by(&self, user_id: i64) -> Vec<Link> {
        self.state
            .lock()
            .unwrap()
            .links
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LinkRepository for InMemoryStore {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        self.check_failure()?;

        {
            let state = self.state.lock().unwrap();
            if state
                .links
                .iter()
                .any(|l| l.short_code == new_link.short_code)
            {
                return Err(AppError::conflict(
                    "Unique constraint violation",
                    json!({ "short_code": new_link.short_code }),
                ));
            }
        }

        let (link_id, _) = self.seed_link(new_link.user_id, &new_link.short_code, &new_link.target_url);

        let state = self.state.lock().unwrap();
        Ok(state
            .links
            .iter()
            .find(|l| l.id == link_id)
            .cloned()
            .expect("just inserted"))
    }

    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<Link>, AppError> {
        self.check_failure()?;

        Ok(self
            .state
            .lock()
            .unwrap()
            .links
            .iter()
            .find(|l| l.short_code == short_code)
            .cloned())
    }

    async fn delete_by_id(&self, link_id: i64) -> Result<Option<Link>, AppError> {
        self.check_failure()?;

        let mut state = self.state.lock().unwrap();
        let position = state.links.iter().position(|l| l.id == link_id);

        let Some(position) = position else {
            return Ok(None);
        };

        let link = state.links.remove(position);
        let stats_ids: Vec<i64> = state
            .stats
            .iter()
            .filter(|s| s.link_id == link.id)
            .map(|s| s.id)
            .collect();
        state.stats.retain(|s| s.link_id != link.id);
        state
            .redirects
            .retain(|r| !stats_ids.contains(&r.link_stats_id));

        Ok(Some(link))
    }

    async fn count_by_owner(&self, user_id: i64) -> Result<i64, AppError> {
        self.check_failure()?;

        Ok(self
            .state
            .lock()
            .unwrap()
            .links
            .iter()
            .filter(|l| l.user_id == user_id)
            .count() as i64)
    }

    async fn bulk_reassign_owner(
        &self,
        from_user_id: i64,
        to_user_id: i64,
    ) -> Result<u64, AppError> {
        self.check_failure()?;

        let mut state = self.state.lock().unwrap();
        let mut affected = 0;
        for link in state.links.iter_mut().filter(|l| l.user_id == from_user_id) {
            link.user_id = to_user_id;
            affected += 1;
        }

        Ok(affected)
    }

    async fn bulk_delete_by_owner(&self, user_id: i64) -> Result<u64, AppError> {
        self.check_failure()?;

        let mut state = self.state.lock().unwrap();
        let doomed: Vec<i64> = state
            .links
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.id)
            .collect();
        let stats_ids: Vec<i64> = state
            .stats
            .iter()
            .filter(|s| doomed.contains(&s.link_id))
            .map(|s| s.id)
            .collect();

        state.links.retain(|l| l.user_id != user_id);
        state.stats.retain(|s| !doomed.contains(&s.link_id));
        state
            .redirects
            .retain(|r| !stats_ids.contains(&r.link_stats_id));

        Ok(doomed.len() as u64)
    }
}

#[async_trait]
impl StatsRepository for InMemoryStore {
    async fn find_by_id(&self, stats_id: i64) -> Result<Option<LinkStats>, AppError> {
        self.check_failure()?;
        Ok(self.stats(stats_id))
    }

    async fn find_by_link_id(&self, link_id: i64) -> Result<Option<LinkStats>, AppError> {
        self.check_failure()?;

        Ok(self
            .state
            .lock()
            .unwrap()
            .stats
            .iter()
            .find(|s| s.link_id == link_id)
            .cloned())
    }

    async fn increment_and_append(
        &self,
        stats_id: i64,
        record: NewRedirect,
    ) -> Result<(), AppError> {
        self.check_failure()?;

        let mut state = self.state.lock().unwrap();

        let Some(stats) = state.stats.iter_mut().find(|s| s.id == stats_id) else {
            return Err(AppError::not_found(
                "Link stats not found",
                json!({ "stats_id": stats_id }),
            ));
        };
        stats.redirects_count += 1;

        state.next_redirect_id += 1;
        let id = state.next_redirect_id;
        state.redirects.push(LinkRedirect {
            id,
            link_stats_id: stats_id,
            ip: record.ip,
            country: record.country,
            browser: record.browser,
            os: record.os,
            device: record.device,
            is_mobile: record.is_mobile,
            is_tablet: record.is_tablet,
            clicked_at: record.clicked_at,
        });

        Ok(())
    }

    async fn recent_redirects(
        &self,
        stats_id: i64,
        limit: i64,
    ) -> Result<Vec<LinkRedirect>, AppError> {
        self.check_failure()?;

        let mut rows = self.redirects(stats_id);
        rows.sort_by(|a, b| b.clicked_at.cmp(&a.clicked_at));
        rows.truncate(limit as usize);

        Ok(rows)
    }

    async fn owner_totals(&self, user_id: i64) -> Result<OwnerTotals, AppError> {
        self.check_failure()?;

        let state = self.state.lock().unwrap();
        let owned: Vec<i64> = state
            .links
            .iter()
            .filter(|l| l.user_id == user_id)
            .map(|l| l.id)
            .collect();
        let total_redirects = state
            .stats
            .iter()
            .filter(|s| owned.contains(&s.link_id))
            .map(|s| s.redirects_count)
            .sum();

        Ok(OwnerTotals {
            total_links: owned.len() as i64,
            total_redirects,
        })
    }
}

/// Publisher that records every event instead of talking to a broker.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish fails with a dependency error.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// All events published so far, in order.
    pub fn published(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), AppError> {
        if self.fail {
            return Err(AppError::dependency("broker unavailable", json!({})));
        }

        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Geo lookup returning a fixed answer.
pub struct StaticGeoLookup {
    country: Option<String>,
}

impl StaticGeoLookup {
    pub fn returning(country: Option<&str>) -> Self {
        Self {
            country: country.map(str::to_string),
        }
    }
}

#[async_trait]
impl GeoLookup for StaticGeoLookup {
    async fn country_for_ip(&self, _ip: &str) -> Option<String> {
        self.country.clone()
    }
}
