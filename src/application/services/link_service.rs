//! Link resolution, creation, and retrieval service.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use crate::broker::EventPublisher;
use crate::domain::entities::{Link, LinkRedirect, LinkStats, NewLink, OwnerTotals};
use crate::domain::events::{DomainEvent, LinkRedirectEvent};
use crate::domain::repositories::{LinkRepository, StatsRepository};
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;
use crate::utils::code_generator::{generate_code, validate_custom_code};
use crate::utils::url_norm::normalize_url;

const RECENT_REDIRECTS_LIMIT: i64 = 10;

/// Cached resolution entry, stored as JSON per short code.
///
/// Carries the stats id alongside the target so cache hits can still raise a
/// tracking event without a store round trip.
#[derive(Debug, Serialize, Deserialize)]
struct CachedTarget {
    target_url: String,
    link_stats_id: Option<i64>,
}

/// Service for resolving, creating, and deleting short links.
///
/// Resolution is the synchronous hot path: cache first, store on miss, and a
/// fire-and-forget tracking event when the link has stats. Nothing on that
/// path waits for the broker.
pub struct LinkService<L: LinkRepository, S: StatsRepository> {
    link_repository: Arc<L>,
    stats_repository: Arc<S>,
    cache: Arc<dyn CacheService>,
    publisher: Arc<dyn EventPublisher>,
}

impl<L, S> LinkService<L, S>
where
    L: LinkRepository,
    S: StatsRepository,
{
    /// Creates a new link service.
    pub fn new(
        link_repository: Arc<L>,
        stats_repository: Arc<S>,
        cache: Arc<dyn CacheService>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            link_repository,
            stats_repository,
            cache,
            publisher,
        }
    }

    /// Resolves a short code to its target URL.
    ///
    /// When the link has stats, publishes a `LINK_REDIRECT` event carrying
    /// the caller's raw user-agent and IP. The publish is spawned: its
    /// failure is logged and never surfaces to the caller — the redirect
    /// succeeds regardless of tracking success.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link matches the short code.
    /// Returns [`AppError::Dependency`] on store errors.
    pub async fn redirect(
        &self,
        short_code: &str,
        user_agent: Option<&str>,
        ip: Option<&str>,
    ) -> Result<String, AppError> {
        if let Ok(Some(raw)) = self.cache.get(short_code).await {
            if let Ok(cached) = serde_json::from_str::<CachedTarget>(&raw) {
                self.publish_redirect(cached.link_stats_id, user_agent, ip);
                return Ok(cached.target_url);
            }
        }

        let link = self
            .link_repository
            .find_by_short_code(short_code)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Link not found", json!({ "short_code": short_code }))
            })?;

        let stats_id = self
            .stats_repository
            .find_by_link_id(link.id)
            .await?
            .map(|stats| stats.id);

        // Asynchronously update cache (fire-and-forget)
        if let Ok(value) = serde_json::to_string(&CachedTarget {
            target_url: link.target_url.clone(),
            link_stats_id: stats_id,
        }) {
            let cache = Arc::clone(&self.cache);
            let key = short_code.to_string();
            tokio::spawn(async move {
                if let Err(e) = cache.set(&key, &value, None).await {
                    error!("Failed to cache resolved target: {}", e);
                }
            });
        }

        self.publish_redirect(stats_id, user_agent, ip);

        Ok(link.target_url)
    }

    /// Spawns a fire-and-forget `LINK_REDIRECT` publish when the link has a
    /// stats row. No stats row means the link is not tracked.
    fn publish_redirect(&self, stats_id: Option<i64>, user_agent: Option<&str>, ip: Option<&str>) {
        let Some(stats_id) = stats_id else {
            return;
        };

        let event = DomainEvent::LinkRedirect(LinkRedirectEvent {
            link_id: None,
            link_stats_id: Some(stats_id),
            user_agent: user_agent.map(str::to_string),
            ip: ip.map(str::to_string),
            timestamp: Utc::now(),
        });

        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(async move {
            if let Err(e) = publisher.publish(&event).await {
                warn!("Failed to publish redirect event: {}", e);
            }
        });
    }

    /// Creates a short link for a user, together with its stats row.
    ///
    /// # Code Generation
    ///
    /// - If `custom_code` is provided, validates it and fails with
    ///   [`AppError::Conflict`] when taken
    /// - Otherwise generates a cryptographically secure random 8-character
    ///   code, retrying up to 10 times on collision
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an invalid URL or custom code,
    /// [`AppError::Conflict`] for a taken code, [`AppError::Dependency`] on
    /// store errors.
    pub async fn create_link(
        &self,
        user_id: i64,
        target_url: String,
        custom_code: Option<String>,
    ) -> Result<Link, AppError> {
        let normalized_url = normalize_url(&target_url)?;

        let short_code = if let Some(custom) = custom_code {
            validate_custom_code(&custom)?;

            if self
                .link_repository
                .find_by_short_code(&custom)
                .await?
                .is_some()
            {
                return Err(AppError::conflict(
                    "Short code already exists",
                    json!({ "short_code": custom }),
                ));
            }

            custom
        } else {
            self.generate_unique_code().await?
        };

        self.link_repository
            .create(NewLink {
                user_id,
                short_code,
                target_url: normalized_url,
            })
            .await
    }

    /// Deletes a link by id and invalidates its cache entry.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no link matches.
    /// Returns [`AppError::Dependency`] on store errors.
    pub async fn delete_link(&self, link_id: i64) -> Result<Link, AppError> {
        let deleted = self
            .link_repository
            .delete_by_id(link_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Link not found", json!({ "link_id": link_id }))
            })?;

        let _ = self.cache.invalidate(&deleted.short_code).await;

        Ok(deleted)
    }

    /// Returns the stats counter and the most recent redirect records for a
    /// short code, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link or its stats row is
    /// missing. Returns [`AppError::Dependency`] on store errors.
    pub async fn get_link_stats(
        &self,
        short_code: &str,
    ) -> Result<(LinkStats, Vec<LinkRedirect>), AppError> {
        let link = self
            .link_repository
            .find_by_short_code(short_code)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Link not found", json!({ "short_code": short_code }))
            })?;

        let stats = self
            .stats_repository
            .find_by_link_id(link.id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Link has no stats", json!({ "short_code": short_code }))
            })?;

        let recent = self
            .stats_repository
            .recent_redirects(stats.id, RECENT_REDIRECTS_LIMIT)
            .await?;

        Ok((stats, recent))
    }

    /// Total links and total redirects across all links owned by a user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on store errors.
    pub async fn user_links_summary(&self, user_id: i64) -> Result<OwnerTotals, AppError> {
        self.stats_repository.owner_totals(user_id).await
    }

    /// Generates a unique short code with collision retry.
    ///
    /// Attempts up to 10 times before failing.
    async fn generate_unique_code(&self) -> Result<String, AppError> {
        const MAX_ATTEMPTS: usize = 10;

        for _ in 0..MAX_ATTEMPTS {
            let code = generate_code();

            if self
                .link_repository
                .find_by_short_code(&code)
                .await?
                .is_none()
            {
                return Ok(code);
            }
        }

        Err(AppError::internal(
            "Failed to generate unique short code",
            json!({ "reason": "Too many collisions" }),
        ))
    }
}
