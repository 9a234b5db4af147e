//! Repository trait for redirect statistics.

use crate::domain::entities::{LinkRedirect, LinkStats, NewRedirect, OwnerTotals};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for redirect counters and history.
///
/// The increment-and-append operation is the store-side atomicity anchor of
/// the whole analytics pipeline: the counter bump and the history row either
/// both land or neither does.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgStatsRepository`] - PostgreSQL implementation
/// - [`crate::test_utils::InMemoryStatsRepository`] - in-memory fake for tests
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Finds a stats row by its own id.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on database errors.
    async fn find_by_id(&self, stats_id: i64) -> Result<Option<LinkStats>, AppError>;

    /// Finds the stats row belonging to a link.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on database errors.
    async fn find_by_link_id(&self, link_id: i64) -> Result<Option<LinkStats>, AppError>;

    /// Atomically increments the redirect counter by 1 and appends one
    /// redirect record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no stats row matches `stats_id`.
    /// Returns [`AppError::Dependency`] on database errors.
    async fn increment_and_append(
        &self,
        stats_id: i64,
        record: NewRedirect,
    ) -> Result<(), AppError>;

    /// Returns the most recent redirect records for a stats row, ordered by
    /// click timestamp descending.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on database errors.
    async fn recent_redirects(
        &self,
        stats_id: i64,
        limit: i64,
    ) -> Result<Vec<LinkRedirect>, AppError>;

    /// Total links and total redirects across all links owned by a user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on database errors.
    async fn owner_totals(&self, user_id: i64) -> Result<OwnerTotals, AppError>;
}
