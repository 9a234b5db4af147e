//! Repository trait for short link data access.

use crate::domain::entities::{Link, NewLink};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for managing short links.
///
/// Covers link CRUD plus the bulk ownership operations used by account
/// reconciliation. Bulk operations are single-statement on the store side,
/// which is what makes re-running them after a redelivery safe.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - [`crate::test_utils::InMemoryLinkRepository`] - in-memory fake for tests
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Creates a new link together with its (empty) stats row.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] if the short code already exists.
    /// Returns [`AppError::Dependency`] on database errors.
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError>;

    /// Finds a link by its globally unique short code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Link))` if found
    /// - `Ok(None)` if not found
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on database errors.
    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<Link>, AppError>;

    /// Deletes a link by id, cascading its stats and redirect records.
    ///
    /// Returns the deleted link, or `Ok(None)` if none matched.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on database errors.
    async fn delete_by_id(&self, link_id: i64) -> Result<Option<Link>, AppError>;

    /// Counts links owned by the given user.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on database errors.
    async fn count_by_owner(&self, user_id: i64) -> Result<i64, AppError>;

    /// Rewrites ownership of every link owned by `from_user_id` to
    /// `to_user_id` in a single statement, returning the affected count.
    ///
    /// Re-running after success affects 0 rows.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on database errors.
    async fn bulk_reassign_owner(
        &self,
        from_user_id: i64,
        to_user_id: i64,
    ) -> Result<u64, AppError>;

    /// Deletes every link owned by `user_id` (cascading stats and redirects),
    /// returning the deleted count. Re-running after success deletes 0.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on database errors.
    async fn bulk_delete_by_owner(&self, user_id: i64) -> Result<u64, AppError>;
}
