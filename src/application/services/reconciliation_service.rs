//! Account reconciliation: bulk link ownership rewrite and deletion.

use std::sync::Arc;
use tracing::info;

use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// Service applying account merge and deletion events to link ownership.
///
/// Both operations are single-statement bulk updates on the store side, so a
/// rerun after success matches zero rows. That natural idempotency is what
/// makes requeue-on-failure safe here.
pub struct ReconciliationService<L: LinkRepository> {
    link_repository: Arc<L>,
}

impl<L: LinkRepository> ReconciliationService<L> {
    /// Creates a new reconciliation service.
    pub fn new(link_repository: Arc<L>) -> Self {
        Self { link_repository }
    }

    /// Rewrites every link owned by `source_user_id` to `target_user_id`.
    ///
    /// Returns the number of links moved.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on store errors; the caller requeues
    /// the event.
    pub async fn migrate_user_links(
        &self,
        source_user_id: i64,
        target_user_id: i64,
    ) -> Result<u64, AppError> {
        let owned_before = self.link_repository.count_by_owner(source_user_id).await?;
        info!(
            source_user_id,
            target_user_id, owned_before, "Migrating user links"
        );

        let affected = self
            .link_repository
            .bulk_reassign_owner(source_user_id, target_user_id)
            .await?;

        let owned_after = self.link_repository.count_by_owner(source_user_id).await?;
        info!(
            source_user_id,
            target_user_id, affected, owned_after, "Migrated user links"
        );

        Ok(affected)
    }

    /// Deletes every link owned by `user_id`, cascading stats and redirects.
    ///
    /// Returns the number of links deleted.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] on store errors; the caller requeues
    /// the event.
    pub async fn delete_user_links(&self, user_id: i64) -> Result<u64, AppError> {
        let owned_before = self.link_repository.count_by_owner(user_id).await?;
        info!(user_id, owned_before, "Deleting user links");

        let deleted = self.link_repository.bulk_delete_by_owner(user_id).await?;

        let owned_after = self.link_repository.count_by_owner(user_id).await?;
        info!(user_id, deleted, owned_after, "Deleted user links");

        Ok(deleted)
    }
}
