//! PostgreSQL implementation of the link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{Link, NewLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// PostgreSQL repository for short links.
///
/// Bulk ownership operations are single statements so that account
/// reconciliation stays idempotent under redelivery: a rerun simply matches
/// zero rows.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct LinkRow {
    id: i64,
    user_id: i64,
    short_code: String,
    target_url: String,
    created_at: DateTime<Utc>,
}

impl From<LinkRow> for Link {
    fn from(row: LinkRow) -> Self {
        Link::new(
            row.id,
            row.user_id,
            row.short_code,
            row.target_url,
            row.created_at,
        )
    }
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn create(&self, new_link: NewLink) -> Result<Link, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            INSERT INTO links (user_id, short_code, target_url)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, short_code, target_url, created_at
            "#,
        )
        .bind(new_link.user_id)
        .bind(&new_link.short_code)
        .bind(&new_link.target_url)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO link_stats (link_id) VALUES ($1)")
            .bind(row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row.into())
    }

    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT id, user_id, short_code, target_url, created_at
            FROM links
            WHERE short_code = $1
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_by_id(&self, link_id: i64) -> Result<Option<Link>, AppError> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            DELETE FROM links
            WHERE id = $1
            RETURNING id, user_id, short_code, target_url, created_at
            "#,
        )
        .bind(link_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn count_by_owner(&self, user_id: i64) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM links WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count)
    }

    async fn bulk_reassign_owner(
        &self,
        from_user_id: i64,
        to_user_id: i64,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE links SET user_id = $2 WHERE user_id = $1")
            .bind(from_user_id)
            .bind(to_user_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }

    async fn bulk_delete_by_owner(&self, user_id: i64) -> Result<u64, AppError> {
        // link_stats and link_redirects go with the links via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM links WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }
}
