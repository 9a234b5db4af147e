//! PostgreSQL implementation of the statistics repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

use crate::domain::entities::{LinkRedirect, LinkStats, NewRedirect, OwnerTotals};
use crate::domain::repositories::StatsRepository;
use crate::error::AppError;

/// PostgreSQL repository for redirect counters and history.
pub struct PgStatsRepository {
    pool: Arc<PgPool>,
}

impl PgStatsRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct StatsRow {
    id: i64,
    link_id: i64,
    redirects_count: i64,
}

impl From<StatsRow> for LinkStats {
    fn from(row: StatsRow) -> Self {
        LinkStats {
            id: row.id,
            link_id: row.link_id,
            redirects_count: row.redirects_count,
        }
    }
}

#[derive(FromRow)]
struct RedirectRow {
    id: i64,
    link_stats_id: i64,
    ip: Option<String>,
    country: Option<String>,
    browser: Option<String>,
    os: Option<String>,
    device: Option<String>,
    is_mobile: Option<bool>,
    is_tablet: Option<bool>,
    clicked_at: DateTime<Utc>,
}

impl From<RedirectRow> for LinkRedirect {
    fn from(row: RedirectRow) -> Self {
        LinkRedirect {
            id: row.id,
            link_stats_id: row.link_stats_id,
            ip: row.ip,
            country: row.country,
            browser: row.browser,
            os: row.os,
            device: row.device,
            is_mobile: row.is_mobile,
            is_tablet: row.is_tablet,
            clicked_at: row.clicked_at,
        }
    }
}

#[async_trait]
impl StatsRepository for PgStatsRepository {
    async fn find_by_id(&self, stats_id: i64) -> Result<Option<LinkStats>, AppError> {
        let row = sqlx::query_as::<_, StatsRow>(
            "SELECT id, link_id, redirects_count FROM link_stats WHERE id = $1",
        )
        .bind(stats_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_link_id(&self, link_id: i64) -> Result<Option<LinkStats>, AppError> {
        let row = sqlx::query_as::<_, StatsRow>(
            "SELECT id, link_id, redirects_count FROM link_stats WHERE link_id = $1",
        )
        .bind(link_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(Into::into))
    }

    async fn increment_and_append(
        &self,
        stats_id: i64,
        record: NewRedirect,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE link_stats SET redirects_count = redirects_count + 1 WHERE id = $1",
        )
        .bind(stats_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(AppError::not_found(
                "Link stats not found",
                json!({ "stats_id": stats_id }),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO link_redirects
                (link_stats_id, ip, country, browser, os, device, is_mobile, is_tablet, clicked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(stats_id)
        .bind(&record.ip)
        .bind(&record.country)
        .bind(&record.browser)
        .bind(&record.os)
        .bind(&record.device)
        .bind(record.is_mobile)
        .bind(record.is_tablet)
        .bind(record.clicked_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn recent_redirects(
        &self,
        stats_id: i64,
        limit: i64,
    ) -> Result<Vec<LinkRedirect>, AppError> {
        let rows = sqlx::query_as::<_, RedirectRow>(
            r#"
            SELECT id, link_stats_id, ip, country, browser, os, device,
                   is_mobile, is_tablet, clicked_at
            FROM link_redirects
            WHERE link_stats_id = $1
            ORDER BY clicked_at DESC
            LIMIT $2
            "#,
        )
        .bind(stats_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn owner_totals(&self, user_id: i64) -> Result<OwnerTotals, AppError> {
        let (total_links, total_redirects) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(l.id), COALESCE(SUM(s.redirects_count), 0)::bigint
            FROM links l
            LEFT JOIN link_stats s ON s.link_id = l.id
            WHERE l.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(OwnerTotals {
            total_links,
            total_redirects,
        })
    }
}
