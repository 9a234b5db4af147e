//! Process bootstrap and runtime setup.
//!
//! Handles database and broker connections, cache setup, service wiring, and
//! the consumer lifecycle.

use crate::broker::{
    AccountReconciliationHandler, AmqpEventPublisher, BrokerClient, EventConsumer,
    RedirectStatsHandler,
};
use crate::config::Config;
use crate::domain::events::EventKind;
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::geo::IpApiGeoLookup;
use crate::state::AppState;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Runs the event-processing service with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Redis cache (or NullCache fallback)
/// - AMQP connection, publisher, and consumer
///
/// Then consumes the events queue until a shutdown signal arrives. In-flight
/// deliveries that were not acknowledged by then are redelivered by the
/// broker.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection fails
/// - The broker channel cannot be set up
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await?;
    tracing::info!("Connected to database");

    let cache: Arc<dyn CacheService> = if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        }
    } else {
        tracing::info!("Cache disabled (NullCache)");
        Arc::new(NullCache::new())
    };

    let broker = Arc::new(BrokerClient::connect(&config.amqp_url).await);
    let publisher = Arc::new(
        AmqpEventPublisher::new(Arc::clone(&broker), config.events_queue.clone()).await?,
    );

    let geo = Arc::new(IpApiGeoLookup::new(Duration::from_secs(
        config.geo_timeout_seconds,
    ))?);

    let state = AppState::new(Arc::new(pool), cache, publisher, geo);

    let redirect_handler = Arc::new(RedirectStatsHandler::new(Arc::clone(&state.stats_service)));
    let reconciliation_handler = Arc::new(AccountReconciliationHandler::new(Arc::clone(
        &state.reconciliation_service,
    )));

    let consumer = EventConsumer::new(
        Arc::clone(&broker),
        config.events_queue.clone(),
        config.event_prefetch,
    )
    .register(EventKind::LinkRedirect, redirect_handler)
    .register(
        EventKind::AccountsMerged,
        Arc::clone(&reconciliation_handler) as _,
    )
    .register(EventKind::UserDeleted, reconciliation_handler);

    tokio::select! {
        result = consumer.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(
                "Shutdown signal received; unacknowledged deliveries will be redelivered"
            );
        }
    }

    Ok(())
}
