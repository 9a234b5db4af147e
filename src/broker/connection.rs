//! Process-scoped AMQP connection lifecycle.

use lapin::{Channel, Connection, ConnectionProperties};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{info, warn};

use crate::error::AppError;

const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Process-scoped AMQP client.
///
/// The connection is established once at startup, retrying with exponential
/// backoff until the broker is reachable, and re-established on demand when
/// it drops. Publishers and consumers get their channels from here instead of
/// holding ambient global state.
pub struct BrokerClient {
    url: String,
    connection: Mutex<Connection>,
}

impl BrokerClient {
    /// Connects to the broker, retrying until it succeeds.
    ///
    /// Broker unavailability at startup must not crash the host process, so
    /// this blocks (asynchronously) for as long as it takes.
    pub async fn connect(url: &str) -> Self {
        let connection = Self::establish(url).await;

        Self {
            url: url.to_string(),
            connection: Mutex::new(connection),
        }
    }

    async fn establish(url: &str) -> Connection {
        let mut backoff = ExponentialBackoff::from_millis(2)
            .factor(250)
            .max_delay(MAX_RECONNECT_DELAY)
            .map(jitter);

        loop {
            match Connection::connect(url, ConnectionProperties::default()).await {
                Ok(connection) => {
                    info!("✓ Connected to AMQP broker");
                    return connection;
                }
                Err(e) => {
                    let delay = backoff.next().unwrap_or(MAX_RECONNECT_DELAY);
                    warn!(
                        "Broker connection failed ({}), retrying in {:?}",
                        e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Opens a fresh channel, re-establishing the connection first if it has
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Dependency`] if the channel cannot be created on a
    /// live connection.
    pub async fn create_channel(&self) -> Result<Channel, AppError> {
        let mut connection = self.connection.lock().await;

        if !connection.status().connected() {
            warn!("AMQP connection lost, reconnecting");
            *connection = Self::establish(&self.url).await;
        }

        connection.create_channel().await.map_err(Into::into)
    }
}
