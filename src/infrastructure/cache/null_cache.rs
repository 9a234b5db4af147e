//! No-op cache used when Redis is not configured.

use super::service::{CacheResult, CacheService};
use async_trait::async_trait;

/// Cache implementation that stores nothing.
///
/// Every lookup is a miss, so resolution always falls through to the store.
#[derive(Debug, Default)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get(&self, _short_code: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(
        &self,
        _short_code: &str,
        _value: &str,
        _ttl_seconds: Option<usize>,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _short_code: &str) -> CacheResult<()> {
        Ok(())
    }
}
