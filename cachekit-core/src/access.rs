//! The capability interface callers use to talk to one cache region.

use crate::error::Result;
use async_trait::async_trait;

/// Per-region cache handle.
///
/// Bound at construction to one `(cache_id, cache_region)` pair. Writes
/// become durable only after [`commit`](CacheAccess::commit); a rejected
/// write (read-only store, closed handle, disabled caching) is reported as
/// `Ok(false)` from [`put`](CacheAccess::put), not as an error.
#[async_trait]
pub trait CacheAccess: Send + Sync {
    fn cache_id(&self) -> &str;

    fn cache_region(&self) -> &str;

    /// Reads the value stored for `key`, if any.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`. Returns whether the write was accepted;
    /// callers must check the result.
    async fn put(&self, key: &[u8], value: &[u8]) -> Result<bool>;

    /// Makes pending writes durable.
    async fn commit(&self) -> Result<()>;

    fn is_read_only(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Releases the handle. Later writes report failure.
    async fn close(&self);
}

/// Access handle that caches nothing.
///
/// Returned by [`CacheService::get_cache_access`](crate::CacheService::get_cache_access)
/// when caching is disabled for the process: `get` never finds anything and
/// `put` always reports failure.
pub struct NoOpCacheAccess {
    cache_id: String,
    cache_region: String,
}

impl NoOpCacheAccess {
    pub fn new(cache_id: impl Into<String>, cache_region: impl Into<String>) -> Self {
        Self {
            cache_id: cache_id.into(),
            cache_region: cache_region.into(),
        }
    }
}

#[async_trait]
impl CacheAccess for NoOpCacheAccess {
    fn cache_id(&self) -> &str {
        &self.cache_id
    }

    fn cache_region(&self) -> &str {
        &self.cache_region
    }

    async fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(None)
    }

    async fn put(&self, _key: &[u8], _value: &[u8]) -> Result<bool> {
        Ok(false)
    }

    async fn commit(&self) -> Result<()> {
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn is_closed(&self) -> bool {
        false
    }

    async fn close(&self) {}
}
