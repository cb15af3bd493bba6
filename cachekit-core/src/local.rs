//! Cache access bound to a locally owned, file-backed store.

use crate::access::CacheAccess;
use crate::error::{CacheError, Result};
use crate::service::CacheService;
use crate::settings::{MapSettings, Persistence};
use crate::store::{MemRegion, Region};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Two-tier access to one region of a local backing store: an optional
/// size-bounded in-memory map in front of the persistent region, or the
/// persistent region alone.
///
/// Writes land in the memory tier when one is configured; entries evicted
/// from it overflow into the persistent region, and
/// [`commit`](CacheAccess::commit) flushes everything still memory-resident
/// before committing the store itself. Against a read-only store the tier
/// is a plain read cache, writes report failure and commit is a logged
/// no-op.
pub struct LocalFileCacheAccess {
    cache_id: String,
    cache_region: String,
    service: Arc<CacheService>,
    store_path: PathBuf,
    read_only: bool,
    /// `None` once the access is closed; both region handles are released
    /// at that point.
    tiers: RwLock<Option<Tiers>>,
}

struct Tiers {
    region: Region,
    mem_tier: Option<Arc<MemRegion>>,
}

impl LocalFileCacheAccess {
    pub fn new(
        service: Arc<CacheService>,
        cache_id: &str,
        cache_region: &str,
        settings: MapSettings,
    ) -> Result<Self> {
        let cache_dir = service
            .config()
            .local_cache_dir()
            .ok_or_else(|| {
                CacheError::Configuration(
                    "local cache type configured without a cache directory".to_string(),
                )
            })?
            .to_path_buf();
        std::fs::create_dir_all(&cache_dir)?;
        let store_path = cache_dir.join(cache_id);

        if settings.mem_cache_size == 0 && settings.persistence == Persistence::Memory {
            tracing::warn!(
                "Cache {cache_id}, region {cache_region} has neither a persistent store nor an \
                 in-memory tier; nothing will be cached durably. This is likely a misconfiguration."
            );
        }

        let region = service.get_cache(&store_path, cache_region, &settings)?;
        let read_only = region.is_read_only();
        let mem_tier = (settings.mem_cache_size > 0).then(|| {
            // A read-only region cannot absorb evicted entries; the tier
            // then only serves reads.
            let overflow = (!read_only).then(|| region.clone());
            Arc::new(MemRegion::tier(&settings, overflow))
        });
        if let (Some(mem), false) = (&mem_tier, read_only) {
            service.register_tier(Arc::downgrade(mem), region.clone());
        }

        Ok(Self {
            cache_id: cache_id.to_string(),
            cache_region: cache_region.to_string(),
            service,
            store_path,
            read_only,
            tiers: RwLock::new(Some(Tiers { region, mem_tier })),
        })
    }
}

#[async_trait]
impl CacheAccess for LocalFileCacheAccess {
    fn cache_id(&self) -> &str {
        &self.cache_id
    }

    fn cache_region(&self) -> &str {
        &self.cache_region
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let guard = self.tiers.read().unwrap_or_else(|e| e.into_inner());
        let Some(tiers) = guard.as_ref() else {
            return Ok(None);
        };
        match &tiers.mem_tier {
            Some(mem) => {
                if let Some(value) = mem.get(key) {
                    return Ok(Some(value));
                }
                let value = tiers.region.get(key)?;
                if let Some(ref v) = value {
                    mem.insert(key.to_vec(), v.clone());
                }
                Ok(value)
            }
            None => tiers.region.get(key),
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        let guard = self.tiers.read().unwrap_or_else(|e| e.into_inner());
        let Some(tiers) = guard.as_ref() else {
            tracing::debug!(
                "Could not write value to cache {} because the access is closed.",
                self.store_path.display()
            );
            return Ok(false);
        };
        if self.read_only {
            tracing::debug!(
                "Could not write value to cache {} because it is read-only.",
                self.store_path.display()
            );
            return Ok(false);
        }
        match &tiers.mem_tier {
            Some(mem) => mem.insert(key.to_vec(), value.to_vec()),
            None => tiers.region.put(key, value)?,
        }
        Ok(true)
    }

    async fn commit(&self) -> Result<()> {
        if self.read_only {
            tracing::debug!(
                "Cannot commit cache {} because it is read-only.",
                self.store_path.display()
            );
            return Ok(());
        }
        {
            let guard = self.tiers.read().unwrap_or_else(|e| e.into_inner());
            if let Some(tiers) = guard.as_ref() {
                if let Some(mem) = &tiers.mem_tier {
                    mem.flush_into(&tiers.region)?;
                }
            }
        }
        self.service.commit_cache(&self.store_path)
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn is_closed(&self) -> bool {
        self.tiers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_none()
    }

    /// Releases both the memory tier and the persistent region handle.
    /// Later writes report failure and later reads find nothing.
    async fn close(&self) {
        let mut guard = self.tiers.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}
