//! The per-process authority for opening, sharing and committing backing
//! stores.

use crate::access::{CacheAccess, NoOpCacheAccess};
use crate::config::{caching_enabled, CacheConfig, CacheType};
use crate::error::{CacheError, Result};
use crate::local::LocalFileCacheAccess;
use crate::remote::RemoteCacheAccess;
use crate::settings::{MapSettings, Persistence};
use crate::store::{DiskStore, MemRegion, MemoryStore, Region};
use cachekit_proto::Encoding;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

/// Single authority for the backing stores of one process.
///
/// Owns the canonical-path registry of open stores and the read-only marker
/// set. Create one per embedding application (or per cache server process)
/// and share it as an `Arc`; every cache access handle is obtained through
/// [`CacheService::get_cache_access`].
///
/// # Example
///
/// ```rust,no_run
/// use cachekit_core::{CacheConfig, CacheService, Encoding, MapSettings};
///
/// # async fn example() -> cachekit_core::Result<()> {
/// let service = CacheService::new(CacheConfig::local("/var/cache/app", false));
/// let users = service.get_cache_access(
///     "appcache",
///     "users",
///     Encoding::String,
///     Encoding::Json,
///     MapSettings::default(),
/// )?;
/// users.put(b"user1", b"\"alice\"").await?;
/// users.commit().await?;
/// # Ok(())
/// # }
/// ```
pub struct CacheService {
    config: CacheConfig,
    disk_stores: DashMap<PathBuf, Arc<DiskStore>>,
    mem_stores: DashMap<String, Arc<MemoryStore>>,
    read_only_paths: DashSet<PathBuf>,
    /// Live in-memory tiers and their backing regions, held weakly so a
    /// dropped access does not linger. Service-wide commits flush these
    /// before flushing the stores.
    tiers: Mutex<Vec<(Weak<MemRegion>, Region)>>,
}

impl CacheService {
    pub fn new(config: CacheConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            disk_stores: DashMap::new(),
            mem_stores: DashMap::new(),
            read_only_paths: DashSet::new(),
            tiers: Mutex::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Constructs the access handle for one cache region, appropriate to
    /// the configured cache type.
    ///
    /// When caching is disabled via [`CACHING_ENABLED_VAR`][crate::CACHING_ENABLED_VAR],
    /// a no-op handle is returned regardless of the configuration. The
    /// encoding names describe the payload bytes; they travel with every
    /// remote request and let typed callers interpret stored values.
    pub fn get_cache_access(
        self: &Arc<Self>,
        cache_id: &str,
        cache_region: &str,
        key_encoding: Encoding,
        value_encoding: Encoding,
        settings: MapSettings,
    ) -> Result<Arc<dyn CacheAccess>> {
        if !caching_enabled() {
            tracing::debug!(
                "Caching is disabled; returning a no-op access for cache {cache_id}, region {cache_region}"
            );
            return Ok(Arc::new(NoOpCacheAccess::new(cache_id, cache_region)));
        }
        match self.config.cache_type() {
            CacheType::Local => Ok(Arc::new(LocalFileCacheAccess::new(
                Arc::clone(self),
                cache_id,
                cache_region,
                settings,
            )?)),
            CacheType::Remote => {
                let host = self.config.remote_host().ok_or_else(|| {
                    CacheError::Configuration(
                        "remote cache type configured without a server host".to_string(),
                    )
                })?;
                Ok(Arc::new(RemoteCacheAccess::new(
                    cache_id,
                    cache_region,
                    key_encoding,
                    value_encoding,
                    host,
                    self.config.remote_port(),
                    settings.mem_cache_size,
                )))
            }
        }
    }

    /// Resolves or lazily creates the backing store at `store_path` and the
    /// named region within it.
    ///
    /// Used by the local access handles and by the cache server on behalf
    /// of remote clients.
    pub fn get_cache(
        &self,
        store_path: &Path,
        region: &str,
        settings: &MapSettings,
    ) -> Result<Region> {
        match settings.persistence {
            Persistence::Memory => {
                let name = store_name(store_path)?;
                let store = self
                    .mem_stores
                    .entry(name)
                    .or_insert_with(|| Arc::new(MemoryStore::new()))
                    .clone();
                Ok(store.ensure_region(region, settings))
            }
            Persistence::Disk => {
                let store = self.disk_store(store_path)?;
                store.ensure_region(region, settings)?;
                Ok(Region::disk(store, region.to_string()))
            }
        }
    }

    /// Resolves the open store for a canonical path, opening it on first
    /// use. Concurrent callers for the same path receive the same handle.
    fn disk_store(&self, store_path: &Path) -> Result<Arc<DiskStore>> {
        let canonical = canonical_store_path(store_path)?;
        if let Some(store) = self.disk_stores.get(&canonical) {
            return Ok(Arc::clone(&store));
        }
        match self.disk_stores.entry(canonical.clone()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                // First opener wins: a directory that already exists under a
                // read-only configuration is marked read-only for the whole
                // process, whatever later callers request.
                let read_only = self.read_only_paths.contains(&canonical)
                    || (self.config.cache_type() == CacheType::Local
                        && self.config.is_read_only()
                        && canonical.exists());
                if read_only {
                    self.read_only_paths.insert(canonical.clone());
                }
                let store = Arc::new(DiskStore::open(&canonical, read_only)?);
                entry.insert(Arc::clone(&store));
                Ok(store)
            }
        }
    }

    /// Whether the backing store at `store_path` is marked read-only.
    pub fn is_path_read_only(&self, store_path: &Path) -> bool {
        canonical_store_path(store_path)
            .map(|p| self.read_only_paths.contains(&p))
            .unwrap_or(false)
    }

    /// Commits pending writes of the store at `store_path`; a logged no-op
    /// when the path is read-only or the store was never opened.
    pub fn commit_cache(&self, store_path: &Path) -> Result<()> {
        let canonical = canonical_store_path(store_path)?;
        if self.read_only_paths.contains(&canonical) {
            tracing::debug!(
                "Cannot commit cache {} because it is read-only.",
                canonical.display()
            );
            return Ok(());
        }
        if let Some(store) = self.disk_stores.get(&canonical) {
            store.flush()?;
        }
        Ok(())
    }

    /// Registers a live in-memory tier so that service-wide commits can
    /// flush it into its backing region.
    pub(crate) fn register_tier(&self, tier: Weak<MemRegion>, region: Region) {
        let mut tiers = self.tiers.lock().unwrap_or_else(|e| e.into_inner());
        tiers.retain(|(t, _)| t.strong_count() > 0);
        tiers.push((tier, region));
    }

    /// Commits every cache the service is aware of at this moment: flushes
    /// each live in-memory tier into its backing region, then flushes every
    /// writable open store. A snapshot, not a barrier: accesses and stores
    /// created by concurrently running requests afterwards are not waited
    /// for.
    pub fn commit_all_caches(&self) {
        let tiers: Vec<(Arc<MemRegion>, Region)> = {
            let mut registered = self.tiers.lock().unwrap_or_else(|e| e.into_inner());
            registered.retain(|(t, _)| t.strong_count() > 0);
            registered
                .iter()
                .filter_map(|(t, region)| t.upgrade().map(|t| (t, region.clone())))
                .collect()
        };
        for (tier, region) in tiers {
            if region.is_read_only() {
                continue;
            }
            if let Err(e) = tier.flush_into(&region) {
                tracing::error!("Could not flush an in-memory tier during commit: {e}");
            }
        }
        let stores: Vec<Arc<DiskStore>> = self
            .disk_stores
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for store in stores {
            if store.is_read_only() {
                continue;
            }
            if let Err(e) = store.flush() {
                tracing::error!("Could not commit cache at {}: {e}", store.path().display());
            }
        }
    }

    /// Drops every open store handle and forgets registered tiers.
    /// Outstanding region handles keep their store alive until they are
    /// dropped as well.
    pub fn close_all(&self) {
        self.tiers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.disk_stores.clear();
        self.mem_stores.clear();
    }
}

/// Canonicalizes a store path that may not exist yet: an existing path is
/// resolved directly, otherwise the parent directory is resolved and the
/// final component appended.
fn canonical_store_path(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.canonicalize()?);
    }
    let file_name = path.file_name().ok_or_else(|| {
        CacheError::Configuration(format!("invalid store path '{}'", path.display()))
    })?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Ok(parent.canonicalize()?.join(file_name))
}

fn store_name(store_path: &Path) -> Result<String> {
    store_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CacheError::Configuration(format!("invalid store path '{}'", store_path.display()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_same_path_resolves_to_same_store() {
        let dir = TempDir::new().unwrap();
        let service = CacheService::new(CacheConfig::local(dir.path(), false));
        let path = dir.path().join("store");

        let first = service.disk_store(&path).unwrap();
        let second = service.disk_store(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_fresh_directory_is_writable_despite_read_only_config() {
        let dir = TempDir::new().unwrap();
        let service = CacheService::new(CacheConfig::local(dir.path(), true));
        let path = dir.path().join("newstore");

        // The store did not exist before, so read-only does not apply.
        let store = service.disk_store(&path).unwrap();
        assert!(!store.is_read_only());
        assert!(!service.is_path_read_only(&path));
    }

    #[test]
    fn test_existing_directory_marked_read_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            let service = CacheService::new(CacheConfig::local(dir.path(), false));
            let region = service
                .get_cache(&path, "regionA", &MapSettings::default())
                .unwrap();
            region.put(b"key1", b"value1").unwrap();
            service.commit_cache(&path).unwrap();
            service.close_all();
        }

        let service = CacheService::new(CacheConfig::local(dir.path(), true));
        let region = service
            .get_cache(&path, "regionA", &MapSettings::default())
            .unwrap();
        assert!(service.is_path_read_only(&path));
        assert!(region.is_read_only());
        assert_eq!(region.get(b"key1").unwrap().as_deref(), Some(b"value1".as_slice()));
        assert!(region.put(b"key2", b"value2").is_err());
        // Committing a read-only path is a logged no-op, not an error
        service.commit_cache(&path).unwrap();
    }

    #[test]
    fn test_memory_persistence_region() {
        let dir = TempDir::new().unwrap();
        let service = CacheService::new(CacheConfig::local(dir.path(), false));
        let settings = MapSettings::default()
            .with_persistence(Persistence::Memory)
            .with_max_size(16);

        let region = service
            .get_cache(&dir.path().join("memstore"), "regionA", &settings)
            .unwrap();
        region.put(b"key", b"value").unwrap();
        assert_eq!(region.get(b"key").unwrap().as_deref(), Some(b"value".as_slice()));
        // Nothing was written to disk
        assert!(!dir.path().join("memstore").exists());
    }
}
