//! Backing stores and region handles.
//!
//! A disk store is one RocksDB database directory holding any number of
//! regions, one column family per region. A memory store holds its regions
//! in bounded in-process maps. Region handles are cheap to clone and are
//! byte-oriented; typed encodings live above this layer.

use crate::error::{CacheError, Result};
use crate::settings::{MapKind, MapSettings};
use dashmap::DashMap;
use moka::notification::RemovalCause;
use moka::sync::Cache as BoundedCache;
use moka::sync::CacheBuilder;
use rocksdb::{DBWithThreadMode, MultiThreaded, Options};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

type Db = DBWithThreadMode<MultiThreaded>;

/// One open, file-resident backing store. At most one instance exists per
/// canonical path per process; the service registry enforces that.
pub(crate) struct DiskStore {
    db: Db,
    path: PathBuf,
    read_only: bool,
    /// Serializes lazy column family creation
    cf_lock: Mutex<()>,
}

impl DiskStore {
    /// Opens or creates the store at `path`. A read-only store is opened
    /// without write capability and never creates regions.
    pub fn open(path: &Path, read_only: bool) -> Result<Self> {
        let existing = Db::list_cf(&Options::default(), path).unwrap_or_default();
        let db = if read_only {
            Db::open_cf_for_read_only(&Options::default(), path, existing, false)?
        } else {
            let mut opts = Options::default();
            opts.create_if_missing(true);
            opts.create_missing_column_families(true);
            if existing.is_empty() {
                Db::open(&opts, path)?
            } else {
                Db::open_cf(&opts, path, existing)?
            }
        };
        Ok(Self {
            db,
            path: path.to_path_buf(),
            read_only,
            cf_lock: Mutex::new(()),
        })
    }

    /// Creates the region's column family if it does not exist yet.
    /// Read-only stores never create regions.
    pub fn ensure_region(&self, name: &str, settings: &MapSettings) -> Result<()> {
        if !self.read_only && self.db.cf_handle(name).is_none() {
            let _guard = self.cf_lock.lock().unwrap_or_else(|e| e.into_inner());
            if self.db.cf_handle(name).is_none() {
                let mut opts = Options::default();
                if settings.map_kind == MapKind::Hash {
                    opts.optimize_for_point_lookup(8);
                }
                self.db.create_cf(name, &opts)?;
            }
        }
        Ok(())
    }

    fn get(&self, region: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        // A region that was never created holds no entries; read-only
        // stores may legitimately lack regions a caller asks for.
        let Some(cf) = self.db.cf_handle(region) else {
            return Ok(None);
        };
        Ok(self.db.get_cf(&cf, key)?)
    }

    fn put(&self, region: &str, key: &[u8], value: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(CacheError::ReadOnly(self.path.clone()));
        }
        let cf = self
            .db
            .cf_handle(region)
            .ok_or_else(|| CacheError::Configuration(format!("unknown region '{region}'")))?;
        self.db.put_cf(&cf, key, value)?;
        Ok(())
    }

    /// Commits pending writes to stable storage.
    pub fn flush(&self) -> Result<()> {
        self.db.flush_wal(true)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A memory-resident backing store: named regions over bounded maps, lost
/// on process shutdown.
pub(crate) struct MemoryStore {
    regions: DashMap<String, MemRegion>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            regions: DashMap::new(),
        }
    }

    pub fn ensure_region(&self, name: &str, settings: &MapSettings) -> Region {
        if settings.map_kind == MapKind::Ordered && !self.regions.contains_key(name) {
            tracing::warn!(
                "Region {name} requests an ordered map with memory persistence; memory regions \
                 are hash-based and key order is not preserved."
            );
        }
        let region = self
            .regions
            .entry(name.to_string())
            .or_insert_with(|| MemRegion::from_settings(settings, None))
            .clone();
        Region {
            inner: RegionInner::Memory(region),
        }
    }
}

/// A bounded in-memory map, optionally wired to overflow evicted entries
/// into another region. Used both as memory-persistence regions and as the
/// in-memory tier in front of a persistent region.
#[derive(Clone)]
pub(crate) struct MemRegion {
    cache: BoundedCache<Vec<u8>, Vec<u8>>,
}

impl MemRegion {
    /// Builds a region from its settings. Capacity comes from
    /// `max_store_bytes` (weighed by entry size) or `max_size`; entries
    /// evicted by size or expiry flow into `overflow` when one is given.
    pub fn from_settings(settings: &MapSettings, overflow: Option<Region>) -> Self {
        let mut builder = BoundedCache::builder();
        if let Some(bytes) = settings.max_store_bytes {
            builder = builder
                .weigher(|key: &Vec<u8>, value: &Vec<u8>| (key.len() + value.len()) as u32)
                .max_capacity(bytes);
        } else if let Some(entries) = settings.max_size {
            builder = builder.max_capacity(entries);
        }
        Self {
            cache: Self::build(builder, settings, overflow),
        }
    }

    /// Builds the in-memory tier for a persistent region, bounded to
    /// `mem_cache_size` entries. With an overflow target, evicted entries
    /// flow into it; without one (read-only backing), evictions are
    /// silently dropped and the tier acts as a plain read cache.
    pub fn tier(settings: &MapSettings, overflow: Option<Region>) -> Self {
        let builder = BoundedCache::builder().max_capacity(settings.mem_cache_size);
        Self {
            cache: Self::build(builder, settings, overflow),
        }
    }

    fn build(
        mut builder: CacheBuilder<Vec<u8>, Vec<u8>, BoundedCache<Vec<u8>, Vec<u8>>>,
        settings: &MapSettings,
        overflow: Option<Region>,
    ) -> BoundedCache<Vec<u8>, Vec<u8>> {
        if let Some(ttl) = settings.expire_after_create {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = settings.expire_after_get {
            builder = builder.time_to_idle(tti);
        }
        if let Some(target) = overflow {
            builder = builder.eviction_listener(move |key, value, cause| {
                if matches!(cause, RemovalCause::Size | RemovalCause::Expired) {
                    if let Err(e) = target.put(&key, &value) {
                        tracing::error!(
                            "Could not overflow an evicted entry into the backing region: {e}"
                        );
                    }
                }
            });
        }
        builder.build()
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.cache.get(key)
    }

    pub fn insert(&self, key: Vec<u8>, value: Vec<u8>) {
        self.cache.insert(key, value);
        // Process evictions eagerly so overflow entries reach the backing
        // region before it is read or committed.
        self.cache.run_pending_tasks();
    }

    /// Writes every entry still resident in memory into `target` without
    /// evicting it.
    pub fn flush_into(&self, target: &Region) -> Result<()> {
        self.cache.run_pending_tasks();
        for (key, value) in self.cache.iter() {
            target.put(&key, &value)?;
        }
        Ok(())
    }
}

/// Handle to one named key/value namespace within a backing store.
#[derive(Clone)]
pub struct Region {
    inner: RegionInner,
}

#[derive(Clone)]
enum RegionInner {
    Disk { store: Arc<DiskStore>, name: String },
    Memory(MemRegion),
}

impl Region {
    pub(crate) fn disk(store: Arc<DiskStore>, name: String) -> Self {
        Self {
            inner: RegionInner::Disk { store, name },
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match &self.inner {
            RegionInner::Disk { store, name } => store.get(name, key),
            RegionInner::Memory(region) => Ok(region.get(key)),
        }
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        match &self.inner {
            RegionInner::Disk { store, name } => store.put(name, key, value),
            RegionInner::Memory(region) => {
                region.insert(key.to_vec(), value.to_vec());
                Ok(())
            }
        }
    }

    pub fn is_read_only(&self) -> bool {
        match &self.inner {
            RegionInner::Disk { store, .. } => store.is_read_only(),
            RegionInner::Memory(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn disk_region(store: &Arc<DiskStore>, name: &str) -> Region {
        store.ensure_region(name, &MapSettings::default()).unwrap();
        Region::disk(Arc::clone(store), name.to_string())
    }

    #[test]
    fn test_disk_region_put_get() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DiskStore::open(&dir.path().join("store"), false).unwrap());
        let region = disk_region(&store, "regionA");

        region.put(b"key1", b"value1").unwrap();
        assert_eq!(region.get(b"key1").unwrap().as_deref(), Some(b"value1".as_slice()));
        assert!(region.get(b"missing").unwrap().is_none());
    }

    #[test]
    fn test_regions_are_isolated() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DiskStore::open(&dir.path().join("store"), false).unwrap());
        let region_a = disk_region(&store, "regionA");
        let region_b = disk_region(&store, "regionB");

        region_a.put(b"key", b"a").unwrap();
        region_b.put(b"key", b"b").unwrap();
        assert_eq!(region_a.get(b"key").unwrap().as_deref(), Some(b"a".as_slice()));
        assert_eq!(region_b.get(b"key").unwrap().as_deref(), Some(b"b".as_slice()));
    }

    #[test]
    fn test_read_only_store_rejects_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            let store = Arc::new(DiskStore::open(&path, false).unwrap());
            let region = disk_region(&store, "regionA");
            region.put(b"key1", b"value1").unwrap();
            store.flush().unwrap();
        }

        let store = Arc::new(DiskStore::open(&path, true).unwrap());
        let region = disk_region(&store, "regionA");
        assert!(store.is_read_only());
        assert_eq!(region.get(b"key1").unwrap().as_deref(), Some(b"value1".as_slice()));
        assert!(matches!(
            region.put(b"key2", b"value2"),
            Err(CacheError::ReadOnly(_))
        ));
    }

    #[test]
    fn test_read_only_store_without_region_reads_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store");
        {
            let store = Arc::new(DiskStore::open(&path, false).unwrap());
            store.flush().unwrap();
        }

        let store = Arc::new(DiskStore::open(&path, true).unwrap());
        let region = disk_region(&store, "neverCreated");
        assert!(region.get(b"key").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_regions() {
        let store = MemoryStore::new();
        let settings = MapSettings::default().with_max_size(10);
        let region = store.ensure_region("regionA", &settings);

        region.put(b"key", b"value").unwrap();
        assert_eq!(region.get(b"key").unwrap().as_deref(), Some(b"value".as_slice()));
        assert!(!region.is_read_only());

        // Same name resolves to the same region
        let again = store.ensure_region("regionA", &settings);
        assert_eq!(again.get(b"key").unwrap().as_deref(), Some(b"value".as_slice()));
    }

    #[test]
    fn test_ordered_memory_region_degrades_to_hash() {
        let store = MemoryStore::new();
        let settings = MapSettings::default()
            .with_map_kind(MapKind::Ordered)
            .with_max_size(10);

        // The ordered kind is not available in memory; the region still
        // serves as a hash map (with a logged warning).
        let region = store.ensure_region("ordered", &settings);
        region.put(b"key", b"value").unwrap();
        assert_eq!(region.get(b"key").unwrap().as_deref(), Some(b"value".as_slice()));
    }

    #[test]
    fn test_mem_region_overflows_into_backing_region() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DiskStore::open(&dir.path().join("store"), false).unwrap());
        let backing = disk_region(&store, "regionA");

        let settings = MapSettings::default().with_mem_cache_size(2);
        let tier = MemRegion::tier(&settings, Some(backing.clone()));
        for i in 0..20u32 {
            tier.insert(format!("key{i}").into_bytes(), format!("val{i}").into_bytes());
        }
        tier.flush_into(&backing).unwrap();

        for i in 0..20u32 {
            let key = format!("key{i}").into_bytes();
            assert_eq!(
                backing.get(&key).unwrap(),
                Some(format!("val{i}").into_bytes()),
                "entry {i} was lost"
            );
        }
    }
}
