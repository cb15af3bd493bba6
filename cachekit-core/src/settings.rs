//! Typed settings controlling how a cache region is created.

use std::time::Duration;

/// Map implementation behind a region.
///
/// Both kinds store bytes against bytes; the kind selects the access
/// pattern the backing store is tuned for. `Hash` optimizes point lookups,
/// `Ordered` keeps keys in sorted order for range-friendly workloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Hash,
    Ordered,
}

/// Persistence medium of a region's backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Durable, file-resident store
    Disk,
    /// Process-memory store, lost on shutdown
    Memory,
}

/// Settings bag applied when a cache region is created or opened.
///
/// Size and expiry settings parametrize memory-resident regions (including
/// the in-memory tier in front of a persistent region); disk regions
/// delegate space management to the storage engine.
///
/// # Example
///
/// ```rust
/// use cachekit_core::{MapKind, MapSettings};
/// use std::time::Duration;
///
/// let settings = MapSettings::default()
///     .with_map_kind(MapKind::Ordered)
///     .with_mem_cache_size(1000)
///     .with_expire_after_create(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct MapSettings {
    /// Map implementation (default: hash)
    pub map_kind: MapKind,
    /// Persistence medium (default: disk)
    pub persistence: Persistence,
    /// Entry capacity of the in-memory tier fronting a persistent region;
    /// zero disables the tier (default: 100)
    pub mem_cache_size: u64,
    /// Maximum entry count of a memory region
    pub max_size: Option<u64>,
    /// Maximum total bytes (keys plus values) of a memory region; takes
    /// precedence over `max_size` when both are set
    pub max_store_bytes: Option<u64>,
    /// Evict entries this long after creation
    pub expire_after_create: Option<Duration>,
    /// Evict entries this long after the last read
    pub expire_after_get: Option<Duration>,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            map_kind: MapKind::Hash,
            persistence: Persistence::Disk,
            mem_cache_size: 100,
            max_size: None,
            max_store_bytes: None,
            expire_after_create: None,
            expire_after_get: None,
        }
    }
}

impl MapSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map_kind(mut self, kind: MapKind) -> Self {
        self.map_kind = kind;
        self
    }

    pub fn with_persistence(mut self, persistence: Persistence) -> Self {
        self.persistence = persistence;
        self
    }

    /// Sets the capacity of the in-memory tier. Zero disables the tier so
    /// that reads and writes go to the persistent region directly.
    pub fn with_mem_cache_size(mut self, size: u64) -> Self {
        self.mem_cache_size = size;
        self
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_max_store_bytes(mut self, max_bytes: u64) -> Self {
        self.max_store_bytes = Some(max_bytes);
        self
    }

    pub fn with_expire_after_create(mut self, ttl: Duration) -> Self {
        self.expire_after_create = Some(ttl);
        self
    }

    pub fn with_expire_after_get(mut self, tti: Duration) -> Self {
        self.expire_after_get = Some(tti);
        self
    }
}
