//! The process-wide disable flag must force no-op accesses regardless of
//! the configured cache type. Runs as its own test binary because it
//! mutates the process environment.

use cachekit_core::{CacheConfig, CacheService, Encoding, MapSettings, CACHING_ENABLED_VAR};
use tempfile::TempDir;

#[tokio::test]
async fn test_disabled_caching_yields_noop_access() {
    std::env::set_var(CACHING_ENABLED_VAR, "false");

    let dir = TempDir::new().unwrap();
    let service = CacheService::new(CacheConfig::local(dir.path(), false));
    let cache = service
        .get_cache_access(
            "testcache",
            "regionA",
            Encoding::String,
            Encoding::String,
            MapSettings::default(),
        )
        .unwrap();

    assert!(!cache.put(b"key1", b"value1").await.unwrap());
    assert!(cache.get(b"key1").await.unwrap().is_none());
    cache.commit().await.unwrap();

    // Nothing was created on disk
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
