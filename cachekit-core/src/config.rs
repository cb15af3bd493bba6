//! Deployment configuration for the cache access layer.

use crate::error::CacheError;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable toggling caching for the whole process.
///
/// Unset or any value other than `false` means caching is enabled. When set
/// to `false`, every access obtained from
/// [`CacheService::get_cache_access`](crate::CacheService::get_cache_access)
/// is a no-op handle: `get` always returns nothing and `put` always reports
/// failure, regardless of the configured cache type.
pub const CACHING_ENABLED_VAR: &str = "CACHEKIT_CACHING_ENABLED";

/// Whether caching is enabled for this process.
pub fn caching_enabled() -> bool {
    std::env::var(CACHING_ENABLED_VAR)
        .map(|v| !v.trim().eq_ignore_ascii_case("false"))
        .unwrap_or(true)
}

/// Where cached data lives: in a locally owned store or behind a remote
/// cache server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheType {
    Local,
    Remote,
}

impl FromStr for CacheType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(CacheType::Local),
            "remote" => Ok(CacheType::Remote),
            other => Err(CacheError::Configuration(format!(
                "unknown cache type '{other}'"
            ))),
        }
    }
}

/// Immutable description of a cache deployment.
///
/// # Example
///
/// ```rust
/// use cachekit_core::CacheConfig;
///
/// let local = CacheConfig::local("/var/cache/app", false);
/// let remote = CacheConfig::remote("cache.internal", 9552);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    cache_type: CacheType,
    local_cache_dir: Option<PathBuf>,
    remote_host: Option<String>,
    remote_port: u16,
    read_only: bool,
}

impl CacheConfig {
    /// Configuration for a locally owned, file-backed cache.
    ///
    /// With `read_only` set, any backing store directory that already exists
    /// when first opened is marked read-only for the process lifetime.
    pub fn local(cache_dir: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            cache_type: CacheType::Local,
            local_cache_dir: Some(cache_dir.into()),
            remote_host: None,
            remote_port: 0,
            read_only,
        }
    }

    /// Configuration for a cache hosted by a remote cache server.
    pub fn remote(host: impl Into<String>, port: u16) -> Self {
        Self {
            cache_type: CacheType::Remote,
            local_cache_dir: None,
            remote_host: Some(host.into()),
            remote_port: port,
            read_only: false,
        }
    }

    pub fn cache_type(&self) -> CacheType {
        self.cache_type
    }

    pub fn local_cache_dir(&self) -> Option<&Path> {
        self.local_cache_dir.as_deref()
    }

    pub fn remote_host(&self) -> Option<&str> {
        self.remote_host.as_deref()
    }

    pub fn remote_port(&self) -> u16 {
        self.remote_port
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}
