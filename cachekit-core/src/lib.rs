//! # Cachekit Core
//!
//! A distributed persistent cache access layer: store and retrieve
//! key/value pairs in a locally owned, file-backed store, or in a remotely
//! hosted equivalent behind a [cache server](../cachekit_server/index.html),
//! with an optional in-memory tier in front of the persistent store.
//!
//! ## Concepts
//!
//! - A **backing store** is one durable store directory; at most one open
//!   handle exists per canonical path per process.
//! - A **region** is a named key/value namespace within a store; many
//!   regions can share one store.
//! - A [`CacheAccess`] is the per-region handle callers use: `get`, `put`,
//!   `commit`. It is local, remote or a no-op depending on configuration.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cachekit_core::{CacheConfig, CacheService, Encoding, MapSettings};
//!
//! #[tokio::main]
//! async fn main() -> cachekit_core::Result<()> {
//!     let service = CacheService::new(CacheConfig::local("/var/cache/app", false));
//!
//!     let cache = service.get_cache_access(
//!         "appcache",
//!         "users",
//!         Encoding::String,
//!         Encoding::String,
//!         MapSettings::default().with_mem_cache_size(1000),
//!     )?;
//!
//!     cache.put(b"user1", b"alice").await?;
//!     if let Some(value) = cache.get(b"user1").await? {
//!         println!("cached: {}", String::from_utf8_lossy(&value));
//!     }
//!     cache.commit().await?;
//!     Ok(())
//! }
//! ```

mod access;
mod config;
mod error;
mod local;
mod remote;
mod service;
mod settings;
mod store;

pub use access::{CacheAccess, NoOpCacheAccess};
pub use cachekit_proto::Encoding;
pub use config::{caching_enabled, CacheConfig, CacheType, CACHING_ENABLED_VAR};
pub use error::{CacheError, Result};
pub use local::LocalFileCacheAccess;
pub use remote::RemoteCacheAccess;
pub use service::CacheService;
pub use settings::{MapKind, MapSettings, Persistence};
pub use store::Region;
