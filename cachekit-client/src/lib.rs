//! # Cachekit Client
//!
//! A high-level client for a remote cachekit cache server.
//!
//! This crate wraps the low-level remote cache access from
//! [`cachekit_core`] with an ergonomic, typed API: string helpers, and
//! serde-typed JSON helpers behind the `json` feature.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cachekit_client::{CacheClient, ClientOptions};
//! use cachekit_core::Encoding;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cachekit_client::Error> {
//!     let options = ClientOptions::new("127.0.0.1", 9552);
//!     let users = CacheClient::for_region(
//!         &options,
//!         "appcache",
//!         "users",
//!         Encoding::String,
//!         Encoding::String,
//!     );
//!
//!     users.put_string("user1", "alice").await?;
//!     if let Some(value) = users.get_string("user1").await? {
//!         println!("cached: {value}");
//!     }
//!     users.commit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## JSON values (requires the `json` feature)
//!
//! ```rust,no_run
//! use cachekit_client::{CacheClient, ClientOptions};
//! use cachekit_core::Encoding;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! # async fn example() -> Result<(), cachekit_client::Error> {
//! let options = ClientOptions::default();
//! let users = CacheClient::for_region(
//!     &options, "appcache", "users", Encoding::String, Encoding::Json,
//! );
//!
//! let user = User { name: "Alice".into(), age: 30 };
//! users.put_json("user:1", &user).await?;
//! let retrieved: Option<User> = users.get_json("user:1").await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod options;

pub use error::Error;
pub use options::ClientOptions;

use cachekit_core::{CacheAccess, Encoding, RemoteCacheAccess};

/// A client handle for one cache region on a remote cachekit server.
///
/// Holds one lazily-established connection; transport failures are
/// recovered by reconnecting on the next call. Cloning is not needed:
/// create one client per region use-site.
pub struct CacheClient {
    access: RemoteCacheAccess,
}

impl CacheClient {
    /// Creates a client bound to one `(cache_id, cache_region)` pair.
    ///
    /// No connection is opened until the first call.
    pub fn for_region(
        options: &ClientOptions,
        cache_id: &str,
        cache_region: &str,
        key_encoding: Encoding,
        value_encoding: Encoding,
    ) -> Self {
        Self {
            access: RemoteCacheAccess::new(
                cache_id,
                cache_region,
                key_encoding,
                value_encoding,
                &options.host,
                options.port,
                options.mem_cache_size,
            ),
        }
    }

    /// Reads the raw value stored for `key`, if any.
    pub async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.access.get(key).await?)
    }

    /// Stores a raw value. Returns whether the server accepted the write.
    pub async fn put(&self, key: &[u8], value: &[u8]) -> Result<bool, Error> {
        Ok(self.access.put(key, value).await?)
    }

    /// Reads a UTF-8 string value stored for `key`, if any.
    pub async fn get_string(&self, key: &str) -> Result<Option<String>, Error> {
        match self.access.get(key.as_bytes()).await? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes)?)),
            None => Ok(None),
        }
    }

    /// Stores a UTF-8 string value.
    pub async fn put_string(&self, key: &str, value: &str) -> Result<bool, Error> {
        Ok(self.access.put(key.as_bytes(), value.as_bytes()).await?)
    }

    /// Reads and deserializes a JSON value stored for `key`, if any.
    #[cfg(feature = "json")]
    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, Error> {
        match self.access.get(key.as_bytes()).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(Error::Deserialization),
            None => Ok(None),
        }
    }

    /// Serializes and stores a value as JSON.
    #[cfg(feature = "json")]
    pub async fn put_json<T: serde::Serialize>(&self, key: &str, value: &T) -> Result<bool, Error> {
        let bytes = serde_json::to_vec(value).map_err(Error::Serialization)?;
        Ok(self.access.put(key.as_bytes(), &bytes).await?)
    }

    /// Asks the server to commit all of its caches and terminates the
    /// session; the next call reconnects lazily.
    pub async fn commit(&self) -> Result<(), Error> {
        Ok(self.access.commit().await?)
    }
}
