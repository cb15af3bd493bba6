//! Client-side proxy presenting the cache access contract over a network
//! connection to a cache server.

use crate::access::CacheAccess;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use cachekit_proto::{read_frame, write_frame, Encoding, Request, Response};
use moka::sync::Cache as BoundedCache;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Remote cache access: forwards `get`/`put`/`commit` over one persistent
/// socket connection to a cache server, with a bounded local read cache.
///
/// The connection is established lazily on the first call and
/// re-established on the next call after any transport failure. The payload
/// encoding names travel on every request, so one connection can be reused
/// by callers addressing different regions with different value types.
pub struct RemoteCacheAccess {
    cache_id: String,
    cache_region: String,
    key_encoding: Encoding,
    value_encoding: Encoding,
    host: String,
    port: u16,
    connection: Mutex<Option<TcpStream>>,
    mem_cache: Option<BoundedCache<Vec<u8>, Vec<u8>>>,
    closed: AtomicBool,
}

impl RemoteCacheAccess {
    pub fn new(
        cache_id: &str,
        cache_region: &str,
        key_encoding: Encoding,
        value_encoding: Encoding,
        host: &str,
        port: u16,
        mem_cache_size: u64,
    ) -> Self {
        let mem_cache =
            (mem_cache_size > 0).then(|| BoundedCache::builder().max_capacity(mem_cache_size).build());
        Self {
            cache_id: cache_id.to_string(),
            cache_region: cache_region.to_string(),
            key_encoding,
            value_encoding,
            host: host.to_string(),
            port,
            connection: Mutex::new(None),
            mem_cache,
            closed: AtomicBool::new(false),
        }
    }

    async fn connected<'a>(
        &self,
        guard: &'a mut Option<TcpStream>,
    ) -> Result<&'a mut TcpStream> {
        if guard.is_none() {
            tracing::debug!(
                "Establishing new connection to cache server at {}:{} for cache {} and region {}",
                self.host,
                self.port,
                self.cache_id,
                self.cache_region
            );
            let stream = TcpStream::connect((self.host.as_str(), self.port))
                .await
                .map_err(|e| {
                    CacheError::Connection(format!(
                        "could not connect to cache server at {}:{}: {e}",
                        self.host, self.port
                    ))
                })?;
            *guard = Some(stream);
        }
        guard
            .as_mut()
            .ok_or_else(|| CacheError::Connection("connection unavailable".to_string()))
    }

    async fn round_trip(&self, stream: &mut TcpStream, request: &Request) -> Result<Response> {
        write_frame(stream, request).await?;
        match read_frame(stream).await? {
            Some(response) => Ok(response),
            None => Err(CacheError::Connection(format!(
                "cache server at {}:{} closed the connection",
                self.host, self.port
            ))),
        }
    }
}

#[async_trait]
impl CacheAccess for RemoteCacheAccess {
    fn cache_id(&self) -> &str {
        &self.cache_id
    }

    fn cache_region(&self) -> &str {
        &self.cache_region
    }

    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }
        if let Some(mem) = &self.mem_cache {
            if let Some(value) = mem.get(key) {
                return Ok(Some(value));
            }
        }
        let mut guard = self.connection.lock().await;
        let stream = self.connected(&mut guard).await?;
        let request = Request::get(
            &self.cache_id,
            &self.cache_region,
            self.key_encoding,
            self.value_encoding,
            key.to_vec(),
        );
        match self.round_trip(stream, &request).await {
            Ok(Response::Value(value)) => {
                if let (Some(mem), Some(v)) = (&self.mem_cache, &value) {
                    mem.insert(key.to_vec(), v.clone());
                }
                Ok(value)
            }
            Ok(Response::Failure { message }) => {
                // The server tears its side down after a failure reply
                *guard = None;
                Err(CacheError::Remote(message))
            }
            Ok(Response::Ok) => {
                *guard = None;
                Err(CacheError::Remote(
                    "unexpected acknowledgment for a get request".to_string(),
                ))
            }
            Err(e) => {
                tracing::debug!(
                    "Closing connection to {}:{} for cache {} and region {} after a failed get: {e}",
                    self.host,
                    self.port,
                    self.cache_id,
                    self.cache_region
                );
                *guard = None;
                Err(e)
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<bool> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(false);
        }
        if let Some(mem) = &self.mem_cache {
            mem.insert(key.to_vec(), value.to_vec());
        }
        let mut guard = self.connection.lock().await;
        let stream = match self.connected(&mut guard).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Could not put data into the remote cache: {e}");
                return Ok(false);
            }
        };
        let request = Request::put(
            &self.cache_id,
            &self.cache_region,
            self.key_encoding,
            self.value_encoding,
            key.to_vec(),
            value.to_vec(),
        );
        match self.round_trip(stream, &request).await {
            Ok(Response::Ok) => Ok(true),
            Ok(Response::Failure { message }) => {
                tracing::error!("Could not put data into the remote cache: {message}");
                *guard = None;
                Ok(false)
            }
            Ok(Response::Value(_)) => {
                tracing::error!("Unexpected value reply for a put request");
                *guard = None;
                Ok(false)
            }
            Err(e) => {
                tracing::error!("Could not put data into the remote cache: {e}");
                *guard = None;
                Ok(false)
            }
        }
    }

    /// Signals the server to commit all of its caches and terminates the
    /// session. Server-side commit is global, not per-region, so this is
    /// the one operation that closes the connection rather than keeping it
    /// open; the next call reconnects lazily.
    async fn commit(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        match self.connected(&mut guard).await {
            Ok(stream) => {
                let request = Request::commit_all(
                    &self.cache_id,
                    &self.cache_region,
                    self.key_encoding,
                    self.value_encoding,
                );
                if let Err(e) = write_frame(stream, &request).await {
                    tracing::debug!(
                        "Closing connection to {}:{} for cache {} and region {} after a failed commit: {e}",
                        self.host,
                        self.port,
                        self.cache_id,
                        self.cache_region
                    );
                }
            }
            Err(e) => {
                tracing::debug!("Could not reach the cache server for commit: {e}");
            }
        }
        *guard = None;
        Ok(())
    }

    /// Always writable from the client's point of view; the server enforces
    /// read-only policy, if any, by rejecting writes.
    fn is_read_only(&self) -> bool {
        false
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        *self.connection.lock().await = None;
    }
}
