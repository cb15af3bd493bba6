//! Client configuration options.

/// Options for connecting to a cachekit server.
///
/// # Example
///
/// ```rust
/// use cachekit_client::ClientOptions;
///
/// let options = ClientOptions::new("cache.internal", 9552)
///     .with_mem_cache_size(1000);
/// ```
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Cache server host name or address
    pub host: String,

    /// Cache server port
    pub port: u16,

    /// Capacity of the client-side read cache; zero disables it
    pub mem_cache_size: u64,
}

impl ClientOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            mem_cache_size: 100,
        }
    }

    /// Sets the capacity of the local read cache. Zero disables local
    /// caching so that every `get` reaches the server.
    pub fn with_mem_cache_size(mut self, size: u64) -> Self {
        self.mem_cache_size = size;
        self
    }

    /// Creates options from environment variables.
    ///
    /// Reads:
    /// - `CACHEKIT_SERVER_HOST` - server host (defaults to "127.0.0.1")
    /// - `CACHEKIT_SERVER_PORT` - server port (defaults to 9552)
    pub fn from_env() -> Self {
        let host =
            std::env::var("CACHEKIT_SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("CACHEKIT_SERVER_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(9552);
        Self::new(host, port)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new("127.0.0.1", 9552)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.host, "127.0.0.1");
        assert_eq!(options.port, 9552);
        assert_eq!(options.mem_cache_size, 100);
    }

    #[test]
    fn test_builder_chaining() {
        let options = ClientOptions::new("cache.internal", 1234).with_mem_cache_size(0);
        assert_eq!(options.host, "cache.internal");
        assert_eq!(options.port, 1234);
        assert_eq!(options.mem_cache_size, 0);
    }
}
