//! Error types for the cache access layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while configuring or using a cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid or incomplete cache configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The connection to a remote cache server could not be opened or used
    #[error("connection error: {0}")]
    Connection(String),

    /// Filesystem failure while resolving or preparing a cache path
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persistent backing store failed
    #[error("storage error: {0}")]
    Storage(#[from] rocksdb::Error),

    /// Wire protocol failure on the remote path
    #[error("protocol error: {0}")]
    Protocol(#[from] cachekit_proto::ProtocolError),

    /// The server reported a failure for a remote request
    #[error("remote failure: {0}")]
    Remote(String),

    /// A write was attempted against a read-only backing store
    #[error("backing store at {0} is read-only")]
    ReadOnly(PathBuf),
}

pub type Result<T> = std::result::Result<T, CacheError>;
