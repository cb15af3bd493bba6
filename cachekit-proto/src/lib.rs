//! # Cachekit Protocol
//!
//! Wire protocol shared by the cachekit server and remote cache clients.
//!
//! Every logical message is one frame: a `u32` big-endian length prefix
//! followed by a bincode payload. Requests carry the method, the cache
//! addressing fields and the payload encodings on every frame, so a single
//! connection can be reused by callers addressing different regions with
//! different value types.
//!
//! A request whose key is absent is the commit sentinel: it asks the server
//! to commit all of its caches and receives no reply.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound for a single frame. Guards both sides against reading a
/// garbage length prefix from a corrupt or misbehaving peer.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Errors raised while encoding, decoding or transporting frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The underlying socket failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame length prefix exceeded [`MAX_FRAME_LEN`]
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    FrameTooLarge(usize),

    /// The frame payload could not be (de)serialized
    #[error("malformed frame: {0}")]
    Malformed(#[from] bincode::Error),

    /// An encoding name not part of the protocol enumeration
    #[error("unsupported payload encoding '{0}'")]
    UnknownEncoding(String),

    /// A method name not part of the protocol enumeration
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
}

/// Request method. Commit is not a method of its own: it is encoded as a
/// [`Method::Put`] request with an absent key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Put => "put",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "put" => Ok(Method::Put),
            other => Err(ProtocolError::UnknownMethod(other.to_string())),
        }
    }
}

/// Payload encoding for keys and values.
///
/// The encoding names travel on every request; they describe how the raw
/// bytes of a key or value are to be interpreted by typed callers. `Json`
/// is the generic object encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    /// UTF-8 string bytes
    String,
    /// Arbitrary serde-serializable object, JSON-encoded
    Json,
    /// Raw byte array, stored as-is
    ByteArray,
    /// Packed little-endian `f64` array
    DoubleArray,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::String => "string",
            Encoding::Json => "json",
            Encoding::ByteArray => "bytearray",
            Encoding::DoubleArray => "doublearray",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(Encoding::String),
            "json" => Ok(Encoding::Json),
            "bytearray" => Ok(Encoding::ByteArray),
            "doublearray" => Ok(Encoding::DoubleArray),
            other => Err(ProtocolError::UnknownEncoding(other.to_string())),
        }
    }
}

/// One client request. Field order mirrors the wire layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    /// Backing store file name within the server's cache directory
    pub cache_id: String,
    pub cache_region: String,
    pub key_encoding: Encoding,
    pub value_encoding: Encoding,
    /// `None` is the commit sentinel, never a real key
    pub key: Option<Vec<u8>>,
    /// Present for PUT requests only
    pub value: Option<Vec<u8>>,
}

impl Request {
    pub fn get(
        cache_id: impl Into<String>,
        cache_region: impl Into<String>,
        key_encoding: Encoding,
        value_encoding: Encoding,
        key: Vec<u8>,
    ) -> Self {
        Self {
            method: Method::Get,
            cache_id: cache_id.into(),
            cache_region: cache_region.into(),
            key_encoding,
            value_encoding,
            key: Some(key),
            value: None,
        }
    }

    pub fn put(
        cache_id: impl Into<String>,
        cache_region: impl Into<String>,
        key_encoding: Encoding,
        value_encoding: Encoding,
        key: Vec<u8>,
        value: Vec<u8>,
    ) -> Self {
        Self {
            method: Method::Put,
            cache_id: cache_id.into(),
            cache_region: cache_region.into(),
            key_encoding,
            value_encoding,
            key: Some(key),
            value: Some(value),
        }
    }

    /// A PUT-shaped request with the absent-key sentinel, asking the server
    /// to commit all of its caches. The server sends no reply for it.
    pub fn commit_all(
        cache_id: impl Into<String>,
        cache_region: impl Into<String>,
        key_encoding: Encoding,
        value_encoding: Encoding,
    ) -> Self {
        Self {
            method: Method::Put,
            cache_id: cache_id.into(),
            cache_region: cache_region.into(),
            key_encoding,
            value_encoding,
            key: None,
            value: None,
        }
    }

    /// Whether this request is the global-commit sentinel
    pub fn is_commit(&self) -> bool {
        self.key.is_none()
    }
}

/// One server reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    /// GET result; inner `None` means no entry for the key
    Value(Option<Vec<u8>>),
    /// PUT acknowledgment
    Ok,
    /// Request handling failed server-side; carries the error description
    Failure { message: String },
}

/// Writes one length-prefixed frame and flushes the writer.
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(message)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one length-prefixed frame. Returns `Ok(None)` when the peer closed
/// the connection before sending another frame.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(ProtocolError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(bincode::deserialize(&payload)?))
}
