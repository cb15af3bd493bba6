//! Per-connection request loop.

use cachekit_core::{CacheError, CacheService, MapSettings};
use cachekit_proto::{read_frame, write_frame, Method, ProtocolError, Request, Response};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpStream;

/// Serves one client connection until it closes or a request fails.
///
/// A failing request is answered with a failure reply while the socket is
/// still writable, then the connection is torn down; other connections are
/// unaffected. All caches are committed when the connection ends,
/// whichever way it ends.
pub(crate) async fn handle(
    service: Arc<CacheService>,
    cache_dir: PathBuf,
    mut stream: TcpStream,
    peer: SocketAddr,
) {
    if let Err(e) = serve(&service, &cache_dir, &mut stream).await {
        if is_client_disconnect(&e) {
            tracing::debug!("Client {peer} closed the connection: {e}");
        } else {
            tracing::error!("Request handling for {peer} failed: {e}");
            let reply = Response::Failure {
                message: e.to_string(),
            };
            if let Err(e) = write_frame(&mut stream, &reply).await {
                tracing::debug!("Could not send the failure reply to {peer}: {e}");
            }
        }
    }
    service.commit_all_caches();
}

async fn serve(
    service: &CacheService,
    cache_dir: &Path,
    stream: &mut TcpStream,
) -> Result<(), CacheError> {
    loop {
        tracing::trace!("Reading request data.");
        let Some(request) = read_frame::<_, Request>(stream).await? else {
            return Ok(());
        };

        // An absent key is the commit signal; only a global commit of all
        // caches is supported, and it receives no reply.
        let Some(key) = request.key else {
            service.commit_all_caches();
            continue;
        };

        let store_path = cache_dir.join(&request.cache_id);
        let region = service.get_cache(&store_path, &request.cache_region, &MapSettings::default())?;

        match request.method {
            Method::Get => {
                let value = region.get(&key)?;
                if value.is_some() {
                    tracing::trace!(
                        "Returning data from cache {}, region {}.",
                        request.cache_id,
                        request.cache_region
                    );
                } else {
                    tracing::trace!(
                        "No cached data available in cache {}, region {}.",
                        request.cache_id,
                        request.cache_region
                    );
                }
                write_frame(stream, &Response::Value(value)).await?;
            }
            Method::Put => {
                let value = request.value.ok_or_else(|| {
                    CacheError::Remote("put request without a value".to_string())
                })?;
                tracing::trace!(
                    "Putting data into cache {}, region {}.",
                    request.cache_id,
                    request.cache_region
                );
                region.put(&key, &value)?;
                write_frame(stream, &Response::Ok).await?;
            }
        }
    }
}

/// A client going away mid-session is benign, not a server error.
fn is_client_disconnect(error: &CacheError) -> bool {
    let kind = match error {
        CacheError::Io(e) => e.kind(),
        CacheError::Protocol(ProtocolError::Io(e)) => e.kind(),
        _ => return false,
    };
    matches!(
        kind,
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
    )
}
