//! Integration tests for the remote cache path: a real server on an
//! ephemeral port, real client connections.

use cachekit_core::{CacheAccess, Encoding, RemoteCacheAccess};
use cachekit_server::{CacheServer, ServerHandle};
use std::sync::Arc;
use tempfile::TempDir;

async fn start_server() -> (ServerHandle, u16, TempDir) {
    let dir = TempDir::new().unwrap();
    let server = CacheServer::bind(dir.path(), "127.0.0.1", 0).await.unwrap();
    let port = server.local_addr().unwrap().port();
    (server.run_in_background(), port, dir)
}

fn client(port: u16, region: &str, mem_cache_size: u64) -> RemoteCacheAccess {
    RemoteCacheAccess::new(
        "testcache",
        region,
        Encoding::String,
        Encoding::String,
        "127.0.0.1",
        port,
        mem_cache_size,
    )
}

#[tokio::test]
async fn test_remote_round_trip_across_connections() {
    let (server, port, _dir) = start_server().await;

    let writer = client(port, "users", 100);
    assert!(writer.put(b"user1", b"alice").await.unwrap());

    // A different client connection must see the write.
    let reader = client(port, "users", 100);
    assert_eq!(
        reader.get(b"user1").await.unwrap().as_deref(),
        Some(b"alice".as_slice())
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_regions_are_isolated_remotely() {
    let (server, port, _dir) = start_server().await;

    let region_a = client(port, "regionA", 0);
    let region_b = client(port, "regionB", 0);

    assert!(region_a.put(b"x", b"from-a").await.unwrap());
    assert!(region_b.put(b"x", b"from-b").await.unwrap());

    assert_eq!(
        region_a.get(b"x").await.unwrap().as_deref(),
        Some(b"from-a".as_slice())
    );
    assert_eq!(
        region_b.get(b"x").await.unwrap().as_deref(),
        Some(b"from-b".as_slice())
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_last_writer_wins_across_clients() {
    let (server, port, _dir) = start_server().await;

    // Read caches disabled so every get reaches the server.
    let client_a = client(port, "users", 0);
    let client_b = client(port, "users", 0);

    assert!(client_a.put(b"user1", b"alice").await.unwrap());
    assert_eq!(
        client_b.get(b"user1").await.unwrap().as_deref(),
        Some(b"alice".as_slice())
    );

    assert!(client_b.put(b"user1", b"bob").await.unwrap());
    assert_eq!(
        client_a.get(b"user1").await.unwrap().as_deref(),
        Some(b"bob".as_slice())
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_commit_terminates_session_but_not_server() {
    let (server, port, _dir) = start_server().await;

    let cache = client(port, "users", 0);
    assert!(cache.put(b"user1", b"alice").await.unwrap());
    cache.commit().await.unwrap();

    // The same access reconnects lazily and the server kept serving.
    assert_eq!(
        cache.get(b"user1").await.unwrap().as_deref(),
        Some(b"alice".as_slice())
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_clients_read_their_own_writes() {
    let (server, port, _dir) = start_server().await;

    let mut tasks = Vec::new();
    for worker in 0..8u32 {
        let cache = Arc::new(client(port, "concurrent", 0));
        tasks.push(tokio::spawn(async move {
            for i in 0..25u32 {
                let key = format!("worker{worker}-key{i}");
                let value = format!("worker{worker}-val{i}");
                assert!(cache.put(key.as_bytes(), value.as_bytes()).await.unwrap());
                assert_eq!(
                    cache.get(key.as_bytes()).await.unwrap(),
                    Some(value.into_bytes()),
                    "lost update for {key}"
                );
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_server_fails_fast() {
    // Nothing listens on this socket after the server is gone.
    let (server, port, _dir) = start_server().await;
    server.shutdown().await;

    let cache = client(port, "users", 0);
    assert!(cache.get(b"user1").await.is_err());
    assert!(!cache.put(b"user1", b"alice").await.unwrap());
}
