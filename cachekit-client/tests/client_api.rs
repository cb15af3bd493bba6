//! End-to-end tests for the high-level client against an in-process server.

use cachekit_client::{CacheClient, ClientOptions};
use cachekit_core::Encoding;
use cachekit_server::{CacheServer, ServerHandle};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
    age: u32,
}

async fn start_server() -> (ServerHandle, ClientOptions, TempDir) {
    let dir = TempDir::new().unwrap();
    let server = CacheServer::bind(dir.path(), "127.0.0.1", 0).await.unwrap();
    let port = server.local_addr().unwrap().port();
    let options = ClientOptions::new("127.0.0.1", port);
    (server.run_in_background(), options, dir)
}

#[tokio::test]
async fn test_string_round_trip() {
    let (server, options, _dir) = start_server().await;
    let users = CacheClient::for_region(
        &options,
        "appcache",
        "users",
        Encoding::String,
        Encoding::String,
    );

    assert!(users.get_string("user1").await.unwrap().is_none());
    assert!(users.put_string("user1", "alice").await.unwrap());
    assert_eq!(
        users.get_string("user1").await.unwrap().as_deref(),
        Some("alice")
    );

    users.commit().await.unwrap();
    server.shutdown().await;
}

#[tokio::test]
async fn test_json_round_trip() {
    let (server, options, _dir) = start_server().await;
    let users = CacheClient::for_region(
        &options,
        "appcache",
        "users",
        Encoding::String,
        Encoding::Json,
    );

    let alice = User {
        name: "Alice".to_string(),
        age: 30,
    };
    assert!(users.put_json("user:1", &alice).await.unwrap());

    let retrieved: Option<User> = users.get_json("user:1").await.unwrap();
    assert_eq!(retrieved, Some(alice));

    server.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_server_reports_connection_error() {
    let (server, options, _dir) = start_server().await;
    server.shutdown().await;

    let users = CacheClient::for_region(
        &options.with_mem_cache_size(0),
        "appcache",
        "users",
        Encoding::String,
        Encoding::String,
    );
    let error = users.get_string("user1").await.unwrap_err();
    assert!(error.is_connection_error());
}
