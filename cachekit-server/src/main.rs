use cachekit_server::CacheServer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cachekit_server=info,cachekit_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: {} <cache-dir> <host> <port>", args[0]);
        std::process::exit(2);
    }
    let cache_dir = &args[1];
    let host = &args[2];
    let port: u16 = args[3]
        .parse()
        .map_err(|e| format!("invalid port '{}': {e}", args[3]))?;

    tracing::info!("Starting cache server with cache directory {cache_dir}, host {host}, port {port}");

    let server = CacheServer::bind(cache_dir, host, port).await?;
    server.run().await;
    Ok(())
}
