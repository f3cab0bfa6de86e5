//! ShardKV - A Sharded JSON Key-Value Store
//!
//! This is the main entry point for the ShardKV server.
//! It reads configuration, bootstraps the shard tables and serves the HTTP API.

use chrono::FixedOffset;
use clap::Parser;
use shardkv::config::parse_offset;
use shardkv::{http, Config, KvStore, MemoryBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// ShardKV Server
///
/// Every option can also be set through the environment.
#[derive(Parser, Debug)]
#[command(name = "shardkv")]
#[command(about = "Sharded JSON key-value store with TTL entries")]
#[command(version)]
struct Args {
    /// Number of shard tables (must stay the same across restarts)
    #[arg(short = 'n', long, env = "NUM_SHARDS", default_value = "4")]
    shards: usize,

    /// Base name of the shard tables
    #[arg(short, long, env = "BASE_TABLE_NAME", default_value = "kv_store")]
    base_table_name: String,

    /// Entry time-to-live in seconds
    #[arg(short, long, env = "KV_TTL_SECS", default_value = "600")]
    ttl_secs: u64,

    /// UTC offset used to render expiry timestamps
    #[arg(long, env = "KV_TZ_OFFSET", default_value = "+05:30", value_parser = parse_offset)]
    tz_offset: FixedOffset,

    /// Listen address (host:port)
    #[arg(short, long, env = "KV_LISTEN", default_value = "127.0.0.1:8080")]
    listen: String,
}

fn print_banner(config: &Config) {
    println!(
        r#"
ShardKV v{} - Sharded JSON Key-Value Store
──────────────────────────────────────────────────────────────
Shards:       {} x {}_<n>
Entry TTL:    {}s
Listening on: {}

Use Ctrl+C to shutdown gracefully.
"#,
        shardkv::VERSION,
        config.shard_count,
        config.base_table_name,
        config.ttl.as_secs(),
        config.listen_addr,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,shardkv=debug"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let config = Config::builder()
        .shard_count(args.shards)
        .base_table_name(args.base_table_name)
        .ttl(Duration::from_secs(args.ttl_secs))
        .reference_offset(args.tz_offset)
        .listen_addr(args.listen)
        .build();

    // Bootstrap the shard tables; a bad config stops the process here
    let backend = Arc::new(MemoryBackend::new());
    let store = match KvStore::open(&config, backend).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to open store: {}", e);
            return Err(e.into());
        }
    };
    info!(
        shards = config.shard_count,
        base = %config.base_table_name,
        "Store initialized"
    );

    print_banner(&config);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!("Listening on {}", config.listen_addr);

    let app = http::router(store);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server...");
}
