//! Adaptive Cache - line-oriented driver
//!
//! Reads one JSON command per stdin line and writes one JSON reply per
//! stdout line. Useful for replaying workloads and inspecting snapshots.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use adaptive_cache::cache::{AdaptiveCache, ZstdCompressor};
use adaptive_cache::config::Config;
use adaptive_cache::driver::handle_line;

/// Main entry point for the cache driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging (stderr)
/// 2. Load configuration from environment variables
/// 3. Build the cache with the configured compressor
/// 4. Serve stdin commands until EOF, Ctrl+C or SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adaptive_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Adaptive Cache driver");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_size={}, ttl_ms={}, compression_enabled={}, zstd_level={}",
        config.cache.max_size,
        config.cache.ttl_ms,
        config.cache.compression_enabled,
        config.zstd_level
    );

    let cache = AdaptiveCache::builder(config.cache.clone())
        .compressor(Arc::new(ZstdCompressor::new(config.zstd_level)))
        .build()
        .context("invalid cache configuration")?;
    info!("Cache initialized");

    tokio::select! {
        result = serve(&cache) => result?,
        _ = shutdown_signal() => {}
    }

    let stats = cache.statistics();
    info!(
        size = stats.size,
        hits = stats.hits,
        misses = stats.misses,
        evictions = stats.evictions,
        "Driver shutdown complete"
    );
    Ok(())
}

/// Processes stdin line by line until EOF.
async fn serve(cache: &AdaptiveCache) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = handle_line(cache, line);
        let mut out = serde_json::to_vec(&reply).context("failed to encode reply")?;
        out.push(b'\n');
        stdout.write_all(&out).await.context("failed to write stdout")?;
        stdout.flush().await?;
    }

    info!("stdin closed");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
