//! rdnscache - An In-Memory Reverse-DNS Cache
//!
//! This is the main entry point for the rdnscache server.
//! It builds the store and resolver, then serves the RESP command port and
//! the diagnostics endpoint until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use rdnscache::commands::CommandHandler;
use rdnscache::connection::{handle_connection, ConnectionStats};
use rdnscache::diagnostics;
use rdnscache::resolver::ReverseDnsCache;
use rdnscache::storage::{start_expiry_sweeper, ShardStore};
use rdnscache::ServerConfig;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
rdnscache v{} - In-Memory Reverse-DNS Cache
──────────────────────────────────────────────────────────────
Command server on {}
Diagnostics on http://{}/

Use Ctrl+C to shutdown gracefully.
"#,
        rdnscache::VERSION,
        config.bind_address(),
        config.diag_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = ServerConfig::parse();

    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.default_log_filter())),
        )
        .with_target(false)
        .init();

    print_banner(&config);

    // Create the store (shared across all connections)
    let store_config = config.store_config();
    let store = ShardStore::new(store_config.clone()).context("invalid store configuration")?;
    let store = Arc::new(store);
    info!(
        shards = store_config.shards,
        life_window_secs = store_config.life_window.as_secs(),
        hard_max_bytes = store_config.hard_max_bytes,
        "Store initialized"
    );

    // Start the background expiry sweeper
    let sweeper = start_expiry_sweeper(Arc::clone(&store));
    if sweeper.is_none() {
        warn!("Background expiry disabled");
    }

    let resolver = Arc::new(ReverseDnsCache::new(store));
    let handler = CommandHandler::new(Arc::clone(&resolver), config.default_ttl);
    let stats = Arc::new(ConnectionStats::new());

    // Bind both listeners before serving anything
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind command server on {}", config.bind_address()))?;
    info!("Listening on {}", config.bind_address());

    let diag_listener = TcpListener::bind(config.diag_address())
        .await
        .with_context(|| format!("failed to bind diagnostics on {}", config.diag_address()))?;

    tokio::select! {
        _ = accept_loop(listener, handler, Arc::clone(&stats)) => {}
        result = diagnostics::serve(diag_listener, resolver) => {
            if let Err(e) = result {
                error!("Diagnostics endpoint failed: {}", e);
            }
        }
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Shutdown signal received, stopping server..."),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        }
    }

    info!(connections = %stats.snapshot(), "Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, handler: CommandHandler, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = handler.clone();
                let stats = Arc::clone(&stats);

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
