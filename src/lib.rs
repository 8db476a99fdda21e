//! # rdnscache - An In-Memory Reverse-DNS Cache
//!
//! rdnscache remembers which hostnames were seen resolving to which IP
//! address and answers "what names point at this IP?" over the Redis
//! protocol (RESP), so any Redis client can feed and query it.
//!
//! ## Features
//!
//! - **Redis-Compatible**: `PING`, `QUIT`, `SET`, `GET` and `DEL` over RESP
//! - **Aggregating**: every `SET ip "host;..."` adds a hostname to the IP's record
//! - **Bounded**: sharded store with per-entry and total byte limits
//! - **Self-Cleaning**: a background sweeper drops entries past their life window
//! - **Async I/O**: built on Tokio, one task per client connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              rdnscache                                  │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └─────────────┘    └──────┬──────┘                  │
//! │                                               │                         │
//! │  ┌─────────────┐                              ▼                         │
//! │  │ Diagnostics │──────────────────> ┌──────────────────┐                │
//! │  │   (HTTP)    │                    │ ReverseDnsCache  │                │
//! │  └─────────────┘                    └────────┬─────────┘                │
//! │                                              ▼                          │
//! │                     ┌──────────────────────────────────────────────┐   │
//! │                     │                ShardStore                    │   │
//! │                     │  ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐ │   │
//! │                     │  │Shard 0 │ │Shard 1 │ │Shard 2 │ │...N    │ │   │
//! │                     │  │RwLock  │ │RwLock  │ │RwLock  │ │shards  │ │   │
//! │                     │  └────────┘ └────────┘ └────────┘ └────────┘ │   │
//! │                     └──────────────────────────────────────────────┘   │
//! │                                               ▲                         │
//! │                     ┌─────────────────────────┴───────────────────────┐ │
//! │                     │           ExpirySweeper                         │ │
//! │                     │      (Background Tokio Task)                    │ │
//! │                     └─────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use rdnscache::commands::{CommandHandler, DEFAULT_OBSERVED_TTL};
//! use rdnscache::connection::{handle_connection, ConnectionStats};
//! use rdnscache::resolver::ReverseDnsCache;
//! use rdnscache::storage::{start_expiry_sweeper, ShardStore, StoreConfig};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(ShardStore::new(StoreConfig::default())?);
//!     let _sweeper = start_expiry_sweeper(Arc::clone(&store));
//!
//!     let resolver = Arc::new(ReverseDnsCache::new(store));
//!     let handler = CommandHandler::new(resolver, DEFAULT_OBSERVED_TTL);
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await?;
//!     loop {
//!         let (stream, addr) = listener.accept().await?;
//!         tokio::spawn(handle_connection(stream, addr, handler.clone(), Arc::clone(&stats)));
//!     }
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: sharded, size-bounded store with background expiry
//! - [`resolver`]: reverse-DNS records on top of the store
//! - [`protocol`]: RESP request parser and reply types
//! - [`commands`]: command validation and dispatch
//! - [`connection`]: client connection management
//! - [`diagnostics`]: plain-text HTTP report
//! - [`config`]: command-line and environment configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod protocol;
pub mod resolver;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::CommandHandler;
pub use config::ServerConfig;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{parse_request, ParseError, Reply};
pub use resolver::{ResolverError, ReverseDnsCache};
pub use storage::{start_expiry_sweeper, ExpirySweeper, ShardStore, StoreConfig, StoreError};

/// The default port the command server listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host both listeners bind to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// The default port of the diagnostics endpoint
pub const DEFAULT_DIAG_PORT: u16 = 8090;

/// Version of rdnscache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
