//! Connection Handler Module
//!
//! This module manages individual client connections. Each client
//! connection is handled by its own async task.
//!
//! ```text
//! accept() ─▶ spawn ─▶ ConnectionHandler::run
//!                        │
//!                        ├─ parse_request   (protocol)
//!                        ├─ execute         (commands)
//!                        └─ queue + flush replies
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use rdnscache::commands::{CommandHandler, DEFAULT_OBSERVED_TTL};
//! use rdnscache::connection::{handle_connection, ConnectionStats};
//! use std::sync::Arc;
//!
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(resolver, DEFAULT_OBSERVED_TTL);
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler.clone(), stats));
//! ```

pub mod handler;

pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionSnapshot, ConnectionStats,
};
