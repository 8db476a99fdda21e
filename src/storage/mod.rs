//! Storage Engine Module
//!
//! This module provides the payload-agnostic store underneath the resolver:
//! a sharded map from string keys to byte payloads that forgets entries
//! after a life window and stays inside a byte budget.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ShardStore                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...N     │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (Background Tokio Task)  │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Sharded Storage**: power-of-two shard count, one lock per shard
//! - **Life Window**: entries older than the window are swept periodically
//! - **Hard Capacity**: oldest entries make room when the budget is reached
//! - **Opaque Payloads**: callers own the encoding of what they store

pub mod config;
pub mod engine;
pub mod expiry;
mod shard;

// Re-export commonly used types
pub use config::StoreConfig;
pub use engine::{ShardStore, StoreError, StoreStats};
pub use expiry::{start_expiry_sweeper, ExpirySweeper};
