//! Thread-Safe Sharded Store with Time and Capacity Eviction
//!
//! This module implements the storage engine behind the reverse-DNS cache.
//! It maps string keys to opaque byte payloads and knows nothing about what
//! those payloads contain.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: The keyspace is split into a power-of-two number of
//!    shards, each behind its own `RwLock`. Operations on different shards
//!    never contend.
//! 2. **Advisory Expiry**: Reads never check an entry's age. A background
//!    sweeper removes entries older than the life window once per clean
//!    window, so a read may see an entry at most one sweep late.
//! 3. **Ring-Style Reclamation**: With a byte budget configured, a write that
//!    does not fit evicts the oldest-inserted entries of its shard first,
//!    whether or not they have expired.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ShardStore                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ map+FIFO│ │ map+FIFO│ │ map+FIFO│ │ map+FIFO│           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::storage::shard::Shard;
use crate::storage::StoreConfig;
use bytes::Bytes;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use thiserror::Error;
use tracing::trace;

/// Errors reported by the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The configuration cannot be used to build a store
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),

    /// The payload exceeds the configured maximum entry size
    #[error("entry too large: {size} bytes (max: {max})")]
    EntryTooLarge { size: usize, max: usize },

    /// The entry alone is bigger than its shard's share of the byte budget
    #[error("entry of {size} bytes exceeds the shard capacity of {budget} bytes")]
    ExceedsShardCapacity { size: usize, budget: usize },
}

/// Store statistics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Reads that found their key
    pub hits: u64,
    /// Reads that did not
    pub misses: u64,
    /// Deletes that removed a key
    pub delete_hits: u64,
    /// Deletes of keys that were not present
    pub delete_misses: u64,
    /// Entries removed because they outlived the life window
    pub expired: u64,
    /// Entries removed to make room for newer ones
    pub evicted: u64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} delete_hits={} delete_misses={} expired={} evicted={}",
            self.hits, self.misses, self.delete_hits, self.delete_misses, self.expired, self.evicted
        )
    }
}

/// The sharded, expiring key/payload store.
///
/// Build it once with [`ShardStore::new`] and share it behind an `Arc`.
///
/// # Example
///
/// ```
/// use rdnscache::storage::{ShardStore, StoreConfig};
///
/// let store = ShardStore::new(StoreConfig::default().with_shards(16)).unwrap();
///
/// store.put("8.8.8.8", "payload").unwrap();
/// assert_eq!(store.get("8.8.8.8").as_deref(), Some(&b"payload"[..]));
///
/// assert!(store.delete("8.8.8.8"));
/// assert_eq!(store.get("8.8.8.8"), None);
/// ```
pub struct ShardStore {
    shards: Box<[RwLock<Shard>]>,
    mask: u64,
    shard_budget: usize,
    config: StoreConfig,

    hits: AtomicU64,
    misses: AtomicU64,
    delete_hits: AtomicU64,
    delete_misses: AtomicU64,
    expired: AtomicU64,
    evicted: AtomicU64,
}

impl fmt::Debug for ShardStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardStore")
            .field("shards", &self.shards.len())
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("stats", &self.stats())
            .finish()
    }
}

impl ShardStore {
    /// Creates a store from a validated configuration.
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;

        let shards = (0..config.shards)
            .map(|_| RwLock::new(Shard::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            shards,
            mask: (config.shards - 1) as u64,
            shard_budget: config.shard_budget(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            delete_hits: AtomicU64::new(0),
            delete_misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        })
    }

    /// Determines which shard a key belongs to.
    #[inline]
    pub fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() & self.mask) as usize
    }

    #[inline]
    fn read_shard(&self, index: usize) -> RwLockReadGuard<'_, Shard> {
        self.shards[index]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    fn write_shard(&self, index: usize) -> RwLockWriteGuard<'_, Shard> {
        self.shards[index]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or overwrites `key`.
    ///
    /// When the shard is over budget, its oldest entries are discarded to make
    /// room. Fails only if the payload is bigger than `max_entry_size` or
    /// cannot fit in an empty shard; other entries are untouched in that case.
    pub fn put(&self, key: &str, payload: impl Into<Bytes>) -> Result<(), StoreError> {
        let payload = payload.into();

        let max = self.config.max_entry_size;
        if max > 0 && payload.len() > max {
            return Err(StoreError::EntryTooLarge {
                size: payload.len(),
                max,
            });
        }

        let index = self.shard_index(key);
        let evictions = self.write_shard(index).insert(
            key,
            payload,
            Instant::now(),
            self.shard_budget,
            self.config.life_window,
        )?;

        if evictions.expired > 0 {
            self.expired.fetch_add(evictions.expired, Ordering::Relaxed);
        }
        if evictions.capacity > 0 {
            self.evicted.fetch_add(evictions.capacity, Ordering::Relaxed);
            trace!(
                shard = index,
                evicted = evictions.capacity,
                "Reclaimed space for new entry"
            );
        }

        Ok(())
    }

    /// Gets the payload for a key, or `None` if it is absent.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let value = self.read_shard(self.shard_index(key)).get(key);

        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        value
    }

    /// Deletes a key. Returns `true` if it was present.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.write_shard(self.shard_index(key)).remove(key);

        if removed {
            self.delete_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.delete_misses.fetch_add(1, Ordering::Relaxed);
        }

        removed
    }

    /// Returns the number of entries currently held.
    pub fn len(&self) -> usize {
        (0..self.shards.len())
            .map(|i| self.read_shard(i).len())
            .sum()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bytes (keys plus payloads) currently held.
    pub fn capacity(&self) -> usize {
        (0..self.shards.len())
            .map(|i| self.read_shard(i).used_bytes())
            .sum()
    }

    /// Returns the configured byte budget, 0 when unbounded.
    pub fn hard_limit(&self) -> usize {
        self.config.hard_max_bytes
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            delete_hits: self.delete_hits.load(Ordering::Relaxed),
            delete_misses: self.delete_misses.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }

    /// Removes entries older than the life window from every shard.
    ///
    /// This is called by the background expiry sweeper. Each shard lock is
    /// held only while that shard is swept.
    ///
    /// # Returns
    ///
    /// Returns the number of entries that were removed.
    pub fn cleanup_expired(&self) -> u64 {
        let life_window = self.config.life_window;
        if life_window.is_zero() {
            return 0;
        }

        let now = Instant::now();
        let cleaned: u64 = (0..self.shards.len())
            .map(|i| self.write_shard(i).sweep(now, life_window))
            .sum();

        if cleaned > 0 {
            self.expired.fetch_add(cleaned, Ordering::Relaxed);
        }

        cleaned
    }
}
