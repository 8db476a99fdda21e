//! Store Configuration
//!
//! Every tunable of the [`ShardStore`](crate::storage::ShardStore) lives in a
//! [`StoreConfig`] value that is built once at startup and handed to
//! [`ShardStore::new`](crate::storage::ShardStore::new). Nothing is read from
//! globals.
//!
//! ## Example
//!
//! ```
//! use rdnscache::storage::StoreConfig;
//! use std::time::Duration;
//!
//! let config = StoreConfig::default()
//!     .with_shards(16)
//!     .with_life_window(Duration::from_secs(60))
//!     .with_hard_max_bytes(1024 * 1024);
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::storage::StoreError;
use std::time::Duration;

/// Default number of shards.
pub const DEFAULT_SHARDS: usize = 1024;

/// Default age after which an entry may be swept (48 hours).
pub const DEFAULT_LIFE_WINDOW: Duration = Duration::from_secs(48 * 60 * 60);

/// Default interval between background sweeps (5 minutes).
pub const DEFAULT_CLEAN_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default maximum payload size in bytes.
pub const DEFAULT_MAX_ENTRY_SIZE: usize = 5000;

/// Key length every shard budget reserves room for, on top of one
/// maximum-size payload. Textual IPv6 addresses are at most 45 bytes.
pub const MAX_KEY_HEADROOM: usize = 64;

/// Configuration for the sharded store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Number of shards. Must be a non-zero power of two.
    pub shards: usize,

    /// Entries older than this are removed by the sweeper.
    /// `Duration::ZERO` disables time-based expiry.
    pub life_window: Duration,

    /// Interval between background sweeps.
    /// `Duration::ZERO` disables the sweeper.
    pub clean_window: Duration,

    /// Largest payload accepted by `put`, in bytes. 0 means no limit.
    pub max_entry_size: usize,

    /// Total byte budget across all shards, split evenly between them.
    /// 0 means unbounded. When set together with `max_entry_size`, each
    /// shard's share must fit one maximum-size entry.
    pub hard_max_bytes: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            life_window: DEFAULT_LIFE_WINDOW,
            clean_window: DEFAULT_CLEAN_WINDOW,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            hard_max_bytes: 0,
        }
    }
}

impl StoreConfig {
    pub fn with_shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    pub fn with_life_window(mut self, life_window: Duration) -> Self {
        self.life_window = life_window;
        self
    }

    pub fn with_clean_window(mut self, clean_window: Duration) -> Self {
        self.clean_window = clean_window;
        self
    }

    pub fn with_max_entry_size(mut self, max_entry_size: usize) -> Self {
        self.max_entry_size = max_entry_size;
        self
    }

    pub fn with_hard_max_bytes(mut self, hard_max_bytes: usize) -> Self {
        self.hard_max_bytes = hard_max_bytes;
        self
    }

    /// Checks the configuration for values the store cannot work with.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.shards == 0 || !self.shards.is_power_of_two() {
            return Err(StoreError::InvalidConfig(format!(
                "shard count must be a non-zero power of two, got {}",
                self.shards
            )));
        }

        if self.hard_max_bytes > 0 && self.hard_max_bytes < self.shards {
            return Err(StoreError::InvalidConfig(format!(
                "hard capacity of {} bytes leaves nothing for {} shards",
                self.hard_max_bytes, self.shards
            )));
        }

        if self.hard_max_bytes > 0 && self.max_entry_size > 0 {
            let needed = self.max_entry_size.saturating_add(MAX_KEY_HEADROOM);
            if self.shard_budget() < needed {
                return Err(StoreError::InvalidConfig(format!(
                    "shard budget of {} bytes ({} bytes over {} shards) cannot hold \
                     a {}-byte entry; raise the capacity or lower the shard count",
                    self.shard_budget(),
                    self.hard_max_bytes,
                    self.shards,
                    needed
                )));
            }
        }

        Ok(())
    }

    /// The byte budget of a single shard, 0 when unbounded.
    pub fn shard_budget(&self) -> usize {
        if self.hard_max_bytes == 0 {
            0
        } else {
            self.hard_max_bytes / self.shards
        }
    }
}
