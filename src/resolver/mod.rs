//! Reverse-DNS Aggregator
//!
//! Turns "IP X resolved to hostname H with TTL T" observations into per-IP
//! [`Record`]s held in the [`ShardStore`], and answers "which hostnames
//! resolve to X" with a sorted, comma-joined string.
//!
//! ## Write Path
//!
//! ```text
//! observe(ip, host, ttl)
//!       │
//!       ▼
//! ┌──────────────────┐   one mutex per store shard, picked with
//! │ lock(shard(ip))  │   ShardStore::shard_index
//! └────────┬─────────┘
//!          ▼
//!   get ─▶ decode ─▶ insert host ─▶ encode ─▶ put
//! ```
//!
//! Two observations for the same IP always take the same mutex, so neither
//! can overwrite the other's hostname. IPs on different shards never wait
//! on each other.
//!
//! ## Undecodable Records
//!
//! A payload that fails to decode is never replaced. Reads treat it as
//! absent, writes refuse with [`ResolverError::CorruptRecord`], and both log
//! it and bump [`ReverseDnsCache::corrupt_records`].

pub mod record;

pub use record::Record;

use crate::storage::{ShardStore, StoreError};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{error, trace, warn};

/// Errors from the write path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// Empty hostnames would render as a stray delimiter
    #[error("hostname must not be empty")]
    EmptyHostname,

    /// The stored record for this IP could not be decoded
    #[error("corrupt record for '{ip}': {reason}")]
    CorruptRecord { ip: String, reason: String },

    /// The record could not be encoded
    #[error("failed to encode record for '{ip}': {reason}")]
    Encode { ip: String, reason: String },

    /// The store refused the updated record
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The reverse-DNS cache: aggregation on top of a shared [`ShardStore`].
///
/// # Example
///
/// ```
/// use rdnscache::resolver::ReverseDnsCache;
/// use rdnscache::storage::{ShardStore, StoreConfig};
/// use std::sync::Arc;
///
/// let store = Arc::new(ShardStore::new(StoreConfig::default()).unwrap());
/// let cache = ReverseDnsCache::new(store);
///
/// cache.observe("8.8.8.8", "2.google.com", 123).unwrap();
/// cache.observe("8.8.8.8", "1.google.com", 123).unwrap();
///
/// assert_eq!(
///     cache.lookup("8.8.8.8").as_deref(),
///     Some("1.google.com,2.google.com")
/// );
/// ```
#[derive(Debug)]
pub struct ReverseDnsCache {
    store: Arc<ShardStore>,
    write_locks: Box<[Mutex<()>]>,
    corrupt: AtomicU64,
}

impl ReverseDnsCache {
    pub fn new(store: Arc<ShardStore>) -> Self {
        let write_locks = (0..store.shard_count())
            .map(|_| Mutex::new(()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            store,
            write_locks,
            corrupt: AtomicU64::new(0),
        }
    }

    fn write_lock(&self, ip: &str) -> MutexGuard<'_, ()> {
        self.write_locks[self.store.shard_index(ip)]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Records that `hostname` resolved to `ip` with `ttl` seconds.
    pub fn observe(&self, ip: &str, hostname: &str, ttl: u64) -> Result<(), ResolverError> {
        if hostname.is_empty() {
            return Err(ResolverError::EmptyHostname);
        }

        let _guard = self.write_lock(ip);

        let mut record = match self.store.get(ip) {
            Some(payload) => Record::decode(&payload).map_err(|e| {
                self.corrupt.fetch_add(1, Ordering::Relaxed);
                error!(key = %ip, error = %e, "Refusing to update corrupt record");
                ResolverError::CorruptRecord {
                    ip: ip.to_string(),
                    reason: e.to_string(),
                }
            })?,
            None => Record::new(),
        };

        record.observe(hostname, ttl);

        let encoded = record.encode().map_err(|e| ResolverError::Encode {
            ip: ip.to_string(),
            reason: e.to_string(),
        })?;
        self.store.put(ip, encoded)?;

        trace!(key = %ip, hostname = %hostname, ttl, hostnames = record.len(), "Observed");
        Ok(())
    }

    /// Returns the sorted, comma-joined hostnames for `ip`, or `None` if
    /// nothing usable is stored.
    pub fn lookup(&self, ip: &str) -> Option<String> {
        let payload = self.store.get(ip)?;

        match Record::decode(&payload) {
            Ok(record) if record.is_empty() => None,
            Ok(record) => Some(record.render()),
            Err(e) => {
                self.corrupt.fetch_add(1, Ordering::Relaxed);
                warn!(key = %ip, error = %e, "Treating corrupt record as absent");
                None
            }
        }
    }

    /// Deletes the whole record for `ip`. Returns `true` if one existed.
    pub fn forget(&self, ip: &str) -> bool {
        let _guard = self.write_lock(ip);
        self.store.delete(ip)
    }

    /// The encoded record for `ip`, exactly as stored.
    pub fn raw(&self, ip: &str) -> Option<Bytes> {
        self.store.get(ip)
    }

    /// How many undecodable records reads and writes have run into.
    pub fn corrupt_records(&self) -> u64 {
        self.corrupt.load(Ordering::Relaxed)
    }

    pub fn store(&self) -> &Arc<ShardStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreConfig;
    use std::thread;

    fn create_cache() -> ReverseDnsCache {
        let store = ShardStore::new(StoreConfig::default().with_shards(16)).unwrap();
        ReverseDnsCache::new(Arc::new(store))
    }

    #[test]
    fn test_observe_and_lookup() {
        let cache = create_cache();

        cache.observe("8.8.8.8", "2.google.com", 123).unwrap();
        cache.observe("8.8.8.8", "1.google.com", 123).unwrap();

        assert_eq!(
            cache.lookup("8.8.8.8"),
            Some("1.google.com,2.google.com".to_string())
        );
    }

    #[test]
    fn test_lookup_sorted_regardless_of_order() {
        let cache = create_cache();

        for host in ["c.net", "a.net", "d.net", "b.net"] {
            cache.observe("10.1.1.1", host, 30).unwrap();
        }

        assert_eq!(
            cache.lookup("10.1.1.1").as_deref(),
            Some("a.net,b.net,c.net,d.net")
        );
    }

    #[test]
    fn test_reobserve_does_not_duplicate() {
        let cache = create_cache();

        cache.observe("1.1.1.1", "one.one.one.one", 10).unwrap();
        cache.observe("1.1.1.1", "one.one.one.one", 300).unwrap();

        assert_eq!(cache.lookup("1.1.1.1").as_deref(), Some("one.one.one.one"));

        let record = Record::decode(&cache.raw("1.1.1.1").unwrap()).unwrap();
        assert_eq!(record.ttl("one.one.one.one"), Some(300));
    }

    #[test]
    fn test_lookup_never_observed() {
        let cache = create_cache();
        assert_eq!(cache.lookup("203.0.113.9"), None);
    }

    #[test]
    fn test_forget_starts_fresh() {
        let cache = create_cache();

        cache.observe("9.9.9.9", "dns.quad9.net", 10).unwrap();
        cache.observe("9.9.9.9", "old.quad9.net", 10).unwrap();

        assert!(cache.forget("9.9.9.9"));
        assert!(!cache.forget("9.9.9.9"));
        assert_eq!(cache.lookup("9.9.9.9"), None);

        cache.observe("9.9.9.9", "new.quad9.net", 10).unwrap();
        assert_eq!(cache.lookup("9.9.9.9").as_deref(), Some("new.quad9.net"));
    }

    #[test]
    fn test_empty_hostname_rejected() {
        let cache = create_cache();

        assert_eq!(
            cache.observe("8.8.8.8", "", 3),
            Err(ResolverError::EmptyHostname)
        );
        assert_eq!(cache.lookup("8.8.8.8"), None);
    }

    #[test]
    fn test_corrupt_record_is_preserved() {
        let cache = create_cache();
        cache.store().put("8.8.4.4", "{garbage").unwrap();

        let err = cache.observe("8.8.4.4", "dns.google", 10).unwrap_err();
        assert!(matches!(err, ResolverError::CorruptRecord { ref ip, .. } if ip == "8.8.4.4"));

        assert_eq!(cache.lookup("8.8.4.4"), None);
        assert_eq!(cache.raw("8.8.4.4"), Some(Bytes::from("{garbage")));
        assert_eq!(cache.corrupt_records(), 2);
    }

    #[test]
    fn test_store_error_surfaces() {
        let store = ShardStore::new(
            StoreConfig::default()
                .with_shards(1)
                .with_max_entry_size(32),
        )
        .unwrap();
        let cache = ReverseDnsCache::new(Arc::new(store));

        let long_host = "x".repeat(64);
        let err = cache.observe("8.8.8.8", &long_host, 3).unwrap_err();
        assert!(matches!(
            err,
            ResolverError::Store(StoreError::EntryTooLarge { .. })
        ));
    }

    #[test]
    fn test_bounded_store_grows_record_up_to_max_entry_size() {
        use crate::storage::config::MAX_KEY_HEADROOM;

        let store = ShardStore::new(
            StoreConfig::default()
                .with_shards(4)
                .with_max_entry_size(1000)
                .with_hard_max_bytes(4 * (1000 + MAX_KEY_HEADROOM)),
        )
        .unwrap();
        let cache = ReverseDnsCache::new(Arc::new(store));

        let mut observed = 0;
        let err = loop {
            let host = format!("host-{:03}.example.com", observed);
            match cache.observe("8.8.8.8", &host, 3) {
                Ok(()) => observed += 1,
                Err(e) => break e,
            }
        };

        // Only the entry-size limit stops the record from growing.
        assert!(matches!(
            err,
            ResolverError::Store(StoreError::EntryTooLarge { max: 1000, .. })
        ));
        assert!(observed >= 35);
        assert_eq!(
            cache.lookup("8.8.8.8").unwrap().split(',').count(),
            observed
        );
        assert!(cache.raw("8.8.8.8").unwrap().len() <= 1000);
    }

    #[test]
    fn test_concurrent_observations_are_not_lost() {
        let cache = Arc::new(create_cache());
        let mut handles = vec![];

        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..25 {
                    let host = format!("h{}-{:02}", i, j);
                    cache.observe("192.0.2.1", &host, 60).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let rendered = cache.lookup("192.0.2.1").unwrap();
        let hosts: Vec<&str> = rendered.split(',').collect();
        assert_eq!(hosts.len(), 200);

        let mut sorted = hosts.clone();
        sorted.sort();
        assert_eq!(hosts, sorted);
    }
}
