//! A single partition of the store.
//!
//! Entries are kept in a map for lookups and in an insertion-ordered queue
//! for eviction. Overwriting a key appends a fresh queue item and leaves the
//! old one behind; such stale items are skipped when they reach the front and
//! compacted away once they outnumber the live ones.
//!
//! Nothing here locks or reads the clock: the engine passes `now` in, which
//! keeps the eviction logic deterministic under test.

use crate::storage::StoreError;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Queue items beyond this slack over the live count trigger a compaction.
const COMPACTION_SLACK: usize = 32;

#[derive(Debug)]
struct Slot {
    payload: Bytes,
    stored_at: Instant,
    seq: u64,
}

#[derive(Debug)]
struct QueueItem {
    key: Arc<str>,
    seq: u64,
}

/// Counts of entries reclaimed by a single write.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Evictions {
    pub expired: u64,
    pub capacity: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Shard {
    slots: HashMap<Arc<str>, Slot>,
    queue: VecDeque<QueueItem>,
    next_seq: u64,
    used_bytes: usize,
}

#[inline]
fn entry_size(key: &str, payload: &[u8]) -> usize {
    key.len() + payload.len()
}

#[inline]
fn is_expired(stored_at: Instant, now: Instant, life_window: Duration) -> bool {
    !life_window.is_zero() && now.saturating_duration_since(stored_at) >= life_window
}

impl Shard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Bytes> {
        self.slots.get(key).map(|slot| slot.payload.clone())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Inserts or overwrites `key`, reclaiming the oldest entries when the
    /// shard budget would be exceeded. A `budget` of 0 means unbounded.
    pub fn insert(
        &mut self,
        key: &str,
        payload: Bytes,
        now: Instant,
        budget: usize,
        life_window: Duration,
    ) -> Result<Evictions, StoreError> {
        let size = entry_size(key, &payload);
        if budget > 0 && size > budget {
            return Err(StoreError::ExceedsShardCapacity { size, budget });
        }

        self.remove(key);

        let mut evictions = Evictions::default();

        // Reclaim at most one expired entry per write.
        self.drop_stale_front();
        if let Some(front) = self.queue.front() {
            let expired = self
                .slots
                .get(&front.key)
                .map(|slot| is_expired(slot.stored_at, now, life_window))
                .unwrap_or(false);
            if expired && self.pop_oldest() {
                evictions.expired += 1;
            }
        }

        while budget > 0 && self.used_bytes + size > budget {
            if !self.pop_oldest() {
                break;
            }
            evictions.capacity += 1;
        }

        let key: Arc<str> = Arc::from(key);
        let seq = self.next_seq;
        self.next_seq += 1;

        self.queue.push_back(QueueItem {
            key: Arc::clone(&key),
            seq,
        });
        self.slots.insert(
            key,
            Slot {
                payload,
                stored_at: now,
                seq,
            },
        );
        self.used_bytes += size;

        self.maybe_compact();

        Ok(evictions)
    }

    /// Removes `key`. Its queue item goes stale and is dropped lazily.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.slots.remove_entry(key) {
            Some((key, slot)) => {
                self.used_bytes -= entry_size(&key, &slot.payload);
                true
            }
            None => false,
        }
    }

    /// Removes every entry older than `life_window`, returning how many went.
    pub fn sweep(&mut self, now: Instant, life_window: Duration) -> u64 {
        if life_window.is_zero() {
            return 0;
        }

        let mut removed = 0;
        loop {
            self.drop_stale_front();
            let expired = match self.queue.front() {
                Some(front) => self
                    .slots
                    .get(&front.key)
                    .map(|slot| is_expired(slot.stored_at, now, life_window))
                    .unwrap_or(false),
                None => false,
            };
            // The queue is in insertion order, so the first live entry that
            // is still fresh ends the scan.
            if !expired || !self.pop_oldest() {
                break;
            }
            removed += 1;
        }
        removed
    }

    fn is_live(slots: &HashMap<Arc<str>, Slot>, item: &QueueItem) -> bool {
        slots
            .get(&item.key)
            .map(|slot| slot.seq == item.seq)
            .unwrap_or(false)
    }

    fn drop_stale_front(&mut self) {
        while let Some(front) = self.queue.front() {
            if Self::is_live(&self.slots, front) {
                break;
            }
            self.queue.pop_front();
        }
    }

    /// Removes the oldest live entry. Returns false when the shard is empty.
    fn pop_oldest(&mut self) -> bool {
        while let Some(item) = self.queue.pop_front() {
            if Self::is_live(&self.slots, &item) {
                self.remove(&item.key);
                return true;
            }
        }
        false
    }

    fn maybe_compact(&mut self) {
        if self.queue.len() > self.slots.len() * 2 + COMPACTION_SLACK {
            let slots = &self.slots;
            self.queue.retain(|item| Self::is_live(slots, item));
        }
    }

    #[cfg(test)]
    fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn payload(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_insert_and_overwrite() {
        let mut shard = Shard::new();
        let now = Instant::now();

        shard.insert("a", payload("one"), now, 0, HOUR).unwrap();
        shard.insert("a", payload("three"), now, 0, HOUR).unwrap();

        assert_eq!(shard.len(), 1);
        assert_eq!(shard.get("a"), Some(payload("three")));
        assert_eq!(shard.used_bytes(), 1 + 5);
    }

    #[test]
    fn test_remove_updates_accounting() {
        let mut shard = Shard::new();
        let now = Instant::now();

        shard.insert("key", payload("value"), now, 0, HOUR).unwrap();
        assert!(shard.remove("key"));
        assert!(!shard.remove("key"));
        assert_eq!(shard.used_bytes(), 0);
        assert_eq!(shard.get("key"), None);
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let mut shard = Shard::new();
        let now = Instant::now();

        // Each entry is 1 + 4 = 5 bytes; the budget holds three.
        shard.insert("a", payload("aaaa"), now, 15, HOUR).unwrap();
        shard.insert("b", payload("bbbb"), now, 15, HOUR).unwrap();
        shard.insert("c", payload("cccc"), now, 15, HOUR).unwrap();

        let evictions = shard.insert("d", payload("dddd"), now, 15, HOUR).unwrap();
        assert_eq!(evictions.capacity, 1);
        assert_eq!(shard.get("a"), None);
        assert!(shard.get("b").is_some());
        assert!(shard.get("d").is_some());
        assert!(shard.used_bytes() <= 15);
    }

    #[test]
    fn test_overwrite_refreshes_position() {
        let mut shard = Shard::new();
        let now = Instant::now();

        shard.insert("a", payload("aaaa"), now, 10, HOUR).unwrap();
        shard.insert("b", payload("bbbb"), now, 10, HOUR).unwrap();
        // Rewriting "a" moves it behind "b".
        shard.insert("a", payload("AAAA"), now, 10, HOUR).unwrap();
        shard.insert("c", payload("cccc"), now, 10, HOUR).unwrap();

        assert_eq!(shard.get("b"), None);
        assert_eq!(shard.get("a"), Some(payload("AAAA")));
        assert!(shard.get("c").is_some());
    }

    #[test]
    fn test_entry_larger_than_budget_is_rejected() {
        let mut shard = Shard::new();
        let now = Instant::now();

        shard.insert("a", payload("aa"), now, 8, HOUR).unwrap();
        let err = shard
            .insert("big", payload("0123456789"), now, 8, HOUR)
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::ExceedsShardCapacity {
                size: 13,
                budget: 8
            }
        );
        assert_eq!(shard.get("a"), Some(payload("aa")));
    }

    #[test]
    fn test_sweep_removes_only_old_entries() {
        let mut shard = Shard::new();
        let start = Instant::now();
        let window = Duration::from_secs(10);

        shard.insert("old", payload("x"), start, 0, window).unwrap();
        shard
            .insert("new", payload("y"), start + Duration::from_secs(8), 0, window)
            .unwrap();

        assert_eq!(shard.sweep(start + Duration::from_secs(5), window), 0);
        assert_eq!(shard.sweep(start + Duration::from_secs(12), window), 1);
        assert_eq!(shard.get("old"), None);
        assert!(shard.get("new").is_some());
    }

    #[test]
    fn test_overwrite_refreshes_timestamp() {
        let mut shard = Shard::new();
        let start = Instant::now();
        let window = Duration::from_secs(10);

        shard.insert("ip", payload("v1"), start, 0, window).unwrap();
        shard
            .insert("ip", payload("v2"), start + Duration::from_secs(9), 0, window)
            .unwrap();

        assert_eq!(shard.sweep(start + Duration::from_secs(15), window), 0);
        assert_eq!(shard.get("ip"), Some(payload("v2")));
    }

    #[test]
    fn test_zero_life_window_never_expires() {
        let mut shard = Shard::new();
        let start = Instant::now();

        shard.insert("k", payload("v"), start, 0, Duration::ZERO).unwrap();
        assert_eq!(shard.sweep(start + HOUR * 1000, Duration::ZERO), 0);
        assert!(shard.get("k").is_some());
    }

    #[test]
    fn test_insert_reclaims_one_expired_entry() {
        let mut shard = Shard::new();
        let start = Instant::now();
        let window = Duration::from_secs(1);

        shard.insert("a", payload("1"), start, 0, window).unwrap();
        shard.insert("b", payload("2"), start, 0, window).unwrap();

        let later = start + Duration::from_secs(5);
        let evictions = shard.insert("c", payload("3"), later, 0, window).unwrap();
        assert_eq!(evictions.expired, 1);
        assert_eq!(shard.get("a"), None);
        assert!(shard.get("b").is_some());
    }

    #[test]
    fn test_repeated_overwrites_are_compacted() {
        let mut shard = Shard::new();
        let now = Instant::now();

        for i in 0..1000 {
            shard
                .insert("hot", payload(&i.to_string()), now, 0, HOUR)
                .unwrap();
        }

        assert_eq!(shard.len(), 1);
        assert!(shard.queue_len() <= 2 + COMPACTION_SLACK + 1);
    }
}
