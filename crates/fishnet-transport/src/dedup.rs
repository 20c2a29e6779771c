//! Broadcast duplicate suppression.
//!
//! A fixed-bucket chained hash table keyed by `(source, packet_id)` that
//! remembers when each broadcast flood was last seen. Entries older than the
//! entry TTL are logically absent even while still stored; they are
//! reclaimed when their bucket is next written, by [`DuplicateTable::sweep`],
//! or by capacity eviction.

use fishnet_core::constants::{DEDUP_BUCKETS, DEDUP_ENTRY_TTL_SECS};
use fishnet_core::types::FishAddr;

/// Sizing and lifetime policy for a [`DuplicateTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupConfig {
    /// Seconds a sighting stays valid.
    pub entry_ttl_secs: u64,
    /// Number of hash buckets; clamped to at least 1.
    pub buckets: usize,
    /// Upper bound on stored entries, clamped to at least 1. `None` leaves
    /// the table unbounded.
    pub capacity: Option<usize>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            entry_ttl_secs: DEDUP_ENTRY_TTL_SECS,
            buckets: DEDUP_BUCKETS,
            capacity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DedupEntry {
    src: FishAddr,
    packet_id: u32,
    timestamp: u64,
}

impl DedupEntry {
    fn matches(&self, src: FishAddr, packet_id: u32) -> bool {
        self.src == src && self.packet_id == packet_id
    }

    /// Valid while `now - timestamp <= ttl`.
    fn is_expired(&self, now: u64, ttl: u64) -> bool {
        now.saturating_sub(self.timestamp) > ttl
    }
}

/// Duplicate-suppression table for broadcast floods.
#[derive(Debug)]
pub struct DuplicateTable {
    buckets: Vec<Vec<DedupEntry>>,
    entry_ttl: u64,
    capacity: Option<usize>,
    len: usize,
}

impl DuplicateTable {
    pub fn new(config: DedupConfig) -> Self {
        let bucket_count = config.buckets.max(1);
        Self {
            buckets: vec![Vec::new(); bucket_count],
            entry_ttl: config.entry_ttl_secs,
            capacity: config.capacity.map(|c| c.max(1)),
            len: 0,
        }
    }

    fn bucket_index(&self, src: FishAddr, packet_id: u32) -> usize {
        (src.to_u32() ^ packet_id) as usize % self.buckets.len()
    }

    /// Timestamp of a still-valid sighting of `(src, packet_id)`.
    ///
    /// Returns `None` when the key was never recorded or its sighting is
    /// older than the entry TTL.
    #[must_use]
    pub fn lookup(&self, src: FishAddr, packet_id: u32, now: u64) -> Option<u64> {
        let bucket = &self.buckets[self.bucket_index(src, packet_id)];
        bucket
            .iter()
            .find(|e| e.matches(src, packet_id))
            .filter(|e| !e.is_expired(now, self.entry_ttl))
            .map(|e| e.timestamp)
    }

    /// Record a sighting of `(src, packet_id)` at `now`.
    ///
    /// An existing entry for the same key has its timestamp replaced.
    /// Returns `true` if the key was not already stored.
    pub fn record(&mut self, src: FishAddr, packet_id: u32, now: u64) -> bool {
        let index = self.bucket_index(src, packet_id);
        let ttl = self.entry_ttl;
        let bucket = &mut self.buckets[index];

        let before = bucket.len();
        bucket.retain(|e| e.matches(src, packet_id) || !e.is_expired(now, ttl));
        self.len -= before - bucket.len();

        if let Some(existing) = bucket.iter_mut().find(|e| e.matches(src, packet_id)) {
            existing.timestamp = now;
            return false;
        }

        // Make room first: the new sighting must never be the one evicted.
        if let Some(capacity) = self.capacity
            && self.len >= capacity
            && self.sweep(now) == 0
        {
            self.evict_oldest();
        }

        self.buckets[index].push(DedupEntry {
            src,
            packet_id,
            timestamp: now,
        });
        self.len += 1;
        true
    }

    /// Atomic check-and-insert: returns `true` if `(src, packet_id)` had a
    /// valid sighting, otherwise records it and returns `false`.
    pub fn check_and_record(&mut self, src: FishAddr, packet_id: u32, now: u64) -> bool {
        if self.lookup(src, packet_id, now).is_some() {
            return true;
        }
        self.record(src, packet_id, now);
        false
    }

    /// Physically remove every expired entry. Returns the number removed.
    pub fn sweep(&mut self, now: u64) -> usize {
        let ttl = self.entry_ttl;
        let before = self.len;
        for bucket in &mut self.buckets {
            bucket.retain(|e| !e.is_expired(now, ttl));
        }
        self.len = self.buckets.iter().map(Vec::len).sum();
        before - self.len
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .buckets
            .iter()
            .enumerate()
            .flat_map(|(b, bucket)| bucket.iter().enumerate().map(move |(i, e)| (b, i, e)))
            .min_by_key(|(_, _, e)| e.timestamp)
            .map(|(b, i, _)| (b, i));

        if let Some((b, i)) = oldest {
            self.buckets[b].swap_remove(i);
            self.len -= 1;
        }
    }

    /// Number of stored entries, including logically expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn entry_ttl(&self) -> u64 {
        self.entry_ttl
    }

    /// Length of the longest collision chain.
    #[must_use]
    pub fn longest_chain(&self) -> usize {
        self.buckets.iter().map(Vec::len).max().unwrap_or(0)
    }
}

impl Default for DuplicateTable {
    fn default() -> Self {
        Self::new(DedupConfig::default())
    }
}
