//! # Rill DNS record cache
//!
//! A shared, TTL-indexed record store. The key is `(owner, type)` with
//! case-insensitive owners; the value is an unordered **multiset** of
//! `(record, absolute_expiry)` pairs. Nothing is deduplicated: if the same
//! record is inserted twice, both copies persist until each expires.
//!
//! Expired entries are never observable. `get` sweeps the key it touches,
//! `sweep` walks the whole map, and both may run concurrently: the map is
//! partitioned by key hash so writers only contend per shard.
//!
//! The cache is also the authoritative store: at startup the served zone
//! is seeded into it, so the authoritative responder and the recursor read
//! through one data structure.

#![warn(missing_docs)]
#![warn(clippy::all)]

use dashmap::DashMap;
use rill_proto::{Name, RecordType, ResourceRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::trace;

pub mod entry;
pub mod key;

pub use entry::CachedRecord;
pub use key::CacheKey;

/// Shared record cache with per-record TTL expiry.
#[derive(Debug, Default)]
pub struct RecordCache {
    entries: DashMap<CacheKey, Vec<CachedRecord>>,
    stats: CacheStats,
}

impl RecordCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record under `(record.owner, record.type)` with expiry
    /// `now + record.ttl`. No deduplication.
    pub fn put(&self, record: ResourceRecord) {
        self.put_at(record, Instant::now());
    }

    /// Inserts every record of an iterator.
    pub fn put_all(&self, records: impl IntoIterator<Item = ResourceRecord>) {
        let now = Instant::now();
        for record in records {
            self.put_at(record, now);
        }
    }

    fn put_at(&self, record: ResourceRecord, now: Instant) {
        let key = CacheKey::new(record.name(), record.rtype());
        trace!(owner = %record.name(), rtype = %record.rtype(), ttl = record.ttl(), "cache insert");
        self.entries
            .entry(key)
            .or_default()
            .push(CachedRecord::new(record, now));
    }

    /// Returns all live records under `(owner, type)`, each carrying its
    /// remaining TTL. Expired entries under the key are dropped as a side
    /// effect; a fully drained key is deleted.
    pub fn get(&self, owner: &Name, rtype: RecordType) -> Vec<ResourceRecord> {
        let now = Instant::now();
        let key = CacheKey::new(owner, rtype);

        let records = match self.entries.get_mut(&key) {
            Some(mut slot) => {
                slot.retain(|entry| !entry.is_expired(now));
                slot.iter().map(|e| e.with_remaining_ttl(now)).collect()
            }
            None => Vec::new(),
        };
        self.entries.remove_if(&key, |_, slot| slot.is_empty());

        if records.is_empty() {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
        }
        records
    }

    /// Returns true if `(owner, type)` has at least one live entry.
    pub fn contains(&self, owner: &Name, rtype: RecordType) -> bool {
        let now = Instant::now();
        let key = CacheKey::new(owner, rtype);
        self.entries
            .get(&key)
            .is_some_and(|slot| slot.iter().any(|entry| !entry.is_expired(now)))
    }

    /// Removes every expired entry and deletes drained keys. Idempotent.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.entries.retain(|_, slot| {
            slot.retain(|entry| !entry.is_expired(now));
            !slot.is_empty()
        });
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the hit/miss counters.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

/// Cache hit/miss counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheStats {
    /// Number of `get` calls that returned at least one record.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of `get` calls that returned nothing.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
