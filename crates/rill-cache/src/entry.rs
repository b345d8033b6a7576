//! Cached record entries.

use rill_proto::ResourceRecord;
use std::time::{Duration, Instant};

/// One cached record with its absolute expiry.
///
/// Entries under the same key form an unordered multiset: inserting the
/// same record twice keeps both copies, each with its own expiry.
#[derive(Debug, Clone)]
pub struct CachedRecord {
    record: ResourceRecord,
    expires_at: Instant,
}

impl CachedRecord {
    /// Wraps a record, stamping `now + record.ttl` as the expiry.
    pub fn new(record: ResourceRecord, now: Instant) -> Self {
        let expires_at = now + Duration::from_secs(u64::from(record.ttl()));
        Self { record, expires_at }
    }

    /// Returns the stored record (with its insertion-time TTL).
    pub fn record(&self) -> &ResourceRecord {
        &self.record
    }

    /// Returns the absolute expiry.
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Returns true once `now` has reached the expiry. A TTL of 0 expires
    /// on the very instant of insertion.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Returns a copy of the record carrying its remaining TTL.
    pub fn with_remaining_ttl(&self, now: Instant) -> ResourceRecord {
        let remaining = self.expires_at.saturating_duration_since(now).as_secs() as u32;
        self.record.with_ttl(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_proto::Name;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn record(ttl: u32) -> ResourceRecord {
        ResourceRecord::a(
            Name::from_str("www.foo").unwrap(),
            ttl,
            Ipv4Addr::new(1, 2, 3, 4),
        )
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let now = Instant::now();
        let entry = CachedRecord::new(record(0), now);
        assert!(entry.is_expired(now));
    }

    #[test]
    fn test_remaining_ttl_decreases() {
        let now = Instant::now();
        let entry = CachedRecord::new(record(300), now);

        assert!(!entry.is_expired(now));
        assert_eq!(entry.with_remaining_ttl(now).ttl(), 300);

        let later = now + Duration::from_secs(100);
        assert_eq!(entry.with_remaining_ttl(later).ttl(), 200);

        let after = now + Duration::from_secs(400);
        assert!(entry.is_expired(after));
        assert_eq!(entry.with_remaining_ttl(after).ttl(), 0);
    }
}
