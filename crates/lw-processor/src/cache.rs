use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// A minimal read-through TTL cache. Entries are authoritative for at most
/// `ttl` are authoritative for at most their TTL
/// window; on miss they defer to C1") — expiry is checked lazily on read,
/// there is no background sweep.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, (Instant, V)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let fresh = self.entries.get(key).filter(|e| e.0.elapsed() < self.ttl).map(|e| e.1.clone());
        if fresh.is_none() {
            self.entries.remove(key);
        }
        fresh
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    /// Drop every entry (spec §4.3 `clear_caches`, invoked by the monitor's
    /// maintenance loop).
    pub fn clear(&self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entries_are_not_returned() {
        let cache: TtlCache<u32, &str> = TtlCache::new(Duration::from_millis(10));
        cache.insert(1, "a");
        assert_eq!(cache.get(&1), Some("a"));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn clear_drops_everything() {
        let cache: TtlCache<u32, &str> = TtlCache::new(Duration::from_secs(60));
        cache.insert(1, "a");
        cache.clear();
        assert_eq!(cache.get(&1), None);
    }
}
