//! TTL cache for asset API responses
//!
//! Entries are indexed by insertion time in a BTreeMap so a sweep only
//! touches expired buckets.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub item_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
}

struct Entry<V> {
    value: V,
    inserted_at: u64,
}

pub struct TtlCache<V> {
    entries: HashMap<String, Entry<V>>,
    // inserted_at -> keys inserted at that millisecond
    expiry_index: BTreeMap<u64, Vec<String>>,
    ttl_millis: u64,
    hit_count: u64,
    miss_count: u64,
    eviction_count: u64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            expiry_index: BTreeMap::new(),
            ttl_millis: ttl.as_millis() as u64,
            hit_count: 0,
            miss_count: 0,
            eviction_count: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_millis)
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, current_time_ms())
    }

    pub fn get_at(&mut self, key: &str, now_millis: u64) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => now_millis.saturating_sub(entry.inserted_at) >= self.ttl_millis,
            None => {
                self.miss_count += 1;
                return None;
            }
        };

        if expired {
            self.remove(key);
            self.miss_count += 1;
            return None;
        }

        self.hit_count += 1;
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn put(&mut self, key: impl Into<String>, value: V) {
        self.put_at(key, value, current_time_ms())
    }

    pub fn put_at(&mut self, key: impl Into<String>, value: V, now_millis: u64) {
        let key = key.into();
        self.unindex(&key);

        self.expiry_index
            .entry(now_millis)
            .or_default()
            .push(key.clone());
        self.entries.insert(
            key,
            Entry {
                value,
                inserted_at: now_millis,
            },
        );
    }

    pub fn remove(&mut self, key: &str) -> bool {
        if self.unindex(key) {
            self.eviction_count += 1;
            true
        } else {
            false
        }
    }

    fn unindex(&mut self, key: &str) -> bool {
        let Some(entry) = self.entries.remove(key) else {
            return false;
        };
        if let Some(keys) = self.expiry_index.get_mut(&entry.inserted_at) {
            keys.retain(|k| k != key);
            if keys.is_empty() {
                self.expiry_index.remove(&entry.inserted_at);
            }
        }
        true
    }

    /// Drop every entry older than the TTL; returns how many went
    pub fn cleanup_expired(&mut self, now_millis: u64) -> usize {
        let Some(cutoff) = now_millis.checked_sub(self.ttl_millis) else {
            return 0;
        };

        let expired: Vec<u64> = self
            .expiry_index
            .range(..=cutoff)
            .map(|(&t, _)| t)
            .collect();

        let mut cleaned = 0;
        for time in expired {
            if let Some(keys) = self.expiry_index.remove(&time) {
                for key in keys {
                    if self.entries.remove(&key).is_some() {
                        cleaned += 1;
                    }
                }
            }
        }

        self.eviction_count += cleaned as u64;
        cleaned
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            item_count: self.entries.len(),
            hit_count: self.hit_count,
            miss_count: self.miss_count,
            eviction_count: self.eviction_count,
        }
    }
}

pub type SharedCache<V> = Arc<Mutex<TtlCache<V>>>;

pub fn shared<V: Clone>(ttl: Duration) -> SharedCache<V> {
    Arc::new(Mutex::new(TtlCache::new(ttl)))
}

/// Sweep expired entries every `period` until the task is aborted
pub fn spawn_cleanup_task<V>(cache: SharedCache<V>, name: &'static str, period: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let (cleaned, stats) = {
                let mut guard = cache.lock().unwrap_or_else(|e| e.into_inner());
                let cleaned = guard.cleanup_expired(current_time_ms());
                (cleaned, guard.stats())
            };
            debug!(
                cache = name,
                cleaned,
                items = stats.item_count,
                hits = stats.hit_count,
                misses = stats.miss_count,
                evictions = stats.eviction_count,
                "Cache sweep"
            );
        }
    })
}

pub fn current_time_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_then_expire() {
        let mut cache = TtlCache::new(Duration::from_secs(300));
        cache.put_at("0xabc", 1u32, 1_000);

        assert_eq!(cache.get_at("0xabc", 1_000 + 299_999), Some(1));
        assert_eq!(cache.get_at("0xabc", 1_000 + 300_000), None);
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.eviction_count, 1);
    }

    #[test]
    fn test_overwrite_moves_index() {
        let mut cache = TtlCache::new(Duration::from_millis(100));
        cache.put_at("k", "old", 0);
        cache.put_at("k", "new", 90);

        assert_eq!(cache.cleanup_expired(150), 0);
        assert_eq!(cache.get_at("k", 150), Some("new"));
        assert_eq!(cache.cleanup_expired(190), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_only_touches_expired() {
        let mut cache = TtlCache::new(Duration::from_millis(100));
        cache.put_at("a", 1, 0);
        cache.put_at("b", 2, 50);
        cache.put_at("c", 3, 120);

        assert_eq!(cache.cleanup_expired(30), 0);
        assert_eq!(cache.cleanup_expired(160), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get_at("c", 160), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps() {
        let cache: SharedCache<u32> = shared(Duration::from_millis(1));
        cache.lock().unwrap().put_at("k", 1, 0);

        let task = spawn_cleanup_task(cache.clone(), "test", Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        tokio::task::yield_now().await;

        assert!(cache.lock().unwrap().is_empty());
        task.abort();
    }
}
