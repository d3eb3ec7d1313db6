use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time source for the cache. Injected so tests can step time manually.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    created_at: Instant,
}

/// TTL cache for provider responses.
///
/// Expiry is lazy on read; `sweep` removes expired entries in bulk and is
/// meant to be called from a periodic task. When the cache is full, the entry
/// with the oldest creation time is evicted to make room.
pub struct ResponseCache<V> {
    entries: Mutex<HashMap<String, Entry<V>>>,
    ttl: Duration,
    max_entries: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self::with_clock(ttl, max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries,
            clock,
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        match entries.get(key) {
            Some(entry) if now.duration_since(entry.created_at) < self.ttl => {
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, value: V) {
        if self.max_entries == 0 {
            return;
        }

        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            // Evict the oldest-created entry to stay within bounds.
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            Entry {
                value,
                created_at: now,
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let before = entries.len();
        entries.retain(|_, e| now.duration_since(e.created_at) < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn the periodic sweeper for a shared cache.
pub fn spawn_sweeper<V: Clone + Send + 'static>(
    cache: Arc<ResponseCache<V>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let removed = cache.sweep();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired cache entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Manually advanced clock.
    struct TestClock {
        start: Instant,
        offset: Mutex<Duration>,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                start: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> Instant {
            self.start + *self.offset.lock().unwrap()
        }
    }

    fn cache_with_clock(
        ttl_secs: u64,
        max_entries: usize,
    ) -> (ResponseCache<String>, Arc<TestClock>) {
        let clock = Arc::new(TestClock::new());
        let cache = ResponseCache::with_clock(
            Duration::from_secs(ttl_secs),
            max_entries,
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        (cache, clock)
    }

    #[test]
    fn hit_within_ttl() {
        let (cache, _clock) = cache_with_clock(60, 10);
        cache.insert("k".into(), "v".into());
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn expiry_is_lazy_on_read() {
        let (cache, clock) = cache_with_clock(60, 10);
        cache.insert("k".into(), "v".into());

        clock.advance(Duration::from_secs(61));
        assert_eq!(cache.get("k"), None);
        // The expired entry was removed by the read itself.
        assert!(cache.is_empty());
    }

    #[test]
    fn overflow_evicts_oldest_created() {
        let (cache, clock) = cache_with_clock(600, 2);
        cache.insert("first".into(), "1".into());
        clock.advance(Duration::from_secs(1));
        cache.insert("second".into(), "2".into());
        clock.advance(Duration::from_secs(1));
        cache.insert("third".into(), "3".into());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("first"), None);
        assert_eq!(cache.get("second"), Some("2".to_string()));
        assert_eq!(cache.get("third"), Some("3".to_string()));
    }

    #[test]
    fn reinserting_an_existing_key_does_not_evict() {
        let (cache, _clock) = cache_with_clock(600, 2);
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        cache.insert("a".into(), "updated".into());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some("updated".to_string()));
        assert_eq!(cache.get("b"), Some("2".to_string()));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let (cache, clock) = cache_with_clock(60, 10);
        cache.insert("old".into(), "1".into());
        clock.advance(Duration::from_secs(59));
        cache.insert("fresh".into(), "2".into());
        clock.advance(Duration::from_secs(2));

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.get("old"), None);
        assert_eq!(cache.get("fresh"), Some("2".to_string()));
    }

    #[test]
    fn zero_capacity_caches_nothing() {
        let (cache, _clock) = cache_with_clock(60, 0);
        cache.insert("k".into(), "v".into());
        assert_eq!(cache.get("k"), None);
    }
}
