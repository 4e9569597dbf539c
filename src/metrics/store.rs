use crate::metrics::ring_buffer::BoundedSeries;
use crate::metrics::types::{HeapSnapshot, NonHeapSnapshot, ThreadSnapshot};
use dashmap::DashMap;
use std::collections::BTreeSet;
use std::ops::DerefMut;

/// Per-instance history of polled metrics, keyed by encoded instance address.
///
/// Series are created on the first sample for a key and never evicted.
/// Appends hold only the owning shard's lock for the duration of the push,
/// and readers receive clones.
pub struct TimeSeriesCache {
    capacity: usize,
    threads: DashMap<String, BoundedSeries<ThreadSnapshot>>,
    heap: DashMap<String, BoundedSeries<HeapSnapshot>>,
    non_heap: DashMap<String, BoundedSeries<NonHeapSnapshot>>,
}

/// Returns the series for `key`, creating an empty one of `capacity` first if
/// needed. The returned guard keeps the entry locked, so creation and the
/// caller's subsequent offer are observed together.
pub fn get_or_create<'a, T: Clone>(
    map: &'a DashMap<String, BoundedSeries<T>>,
    key: &str,
    capacity: usize,
) -> impl DerefMut<Target = BoundedSeries<T>> + 'a {
    map.entry(key.to_string())
        .or_insert_with(|| BoundedSeries::new(capacity))
}

impl TimeSeriesCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            threads: DashMap::new(),
            heap: DashMap::new(),
            non_heap: DashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record_threads(&self, key: &str, snapshot: ThreadSnapshot) {
        if !key.is_empty() {
            get_or_create(&self.threads, key, self.capacity).offer(snapshot);
        }
    }

    pub fn record_heap(&self, key: &str, snapshot: HeapSnapshot) {
        if !key.is_empty() {
            get_or_create(&self.heap, key, self.capacity).offer(snapshot);
        }
    }

    pub fn record_non_heap(&self, key: &str, snapshot: NonHeapSnapshot) {
        if !key.is_empty() {
            get_or_create(&self.non_heap, key, self.capacity).offer(snapshot);
        }
    }

    pub fn thread_series(&self, key: &str) -> Option<BoundedSeries<ThreadSnapshot>> {
        self.threads.get(key).map(|series| series.clone())
    }

    pub fn heap_series(&self, key: &str) -> Option<BoundedSeries<HeapSnapshot>> {
        self.heap.get(key).map(|series| series.clone())
    }

    pub fn non_heap_series(&self, key: &str) -> Option<BoundedSeries<NonHeapSnapshot>> {
        self.non_heap.get(key).map(|series| series.clone())
    }

    /// Every instance key with at least one cached series.
    pub fn keys(&self) -> BTreeSet<String> {
        self.threads
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.heap.iter().map(|entry| entry.key().clone()))
            .chain(self.non_heap.iter().map(|entry| entry.key().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::types::Reading;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn threads(live: f64) -> ThreadSnapshot {
        ThreadSnapshot::from_readings(
            Reading::Measured(live),
            Reading::Measured(1.0),
            Reading::Measured(live),
            "12:00:00",
        )
    }

    #[test]
    fn test_series_created_on_first_record() {
        let cache = TimeSeriesCache::new(4);
        assert!(cache.thread_series("ag0g0g1g1f90").is_none());

        cache.record_threads("ag0g0g1g1f90", threads(10.0));

        let series = cache.thread_series("ag0g0g1g1f90").unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.capacity(), 4);
        assert!(cache.heap_series("ag0g0g1g1f90").is_none());
        assert_eq!(cache.keys().len(), 1);
    }

    #[test]
    fn test_series_bounded_per_key() {
        let cache = TimeSeriesCache::new(4);
        for live in 1..=6 {
            cache.record_threads("a", threads(live as f64));
        }
        cache.record_threads("b", threads(99.0));

        let lives: Vec<u64> = cache
            .thread_series("a")
            .unwrap()
            .iter()
            .map(|snapshot| snapshot.live.value)
            .collect();
        assert_eq!(lives, vec![3, 4, 5, 6]);
        assert_eq!(cache.thread_series("b").unwrap().len(), 1);
    }

    #[test]
    fn test_blank_key_ignored() {
        let cache = TimeSeriesCache::new(4);
        cache.record_threads("", threads(1.0));
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_get_or_create_keeps_existing() {
        let map: DashMap<String, BoundedSeries<u32>> = DashMap::new();
        get_or_create(&map, "k", 2).offer(1);
        get_or_create(&map, "k", 10).offer(2);

        let series = map.get("k").unwrap();
        assert_eq!(series.capacity(), 2);
        assert_eq!(series.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_concurrent_appends_never_exceed_capacity() {
        let cache = Arc::new(TimeSeriesCache::new(4));

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        cache.record_threads("shared", threads((worker * 100 + i) as f64));
                        if let Some(series) = cache.thread_series("shared") {
                            assert!(series.len() <= 4);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.thread_series("shared").unwrap().len(), 4);
    }
}
