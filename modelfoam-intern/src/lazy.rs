//! Values that are expensive to compute, cheap to recompute and may be dropped at any time to free
//! memory. Readers never observe the difference: a reclaimed value is transparently recomputed on
//! the next access.
use arc_swap::ArcSwapOption;
use log::trace;
use quick_cache::sync::Cache;
use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use std::sync::Arc;

/// Something an external memory manager can empty at any time.
pub trait Reclaim: Send + Sync {
    /// Returns how many values have been dropped.
    fn reclaim_now(&self) -> usize;
}

/// A single reclaimable value.
pub struct LazySlot<V> {
    value: ArcSwapOption<V>,
}

impl<V> LazySlot<V> {
    pub fn new() -> Self {
        Self {
            value: ArcSwapOption::empty(),
        }
    }

    pub fn with_value(value: Arc<V>) -> Self {
        Self {
            value: ArcSwapOption::new(Some(value)),
        }
    }

    /// Returns the present value, or computes, stores and returns a new one.
    ///
    /// Two threads racing on an empty slot may both compute; the last store wins, but each caller
    /// gets back the value it computed itself.
    pub fn get_or_compute<F>(&self, compute: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.value.load_full() {
            return value;
        }

        let value = Arc::new(compute());
        self.value.store(Some(value.clone()));
        value
    }

    pub fn peek(&self) -> Option<Arc<V>> {
        self.value.load_full()
    }

    /// Drops the value. Returns whether there was one.
    pub fn reclaim(&self) -> bool {
        self.value.swap(None).is_some()
    }

    pub fn is_present(&self) -> bool {
        self.value.load().is_some()
    }
}

impl<V: Send + Sync> Reclaim for LazySlot<V> {
    fn reclaim_now(&self) -> usize {
        self.reclaim() as usize
    }
}

impl<V> Default for LazySlot<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Debug for LazySlot<V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazySlot")
            .field("present", &self.is_present())
            .finish()
    }
}

/// Lazily computed values per key, with a bounded number of entries.
///
/// Eviction by capacity and explicit reclaiming are both treated as memory pressure: the entry is
/// computed again on the next [`KeyedLazyCache::get`].
pub struct KeyedLazyCache<K, V> {
    entries: Cache<K, Arc<V>>,
}

impl<K, V> KeyedLazyCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Cache::new(capacity),
        }
    }

    pub fn get<F>(&self, key: &K, compute: F) -> Arc<V>
    where
        F: FnOnce(&K) -> V,
    {
        if let Some(value) = self.entries.get(key) {
            return value;
        }

        trace!("Computing lazy cache entry");
        let value = Arc::new(compute(key));
        self.entries.insert(key.clone(), value.clone());
        value
    }

    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key)
    }

    pub fn reclaim(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn reclaim_all(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Reclaim for KeyedLazyCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    fn reclaim_now(&self) -> usize {
        let count = self.len();
        self.reclaim_all();
        count
    }
}

#[cfg(test)]
mod tests;
