use dashmap::DashMap;
use itertools::Itertools;
use log::debug;
use modelfoam_intern::lazy::Reclaim;
use std::sync::{Arc, Weak};

struct MapValue<K: ?Sized, V> {
    weak: Weak<K>,
    value: V,
}

/// A concurrent hash map keyed by the address behind a [`Weak`], so that tracking an object does
/// not keep it alive. Entries whose object is gone are pruned lazily, whenever the map would have
/// to grow on the next insert.
pub struct WeakKeyDashMapPruneOnInsert<K: ?Sized, V> {
    inner: DashMap<usize, MapValue<K, V>>,
}

#[inline]
fn address<K: ?Sized>(weak: &Weak<K>) -> usize {
    weak.as_ptr() as *const () as usize
}

impl<K: ?Sized, V> WeakKeyDashMapPruneOnInsert<K, V> {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: DashMap::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn insert(&self, key: Weak<K>, value: V) {
        self.try_prune();
        self.inner
            .insert(address(&key), MapValue { weak: key, value });
    }

    #[inline]
    pub fn contains_key(&self, key: &Weak<K>) -> bool {
        self.inner.contains_key(&address(key))
    }

    #[inline]
    fn try_prune(&self) {
        // Would have to allocate after the next insert.
        if self.inner.capacity() == self.inner.len() {
            self.inner.retain(|_, v| v.weak.strong_count() > 0);
        }
    }

    /// Calls `f` for every entry whose object is still alive.
    pub fn for_each_live<F>(&self, mut f: F)
    where
        F: FnMut(&Arc<K>, &V),
    {
        for entry in self.inner.iter() {
            if let Some(strong) = entry.weak.upgrade() {
                f(&strong, &entry.value);
            }
        }
    }

    pub fn live_count(&self) -> usize {
        self.inner
            .iter()
            .filter(|entry| entry.weak.strong_count() > 0)
            .count()
    }

    /// Number of entries, including not yet pruned dead ones.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: ?Sized, V> Default for WeakKeyDashMapPruneOnInsert<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ?Sized, V: Clone> WeakKeyDashMapPruneOnInsert<K, V> {
    pub fn values(&self) -> Vec<V> {
        self.inner.iter().map(|v| v.value.clone()).collect_vec()
    }
}

/// Stands in for the memory manager of the host: it knows every reclaimable slot without owning
/// it and can empty all of them at once, the same way memory pressure would.
#[derive(Default)]
pub struct SlotTracker {
    slots: WeakKeyDashMapPruneOnInsert<dyn Reclaim, &'static str>,
}

impl SlotTracker {
    pub fn new() -> Self {
        Self {
            slots: WeakKeyDashMapPruneOnInsert::with_capacity(64),
        }
    }

    pub fn track<R: Reclaim + 'static>(&self, slot: &Arc<R>, label: &'static str) {
        let weak: Weak<dyn Reclaim> = Arc::downgrade(slot) as Weak<R>;
        self.slots.insert(weak, label);
    }

    /// Empties every tracked slot that is still alive, returns how many values were dropped.
    pub fn reclaim_all(&self) -> usize {
        let mut reclaimed = 0;
        self.slots
            .for_each_live(|slot, _| reclaimed += slot.reclaim_now());
        debug!(
            "Reclaimed {} values from {} live slots",
            reclaimed,
            self.slots.live_count()
        );
        reclaimed
    }

    pub fn live_slots(&self) -> usize {
        self.slots.live_count()
    }

    /// Labels of all tracked slots, including ones that are already gone.
    pub fn labels(&self) -> Vec<&'static str> {
        self.slots.values()
    }
}

#[cfg(test)]
mod tests {
    use crate::util::weak_dashmap::SlotTracker;
    use modelfoam_intern::lazy::LazySlot;
    use std::sync::Arc;

    #[test]
    fn reclaims_live_slots_only() {
        let tracker = SlotTracker::new();
        let kept = Arc::new(LazySlot::with_value(Arc::new(1u32)));
        let dropped = Arc::new(LazySlot::with_value(Arc::new(2u32)));
        let empty = Arc::new(LazySlot::<u32>::new());

        tracker.track(&kept, "kept");
        tracker.track(&dropped, "dropped");
        tracker.track(&empty, "empty");
        drop(dropped);

        assert_eq!(tracker.live_slots(), 2);
        assert_eq!(tracker.reclaim_all(), 1);
        assert!(!kept.is_present());
        assert_eq!(tracker.labels().len(), 3);
    }
}
