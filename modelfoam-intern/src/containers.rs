//! Reference holders the engine can rewrite through a shared reference.
//!
//! Host objects are shared (`Arc`) and the engine never gets `&mut` access, so every reference that
//! should be eligible for rewriting has to live in one of these. [`Slot`] and [`OptionalSlot`] are
//! single fields, [`NodeList`], [`NodeSet`] and [`NodeMap`] are containers the engine owns the
//! rules for (see [`crate::rules`]).
use crate::fingerprint::{NodeId, Value};
use arc_swap::{ArcSwap, ArcSwapOption};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::hash::Hash;
use itertools::Itertools;
use std::sync::{Arc, PoisonError, RwLock};

pub struct Slot<T> {
    inner: ArcSwap<T>,
}

impl<T> Slot<T> {
    pub fn new(value: Arc<T>) -> Self {
        Self {
            inner: ArcSwap::new(value),
        }
    }

    pub fn from_value(value: T) -> Self {
        Self::new(Arc::new(value))
    }

    #[inline]
    pub fn load(&self) -> Arc<T> {
        self.inner.load_full()
    }

    #[inline]
    pub fn store(&self, value: Arc<T>) {
        self.inner.store(value)
    }

    pub fn points_to(&self, other: &Arc<T>) -> bool {
        Arc::ptr_eq(&self.inner.load_full(), other)
    }
}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self::from_value(T::default())
    }
}

impl<T: Debug> Debug for Slot<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&**self.inner.load(), f)
    }
}

pub struct OptionalSlot<T> {
    inner: ArcSwapOption<T>,
}

impl<T> OptionalSlot<T> {
    pub fn new(value: Option<Arc<T>>) -> Self {
        Self {
            inner: ArcSwapOption::new(value),
        }
    }

    pub fn empty() -> Self {
        Self::new(None)
    }

    #[inline]
    pub fn load(&self) -> Option<Arc<T>> {
        self.inner.load_full()
    }

    #[inline]
    pub fn store(&self, value: Option<Arc<T>>) {
        self.inner.store(value)
    }
}

impl<T> Default for OptionalSlot<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Debug for OptionalSlot<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // Printing the content would recurse endlessly for self referencing nodes.
        match &*self.inner.load() {
            Some(arc) => write!(f, "Some({:p})", Arc::as_ptr(arc)),
            None => write!(f, "None"),
        }
    }
}

/// An ordered sequence of nodes, compared positionally.
pub struct NodeList<T> {
    items: RwLock<Vec<Arc<T>>>,
}

impl<T> NodeList<T> {
    pub fn new(items: Vec<Arc<T>>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = T>) -> Self {
        Self::new(values.into_iter().map(Arc::new).collect())
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Arc<T>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns false if the index is out of bounds.
    pub fn replace(&self, index: usize, value: Arc<T>) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl<T> Default for NodeList<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Debug> Debug for NodeList<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

/// An unordered collection of nodes: two sets are equal when they hold the same canonical members,
/// regardless of insertion order. A node is held at most once.
pub struct NodeSet<T> {
    items: RwLock<Vec<Arc<T>>>,
}

impl<T> NodeSet<T> {
    pub fn new(items: Vec<Arc<T>>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().unique_by(NodeId::of_arc).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, node: &Arc<T>) -> bool {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|item| Arc::ptr_eq(item, node))
    }

    pub fn to_vec(&self) -> Vec<Arc<T>> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swaps the member `current` for `value`. When `value` already is a member, `current` is
    /// dropped instead. Returns false if `current` is not a member.
    pub(crate) fn replace_member(&self, current: NodeId, value: Arc<T>) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = items.iter().position(|item| NodeId::of_arc(item) == current) else {
            return false;
        };

        if items.iter().any(|item| Arc::ptr_eq(item, &value)) {
            items.remove(index);
        } else {
            items[index] = value;
        }
        true
    }
}

impl<T: Debug> Debug for NodeSet<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.to_vec()).finish()
    }
}

/// Keys of a [`NodeMap`] are plain values, they take part in the fingerprint but are never
/// deduplicated themselves.
pub trait MapKey: Eq + Hash + Clone + Send + Sync + 'static {
    fn to_value(&self) -> Value;
}

impl MapKey for String {
    fn to_value(&self) -> Value {
        Value::from(self)
    }
}

impl MapKey for u32 {
    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

/// An unordered map from values to nodes, compared by key/value equality.
pub struct NodeMap<K, V> {
    entries: RwLock<HashMap<K, Arc<V>>>,
}

impl<K: MapKey, V> NodeMap<K, V> {
    pub fn new(entries: HashMap<K, Arc<V>>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::new(values.into_iter().map(|(k, v)| (k, Arc::new(v))).collect())
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<(K, Arc<V>)> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Replaces the value of the entry whose key maps to `key`. Returns false if there is none.
    pub(crate) fn replace_by_value(&self, key: &Value, value: Arc<V>) -> bool {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|(k, _)| &k.to_value() == key) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

impl<K: MapKey, V> Default for NodeMap<K, V> {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl<K: MapKey + Debug, V: Debug> Debug for NodeMap<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}
