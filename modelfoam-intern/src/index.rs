use crate::Handle;
use crate::fingerprint::Fingerprint;
use itertools::Itertools;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TypeStats {
    /// Nodes that became the canonical member of a new equivalence class.
    pub registered: usize,
    /// Lookups that found an already registered equivalence class.
    pub hits: usize,
    pub replaced: usize,
    pub trimmed: usize,
    pub failures: usize,
}

/// Maps fingerprints to the canonical member of their equivalence class.
///
/// The first node registered for a fingerprint stays canonical for the lifetime of the index
/// (until [`IdentityIndex::reset`]). The index keeps its canonical members alive, which also keeps
/// the node identities inside the stored fingerprints valid.
#[derive(Default)]
pub struct IdentityIndex {
    canonical: HashMap<Fingerprint, Handle>,
    successful: usize,
    trims: usize,
    per_type: HashMap<&'static str, TypeStats>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            canonical: HashMap::with_capacity(capacity),
            ..Default::default()
        }
    }

    pub fn intern_or_register(&mut self, node: &Handle, fingerprint: Fingerprint) -> Handle {
        let stats = self.per_type.entry(fingerprint.type_name()).or_default();
        match self.canonical.entry(fingerprint) {
            Entry::Occupied(entry) => {
                stats.hits += 1;
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                stats.registered += 1;
                entry.insert(node.clone()).clone()
            }
        }
    }

    pub fn record_full_replacement(&mut self, type_name: &'static str) {
        self.successful += 1;
        self.per_type.entry(type_name).or_default().replaced += 1;
    }

    pub fn record_partial_trim(&mut self, type_name: &'static str) {
        self.trims += 1;
        self.per_type.entry(type_name).or_default().trimmed += 1;
    }

    pub fn record_failure(&mut self, type_name: &'static str) {
        self.per_type.entry(type_name).or_default().failures += 1;
    }

    /// Number of nodes that have been replaced by their canonical equivalent.
    pub fn successful(&self) -> usize {
        self.successful
    }

    /// Number of nodes that were kept, but had at least one child replaced.
    pub fn trims(&self) -> usize {
        self.trims
    }

    pub fn failures(&self) -> usize {
        self.per_type.values().map(|s| s.failures).sum()
    }

    /// Sorted by replacements, descending.
    pub fn type_stats(&self) -> Vec<(&'static str, TypeStats)> {
        self.per_type
            .iter()
            .map(|(name, stats)| (*name, *stats))
            .sorted_by(|a, b| b.1.replaced.cmp(&a.1.replaced).then(a.0.cmp(b.0)))
            .collect_vec()
    }

    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }

    pub fn reset(&mut self) {
        self.canonical.clear();
        self.successful = 0;
        self.trims = 0;
        self.per_type.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FingerprintBuilder;
    use crate::rules::Layout;
    use std::any::TypeId;
    use std::sync::Arc;

    fn fingerprint(value: &str) -> Fingerprint {
        let mut builder = FingerprintBuilder::new(TypeId::of::<String>(), "String");
        builder.push(value);
        builder.finish(Layout::Leaf)
    }

    #[test_log::test]
    fn equal_fingerprints_resolve_to_the_first_node() {
        let mut index = IdentityIndex::new();
        let first: Handle = Arc::new("a".to_string());
        let second: Handle = Arc::new("a".to_string());
        let other: Handle = Arc::new("b".to_string());

        assert!(Arc::ptr_eq(&index.intern_or_register(&first, fingerprint("a")), &first));
        assert!(Arc::ptr_eq(&index.intern_or_register(&second, fingerprint("a")), &first));
        assert!(Arc::ptr_eq(&index.intern_or_register(&other, fingerprint("b")), &other));
        assert_eq!(index.len(), 2);

        index.reset();
        assert!(index.is_empty());
    }
}
