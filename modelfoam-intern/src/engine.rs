use crate::fingerprint::{FingerprintBuilder, NodeId};
use crate::index::IdentityIndex;
use crate::rules::{Child, Decompose, InternPolicy, Registry};
use crate::{DedupError, Handle, type_of};
use log::{debug, trace};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

// Both variants hold on to the visited node, so its address cannot be reused within a pass.
enum Visit {
    InProgress(#[allow(unused)] Handle),
    Done {
        #[allow(unused)]
        original: Handle,
        canonical: Handle,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub full_replacements: usize,
    pub partial_trims: usize,
    pub failures: usize,
    pub canonical_instances: usize,
}

/// Rewrites object graphs so that structurally equal subgraphs share one canonical instance.
///
/// The [`IdentityIndex`] lives as long as the deduplicator, so equal nodes are merged across all
/// roots that are fed into it. The visited set only lives for one pass (one root), see
/// [`Deduplicator::begin_pass`].
pub struct Deduplicator {
    registry: Arc<Registry>,
    index: IdentityIndex,
    visited: HashMap<NodeId, Visit>,
    // While seeding, the root itself is registered without counting as a replacement.
    seeding: bool,
    pub max_recursion: u32,
}

impl Deduplicator {
    pub fn new(registry: Arc<Registry>, max_recursion: u32) -> Self {
        Self {
            registry,
            index: IdentityIndex::with_capacity(1024),
            visited: HashMap::new(),
            seeding: false,
            max_recursion,
        }
    }

    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }

    pub fn summary(&self) -> Summary {
        Summary {
            full_replacements: self.index.successful(),
            partial_trims: self.index.trims(),
            failures: self.index.failures(),
            canonical_instances: self.index.len(),
        }
    }

    /// Drops all canonical instances and counters.
    pub fn reset(&mut self) {
        self.visited.clear();
        self.index.reset();
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Forgets which nodes have been visited, but keeps all canonical instances.
    pub fn begin_pass(&mut self) {
        self.visited.clear();
    }

    /// Deduplicates `node` as the root of a fresh pass.
    pub fn deduplicate_root(&mut self, node: Handle) -> Handle {
        self.begin_pass();
        self.deduplicate(node, 0)
    }

    /// Typed convenience around [`Deduplicator::deduplicate_root`].
    pub fn deduplicate_arc<T: Any + Send + Sync>(&mut self, node: Arc<T>) -> Arc<T> {
        let canonical = self.deduplicate_root(node.clone());
        // Equal fingerprints imply equal runtime types, so this only falls back on a broken rule.
        canonical.downcast::<T>().unwrap_or(node)
    }

    /// Registers `node` (and its children) as canonical before any other graph is processed, so
    /// that later equal nodes are replaced by it instead of the other way around.
    pub fn seed(&mut self, node: Handle) -> Result<Handle, DedupError> {
        let type_id = type_of(&node);
        if self.registry.rule_for(type_id).is_none() {
            return Err(DedupError::UnsupportedType {
                type_name: "<unregistered>",
            });
        }

        self.seeding = true;
        let canonical = self.deduplicate_root(node);
        self.seeding = false;
        Ok(canonical)
    }

    /// Counts a replacement the host performed outside of the traversal, e.g. converting a model
    /// into a more compact representation before feeding it in.
    pub fn record_replacement(&mut self, type_name: &'static str) {
        self.index.record_full_replacement(type_name);
    }

    pub fn deduplicate(&mut self, node: Handle, depth: u32) -> Handle {
        if depth > self.max_recursion {
            return node;
        }

        let Some(rule) = self.registry.rule_for(type_of(&node)).cloned() else {
            return node;
        };

        let id = NodeId::of(&node);
        match self.visited.get(&id) {
            Some(Visit::Done { canonical, .. }) => return canonical.clone(),
            Some(Visit::InProgress(_)) => return node,
            None => {}
        }

        trace!("Visiting {} at depth {}", rule.type_name(), depth);
        self.visited.insert(id, Visit::InProgress(node.clone()));

        let result = match self.canonicalize(&node, rule.as_ref(), depth) {
            Ok(result) => result,
            Err(err) => {
                debug!("Leaving {} unmodified: {}", rule.type_name(), err);
                self.index.record_failure(rule.type_name());
                node.clone()
            }
        };

        self.visited.insert(
            id,
            Visit::Done {
                original: node,
                canonical: result.clone(),
            },
        );
        result
    }

    fn canonicalize(&mut self, node: &Handle, rule: &dyn Decompose, depth: u32) -> Result<Handle, DedupError> {
        let object: &dyn Any = node.as_ref();
        let children = rule.children(object)?;

        let mut fingerprint = FingerprintBuilder::new(rule.target(), rule.type_name());
        let mut trimmed = false;

        for Child { slot, value } in children {
            let Some(child) = value else {
                fingerprint.child(slot, None);
                continue;
            };

            let canonical = self.deduplicate(child.clone(), depth + 1);
            let canonical_id = NodeId::of(&canonical);

            if canonical_id != NodeId::of(&child) {
                match rule.replace_child(object, &slot, canonical) {
                    Ok(()) => trimmed = true,
                    // The slot keeps the old child, which is still structurally equal to the
                    // canonical one, so fingerprinting with the canonical identity stays correct.
                    Err(err) => {
                        debug!("Cannot rewrite {:?} of {}: {}", slot, rule.type_name(), err);
                        self.index.record_failure(rule.type_name());
                    }
                }
            }

            fingerprint.child(slot, Some(canonical_id));
        }

        rule.intrinsic(object, &mut fingerprint)?;

        if rule.policy() == InternPolicy::TraverseOnly {
            if trimmed {
                self.index.record_partial_trim(rule.type_name());
            }
            return Ok(node.clone());
        }

        let canonical = self
            .index
            .intern_or_register(node, fingerprint.finish(rule.layout()));

        if self.seeding && depth == 0 {
            return Ok(canonical);
        }

        if NodeId::of(&canonical) != NodeId::of(node) {
            self.index.record_full_replacement(rule.type_name());
        } else if trimmed {
            self.index.record_partial_trim(rule.type_name());
        }

        Ok(canonical)
    }
}

#[cfg(test)]
mod tests;
