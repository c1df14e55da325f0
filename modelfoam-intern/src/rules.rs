use crate::capability::{Capabilities, FieldAccessor, downcast_handle};
use crate::containers::{MapKey, NodeList, NodeMap, NodeSet};
use crate::fingerprint::{FingerprintBuilder, NodeId, Value};
use crate::{DedupError, Handle};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Fixed, named fields.
    Record,
    /// Positional children.
    Sequence,
    /// Unordered children.
    Set,
    /// Unordered children, each tagged with a key.
    Map,
    /// No children, only intrinsic values.
    Leaf,
}

impl Layout {
    pub fn is_unordered(self) -> bool {
        matches!(self, Layout::Set | Layout::Map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InternPolicy {
    #[default]
    Canonicalize,
    /// Children are deduplicated, but the node itself is never swapped for an equal one,
    /// because the host depends on its identity.
    TraverseOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotKey {
    Field(&'static str),
    Index(usize),
    Key(Value),
    /// A set member, addressed by the node it currently holds.
    Member(NodeId),
}

pub struct Child {
    pub slot: SlotKey,
    pub value: Option<Handle>,
}

/// How a type is taken apart and put back together by the engine.
pub trait Decompose: Send + Sync {
    fn target(&self) -> TypeId;

    fn type_name(&self) -> &'static str;

    fn layout(&self) -> Layout;

    fn policy(&self) -> InternPolicy {
        InternPolicy::Canonicalize
    }

    fn children(&self, node: &dyn Any) -> Result<Vec<Child>, DedupError>;

    fn replace_child(&self, node: &dyn Any, slot: &SlotKey, value: Handle) -> Result<(), DedupError>;

    fn intrinsic(&self, node: &dyn Any, fingerprint: &mut FingerprintBuilder) -> Result<(), DedupError>;
}

#[derive(Default, Clone)]
pub struct Registry {
    rules: HashMap<TypeId, Arc<dyn Decompose>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later registrations for the same type win.
    pub fn register(&mut self, rule: impl Decompose + 'static) -> &mut Self {
        self.rules.insert(rule.target(), Arc::new(rule));
        self
    }

    /// Takes over every rule of `other`, replacing rules for the same types.
    pub fn extend(&mut self, other: Registry) -> &mut Self {
        self.rules.extend(other.rules);
        self
    }

    #[inline]
    pub fn rule_for(&self, type_id: TypeId) -> Option<&Arc<dyn Decompose>> {
        self.rules.get(&type_id)
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.rules.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn downcast_node<'a, T: Any>(node: &'a dyn Any, type_name: &'static str) -> Result<&'a T, DedupError> {
    node.downcast_ref::<T>()
        .ok_or_else(|| DedupError::Decomposition {
            type_name,
            reason: "node has an unexpected runtime type".to_string(),
        })
}

fn slot_mismatch(type_name: &'static str, slot: &SlotKey) -> DedupError {
    DedupError::Decomposition {
        type_name,
        reason: format!("no child at {:?}", slot),
    }
}

type IntrinsicFn<T> = dyn Fn(&T, &mut FingerprintBuilder) + Send + Sync;

/// A host type with named fields, reached through [`FieldAccessor`]s.
pub struct Record<T> {
    name: &'static str,
    fields: Vec<FieldAccessor>,
    intrinsic: Option<Box<IntrinsicFn<T>>>,
    policy: InternPolicy,
    _marker: PhantomData<fn(&T)>,
}

pub struct RecordBuilder<'c, T> {
    capabilities: &'c Capabilities,
    name: &'static str,
    fields: Vec<&'static str>,
    intrinsic: Option<Box<IntrinsicFn<T>>>,
    policy: InternPolicy,
}

impl<T: Any> Record<T> {
    pub fn builder<'c>(capabilities: &'c Capabilities, name: &'static str) -> RecordBuilder<'c, T> {
        RecordBuilder {
            capabilities,
            name,
            fields: Vec::new(),
            intrinsic: None,
            policy: InternPolicy::Canonicalize,
        }
    }

    fn field(&self, name: &str) -> Option<&FieldAccessor> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

impl<T: Any> RecordBuilder<'_, T> {
    pub fn field(mut self, name: &'static str) -> Self {
        self.fields.push(name);
        self
    }

    pub fn intrinsic<F>(mut self, intrinsic: F) -> Self
    where
        F: Fn(&T, &mut FingerprintBuilder) + Send + Sync + 'static,
    {
        self.intrinsic = Some(Box::new(intrinsic));
        self
    }

    pub fn traverse_only(mut self) -> Self {
        self.policy = InternPolicy::TraverseOnly;
        self
    }

    /// Resolves all fields. The first one that cannot be resolved fails the whole record.
    pub fn build(self) -> Result<Record<T>, DedupError> {
        let fields = self
            .fields
            .iter()
            .map(|&name| self.capabilities.resolve_field::<T>(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Record {
            name: self.name,
            fields,
            intrinsic: self.intrinsic,
            policy: self.policy,
            _marker: PhantomData,
        })
    }
}

impl<T: Any> Decompose for Record<T> {
    fn target(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        self.name
    }

    fn layout(&self) -> Layout {
        Layout::Record
    }

    fn policy(&self) -> InternPolicy {
        self.policy
    }

    fn children(&self, node: &dyn Any) -> Result<Vec<Child>, DedupError> {
        self.fields
            .iter()
            .map(|field| {
                Ok(Child {
                    slot: SlotKey::Field(field.name()),
                    value: field.get(node)?,
                })
            })
            .collect()
    }

    fn replace_child(&self, node: &dyn Any, slot: &SlotKey, value: Handle) -> Result<(), DedupError> {
        let SlotKey::Field(name) = slot else {
            return Err(slot_mismatch(self.name, slot));
        };

        self.field(name)
            .ok_or_else(|| slot_mismatch(self.name, slot))?
            .set(node, value)
    }

    fn intrinsic(&self, node: &dyn Any, fingerprint: &mut FingerprintBuilder) -> Result<(), DedupError> {
        if let Some(intrinsic) = &self.intrinsic {
            intrinsic(downcast_node::<T>(node, self.name)?, fingerprint);
        }
        Ok(())
    }
}

/// Immutable value types: compared by their intrinsic values, shared but never written to.
pub struct Leaf<T> {
    name: &'static str,
    intrinsic: Box<IntrinsicFn<T>>,
}

impl<T: Any> Leaf<T> {
    pub fn new<F>(name: &'static str, intrinsic: F) -> Self
    where
        F: Fn(&T, &mut FingerprintBuilder) + Send + Sync + 'static,
    {
        Self {
            name,
            intrinsic: Box::new(intrinsic),
        }
    }
}

impl<T: Any> Decompose for Leaf<T> {
    fn target(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        self.name
    }

    fn layout(&self) -> Layout {
        Layout::Leaf
    }

    fn children(&self, _node: &dyn Any) -> Result<Vec<Child>, DedupError> {
        Ok(Vec::new())
    }

    fn replace_child(&self, _node: &dyn Any, slot: &SlotKey, _value: Handle) -> Result<(), DedupError> {
        Err(slot_mismatch(self.name, slot))
    }

    fn intrinsic(&self, node: &dyn Any, fingerprint: &mut FingerprintBuilder) -> Result<(), DedupError> {
        (self.intrinsic)(downcast_node::<T>(node, self.name)?, fingerprint);
        Ok(())
    }
}

/// Rule for [`NodeList<T>`].
pub struct Sequence<T> {
    name: &'static str,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> Sequence<T> {
    pub fn new() -> Self {
        Self::named(type_name::<NodeList<T>>())
    }

    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn indexed_children<T: Any + Send + Sync>(items: Vec<Arc<T>>) -> Vec<Child> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| Child {
            slot: SlotKey::Index(index),
            value: Some(item as Handle),
        })
        .collect()
}

impl<T: Any + Send + Sync> Decompose for Sequence<T> {
    fn target(&self) -> TypeId {
        TypeId::of::<NodeList<T>>()
    }

    fn type_name(&self) -> &'static str {
        self.name
    }

    fn layout(&self) -> Layout {
        Layout::Sequence
    }

    fn children(&self, node: &dyn Any) -> Result<Vec<Child>, DedupError> {
        Ok(indexed_children(
            downcast_node::<NodeList<T>>(node, self.name)?.to_vec(),
        ))
    }

    fn replace_child(&self, node: &dyn Any, slot: &SlotKey, value: Handle) -> Result<(), DedupError> {
        let list = downcast_node::<NodeList<T>>(node, self.name)?;
        let SlotKey::Index(index) = slot else {
            return Err(slot_mismatch(self.name, slot));
        };

        if list.replace(*index, downcast_handle::<T>(value, self.name)?) {
            Ok(())
        } else {
            Err(slot_mismatch(self.name, slot))
        }
    }

    fn intrinsic(&self, _node: &dyn Any, _fingerprint: &mut FingerprintBuilder) -> Result<(), DedupError> {
        Ok(())
    }
}

/// Rule for [`NodeSet<T>`].
pub struct Set<T> {
    name: &'static str,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Any + Send + Sync> Set<T> {
    pub fn new() -> Self {
        Self {
            name: type_name::<NodeSet<T>>(),
            _marker: PhantomData,
        }
    }
}

impl<T: Any + Send + Sync> Default for Set<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any + Send + Sync> Decompose for Set<T> {
    fn target(&self) -> TypeId {
        TypeId::of::<NodeSet<T>>()
    }

    fn type_name(&self) -> &'static str {
        self.name
    }

    fn layout(&self) -> Layout {
        Layout::Set
    }

    fn children(&self, node: &dyn Any) -> Result<Vec<Child>, DedupError> {
        Ok(downcast_node::<NodeSet<T>>(node, self.name)?
            .to_vec()
            .into_iter()
            .map(|item| Child {
                slot: SlotKey::Member(NodeId::of_arc(&item)),
                value: Some(item as Handle),
            })
            .collect())
    }

    fn replace_child(&self, node: &dyn Any, slot: &SlotKey, value: Handle) -> Result<(), DedupError> {
        let set = downcast_node::<NodeSet<T>>(node, self.name)?;
        let SlotKey::Member(current) = slot else {
            return Err(slot_mismatch(self.name, slot));
        };

        // Collapses the member when its canonical twin is already in the set.
        if set.replace_member(*current, downcast_handle::<T>(value, self.name)?) {
            Ok(())
        } else {
            Err(slot_mismatch(self.name, slot))
        }
    }

    fn intrinsic(&self, _node: &dyn Any, _fingerprint: &mut FingerprintBuilder) -> Result<(), DedupError> {
        Ok(())
    }
}

/// Rule for [`NodeMap<K, V>`].
pub struct Map<K, V> {
    name: &'static str,
    _marker: PhantomData<fn(&K, &V)>,
}

impl<K: MapKey, V: Any + Send + Sync> Map<K, V> {
    pub fn new() -> Self {
        Self::named(type_name::<NodeMap<K, V>>())
    }

    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

impl<K: MapKey, V: Any + Send + Sync> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MapKey, V: Any + Send + Sync> Decompose for Map<K, V> {
    fn target(&self) -> TypeId {
        TypeId::of::<NodeMap<K, V>>()
    }

    fn type_name(&self) -> &'static str {
        self.name
    }

    fn layout(&self) -> Layout {
        Layout::Map
    }

    fn children(&self, node: &dyn Any) -> Result<Vec<Child>, DedupError> {
        Ok(downcast_node::<NodeMap<K, V>>(node, self.name)?
            .entries()
            .into_iter()
            .map(|(key, value)| Child {
                slot: SlotKey::Key(key.to_value()),
                value: Some(value as Handle),
            })
            .collect())
    }

    fn replace_child(&self, node: &dyn Any, slot: &SlotKey, value: Handle) -> Result<(), DedupError> {
        let map = downcast_node::<NodeMap<K, V>>(node, self.name)?;
        let SlotKey::Key(key) = slot else {
            return Err(slot_mismatch(self.name, slot));
        };

        if map.replace_by_value(key, downcast_handle::<V>(value, self.name)?) {
            Ok(())
        } else {
            Err(slot_mismatch(self.name, slot))
        }
    }

    fn intrinsic(&self, _node: &dyn Any, _fingerprint: &mut FingerprintBuilder) -> Result<(), DedupError> {
        Ok(())
    }
}
