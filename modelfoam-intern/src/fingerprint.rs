use crate::Handle;
use crate::rules::{Layout, SlotKey};
use std::any::TypeId;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// The identity of a node: the address of its shared allocation.
/// Only meaningful while something keeps the node alive, which the visited set and the index do.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub fn of(handle: &Handle) -> Self {
        Self(Arc::as_ptr(handle) as *const () as usize)
    }

    #[inline]
    pub fn of_arc<T>(arc: &Arc<T>) -> Self {
        Self(Arc::as_ptr(arc) as *const () as usize)
    }
}

impl Debug for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({:#x})", self.0)
    }
}

/// Intrinsic (non-reference) values of a node. Floats are compared by their bit pattern, with all
/// NaNs collapsed into one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(u64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
    Ints(Arc<[i32]>),
}

impl Value {
    pub fn f32(value: f32) -> Self {
        Self::f64(value as f64)
    }

    pub fn f64(value: f64) -> Self {
        if value.is_nan() {
            Value::Float(f64::NAN.to_bits())
        } else {
            Value::Float(value.to_bits())
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::UInt(value as u64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::UInt(value as u64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UInt(value)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::UInt(value as u64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::f32(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Str(Arc::from(value.as_str()))
    }
}

impl From<&[i32]> for Value {
    fn from(value: &[i32]) -> Self {
        Value::Ints(Arc::from(value))
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(Arc::from(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Part {
    Value(Value),
    Node(NodeId),
    Null,
    Keyed(Value, Option<NodeId>),
}

/// Enough information to decide structural equality of two nodes whose children are canonical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    type_id: TypeId,
    type_name: &'static str,
    parts: Box<[Part]>,
}

impl Fingerprint {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }
}

pub struct FingerprintBuilder {
    type_id: TypeId,
    type_name: &'static str,
    values: Vec<Part>,
    children: Vec<Part>,
}

impl FingerprintBuilder {
    pub fn new(type_id: TypeId, type_name: &'static str) -> Self {
        Self {
            type_id,
            type_name,
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, value: impl Into<Value>) -> &mut Self {
        self.values.push(Part::Value(value.into()));
        self
    }

    pub fn push_floats(&mut self, values: &[f32]) -> &mut Self {
        self.values
            .extend(values.iter().map(|&v| Part::Value(Value::f32(v))));
        self
    }

    /// Records an identity as an intrinsic value, for references the engine must not descend into.
    pub fn push_identity(&mut self, node: NodeId) -> &mut Self {
        self.values.push(Part::Node(node));
        self
    }

    pub(crate) fn child(&mut self, slot: SlotKey, child: Option<NodeId>) {
        let part = match (slot, child) {
            (SlotKey::Key(key), child) => Part::Keyed(key, child),
            (_, Some(id)) => Part::Node(id),
            (_, None) => Part::Null,
        };
        self.children.push(part);
    }

    pub(crate) fn finish(mut self, layout: Layout) -> Fingerprint {
        if layout.is_unordered() {
            self.children.sort_unstable();
        }
        // Equal members of a set are one member.
        if layout == Layout::Set {
            self.children.dedup();
        }

        let mut parts = self.values;
        parts.append(&mut self.children);

        Fingerprint {
            type_id: self.type_id,
            type_name: self.type_name,
            parts: parts.into_boxed_slice(),
        }
    }
}
