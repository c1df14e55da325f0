//! Structural interning of shared object graphs.
//!
//! Host objects are handed to the engine as type erased [`Handle`]s. What a type looks like to the
//! engine (its children, its intrinsic values and how a child slot is rewritten) is described by a
//! rule in a [`rules::Registry`]. Rules are built from the accessors collected in
//! [`capability::Capabilities`], so the engine itself never needs to know the concrete host types.
//!
//! Two nodes are structurally equal when they have the same runtime type, equal intrinsic values
//! and structurally equal children. Children are canonicalized before their parent is
//! fingerprinted, so comparing children reduces to comparing the identity of their canonical
//! representatives (hash consing).
use std::any::{Any, TypeId};
use std::sync::Arc;
use thiserror::Error;

/// A shared, type erased reference to a node of the host's object graph.
pub type Handle = Arc<dyn Any + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DedupError {
    /// No accessor for the given field or method has been registered.
    #[error("Capability {name} is unavailable on {type_name}")]
    CapabilityUnavailable { type_name: &'static str, name: &'static str },

    #[error("Field {name} of {type_name} cannot be written")]
    Immutable { type_name: &'static str, name: &'static str },

    #[error("Expected a value of type {expected} for {name}")]
    TypeMismatch { expected: &'static str, name: &'static str },

    #[error("Failed to decompose {type_name}: {reason}")]
    Decomposition { type_name: &'static str, reason: String },

    /// Not a failure during traversal: types without a rule are leaves. This is only returned
    /// by APIs that explicitly require a rule.
    #[error("No decomposition rule registered for {type_name}")]
    UnsupportedType { type_name: &'static str },
}

/// The runtime type of the object behind the handle (not the type of the [`Arc`] itself).
#[inline]
pub fn type_of(handle: &Handle) -> TypeId {
    (**handle).type_id()
}

pub mod capability;
pub mod containers;
pub mod engine;
pub mod fingerprint;
pub mod index;
pub mod lazy;
pub mod rules;

pub use engine::{Deduplicator, Summary};
pub use fingerprint::{Fingerprint, FingerprintBuilder, NodeId, Value};
pub use index::IdentityIndex;
