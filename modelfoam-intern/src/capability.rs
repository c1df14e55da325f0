//! Named accessors for fields and methods of host types the engine cannot see into.
//!
//! The host registers getters/setters once at startup, dependent code resolves them by name and
//! keeps the resolved accessor around. Resolution failures are reported as
//! [`DedupError::CapabilityUnavailable`], and it is up to the caller to decide whether that
//! disables a feature or aborts the initialization.
use crate::containers::{OptionalSlot, Slot};
use crate::{DedupError, Handle};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

type Getter = dyn Fn(&dyn Any) -> Result<Option<Handle>, DedupError> + Send + Sync;
type Setter = dyn Fn(&dyn Any, Handle) -> Result<(), DedupError> + Send + Sync;
type Method = dyn Fn(&dyn Any, &[Handle]) -> Result<Handle, DedupError> + Send + Sync;

#[derive(Clone)]
pub struct FieldAccessor {
    type_name: &'static str,
    name: &'static str,
    getter: Arc<Getter>,
    setter: Option<Arc<Setter>>,
}

impl FieldAccessor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_mutable(&self) -> bool {
        self.setter.is_some()
    }

    #[inline]
    pub fn get(&self, object: &dyn Any) -> Result<Option<Handle>, DedupError> {
        (self.getter)(object)
    }

    #[inline]
    pub fn set(&self, object: &dyn Any, value: Handle) -> Result<(), DedupError> {
        match &self.setter {
            Some(setter) => setter(object, value),
            None => Err(DedupError::Immutable {
                type_name: self.type_name,
                name: self.name,
            }),
        }
    }
}

#[derive(Clone)]
pub struct MethodAccessor {
    signature: &'static str,
    method: Arc<Method>,
}

impl MethodAccessor {
    pub fn signature(&self) -> &'static str {
        self.signature
    }

    #[inline]
    pub fn invoke(&self, receiver: &dyn Any, args: &[Handle]) -> Result<Handle, DedupError> {
        (self.method)(receiver, args)
    }
}

#[derive(Default)]
pub struct Capabilities {
    type_names: HashMap<TypeId, &'static str>,
    fields: HashMap<(TypeId, &'static str), FieldAccessor>,
    methods: HashMap<(TypeId, &'static str), MethodAccessor>,
}

fn downcast_object<'a, T: Any>(object: &'a dyn Any, name: &'static str) -> Result<&'a T, DedupError> {
    object
        .downcast_ref::<T>()
        .ok_or(DedupError::TypeMismatch {
            expected: type_name::<T>(),
            name,
        })
}

/// Turns a handle back into the typed [`Arc`] a slot expects.
pub fn downcast_handle<V: Any + Send + Sync>(value: Handle, name: &'static str) -> Result<Arc<V>, DedupError> {
    value.downcast::<V>().map_err(|_| DedupError::TypeMismatch {
        expected: type_name::<V>(),
        name,
    })
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a read-only field.
    pub fn register_field<T, G>(&mut self, name: &'static str, getter: G) -> &mut Self
    where
        T: Any,
        G: Fn(&T) -> Option<Handle> + Send + Sync + 'static,
    {
        self.insert_field::<T>(
            name,
            Arc::new(move |object: &dyn Any| -> Result<Option<Handle>, DedupError> {
                Ok(getter(downcast_object::<T>(object, name)?))
            }),
            None,
        )
    }

    pub fn register_field_with_setter<T, G, S>(&mut self, name: &'static str, getter: G, setter: S) -> &mut Self
    where
        T: Any,
        G: Fn(&T) -> Option<Handle> + Send + Sync + 'static,
        S: Fn(&T, Handle) -> Result<(), DedupError> + Send + Sync + 'static,
    {
        self.insert_field::<T>(
            name,
            Arc::new(move |object: &dyn Any| -> Result<Option<Handle>, DedupError> {
                Ok(getter(downcast_object::<T>(object, name)?))
            }),
            Some(Arc::new(move |object: &dyn Any, value: Handle| -> Result<(), DedupError> {
                setter(downcast_object::<T>(object, name)?, value)
            })),
        )
    }

    /// Registers a readable and writable field that is backed by a [`Slot`].
    pub fn register_slot<T, V>(&mut self, name: &'static str, project: fn(&T) -> &Slot<V>) -> &mut Self
    where
        T: Any,
        V: Any + Send + Sync,
    {
        self.register_field_with_setter::<T, _, _>(
            name,
            move |object: &T| Some(project(object).load() as Handle),
            move |object: &T, value: Handle| {
                project(object).store(downcast_handle::<V>(value, name)?);
                Ok(())
            },
        )
    }

    pub fn register_optional_slot<T, V>(&mut self, name: &'static str, project: fn(&T) -> &OptionalSlot<V>) -> &mut Self
    where
        T: Any,
        V: Any + Send + Sync,
    {
        self.register_field_with_setter::<T, _, _>(
            name,
            move |object: &T| project(object).load().map(|v| v as Handle),
            move |object: &T, value: Handle| {
                project(object).store(Some(downcast_handle::<V>(value, name)?));
                Ok(())
            },
        )
    }

    pub fn register_method<T, F>(&mut self, signature: &'static str, method: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T, &[Handle]) -> Result<Handle, DedupError> + Send + Sync + 'static,
    {
        self.type_names.insert(TypeId::of::<T>(), type_name::<T>());
        self.methods.insert(
            (TypeId::of::<T>(), signature),
            MethodAccessor {
                signature,
                method: Arc::new(move |receiver: &dyn Any, args: &[Handle]| -> Result<Handle, DedupError> {
                    method(downcast_object::<T>(receiver, signature)?, args)
                }),
            },
        );
        self
    }

    fn insert_field<T: Any>(&mut self, name: &'static str, getter: Arc<Getter>, setter: Option<Arc<Setter>>) -> &mut Self {
        self.type_names.insert(TypeId::of::<T>(), type_name::<T>());
        self.fields.insert(
            (TypeId::of::<T>(), name),
            FieldAccessor {
                type_name: type_name::<T>(),
                name,
                getter,
                setter,
            },
        );
        self
    }

    pub fn resolve_field<T: Any>(&self, name: &'static str) -> Result<FieldAccessor, DedupError> {
        self.fields
            .get(&(TypeId::of::<T>(), name))
            .cloned()
            .ok_or(DedupError::CapabilityUnavailable {
                type_name: type_name::<T>(),
                name,
            })
    }

    pub fn resolve_method<T: Any>(&self, signature: &'static str) -> Result<MethodAccessor, DedupError> {
        self.methods
            .get(&(TypeId::of::<T>(), signature))
            .cloned()
            .ok_or(DedupError::CapabilityUnavailable {
                type_name: type_name::<T>(),
                name: signature,
            })
    }

    fn type_name_of(&self, object: &dyn Any) -> &'static str {
        self.type_names
            .get(&object.type_id())
            .copied()
            .unwrap_or("<unregistered>")
    }

    fn field_of(&self, object: &dyn Any, name: &'static str) -> Result<&FieldAccessor, DedupError> {
        self.fields
            .get(&(object.type_id(), name))
            .ok_or_else(|| DedupError::CapabilityUnavailable {
                type_name: self.type_name_of(object),
                name,
            })
    }

    pub fn get_field(&self, object: &dyn Any, name: &'static str) -> Result<Option<Handle>, DedupError> {
        self.field_of(object, name)?.get(object)
    }

    pub fn set_field(&self, object: &dyn Any, name: &'static str, value: Handle) -> Result<(), DedupError> {
        self.field_of(object, name)?.set(object, value)
    }

    pub fn invoke_hidden(&self, object: &dyn Any, signature: &'static str, args: &[Handle]) -> Result<Handle, DedupError> {
        self.methods
            .get(&(object.type_id(), signature))
            .ok_or_else(|| DedupError::CapabilityUnavailable {
                type_name: self.type_name_of(object),
                name: signature,
            })?
            .invoke(object, args)
    }
}

#[cfg(test)]
mod tests {
    use crate::capability::Capabilities;
    use crate::{DedupError, Handle};
    use crate::containers::Slot;
    use std::any::Any;
    use std::sync::Arc;

    struct Holder {
        label: Slot<String>,
        fixed: Arc<String>,
    }

    fn capabilities() -> Capabilities {
        let mut caps = Capabilities::new();
        caps.register_slot::<Holder, String>("label", |h| &h.label)
            .register_field::<Holder, _>("fixed", |h| Some(h.fixed.clone() as Handle))
            .register_method::<Holder, _>("describe()", |h, _| {
                Ok(Arc::new(format!("holder {}", h.label.load())) as Handle)
            });
        caps
    }

    fn holder() -> Holder {
        Holder {
            label: Slot::new(Arc::new("a".to_string())),
            fixed: Arc::new("b".to_string()),
        }
    }

    #[test]
    fn get_and_set_through_slot() {
        let caps = capabilities();
        let holder = holder();

        caps.set_field(&holder, "label", Arc::new("changed".to_string()))
            .unwrap();
        let value = caps.get_field(&holder, "label").unwrap().unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "changed");
    }

    #[test]
    fn read_only_field_is_immutable() {
        let caps = capabilities();
        let holder = holder();
        let err = caps
            .set_field(&holder, "fixed", Arc::new("x".to_string()))
            .unwrap_err();
        assert!(matches!(err, DedupError::Immutable { name: "fixed", .. }));
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        let caps = capabilities();
        let holder = holder();
        let err = caps
            .set_field(&holder, "label", Arc::new(5u32))
            .unwrap_err();
        assert!(matches!(err, DedupError::TypeMismatch { name: "label", .. }));
        assert_eq!(holder.label.load().as_str(), "a");
    }

    #[test]
    fn missing_capabilities_are_reported() {
        let caps = capabilities();
        let holder = holder();
        assert!(matches!(
            caps.get_field(&holder, "nope"),
            Err(DedupError::CapabilityUnavailable { name: "nope", .. })
        ));
        assert!(caps.resolve_method::<String>("describe()").is_err());
        assert!(matches!(
            caps.get_field(&7u8 as &dyn Any, "label"),
            Err(DedupError::CapabilityUnavailable {
                type_name: "<unregistered>",
                ..
            })
        ));
    }

    #[test]
    fn hidden_method_invocation() {
        let caps = capabilities();
        let holder = holder();
        let result = caps.invoke_hidden(&holder, "describe()", &[]).unwrap();
        assert_eq!(result.downcast_ref::<String>().unwrap(), "holder a");

        let resolved = caps.resolve_method::<Holder>("describe()").unwrap();
        assert_eq!(resolved.signature(), "describe()");
    }
}
