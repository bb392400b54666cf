//! Runtime type information and type-erased instances
//!
//! [`TypeInfo`] stands in for a reflected type handle, [`TypeKind`] for the
//! classification a reflection facility would report, and [`Instance`] is the
//! type-erased value that flows through the container.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A runtime type handle: `TypeId` plus a human readable name.
///
/// Works for sized types as well as trait objects, so both `ConsoleLogger`
/// and `dyn Logger` can be described.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
    trait_object: bool,
}

impl TypeInfo {
    /// Type information for `T`
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        let name = std::any::type_name::<T>();
        Self {
            id: TypeId::of::<T>(),
            name,
            trait_object: name.starts_with("dyn "),
        }
    }

    /// The underlying `TypeId`
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The type name as reported by `std::any::type_name`
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this describes a `dyn Trait` type
    #[inline]
    pub fn is_trait_object(&self) -> bool {
        self.trait_object
    }
}

impl PartialEq for TypeInfo {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Classification of a type, as reported by a [`TypeIntrospector`](crate::TypeIntrospector).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TypeKind {
    /// Concrete, instantiable reference type
    #[default]
    Class,
    /// Reference type that cannot be instantiated directly
    Abstract,
    /// Contract type (usually a `dyn Trait`)
    Interface,
    /// Array or sequence type
    Array,
    /// Plain value type (numbers, booleans, ...)
    Value,
    /// Text type (`String`, `str`)
    Text,
    /// Type-of-types (`TypeInfo`, `TypeId`)
    Meta,
}

impl TypeKind {
    /// Whether values of this kind are handed out by reference
    #[inline]
    pub fn is_reference(self) -> bool {
        !matches!(self, TypeKind::Value)
    }

    /// Whether this kind may never be used as a service type
    #[inline]
    pub fn is_restricted(self) -> bool {
        matches!(self, TypeKind::Text | TypeKind::Meta)
    }

    /// Whether a constructor of this kind can be invoked
    #[inline]
    pub fn is_instantiable(self) -> bool {
        !matches!(self, TypeKind::Abstract | TypeKind::Interface | TypeKind::Array)
    }
}

/// A type-erased service instance.
///
/// The payload is always an `Arc<T>` for the instance's declared type `T`,
/// which may be a trait object. Cloning an `Instance` shares the payload.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    ty: TypeInfo,
}

impl Instance {
    /// Wrap a shared value whose declared type is `T`
    #[inline]
    pub fn new<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            value: Arc::new(value),
            ty: TypeInfo::of::<T>(),
        }
    }

    /// Wrap an owned value
    #[inline]
    pub fn of<T: Send + Sync + 'static>(value: T) -> Self {
        Self::new(Arc::new(value))
    }

    /// Declared type of the payload
    #[inline]
    pub fn type_info(&self) -> TypeInfo {
        self.ty
    }

    /// Whether the declared type is `T`
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.ty.id() == TypeId::of::<T>()
    }

    /// Recover the typed handle, if the declared type is `T`
    #[inline]
    pub fn downcast<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.value.downcast_ref::<Arc<T>>().cloned()
    }

    /// Whether both handles share one payload
    #[inline]
    pub fn ptr_eq(a: &Instance, b: &Instance) -> bool {
        Arc::ptr_eq(&a.value, &b.value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").field("type", &self.ty).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    struct Square;

    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    #[test]
    fn test_type_info_identity() {
        assert_eq!(TypeInfo::of::<u32>(), TypeInfo::of::<u32>());
        assert_ne!(TypeInfo::of::<u32>(), TypeInfo::of::<u64>());
        assert_ne!(TypeInfo::of::<dyn Shape>(), TypeInfo::of::<Square>());
        assert!(TypeInfo::of::<dyn Shape>().name().contains("Shape"));
    }

    #[test]
    fn test_trait_object_detection() {
        assert!(TypeInfo::of::<dyn Shape>().is_trait_object());
        assert!(TypeInfo::of::<dyn Shape + Send>().is_trait_object());
        assert!(!TypeInfo::of::<Square>().is_trait_object());
        assert!(!TypeInfo::of::<Arc<dyn Shape>>().is_trait_object());
        assert!(!TypeInfo::of::<str>().is_trait_object());
    }

    #[test]
    fn test_instance_downcast_trait_object() {
        let shape: Arc<dyn Shape> = Arc::new(Square);
        let instance = Instance::new(Arc::clone(&shape));

        assert!(instance.is::<dyn Shape>());
        assert!(instance.downcast::<Square>().is_none());

        let back = instance.downcast::<dyn Shape>().unwrap();
        assert_eq!(back.sides(), 4);
        assert!(Arc::ptr_eq(&back, &shape));
    }

    #[test]
    fn test_instance_clone_shares_payload() {
        let a = Instance::of(7u8);
        let b = a.clone();
        let c = Instance::of(7u8);

        assert!(Instance::ptr_eq(&a, &b));
        assert!(!Instance::ptr_eq(&a, &c));
        assert_eq!(*a.downcast::<u8>().unwrap(), 7);
    }

    #[test]
    fn test_kind_classification() {
        assert!(TypeKind::Class.is_reference());
        assert!(!TypeKind::Value.is_reference());
        assert!(TypeKind::Text.is_restricted());
        assert!(TypeKind::Meta.is_restricted());
        assert!(!TypeKind::Interface.is_instantiable());
        assert!(!TypeKind::Array.is_instantiable());
        assert!(TypeKind::Class.is_instantiable());
    }
}
