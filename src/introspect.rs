//! Type introspection capability
//!
//! The container never inspects types itself. Everything it needs to know
//! (constructors and their parameters, assignability, type kinds, default
//! values) comes from a [`TypeIntrospector`]. [`TypeCatalog`](crate::TypeCatalog)
//! is the default implementation.

use crate::types::{Instance, TypeInfo, TypeKind};
use crate::{DiError, Result};
use std::fmt;
use std::sync::Arc;

/// Converts an implementation instance into a service instance.
///
/// Returns `None` when the given instance is not of the expected
/// implementation type.
pub type UpcastFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

type InvokeFn = Arc<dyn Fn(&Arguments) -> Result<Instance> + Send + Sync>;

/// Visibility of a constructor. Both kinds take part in selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    NonPublic,
}

/// A constructor of an implementation type: parameter types plus an invoker.
#[derive(Clone)]
pub struct Constructor {
    owner: TypeInfo,
    params: Vec<TypeInfo>,
    visibility: Visibility,
    invoke: InvokeFn,
}

impl Constructor {
    /// Create a public constructor for `T`.
    ///
    /// The invoker receives one argument slot per entry in `params`, in order.
    pub fn new<T, F>(params: Vec<TypeInfo>, invoke: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            owner: TypeInfo::of::<T>(),
            params,
            visibility: Visibility::Public,
            invoke: Arc::new(move |args| invoke(args).map(Instance::of)),
        }
    }

    /// Mark this constructor as non-public
    #[inline]
    pub fn non_public(mut self) -> Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    /// Type this constructor creates
    #[inline]
    pub fn owner(&self) -> TypeInfo {
        self.owner
    }

    /// Declared parameter types
    #[inline]
    pub fn params(&self) -> &[TypeInfo] {
        &self.params
    }

    #[inline]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Whether the runtime types of `args` match the parameter list exactly
    pub fn accepts(&self, args: &[Instance]) -> bool {
        self.params.len() == args.len()
            && self
                .params
                .iter()
                .zip(args)
                .all(|(param, arg)| *param == arg.type_info())
    }

    /// Human readable parameter list, e.g. `dyn app::Logger, u32`
    pub fn signature(&self) -> String {
        signature_of(self.params.iter().copied())
    }

    /// Invoke the constructor. The instance's declared type is [`owner`](Self::owner).
    pub fn invoke(&self, args: &Arguments) -> Result<Instance> {
        if args.len() != self.params.len() {
            return Err(DiError::creation_failed_for(
                &self.owner,
                format!(
                    "constructor takes {} argument(s), {} supplied",
                    self.params.len(),
                    args.len()
                ),
            ));
        }
        (self.invoke)(args)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("owner", &self.owner)
            .field("params", &self.params)
            .field("visibility", &self.visibility)
            .finish()
    }
}

pub(crate) fn signature_of(types: impl Iterator<Item = TypeInfo>) -> String {
    types.map(|ty| ty.name()).collect::<Vec<_>>().join(", ")
}

/// Argument slots handed to a constructor invoker.
///
/// A slot is empty when a reference-typed dependency was neither registered
/// nor supplied. The accessors check the declared type of each slot.
pub struct Arguments {
    owner: TypeInfo,
    values: Vec<Option<Instance>>,
}

impl Arguments {
    pub(crate) fn new(owner: TypeInfo, values: Vec<Option<Instance>>) -> Self {
        Self { owner, values }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw slot at `index`
    pub fn get(&self, index: usize) -> Result<Option<&Instance>> {
        self.values.get(index).map(Option::as_ref).ok_or_else(|| {
            DiError::creation_failed_for(&self.owner, format!("no argument at position {index}"))
        })
    }

    /// A reference-typed dependency that may be absent
    pub fn service<S: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Result<Option<Arc<S>>> {
        match self.get(index)? {
            None => Ok(None),
            Some(instance) => instance.downcast::<S>().map(Some).ok_or_else(|| {
                DiError::creation_failed_for(
                    &self.owner,
                    format!(
                        "argument {index} is {}, expected {}",
                        instance.type_info(),
                        std::any::type_name::<S>()
                    ),
                )
            }),
        }
    }

    /// A dependency the constructor cannot do without
    pub fn required<S: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Result<Arc<S>> {
        self.service::<S>(index)?.ok_or_else(|| {
            DiError::creation_failed_for(
                &self.owner,
                format!(
                    "dependency {} at position {index} is unavailable",
                    std::any::type_name::<S>()
                ),
            )
        })
    }

    /// A value-typed argument, cloned out of its slot
    pub fn value<V: Clone + Send + Sync + 'static>(&self, index: usize) -> Result<V> {
        self.required::<V>(index).map(|value| V::clone(&value))
    }
}

/// Reflection facility consumed by the container.
pub trait TypeIntrospector: Send + Sync {
    /// Classify a type
    fn kind(&self, ty: &TypeInfo) -> TypeKind;

    /// All instance constructors of a type (public and non-public), in
    /// declaration order
    fn constructors(&self, ty: &TypeInfo) -> Vec<Constructor>;

    /// Conversion from an `implementation` instance to a `service` instance,
    /// if the implementation is assignable to the service
    fn upcast(&self, implementation: &TypeInfo, service: &TypeInfo) -> Option<UpcastFn>;

    /// Default value used for an unregistered parameter type; `None` for
    /// reference types
    fn default_value(&self, ty: &TypeInfo) -> Option<Instance>;

    /// Whether `implementation` may be registered for `service`
    fn is_assignable(&self, service: &TypeInfo, implementation: &TypeInfo) -> bool {
        service == implementation || self.upcast(implementation, service).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    fn point_ctor() -> Constructor {
        Constructor::new(
            vec![TypeInfo::of::<i32>(), TypeInfo::of::<i32>()],
            |args: &Arguments| {
                Ok(Point {
                    x: args.value(0)?,
                    y: args.value(1)?,
                })
            },
        )
    }

    #[test]
    fn test_constructor_invoke() {
        let ctor = point_ctor();
        let args = Arguments::new(
            ctor.owner(),
            vec![Some(Instance::of(1i32)), Some(Instance::of(2i32))],
        );

        let point = ctor.invoke(&args).unwrap().downcast::<Point>().unwrap();
        assert_eq!(*point, Point { x: 1, y: 2 });
    }

    #[test]
    fn test_constructor_accepts_exact_types_only() {
        let ctor = point_ctor();

        assert!(ctor.accepts(&[Instance::of(1i32), Instance::of(2i32)]));
        assert!(!ctor.accepts(&[Instance::of(1i64), Instance::of(2i32)]));
        assert!(!ctor.accepts(&[Instance::of(1i32)]));
        assert_eq!(ctor.signature(), "i32, i32");
    }

    #[test]
    fn test_arity_mismatch_is_reported() {
        let ctor = point_ctor();
        let args = Arguments::new(ctor.owner(), vec![Some(Instance::of(1i32))]);

        let err = ctor.invoke(&args).unwrap_err();
        assert!(matches!(err, DiError::CreationFailed { .. }));
    }

    #[test]
    fn test_argument_accessors() {
        let args = Arguments::new(
            TypeInfo::of::<Point>(),
            vec![None, Some(Instance::of(String::from("x")))],
        );

        assert!(args.service::<String>(0).unwrap().is_none());
        assert!(args.required::<String>(0).is_err());
        assert_eq!(args.value::<String>(1).unwrap(), "x");
        assert!(args.service::<u8>(1).is_err());
        assert!(args.get(2).is_err());
    }

    #[test]
    fn test_non_public_marker() {
        let ctor = point_ctor().non_public();
        assert_eq!(ctor.visibility(), Visibility::NonPublic);
    }
}
