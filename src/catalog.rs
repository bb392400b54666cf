//! Host-populated type catalog
//!
//! Rust has no runtime reflection, so the metadata the container needs is
//! declared up front: which types are interfaces or value types, what
//! constructors a class has, and which services it implements.
//!
//! # Example
//!
//! ```rust
//! use activator::{TypeCatalog, TypeInfo, TypeIntrospector, TypeKind};
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! #[derive(Default)]
//! struct FixedClock;
//!
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 {
//!         42
//!     }
//! }
//!
//! let types = TypeCatalog::new();
//! types
//!     .class::<FixedClock>()
//!     .default_constructor()
//!     .implements::<dyn Clock>(|clock| clock as Arc<dyn Clock>);
//!
//! assert_eq!(types.kind(&TypeInfo::of::<dyn Clock>()), TypeKind::Interface);
//! assert!(types.is_assignable(&TypeInfo::of::<dyn Clock>(), &TypeInfo::of::<FixedClock>()));
//! ```

use crate::introspect::{Arguments, Constructor, TypeIntrospector, UpcastFn};
use crate::types::{Instance, TypeInfo, TypeKind};
use crate::Result;
use ahash::{HashMap, RandomState};
use dashmap::DashMap;
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

type DefaultFn = fn() -> Instance;

#[derive(Default)]
struct TypeRecord {
    kind: TypeKind,
    constructors: Vec<Constructor>,
    upcasts: HashMap<TypeId, UpcastFn>,
    default_value: Option<DefaultFn>,
}

/// Types that describe their own constructors and relations.
///
/// Implemented by hand or with `#[derive(Inject)]` (feature `derive`).
pub trait Describe: Send + Sync + Sized + 'static {
    fn describe(class: ClassBuilder<'_, Self>) -> ClassBuilder<'_, Self>;
}

/// Concurrent catalog of type metadata; the default [`TypeIntrospector`].
///
/// Types that were never declared are reported as [`TypeKind::Class`] with no
/// constructors.
pub struct TypeCatalog {
    records: DashMap<TypeId, TypeRecord, RandomState>,
}

impl TypeCatalog {
    /// Create a catalog pre-seeded with primitive value types, text types and
    /// the type-of-types markers.
    pub fn new() -> Self {
        let catalog = Self::empty();

        catalog
            .value::<bool>()
            .value::<char>()
            .value::<i8>()
            .value::<i16>()
            .value::<i32>()
            .value::<i64>()
            .value::<i128>()
            .value::<isize>()
            .value::<u8>()
            .value::<u16>()
            .value::<u32>()
            .value::<u64>()
            .value::<u128>()
            .value::<usize>()
            .value::<f32>()
            .value::<f64>()
            .value::<()>()
            .declare::<String>(TypeKind::Text)
            .declare::<str>(TypeKind::Text)
            .declare::<&'static str>(TypeKind::Text)
            .declare::<TypeInfo>(TypeKind::Meta)
            .declare::<TypeId>(TypeKind::Meta);

        catalog
    }

    /// Create a catalog without any pre-declared types
    pub fn empty() -> Self {
        Self {
            records: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Set the kind of `T`
    pub fn declare<T: ?Sized + 'static>(&self, kind: TypeKind) -> &Self {
        self.records.entry(TypeId::of::<T>()).or_default().kind = kind;
        self
    }

    /// Declare `T` as an interface (typically `dyn Trait`)
    pub fn interface<T: ?Sized + 'static>(&self) -> &Self {
        self.declare::<T>(TypeKind::Interface)
    }

    /// Declare `T` as a value type whose default is `T::default()`
    pub fn value<T: Default + Send + Sync + 'static>(&self) -> &Self {
        let mut record = self.records.entry(TypeId::of::<T>()).or_default();
        record.kind = TypeKind::Value;
        record.default_value = Some(|| Instance::of(T::default()));
        self
    }

    /// Declare (or extend) the class `T`
    pub fn class<T: Send + Sync + 'static>(&self) -> ClassBuilder<'_, T> {
        self.records.entry(TypeId::of::<T>()).or_default();
        ClassBuilder {
            catalog: self,
            _marker: PhantomData,
        }
    }

    /// Let `T` describe itself
    pub fn describe<T: Describe>(&self) -> &Self {
        T::describe(self.class::<T>());
        self
    }

    /// Whether `T` has been declared
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.records.contains_key(&TypeId::of::<T>())
    }

    /// Number of declared types
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeCatalog")
            .field("types", &self.len())
            .finish()
    }
}

impl TypeIntrospector for TypeCatalog {
    fn kind(&self, ty: &TypeInfo) -> TypeKind {
        self.records
            .get(&ty.id())
            .map(|record| record.kind)
            .unwrap_or(if ty.is_trait_object() {
                TypeKind::Interface
            } else {
                TypeKind::Class
            })
    }

    fn constructors(&self, ty: &TypeInfo) -> Vec<Constructor> {
        self.records
            .get(&ty.id())
            .map(|record| record.constructors.clone())
            .unwrap_or_default()
    }

    fn upcast(&self, implementation: &TypeInfo, service: &TypeInfo) -> Option<UpcastFn> {
        self.records
            .get(&implementation.id())
            .and_then(|record| record.upcasts.get(&service.id()).cloned())
    }

    fn default_value(&self, ty: &TypeInfo) -> Option<Instance> {
        let make = self.records.get(&ty.id()).and_then(|record| record.default_value);
        make.map(|make| make())
    }
}

/// Fluent declaration of a class's constructors and implemented services.
pub struct ClassBuilder<'a, T> {
    catalog: &'a TypeCatalog,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: Send + Sync + 'static> ClassBuilder<'a, T> {
    fn update(&self, f: impl FnOnce(&mut TypeRecord)) {
        f(&mut self.catalog.records.entry(TypeId::of::<T>()).or_default());
    }

    /// Mark the class abstract: it can be a service type but not an implementation
    pub fn abstract_class(self) -> Self {
        self.update(|record| record.kind = TypeKind::Abstract);
        self
    }

    /// Append a public constructor
    pub fn constructor<F>(self, params: Vec<TypeInfo>, invoke: F) -> Self
    where
        F: Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    {
        self.constructor_from(Constructor::new(params, invoke))
    }

    /// Append a non-public constructor
    pub fn non_public_constructor<F>(self, params: Vec<TypeInfo>, invoke: F) -> Self
    where
        F: Fn(&Arguments) -> Result<T> + Send + Sync + 'static,
    {
        self.constructor_from(Constructor::new(params, invoke).non_public())
    }

    /// Append a parameterless constructor calling `T::default()`
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(Vec::new(), |_| Ok(T::default()))
    }

    fn constructor_from(self, constructor: Constructor) -> Self {
        #[cfg(feature = "logging")]
        trace!(
            target: "activator",
            class = std::any::type_name::<T>(),
            params = %constructor.signature(),
            "Declaring constructor"
        );

        self.update(|record| record.constructors.push(constructor));
        self
    }

    /// Declare that `T` implements the service `S`.
    ///
    /// `cast` performs the unsizing conversion, usually `|t| t as Arc<dyn S>`.
    /// An undeclared `S` is declared as an interface.
    pub fn implements<S: ?Sized + Send + Sync + 'static>(self, cast: fn(Arc<T>) -> Arc<S>) -> Self {
        let upcast: UpcastFn = Arc::new(move |instance: &Instance| {
            instance.downcast::<T>().map(|concrete| Instance::new(cast(concrete)))
        });

        self.update(|record| {
            record.upcasts.insert(TypeId::of::<S>(), upcast);
        });
        self.catalog
            .records
            .entry(TypeId::of::<S>())
            .or_insert_with(|| TypeRecord {
                kind: TypeKind::Interface,
                ..TypeRecord::default()
            });
        self
    }
}
