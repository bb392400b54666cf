//! # Activator - Constructor-Injection Container for Rust
//!
//! A thread-safe dependency injection container that builds object graphs
//! through constructors, caches one compiled creator per registration, and
//! detects circular constructor chains instead of overflowing the stack.
//!
//! ## Features
//!
//! - **Constructor injection** - parameters are resolved from the unnamed
//!   registration of their type
//! - **Lazy compiled creators** - built on first resolution, then reused
//! - **Transient and singleton lifetimes** - singletons are created exactly
//!   once, even under concurrent first access
//! - **Named registrations** - case-insensitive names next to the unnamed one
//! - **Cycle detection** - per execution context, so concurrency is never
//!   mistaken for recursion
//! - **Lock-free registry** - `DashMap` with `ahash`
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! Rust has no runtime reflection, so constructors and `implements`
//! relations are declared on a [`TypeCatalog`] first.
//!
//! ```rust
//! use activator::{Arguments, Container, TypeCatalog, TypeInfo};
//! use std::sync::Arc;
//!
//! trait Database: Send + Sync {
//!     fn url(&self) -> &str;
//! }
//!
//! struct Postgres;
//!
//! impl Database for Postgres {
//!     fn url(&self) -> &str {
//!         "postgres://localhost"
//!     }
//! }
//!
//! struct UserService {
//!     db: Arc<dyn Database>,
//! }
//!
//! let types = TypeCatalog::new();
//! types
//!     .class::<Postgres>()
//!     .constructor(Vec::new(), |_| Ok(Postgres))
//!     .implements::<dyn Database>(|pg| pg as Arc<dyn Database>);
//! types
//!     .class::<UserService>()
//!     .constructor(vec![TypeInfo::of::<dyn Database>()], |args: &Arguments| {
//!         Ok(UserService { db: args.required(0)? })
//!     });
//!
//! let container = Container::with_catalog(types);
//! container.singleton::<dyn Database, Postgres>()?;
//! container.transient::<UserService, UserService>()?;
//!
//! let users = container.get::<UserService>()?;
//! assert_eq!(users.db.url(), "postgres://localhost");
//! # Ok::<(), activator::DiError>(())
//! ```
//!
//! ## Named Registrations and Explicit Arguments
//!
//! ```rust
//! use activator::{Arguments, Container, Instance, Lifetime, TypeCatalog, TypeInfo};
//!
//! struct Endpoint {
//!     url: String,
//! }
//!
//! let types = TypeCatalog::new();
//! types
//!     .class::<Endpoint>()
//!     .constructor(Vec::new(), |_| Ok(Endpoint { url: "http://primary".into() }))
//!     .constructor(vec![TypeInfo::of::<String>()], |args: &Arguments| {
//!         Ok(Endpoint { url: args.value(0)? })
//!     });
//!
//! let container = Container::with_catalog(types);
//! container.register_self::<Endpoint>(Lifetime::Singleton)?;
//! container.register_self_named::<Endpoint>("Backup", Lifetime::Singleton)?;
//!
//! // Names compare case-insensitively
//! assert!(container.contains_named::<Endpoint>("backup"));
//!
//! // Explicit arguments always build a fresh instance
//! let custom = container.get_with::<Endpoint>(&[Instance::of(String::from("http://custom"))])?;
//! assert_eq!(custom.url, "http://custom");
//! assert_eq!(container.get::<Endpoint>()?.url, "http://primary");
//! # Ok::<(), activator::DiError>(())
//! ```
//!
//! ## Circular Dependencies
//!
//! ```rust
//! use activator::{Arguments, Container, DiError, TypeCatalog, TypeInfo};
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Chicken(Arc<Egg>);
//! #[derive(Debug)]
//! struct Egg(Arc<Chicken>);
//!
//! let types = TypeCatalog::new();
//! types.class::<Chicken>().constructor(vec![TypeInfo::of::<Egg>()], |args: &Arguments| {
//!     Ok(Chicken(args.required(0)?))
//! });
//! types.class::<Egg>().constructor(vec![TypeInfo::of::<Chicken>()], |args: &Arguments| {
//!     Ok(Egg(args.required(0)?))
//! });
//!
//! let container = Container::with_catalog(types);
//! container.transient::<Chicken, Chicken>()?;
//! container.transient::<Egg, Egg>()?;
//!
//! let err = container.get::<Chicken>().unwrap_err();
//! assert!(matches!(err, DiError::CircularDependency { .. }));
//! # Ok::<(), activator::DiError>(())
//! ```

// Lets derive output name `::activator` inside this crate's own tests
extern crate self as activator;

mod catalog;
mod compiler;
mod container;
mod error;
mod guard;
mod introspect;
mod lifetime;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod registration;
mod selector;
mod storage;
mod types;

pub use catalog::*;
pub use compiler::*;
pub use container::*;
pub use error::*;
pub use guard::*;
pub use introspect::*;
pub use lifetime::*;
pub use provider::*;
pub use registration::*;
pub use selector::*;
pub use storage::*;
pub use types::*;

#[cfg(feature = "derive")]
pub use activator_derive::Inject;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    #[cfg(feature = "derive")]
    pub use crate::Inject;
    pub use crate::{
        Arguments, Container, Describe, DiError, Implementation, Injectable, Instance, Lifetime, Module, Result,
        TypeCatalog, TypeInfo, TypeIntrospector, TypeKind,
    };
    pub use std::sync::Arc;
}


#[cfg(all(test, feature = "derive"))]
mod derive_tests {
    use crate::{Container, DiError, Inject, Lifetime, TypeCatalog};
    use std::sync::Arc;
    use std::sync::atomic::AtomicU64;

    trait Repository: Send + Sync {
        fn table(&self) -> &'static str;
    }

    #[derive(Debug, Inject)]
    struct Database {
        #[inject]
        port: u16,
    }

    #[derive(Debug, Inject)]
    struct Metrics {}

    #[derive(Debug, Inject)]
    #[implements(dyn Repository)]
    struct UserRepository {
        #[inject]
        db: Arc<Database>,
        #[inject]
        metrics: Option<Arc<Metrics>>,
        queries: AtomicU64,
    }

    impl Repository for UserRepository {
        fn table(&self) -> &'static str {
            "users"
        }
    }

    fn catalog() -> TypeCatalog {
        let types = TypeCatalog::new();
        types.describe::<Database>().describe::<Metrics>().describe::<UserRepository>();
        types
    }

    #[test]
    fn test_derived_constructor() {
        let container = Container::with_catalog(catalog());
        container.singleton::<Database, Database>().unwrap();
        container.register_type::<dyn Repository, UserRepository>(Lifetime::Transient).unwrap();

        let repository = container.get::<dyn Repository>().unwrap();
        assert_eq!(repository.table(), "users");
    }

    #[test]
    fn test_derived_fields() {
        let container = Container::with_catalog(catalog());
        container.singleton::<Database, Database>().unwrap();
        container.transient::<UserRepository, UserRepository>().unwrap();

        let repository = container.get::<UserRepository>().unwrap();
        assert_eq!(repository.db.port, 0);
        assert!(repository.metrics.is_none());
        assert_eq!(repository.queries.load(std::sync::atomic::Ordering::Relaxed), 0);
        assert!(Arc::ptr_eq(&repository.db, &container.get::<Database>().unwrap()));

        container.transient::<Metrics, Metrics>().unwrap();
        assert!(container.get::<UserRepository>().unwrap().metrics.is_some());
    }

    #[test]
    fn test_missing_required_dependency() {
        let container = Container::with_catalog(catalog());
        container.transient::<UserRepository, UserRepository>().unwrap();

        let err = container.get::<UserRepository>().unwrap_err();
        assert!(matches!(err, DiError::CreationFailed { .. }));
    }
}
