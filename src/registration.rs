//! Registration records

use crate::compiler::CompiledCreator;
use crate::introspect::UpcastFn;
use crate::lifetime::LifetimeManager;
use crate::provider::{Lifetime, ServiceKey};
use crate::types::{Instance, TypeInfo};
use crate::{Container, Result};
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// User-authored construction logic. Receives the container so it can pull
/// further dependencies.
pub type InstanceFactory = Arc<dyn Fn(&Container) -> Result<Instance> + Send + Sync>;

/// What a registration activates, as supplied by the caller.
#[derive(Clone)]
pub enum Implementation {
    /// Construct this type through its constructors
    Type(TypeInfo),
    /// Call this factory
    Factory(InstanceFactory),
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Type(ty) => f.debug_tuple("Type").field(ty).finish(),
            Implementation::Factory(_) => f.write_str("Factory"),
        }
    }
}

/// Validated activation strategy stored on a registration.
pub(crate) enum Activation {
    Type {
        implementation: TypeInfo,
        /// `None` when the implementation is the service type itself
        upcast: Option<UpcastFn>,
    },
    Factory(InstanceFactory),
}

/// A stored association of (service, name) with its activation and lifetime.
///
/// The compiled creator is built on first resolution and cached here.
pub struct ServiceRegistration {
    key: ServiceKey,
    activation: Activation,
    lifetime: Lifetime,
    manager: LifetimeManager,
    creator: OnceCell<CompiledCreator>,
}

impl ServiceRegistration {
    pub(crate) fn new(key: ServiceKey, activation: Activation, lifetime: Lifetime) -> Self {
        Self {
            key,
            activation,
            lifetime,
            manager: LifetimeManager::new(lifetime),
            creator: OnceCell::new(),
        }
    }

    #[inline]
    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    #[inline]
    pub fn service(&self) -> TypeInfo {
        self.key.service()
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.key.name()
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    /// Implementation type, `None` for factory registrations
    pub fn implementation(&self) -> Option<TypeInfo> {
        match &self.activation {
            Activation::Type { implementation, .. } => Some(*implementation),
            Activation::Factory(_) => None,
        }
    }

    #[inline]
    pub fn is_factory(&self) -> bool {
        matches!(self.activation, Activation::Factory(_))
    }

    /// Whether the creator has been compiled
    #[inline]
    pub fn is_compiled(&self) -> bool {
        self.creator.get().is_some()
    }

    /// Whether a singleton instance has been created
    #[inline]
    pub fn is_instantiated(&self) -> bool {
        self.manager.is_instantiated()
    }

    #[inline]
    pub(crate) fn activation(&self) -> &Activation {
        &self.activation
    }

    #[inline]
    pub(crate) fn cached_creator(&self) -> Option<CompiledCreator> {
        self.creator.get().cloned()
    }

    /// Store a compiled creator. If another thread got there first, its
    /// creator is kept and returned.
    pub(crate) fn cache_creator(&self, creator: CompiledCreator) -> CompiledCreator {
        match self.creator.try_insert(creator) {
            Ok(stored) => Arc::clone(stored),
            Err((stored, _ours)) => Arc::clone(stored),
        }
    }

    /// Resolve through the lifetime manager
    #[inline]
    pub(crate) fn resolve(&self, container: &Container) -> Result<Instance> {
        self.manager.resolve(self, container)
    }

    /// Construct a fresh instance from explicit arguments
    #[inline]
    pub(crate) fn create_with(&self, container: &Container, args: &[Instance]) -> Result<Instance> {
        self.manager.create_with(self, container, args)
    }
}

impl fmt::Debug for ServiceRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistration")
            .field("key", &self.key)
            .field("implementation", &self.implementation())
            .field("lifetime", &self.lifetime)
            .field("compiled", &self.is_compiled())
            .finish()
    }
}
