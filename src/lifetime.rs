//! Lifetime managers
//!
//! A lifetime manager decides when a registration's compiled creator runs:
//! on every resolve (transient) or once (singleton).
//!
//! Both variants also offer construction from explicit arguments, which
//! always builds a fresh instance. For singletons this deliberately bypasses
//! the memoized instance.

use crate::guard::CircularDependencyGuard;
use crate::provider::Lifetime;
use crate::registration::ServiceRegistration;
use crate::types::Instance;
use crate::{Container, Result};
use once_cell::sync::OnceCell;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

// =============================================================================
// Transient
// =============================================================================

/// Runs the creator on every resolve
pub struct TransientLifetime {
    guard: CircularDependencyGuard,
}

impl TransientLifetime {
    pub fn new() -> Self {
        Self {
            guard: CircularDependencyGuard::new(),
        }
    }

    /// Create a new instance graph
    pub fn resolve(&self, registration: &ServiceRegistration, container: &Container) -> Result<Instance> {
        let _scope = self.guard.enter(registration.service().name())?;
        let creator = container.compiler().creator(registration, container)?;

        #[cfg(feature = "logging")]
        trace!(
            target: "activator",
            service = registration.service().name(),
            name = registration.name(),
            "Creating new transient instance"
        );

        creator(container)
    }
}

impl Default for TransientLifetime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Singleton
// =============================================================================

/// Runs the creator at most once and shares the result
pub struct SingletonLifetime {
    instance: OnceCell<Instance>,
    guard: CircularDependencyGuard,
}

impl SingletonLifetime {
    pub fn new() -> Self {
        Self {
            instance: OnceCell::new(),
            guard: CircularDependencyGuard::new(),
        }
    }

    /// Get the instance, creating it if necessary.
    ///
    /// Concurrent first callers block on the cell until the single
    /// construction finishes. A failed construction leaves the cell empty.
    pub fn resolve(&self, registration: &ServiceRegistration, container: &Container) -> Result<Instance> {
        if let Some(instance) = self.instance.get() {
            #[cfg(feature = "logging")]
            trace!(
                target: "activator",
                service = registration.service().name(),
                name = registration.name(),
                "Singleton already initialized, returning cached instance"
            );

            return Ok(instance.clone());
        }

        // Same-context re-entry must fail before touching the cell: a nested
        // get_or_try_init on one cell never returns.
        let _scope = self.guard.enter(registration.service().name())?;

        self.instance
            .get_or_try_init(|| {
                #[cfg(feature = "logging")]
                debug!(
                    target: "activator",
                    service = registration.service().name(),
                    name = registration.name(),
                    "Singleton initializing on first access"
                );

                let creator = container.compiler().creator(registration, container)?;
                creator(container)
            })
            .cloned()
    }

    #[inline]
    pub fn is_instantiated(&self) -> bool {
        self.instance.get().is_some()
    }
}

impl Default for SingletonLifetime {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// LifetimeManager
// =============================================================================

/// Reuse policy of a registration
pub enum LifetimeManager {
    Transient(TransientLifetime),
    Singleton(SingletonLifetime),
}

impl LifetimeManager {
    pub fn new(lifetime: Lifetime) -> Self {
        match lifetime {
            Lifetime::Transient => LifetimeManager::Transient(TransientLifetime::new()),
            Lifetime::Singleton => LifetimeManager::Singleton(SingletonLifetime::new()),
        }
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        match self {
            LifetimeManager::Transient(_) => Lifetime::Transient,
            LifetimeManager::Singleton(_) => Lifetime::Singleton,
        }
    }

    /// Resolve according to the reuse policy
    #[inline]
    pub fn resolve(&self, registration: &ServiceRegistration, container: &Container) -> Result<Instance> {
        match self {
            LifetimeManager::Transient(lifetime) => lifetime.resolve(registration, container),
            LifetimeManager::Singleton(lifetime) => lifetime.resolve(registration, container),
        }
    }

    /// Construct a fresh instance from explicit arguments, never memoized
    pub fn create_with(
        &self,
        registration: &ServiceRegistration,
        container: &Container,
        args: &[Instance],
    ) -> Result<Instance> {
        #[cfg(feature = "logging")]
        debug!(
            target: "activator",
            service = registration.service().name(),
            name = registration.name(),
            lifetime = self.lifetime().as_str(),
            args = args.len(),
            "Constructing instance from explicit arguments"
        );

        container.compiler().construct_with(registration, container, args)
    }

    #[inline]
    pub fn is_instantiated(&self) -> bool {
        match self {
            LifetimeManager::Transient(_) => false,
            LifetimeManager::Singleton(lifetime) => lifetime.is_instantiated(),
        }
    }
}
