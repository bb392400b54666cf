//! Dependency injection container
//!
//! The `Container` is the public registrar and resolver surface. It composes
//! the registry, the factory compiler and the lifetime managers, and takes
//! all type metadata from a [`TypeIntrospector`].

use crate::compiler::FactoryCompiler;
use crate::introspect::TypeIntrospector;
use crate::provider::{Injectable, Lifetime, Module};
use crate::registration::{Implementation, ServiceRegistration};
use crate::storage::ServiceRegistry;
use crate::types::{Instance, TypeInfo};
use crate::{DiError, Result, TypeCatalog};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

struct Inner {
    registry: ServiceRegistry,
    compiler: FactoryCompiler,
    introspector: Arc<dyn TypeIntrospector>,
}

/// Dependency injection container.
///
/// Cloning is cheap and yields a handle to the same container. All methods
/// take `&self` and may be called from any thread.
///
/// # Examples
///
/// ```rust
/// use activator::{Arguments, Container, Lifetime, TypeCatalog, TypeInfo};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, message: &str);
/// }
///
/// #[derive(Default)]
/// struct ConsoleLogger;
///
/// impl Logger for ConsoleLogger {
///     fn log(&self, message: &str) {
///         println!("{message}");
///     }
/// }
///
/// struct ReportGenerator {
///     logger: Option<Arc<dyn Logger>>,
/// }
///
/// let types = TypeCatalog::new();
/// types
///     .class::<ConsoleLogger>()
///     .default_constructor()
///     .implements::<dyn Logger>(|logger| logger as Arc<dyn Logger>);
/// types.class::<ReportGenerator>().constructor(
///     vec![TypeInfo::of::<dyn Logger>()],
///     |args: &Arguments| Ok(ReportGenerator { logger: args.service(0)? }),
/// );
///
/// let container = Container::with_catalog(types);
/// container.register_type::<dyn Logger, ConsoleLogger>(Lifetime::Singleton)?;
/// container.register_self::<ReportGenerator>(Lifetime::Transient)?;
///
/// let report = container.get::<ReportGenerator>()?;
/// let logger = container.get::<dyn Logger>()?;
/// assert!(Arc::ptr_eq(report.logger.as_ref().unwrap(), &logger));
/// # Ok::<(), activator::DiError>(())
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Create a container backed by `introspector`.
    pub fn new(introspector: Arc<dyn TypeIntrospector>) -> Self {
        Self::from_registry(ServiceRegistry::new(), introspector)
    }

    /// Create a container with pre-allocated registry capacity.
    ///
    /// Use this when you know approximately how many services will be registered.
    pub fn with_capacity(introspector: Arc<dyn TypeIntrospector>, capacity: usize) -> Self {
        Self::from_registry(ServiceRegistry::with_capacity(capacity), introspector)
    }

    /// Create a container backed by a [`TypeCatalog`].
    pub fn with_catalog(catalog: TypeCatalog) -> Self {
        Self::new(Arc::new(catalog))
    }

    fn from_registry(registry: ServiceRegistry, introspector: Arc<dyn TypeIntrospector>) -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "activator", "Creating new DI container");

        Self {
            inner: Arc::new(Inner {
                registry,
                compiler: FactoryCompiler::new(),
                introspector,
            }),
        }
    }

    /// The type metadata source
    #[inline]
    pub fn introspector(&self) -> &dyn TypeIntrospector {
        &*self.inner.introspector
    }

    #[inline]
    pub(crate) fn registry(&self) -> &ServiceRegistry {
        &self.inner.registry
    }

    #[inline]
    pub(crate) fn compiler(&self) -> &FactoryCompiler {
        &self.inner.compiler
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register `implementation` for `service` under an optional name.
    ///
    /// Replaces an existing registration with the same key.
    ///
    /// # Errors
    ///
    /// [`DiError::Registration`] if the service type is restricted or a value
    /// type, or the implementation is not instantiable or not assignable to
    /// the service.
    pub fn register(
        &self,
        service: TypeInfo,
        implementation: Implementation,
        lifetime: Lifetime,
        name: Option<&str>,
    ) -> Result<Arc<ServiceRegistration>> {
        self.inner
            .registry
            .register(self.introspector(), service, implementation, lifetime, name)
    }

    /// Register implementation type `I` for service `S`.
    #[inline]
    pub fn register_type<S, I>(&self, lifetime: Lifetime) -> Result<Arc<ServiceRegistration>>
    where
        S: ?Sized + Injectable,
        I: Injectable,
    {
        self.register(
            TypeInfo::of::<S>(),
            Implementation::Type(TypeInfo::of::<I>()),
            lifetime,
            None,
        )
    }

    /// Register implementation type `I` for service `S` under `name`.
    #[inline]
    pub fn register_type_named<S, I>(&self, name: &str, lifetime: Lifetime) -> Result<Arc<ServiceRegistration>>
    where
        S: ?Sized + Injectable,
        I: Injectable,
    {
        self.register(
            TypeInfo::of::<S>(),
            Implementation::Type(TypeInfo::of::<I>()),
            lifetime,
            Some(name),
        )
    }

    /// Register `T` as its own service.
    #[inline]
    pub fn register_self<T: Injectable>(&self, lifetime: Lifetime) -> Result<Arc<ServiceRegistration>> {
        self.register_type::<T, T>(lifetime)
    }

    /// Register `T` as its own service under `name`.
    #[inline]
    pub fn register_self_named<T: Injectable>(&self, name: &str, lifetime: Lifetime) -> Result<Arc<ServiceRegistration>> {
        self.register_type_named::<T, T>(name, lifetime)
    }

    /// Register a factory delegate for service `S`.
    ///
    /// The factory receives this container, so it can resolve further
    /// dependencies. Errors it returns propagate unchanged.
    pub fn register_factory<S, F>(&self, lifetime: Lifetime, factory: F) -> Result<Arc<ServiceRegistration>>
    where
        S: ?Sized + Injectable,
        F: Fn(&Container) -> Result<Arc<S>> + Send + Sync + 'static,
    {
        self.register(TypeInfo::of::<S>(), erase_factory(factory), lifetime, None)
    }

    /// Register a factory delegate for service `S` under `name`.
    pub fn register_factory_named<S, F>(
        &self,
        name: &str,
        lifetime: Lifetime,
        factory: F,
    ) -> Result<Arc<ServiceRegistration>>
    where
        S: ?Sized + Injectable,
        F: Fn(&Container) -> Result<Arc<S>> + Send + Sync + 'static,
    {
        self.register(TypeInfo::of::<S>(), erase_factory(factory), lifetime, Some(name))
    }

    /// Register `I` for `S` as a singleton.
    #[inline]
    pub fn singleton<S: ?Sized + Injectable, I: Injectable>(&self) -> Result<Arc<ServiceRegistration>> {
        self.register_type::<S, I>(Lifetime::Singleton)
    }

    /// Register `I` for `S` as a transient.
    #[inline]
    pub fn transient<S: ?Sized + Injectable, I: Injectable>(&self) -> Result<Arc<ServiceRegistration>> {
        self.register_type::<S, I>(Lifetime::Transient)
    }

    /// Apply a batch of registrations.
    pub fn install<M: Module + ?Sized>(&self, module: &M) -> Result<()> {
        #[cfg(feature = "logging")]
        let start_count = self.inner.registry.len();

        module.configure(self)?;

        #[cfg(feature = "logging")]
        debug!(
            target: "activator",
            services_registered = self.inner.registry.len().saturating_sub(start_count),
            "Module installed"
        );

        Ok(())
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve the unnamed registration of `service`.
    ///
    /// With non-empty `args`, a fresh instance is built from the constructor
    /// whose parameter types match the arguments exactly, even for
    /// singletons.
    ///
    /// # Errors
    ///
    /// [`DiError::NotRegistered`] if `service` has no unnamed registration,
    /// plus any error raised while compiling or constructing.
    #[inline]
    pub fn get_instance(&self, service: &TypeInfo, args: &[Instance]) -> Result<Instance> {
        self.resolve(service, None, args)
    }

    /// Resolve the registration of `service` named `name`.
    #[inline]
    pub fn get_instance_by_name(&self, service: &TypeInfo, name: &str, args: &[Instance]) -> Result<Instance> {
        self.resolve(service, Some(name), args)
    }

    /// Like [`get_instance`](Self::get_instance), but `Ok(None)` when the
    /// service is not registered. Every other failure is still returned.
    #[inline]
    pub fn get_instance_optional(&self, service: &TypeInfo, args: &[Instance]) -> Result<Option<Instance>> {
        self.resolve_optional(service, None, args)
    }

    /// Like [`get_instance_by_name`](Self::get_instance_by_name), but
    /// `Ok(None)` when the key is not registered.
    #[inline]
    pub fn get_instance_optional_by_name(
        &self,
        service: &TypeInfo,
        name: &str,
        args: &[Instance],
    ) -> Result<Option<Instance>> {
        self.resolve_optional(service, Some(name), args)
    }

    /// One instance per registration of `service`: unnamed first, then named
    /// ones ordered by name.
    pub fn get_all_instances(&self, service: &TypeInfo) -> Result<Vec<Instance>> {
        let registrations = self.inner.registry.get_all(service);

        #[cfg(feature = "logging")]
        trace!(
            target: "activator",
            service = service.name(),
            registrations = registrations.len(),
            "Resolving all registrations"
        );

        registrations
            .iter()
            .map(|registration| registration.resolve(self))
            .collect()
    }

    /// Check if (service, name) is registered.
    #[inline]
    pub fn is_registered(&self, service: &TypeInfo, name: Option<&str>) -> bool {
        self.inner.registry.is_registered(service, name)
    }

    /// The registration record for (service, name)
    #[inline]
    pub fn registration(&self, service: &TypeInfo, name: Option<&str>) -> Option<Arc<ServiceRegistration>> {
        self.inner.registry.get(service, name)
    }

    /// All registration records for `service`, in [`get_all_instances`](Self::get_all_instances) order
    #[inline]
    pub fn registrations(&self, service: &TypeInfo) -> Vec<Arc<ServiceRegistration>> {
        self.inner.registry.get_all(service)
    }

    fn resolve(&self, service: &TypeInfo, name: Option<&str>, args: &[Instance]) -> Result<Instance> {
        let Some(registration) = self.inner.registry.get(service, name) else {
            #[cfg(feature = "logging")]
            debug!(
                target: "activator",
                service = service.name(),
                name = name,
                "Service not registered"
            );
            return Err(DiError::not_registered(service, name));
        };

        #[cfg(feature = "logging")]
        trace!(
            target: "activator",
            service = service.name(),
            name = name,
            lifetime = registration.lifetime().as_str(),
            explicit_args = args.len(),
            "Resolving service"
        );

        if args.is_empty() {
            registration.resolve(self)
        } else {
            registration.create_with(self, args)
        }
    }

    fn resolve_optional(&self, service: &TypeInfo, name: Option<&str>, args: &[Instance]) -> Result<Option<Instance>> {
        if !self.is_registered(service, name) {
            return Ok(None);
        }
        // Registrations are never removed, so any NotRegistered from here on
        // comes from a nested resolution and is reported.
        self.resolve(service, name, args).map(Some)
    }

    // =========================================================================
    // Typed Resolution
    // =========================================================================

    /// Resolve service `S`.
    #[inline]
    pub fn get<S: ?Sized + Injectable>(&self) -> Result<Arc<S>> {
        typed(self.get_instance(&TypeInfo::of::<S>(), &[])?)
    }

    /// Resolve service `S` registered under `name`.
    #[inline]
    pub fn get_named<S: ?Sized + Injectable>(&self, name: &str) -> Result<Arc<S>> {
        typed(self.get_instance_by_name(&TypeInfo::of::<S>(), name, &[])?)
    }

    /// Construct a fresh `S` from explicit constructor arguments.
    #[inline]
    pub fn get_with<S: ?Sized + Injectable>(&self, args: &[Instance]) -> Result<Arc<S>> {
        typed(self.get_instance(&TypeInfo::of::<S>(), args)?)
    }

    /// Construct a fresh `S` registered under `name` from explicit arguments.
    #[inline]
    pub fn get_named_with<S: ?Sized + Injectable>(&self, name: &str, args: &[Instance]) -> Result<Arc<S>> {
        typed(self.get_instance_by_name(&TypeInfo::of::<S>(), name, args)?)
    }

    /// Resolve `S`, returning `Ok(None)` if it is not registered.
    #[inline]
    pub fn try_get<S: ?Sized + Injectable>(&self) -> Result<Option<Arc<S>>> {
        self.get_instance_optional(&TypeInfo::of::<S>(), &[])?
            .map(typed)
            .transpose()
    }

    /// Resolve `S` named `name`, returning `Ok(None)` if it is not registered.
    #[inline]
    pub fn try_get_named<S: ?Sized + Injectable>(&self, name: &str) -> Result<Option<Arc<S>>> {
        self.get_instance_optional_by_name(&TypeInfo::of::<S>(), name, &[])?
            .map(typed)
            .transpose()
    }

    /// Resolve every registration of `S`.
    pub fn get_all<S: ?Sized + Injectable>(&self) -> Result<Vec<Arc<S>>> {
        self.get_all_instances(&TypeInfo::of::<S>())?
            .into_iter()
            .map(typed)
            .collect()
    }

    /// Check if `S` has an unnamed registration.
    #[inline]
    pub fn contains<S: ?Sized + Injectable>(&self) -> bool {
        self.is_registered(&TypeInfo::of::<S>(), None)
    }

    /// Check if `S` has a registration named `name`.
    #[inline]
    pub fn contains_named<S: ?Sized + Injectable>(&self, name: &str) -> bool {
        self.is_registered(&TypeInfo::of::<S>(), Some(name))
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Get the number of registrations.
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    /// Check if nothing is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.len())
            .finish()
    }
}

fn erase_factory<S, F>(factory: F) -> Implementation
where
    S: ?Sized + Injectable,
    F: Fn(&Container) -> Result<Arc<S>> + Send + Sync + 'static,
{
    Implementation::Factory(Arc::new(move |container: &Container| {
        factory(container).map(Instance::new)
    }))
}

fn typed<S: ?Sized + Injectable>(instance: Instance) -> Result<Arc<S>> {
    instance.downcast::<S>().ok_or_else(|| {
        DiError::creation_failed::<S>(format!("resolved instance has type {}", instance.type_info()))
    })
}
