//! Creator compilation
//!
//! Turns a registration into a cached [`CompiledCreator`]. For type
//! registrations this selects a constructor, walks the constructors of the
//! registered parameter types (depth first, cycle-guarded per implementation
//! type), and composes:
//!
//! ```text
//! resolve each parameter -> invoke constructor -> upcast to service type
//! ```
//!
//! Parameters are resolved through the dependency's lifetime manager at
//! call time, so singleton dependencies are shared and overwritten
//! registrations are honoured. An unregistered parameter type falls back to
//! its default value (absent for reference types).

use crate::guard::CircularDependencyGuard;
use crate::introspect::{Arguments, Constructor, UpcastFn};
use crate::provider::ServiceKey;
use crate::registration::{Activation, InstanceFactory, ServiceRegistration};
use crate::selector::ConstructorSelector;
use crate::types::{Instance, TypeInfo};
use crate::{Container, DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// A reusable creator for one registration. Its only input is the resolver
/// handle; no user arguments are involved.
pub type CompiledCreator = Arc<dyn Fn(&Container) -> Result<Instance> + Send + Sync>;

/// Builds and caches compiled creators.
pub(crate) struct FactoryCompiler {
    /// In-progress tracking per implementation type
    guards: DashMap<TypeId, Arc<CircularDependencyGuard>, RandomState>,
}

impl FactoryCompiler {
    pub fn new() -> Self {
        Self {
            guards: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// The registration's creator, compiling it on first use.
    ///
    /// Two threads may compile the same registration concurrently; one
    /// result is kept and both are equivalent.
    pub fn creator(&self, registration: &ServiceRegistration, container: &Container) -> Result<CompiledCreator> {
        if let Some(creator) = registration.cached_creator() {
            return Ok(creator);
        }

        let creator = self.compile(registration, container)?;
        Ok(registration.cache_creator(creator))
    }

    fn compile(&self, registration: &ServiceRegistration, container: &Container) -> Result<CompiledCreator> {
        match registration.activation() {
            Activation::Factory(factory) => Ok(wrap_factory(registration.service(), Arc::clone(factory))),
            Activation::Type {
                implementation,
                upcast,
            } => self.compile_type(registration.service(), *implementation, upcast.clone(), container),
        }
    }

    fn compile_type(
        &self,
        service: TypeInfo,
        implementation: TypeInfo,
        upcast: Option<UpcastFn>,
        container: &Container,
    ) -> Result<CompiledCreator> {
        #[cfg(feature = "logging")]
        debug!(
            target: "activator",
            service = service.name(),
            implementation = implementation.name(),
            "Compiling creator"
        );

        let mut explored = HashSet::with_hasher(RandomState::new());
        let constructor = self.explore(implementation, container, &mut explored)?;

        let params: Vec<ServiceKey> = constructor.params().iter().map(|param| ServiceKey::unnamed(*param)).collect();

        Ok(Arc::new(move |container: &Container| {
            let values = params
                .iter()
                .map(|key| resolve_parameter(key, container))
                .collect::<Result<Vec<_>>>()?;

            let instance = constructor.invoke(&Arguments::new(constructor.owner(), values))?;
            convert(instance, service, upcast.as_ref())
        }))
    }

    /// Select the constructor of `implementation` and walk the constructors
    /// of its registered parameter types, depth first.
    ///
    /// The walk ignores cached creators: a creator compiled before one of its
    /// dependencies was registered may close a cycle later, and that cycle
    /// must surface here rather than inside a singleton cell. Factory
    /// registrations are not walked.
    fn explore(
        &self,
        implementation: TypeInfo,
        container: &Container,
        explored: &mut HashSet<TypeId, RandomState>,
    ) -> Result<Constructor> {
        let guard = self.guard_for(&implementation);
        let _scope = guard.enter(implementation.name())?;

        let constructor = ConstructorSelector::new(container.introspector()).select(&implementation)?;

        for param in constructor.params() {
            match container.registry().get_by_key(&ServiceKey::unnamed(*param)) {
                Some(dependency) => {
                    if let Activation::Type { implementation, .. } = dependency.activation() {
                        if !explored.contains(&implementation.id()) {
                            self.explore(*implementation, container, explored)?;
                        }
                    }
                }
                None => {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "activator",
                        parameter = param.name(),
                        "Parameter type not registered, default value will be used"
                    );
                }
            }
        }

        explored.insert(implementation.id());
        Ok(constructor)
    }

    /// Build a fresh instance from explicit arguments, bypassing lifetimes
    pub fn construct_with(
        &self,
        registration: &ServiceRegistration,
        container: &Container,
        args: &[Instance],
    ) -> Result<Instance> {
        match registration.activation() {
            Activation::Factory(_) => Err(DiError::signature_mismatch(
                &registration.service(),
                crate::introspect::signature_of(args.iter().map(Instance::type_info)),
            )),
            Activation::Type {
                implementation,
                upcast,
            } => {
                let constructor =
                    ConstructorSelector::new(container.introspector()).select_for(implementation, args)?;
                let values = args.iter().cloned().map(Some).collect();
                let instance = constructor.invoke(&Arguments::new(*implementation, values))?;
                convert(instance, registration.service(), upcast.as_ref())
            }
        }
    }

    fn guard_for(&self, implementation: &TypeInfo) -> Arc<CircularDependencyGuard> {
        // Clone out so no map reference is held during recursion
        Arc::clone(
            self.guards
                .entry(implementation.id())
                .or_insert_with(|| Arc::new(CircularDependencyGuard::new()))
                .value(),
        )
    }
}

impl Default for FactoryCompiler {
    fn default() -> Self {
        Self::new()
    }
}

fn wrap_factory(service: TypeInfo, factory: InstanceFactory) -> CompiledCreator {
    Arc::new(move |container: &Container| {
        let instance = factory(container)?;
        if instance.type_info() != service {
            return Err(DiError::creation_failed_for(
                &service,
                format!("factory produced {}", instance.type_info()),
            ));
        }
        Ok(instance)
    })
}

fn resolve_parameter(key: &ServiceKey, container: &Container) -> Result<Option<Instance>> {
    match container.registry().get_by_key(key) {
        Some(dependency) => dependency.resolve(container).map(Some),
        None => Ok(container.introspector().default_value(&key.service())),
    }
}

fn convert(instance: Instance, service: TypeInfo, upcast: Option<&UpcastFn>) -> Result<Instance> {
    match upcast {
        None => Ok(instance),
        Some(upcast) => upcast(&instance).ok_or_else(|| {
            DiError::creation_failed_for(
                &service,
                format!("{} cannot be converted to the service type", instance.type_info()),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::{Arguments, Container, DiError, Lifetime, TypeCatalog, TypeInfo};
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::Duration;

    struct Slow;

    #[allow(dead_code)]
    struct Left {
        slow: Arc<Slow>,
        right: Arc<Right>,
    }

    #[allow(dead_code)]
    struct Right {
        slow: Arc<Slow>,
        left: Arc<Left>,
    }

    fn pair_catalog() -> TypeCatalog {
        let types = TypeCatalog::new();
        types.class::<Slow>().constructor(Vec::new(), |_| {
            std::thread::sleep(Duration::from_millis(100));
            Ok(Slow)
        });
        types.class::<Left>().constructor(
            vec![TypeInfo::of::<Slow>(), TypeInfo::of::<Right>()],
            |args: &Arguments| {
                Ok(Left {
                    slow: args.required(0)?,
                    right: args.required(1)?,
                })
            },
        );
        types.class::<Right>().constructor(
            vec![TypeInfo::of::<Slow>(), TypeInfo::of::<Left>()],
            |args: &Arguments| {
                Ok(Right {
                    slow: args.required(0)?,
                    left: args.required(1)?,
                })
            },
        );
        types
    }

    #[test]
    fn test_cycle_closed_after_compilation_fails_on_both_threads() {
        let container = Container::with_catalog(pair_catalog());
        container.transient::<Slow, Slow>().unwrap();
        container.singleton::<Left, Left>().unwrap();

        // Compiles Left while Right is unregistered; construction then fails
        assert!(container.get::<Left>().is_err());
        assert!(container.registration(&TypeInfo::of::<Left>(), None).unwrap().is_compiled());

        container.singleton::<Right, Right>().unwrap();

        let (tx, rx) = mpsc::channel();
        for side in 0..2 {
            let container = container.clone();
            let tx = tx.clone();
            std::thread::spawn(move || {
                let result = if side == 0 {
                    container.get::<Left>().map(|_| ())
                } else {
                    container.get::<Right>().map(|_| ())
                };
                let _ = tx.send(result);
            });
        }

        for _ in 0..2 {
            let result = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("resolution did not finish");
            assert!(matches!(result, Err(DiError::CircularDependency { .. })));
        }

        assert!(!container.registration(&TypeInfo::of::<Left>(), None).unwrap().is_instantiated());
        assert!(!container.registration(&TypeInfo::of::<Right>(), None).unwrap().is_instantiated());
    }

    struct First(#[allow(dead_code)] Arc<Second>);
    struct Second(#[allow(dead_code)] Arc<Third>);
    struct Third(#[allow(dead_code)] Arc<First>);

    #[test]
    fn test_three_node_singleton_cycle_leaves_nothing_behind() {
        let types = TypeCatalog::new();
        types
            .class::<First>()
            .constructor(vec![TypeInfo::of::<Second>()], |args: &Arguments| Ok(First(args.required(0)?)));
        types
            .class::<Second>()
            .constructor(vec![TypeInfo::of::<Third>()], |args: &Arguments| Ok(Second(args.required(0)?)));
        types
            .class::<Third>()
            .constructor(vec![TypeInfo::of::<First>()], |args: &Arguments| Ok(Third(args.required(0)?)));

        let container = Container::with_catalog(types);
        container.register_self::<First>(Lifetime::Singleton).unwrap();
        container.register_self::<Second>(Lifetime::Singleton).unwrap();
        container.register_self::<Third>(Lifetime::Singleton).unwrap();

        assert!(matches!(
            container.get::<First>().map(|_| ()),
            Err(DiError::CircularDependency { .. })
        ));
        assert!(matches!(
            container.get::<Third>().map(|_| ()),
            Err(DiError::CircularDependency { .. })
        ));

        for ty in [TypeInfo::of::<First>(), TypeInfo::of::<Second>(), TypeInfo::of::<Third>()] {
            let registration = container.registration(&ty, None).unwrap();
            assert!(!registration.is_compiled(), "{ty} was compiled");
            assert!(!registration.is_instantiated(), "{ty} was instantiated");
        }
    }

    #[test]
    fn test_shared_dependency_is_not_a_cycle() {
        struct Leaf;
        #[allow(dead_code)]
        struct Diamond(Arc<Leaf>, Arc<Leaf>);

        let types = TypeCatalog::new();
        types.class::<Leaf>().constructor(Vec::new(), |_| Ok(Leaf));
        types.class::<Diamond>().constructor(
            vec![TypeInfo::of::<Leaf>(), TypeInfo::of::<Leaf>()],
            |args: &Arguments| Ok(Diamond(args.required(0)?, args.required(1)?)),
        );
        let container = Container::with_catalog(types);
        container.transient::<Leaf, Leaf>().unwrap();
        container.transient::<Diamond, Diamond>().unwrap();

        assert!(container.get::<Diamond>().is_ok());
    }
}
