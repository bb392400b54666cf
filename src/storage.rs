//! Registration storage for the DI container
//!
//! Uses DashMap for lock-free concurrent access. Lookups hand out
//! `Arc<ServiceRegistration>` clones so no map guard outlives the call.

use crate::error::RegistrationIssue;
use crate::introspect::TypeIntrospector;
use crate::provider::{Lifetime, ServiceKey};
use crate::registration::{Activation, Implementation, ServiceRegistration};
use crate::types::TypeInfo;
use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::debug;

/// Thread-safe store of registrations keyed by (service type, name).
pub struct ServiceRegistry {
    registrations: DashMap<ServiceKey, Arc<ServiceRegistration>, RandomState>,
}

impl ServiceRegistry {
    /// Create new empty storage with optimized shard count.
    ///
    /// Default DashMap uses num_cpus * 4 shards which is overkill for
    /// typical containers with <50 services.
    #[inline]
    pub fn new() -> Self {
        Self {
            registrations: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Create with pre-allocated capacity and shards scaled to it.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        let shard_amount = if capacity <= 16 {
            8
        } else if capacity <= 64 {
            16
        } else {
            32
        };
        Self {
            registrations: DashMap::with_capacity_and_hasher_and_shard_amount(
                capacity,
                RandomState::new(),
                shard_amount,
            ),
        }
    }

    /// Validate and store a registration, replacing any registration with
    /// the same key.
    pub fn register(
        &self,
        introspector: &dyn TypeIntrospector,
        service: TypeInfo,
        implementation: Implementation,
        lifetime: Lifetime,
        name: Option<&str>,
    ) -> Result<Arc<ServiceRegistration>> {
        let service_kind = introspector.kind(&service);
        if service_kind.is_restricted() {
            return Err(DiError::registration(&service, RegistrationIssue::RestrictedServiceType));
        }
        if !service_kind.is_reference() {
            return Err(DiError::registration(&service, RegistrationIssue::NotReferenceType));
        }
        if name.is_some_and(|name| name.trim().is_empty()) {
            return Err(DiError::registration(&service, RegistrationIssue::BlankName));
        }

        let activation = match implementation {
            Implementation::Factory(factory) => Activation::Factory(factory),
            Implementation::Type(implementation) => {
                if !introspector.kind(&implementation).is_instantiable() {
                    return Err(DiError::registration(&service, RegistrationIssue::NotInstantiable));
                }
                let upcast = if implementation == service {
                    None
                } else {
                    Some(
                        introspector
                            .upcast(&implementation, &service)
                            .ok_or_else(|| DiError::registration(&service, RegistrationIssue::NotAssignable))?,
                    )
                };
                Activation::Type {
                    implementation,
                    upcast,
                }
            }
        };

        let key = ServiceKey::new(service, name);
        let registration = Arc::new(ServiceRegistration::new(key.clone(), activation, lifetime));
        let previous = self.registrations.insert(key, Arc::clone(&registration));

        #[cfg(feature = "logging")]
        debug!(
            target: "activator",
            service = service.name(),
            name = name,
            implementation = registration.implementation().map(|ty| ty.name()).unwrap_or("<factory>"),
            lifetime = lifetime.as_str(),
            replaced = previous.is_some(),
            service_count = self.registrations.len(),
            "Registered service"
        );
        #[cfg(not(feature = "logging"))]
        drop(previous);

        Ok(registration)
    }

    /// Registration for (service, name)
    #[inline]
    pub fn get(&self, service: &TypeInfo, name: Option<&str>) -> Option<Arc<ServiceRegistration>> {
        self.get_by_key(&ServiceKey::new(*service, name))
    }

    #[inline]
    pub fn get_by_key(&self, key: &ServiceKey) -> Option<Arc<ServiceRegistration>> {
        self.registrations.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// The unnamed registration (if any) followed by every named
    /// registration of `service`, ordered by case-folded name
    pub fn get_all(&self, service: &TypeInfo) -> Vec<Arc<ServiceRegistration>> {
        let mut matching: Vec<_> = self
            .registrations
            .iter()
            .filter(|entry| entry.key().service() == *service)
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        // None sorts before Some, so the unnamed registration comes first
        matching.sort_by(|a, b| a.key().folded_name().cmp(&b.key().folded_name()));
        matching
    }

    /// Check if (service, name) is registered
    #[inline]
    pub fn is_registered(&self, service: &TypeInfo, name: Option<&str>) -> bool {
        self.registrations.contains_key(&ServiceKey::new(*service, name))
    }

    /// Get number of registrations
    #[inline]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Check if empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Instance, TypeCatalog, TypeKind};

    trait Store: Send + Sync {}

    #[derive(Default)]
    struct MemoryStore;

    impl Store for MemoryStore {}

    struct Unrelated;

    fn catalog() -> TypeCatalog {
        let types = TypeCatalog::new();
        types
            .class::<MemoryStore>()
            .default_constructor()
            .implements::<dyn Store>(|store| store as Arc<dyn Store>);
        types.declare::<Vec<u8>>(TypeKind::Array);
        types
    }

    fn register(
        registry: &ServiceRegistry,
        types: &TypeCatalog,
        service: TypeInfo,
        implementation: TypeInfo,
        name: Option<&str>,
    ) -> Result<Arc<ServiceRegistration>> {
        registry.register(types, service, Implementation::Type(implementation), Lifetime::Transient, name)
    }

    fn issue(result: Result<Arc<ServiceRegistration>>) -> RegistrationIssue {
        match result {
            Err(DiError::Registration { reason, .. }) => reason,
            other => panic!("expected registration error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_registration() {
        let types = catalog();
        let registry = ServiceRegistry::new();

        let registration = register(
            &registry,
            &types,
            TypeInfo::of::<dyn Store>(),
            TypeInfo::of::<MemoryStore>(),
            None,
        )
        .unwrap();

        assert_eq!(registration.implementation(), Some(TypeInfo::of::<MemoryStore>()));
        assert!(registry.is_registered(&TypeInfo::of::<dyn Store>(), None));
        assert!(!registry.is_registered(&TypeInfo::of::<dyn Store>(), Some("other")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rejected_service_types() {
        let types = catalog();
        let registry = ServiceRegistry::new();

        let restricted = register(&registry, &types, TypeInfo::of::<String>(), TypeInfo::of::<String>(), None);
        assert_eq!(issue(restricted), RegistrationIssue::RestrictedServiceType);

        let meta = register(&registry, &types, TypeInfo::of::<TypeInfo>(), TypeInfo::of::<TypeInfo>(), None);
        assert_eq!(issue(meta), RegistrationIssue::RestrictedServiceType);

        let value = register(&registry, &types, TypeInfo::of::<u32>(), TypeInfo::of::<u32>(), None);
        assert_eq!(issue(value), RegistrationIssue::NotReferenceType);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_rejected_implementations() {
        let types = catalog();
        let registry = ServiceRegistry::new();
        let store = TypeInfo::of::<dyn Store>();

        let interface = register(&registry, &types, store, store, None);
        assert_eq!(issue(interface), RegistrationIssue::NotInstantiable);

        let array = register(&registry, &types, TypeInfo::of::<Vec<u8>>(), TypeInfo::of::<Vec<u8>>(), None);
        assert_eq!(issue(array), RegistrationIssue::NotInstantiable);

        let unrelated = register(&registry, &types, store, TypeInfo::of::<Unrelated>(), None);
        assert_eq!(issue(unrelated), RegistrationIssue::NotAssignable);

        let blank = register(&registry, &types, store, TypeInfo::of::<MemoryStore>(), Some("  "));
        assert_eq!(issue(blank), RegistrationIssue::BlankName);
    }

    #[test]
    fn test_last_writer_wins() {
        let types = catalog();
        let registry = ServiceRegistry::new();
        let service = TypeInfo::of::<MemoryStore>();

        let first = register(&registry, &types, service, service, Some("Main")).unwrap();
        let second = registry
            .register(
                &types,
                service,
                Implementation::Factory(Arc::new(|_: &crate::Container| Ok(Instance::of(MemoryStore)))),
                Lifetime::Singleton,
                Some("MAIN"),
            )
            .unwrap();

        let stored = registry.get(&service, Some("main")).unwrap();
        assert!(!Arc::ptr_eq(&stored, &first));
        assert!(Arc::ptr_eq(&stored, &second));
        assert_eq!(stored.lifetime(), Lifetime::Singleton);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_all_orders_unnamed_first() {
        let types = catalog();
        let registry = ServiceRegistry::new();
        let store = TypeInfo::of::<dyn Store>();
        let memory = TypeInfo::of::<MemoryStore>();

        register(&registry, &types, store, memory, Some("zeta")).unwrap();
        register(&registry, &types, store, memory, Some("Alpha")).unwrap();
        register(&registry, &types, store, memory, None).unwrap();
        register(&registry, &types, memory, memory, None).unwrap();

        let all = registry.get_all(&store);
        let names: Vec<_> = all.iter().map(|r| r.name()).collect();
        assert_eq!(names, vec![None, Some("Alpha"), Some("zeta")]);
        assert_eq!(registry.len(), 4);
    }
}
