//! Provider traits and registration keys
//!
//! These types define what can be injected, how long it lives, and how a
//! registration is addressed.

use crate::types::TypeInfo;
use crate::{Container, Result};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marker trait for types that can be injected via the DI container.
///
/// This is automatically implemented for all types (including trait objects)
/// that are `Send + Sync + 'static`. You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Service lifetime specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// New instance graph created on every resolve
    #[default]
    Transient,

    /// Created lazily on first resolve, then shared for the container's lifetime
    Singleton,
}

impl Lifetime {
    pub fn as_str(self) -> &'static str {
        match self {
            Lifetime::Transient => "transient",
            Lifetime::Singleton => "singleton",
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of a registration: service type plus optional name.
///
/// Names compare case-insensitively. The unnamed key and the named keys of a
/// service type are independent of each other.
#[derive(Clone)]
pub struct ServiceKey {
    service: TypeInfo,
    name: Option<Box<str>>,
    folded: Option<Box<str>>,
}

impl ServiceKey {
    /// Key of the unnamed registration for `service`
    #[inline]
    pub fn unnamed(service: TypeInfo) -> Self {
        Self {
            service,
            name: None,
            folded: None,
        }
    }

    /// Key of the registration named `name` for `service`
    pub fn named(service: TypeInfo, name: &str) -> Self {
        Self {
            service,
            name: Some(name.into()),
            folded: Some(name.to_lowercase().into_boxed_str()),
        }
    }

    /// Key for an optional name
    #[inline]
    pub fn new(service: TypeInfo, name: Option<&str>) -> Self {
        match name {
            Some(name) => Self::named(service, name),
            None => Self::unnamed(service),
        }
    }

    #[inline]
    pub fn service(&self) -> TypeInfo {
        self.service
    }

    /// Name as originally given
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Case-folded name used for comparison
    #[inline]
    pub(crate) fn folded_name(&self) -> Option<&str> {
        self.folded.as_deref()
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        self.service == other.service && self.folded == other.folded
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.service.hash(state);
        self.folded.hash(state);
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceKey")
            .field("service", &self.service)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}[{}]", self.service, name),
            None => write!(f, "{}", self.service),
        }
    }
}

/// A batch of registrations applied to a container as a unit.
///
/// Closures taking `&Container` are modules too.
pub trait Module {
    fn configure(&self, container: &Container) -> Result<()>;
}

impl<F> Module for F
where
    F: Fn(&Container) -> Result<()>,
{
    fn configure(&self, container: &Container) -> Result<()> {
        self(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_compare_case_insensitively() {
        let service = TypeInfo::of::<u8>();
        let upper = ServiceKey::named(service, "FILE");
        let lower = ServiceKey::named(service, "file");

        assert_eq!(upper, lower);
        assert_eq!(upper.name(), Some("FILE"));

        let set: HashSet<_> = [upper, lower].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_named_and_unnamed_are_distinct() {
        let service = TypeInfo::of::<u8>();

        assert_ne!(ServiceKey::unnamed(service), ServiceKey::named(service, "x"));
        assert_ne!(
            ServiceKey::unnamed(service),
            ServiceKey::unnamed(TypeInfo::of::<u16>())
        );
        assert_eq!(ServiceKey::new(service, None), ServiceKey::unnamed(service));
    }

    #[test]
    fn test_display() {
        let key = ServiceKey::named(TypeInfo::of::<u8>(), "Primary");
        assert_eq!(key.to_string(), "u8[Primary]");
        assert_eq!(Lifetime::Singleton.to_string(), "singleton");
        assert_eq!(Lifetime::default(), Lifetime::Transient);
    }
}
