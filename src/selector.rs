//! Constructor selection

use crate::introspect::{signature_of, Constructor, TypeIntrospector};
use crate::types::{Instance, TypeInfo};
use crate::{DiError, Result};

#[cfg(feature = "logging")]
use tracing::trace;

/// Picks the constructor used to build an implementation type.
pub struct ConstructorSelector<'a> {
    introspector: &'a dyn TypeIntrospector,
}

impl<'a> ConstructorSelector<'a> {
    #[inline]
    pub fn new(introspector: &'a dyn TypeIntrospector) -> Self {
        Self { introspector }
    }

    /// Automatic mode: the first declared constructor, public or not
    pub fn select(&self, implementation: &TypeInfo) -> Result<Constructor> {
        let constructor = self
            .introspector
            .constructors(implementation)
            .into_iter()
            .next()
            .ok_or_else(|| DiError::no_constructor(implementation))?;

        #[cfg(feature = "logging")]
        trace!(
            target: "activator",
            implementation = implementation.name(),
            params = %constructor.signature(),
            "Selected constructor"
        );

        Ok(constructor)
    }

    /// Explicit-argument mode: the first constructor whose parameter types
    /// equal the runtime types of `args`
    pub fn select_for(&self, implementation: &TypeInfo, args: &[Instance]) -> Result<Constructor> {
        let constructors = self.introspector.constructors(implementation);
        if constructors.is_empty() {
            return Err(DiError::no_constructor(implementation));
        }

        constructors
            .into_iter()
            .find(|constructor| constructor.accepts(args))
            .ok_or_else(|| {
                DiError::signature_mismatch(
                    implementation,
                    signature_of(args.iter().map(Instance::type_info)),
                )
            })
    }
}
