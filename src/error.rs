//! Error types for dependency injection

use crate::types::TypeInfo;
use thiserror::Error;

/// Why a registration was rejected.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationIssue {
    /// Service type is a restricted marker type (text or type-of-types)
    #[error("restricted marker types cannot be registered as services")]
    RestrictedServiceType,

    /// Service type is a value type
    #[error("service type must be a reference type")]
    NotReferenceType,

    /// Implementation is abstract, an interface or an array
    #[error("implementation type is not instantiable")]
    NotInstantiable,

    /// Implementation cannot be converted to the service type
    #[error("implementation type is not assignable to the service type")]
    NotAssignable,

    /// Registration name is empty or whitespace
    #[error("registration name must not be blank")]
    BlankName,
}

/// Errors that can occur during dependency injection operations
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// Invalid service/implementation pairing at registration time
    #[error("Invalid registration for {service}: {reason}")]
    Registration {
        service: &'static str,
        reason: RegistrationIssue,
    },

    /// Non-optional resolution of an unregistered key
    #[error("Service not registered: {type_name}{}", describe_name(.name))]
    NotRegistered {
        type_name: &'static str,
        name: Option<String>,
    },

    /// Implementation exposes no constructor
    #[error("No constructor found for {type_name}")]
    NoConstructor { type_name: &'static str },

    /// Explicit arguments match none of the implementation's constructors
    #[error("No constructor of {type_name} accepts ({signature})")]
    SignatureMismatch {
        type_name: &'static str,
        signature: String,
    },

    /// Circular dependency detected during resolution
    #[error("Circular dependency detected while resolving: {type_name}")]
    CircularDependency { type_name: &'static str },

    /// Constructor or factory failed to create service
    #[error("Failed to create service {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },
}

fn describe_name(name: &Option<String>) -> String {
    match name {
        Some(name) => format!(" (named \"{name}\")"),
        None => String::new(),
    }
}

impl DiError {
    /// Create a Registration error
    #[inline]
    pub fn registration(service: &TypeInfo, reason: RegistrationIssue) -> Self {
        Self::Registration {
            service: service.name(),
            reason,
        }
    }

    /// Create a NotRegistered error for a key
    #[inline]
    pub fn not_registered(service: &TypeInfo, name: Option<&str>) -> Self {
        Self::NotRegistered {
            type_name: service.name(),
            name: name.map(str::to_owned),
        }
    }

    /// Create a NoConstructor error
    #[inline]
    pub fn no_constructor(implementation: &TypeInfo) -> Self {
        Self::NoConstructor {
            type_name: implementation.name(),
        }
    }

    /// Create a SignatureMismatch error
    #[inline]
    pub fn signature_mismatch(implementation: &TypeInfo, signature: impl Into<String>) -> Self {
        Self::SignatureMismatch {
            type_name: implementation.name(),
            signature: signature.into(),
        }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(type_name: &'static str) -> Self {
        Self::CircularDependency { type_name }
    }

    /// Create a CreationFailed error for a type
    #[inline]
    pub fn creation_failed<T: ?Sized + 'static>(reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: std::any::type_name::<T>(),
            reason: reason.into(),
        }
    }

    /// Create a CreationFailed error from runtime type information
    #[inline]
    pub fn creation_failed_for(ty: &TypeInfo, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: ty.name(),
            reason: reason.into(),
        }
    }

    /// Whether this error reports an unregistered key
    #[inline]
    pub fn is_not_registered(&self) -> bool {
        matches!(self, Self::NotRegistered { .. })
    }
}

/// Result type alias for DI operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_registered_message_includes_name() {
        let err = DiError::not_registered(&TypeInfo::of::<u32>(), Some("file"));
        assert_eq!(err.to_string(), "Service not registered: u32 (named \"file\")");

        let err = DiError::not_registered(&TypeInfo::of::<u32>(), None);
        assert_eq!(err.to_string(), "Service not registered: u32");
        assert!(err.is_not_registered());
    }

    #[test]
    fn test_registration_message() {
        let err = DiError::registration(&TypeInfo::of::<String>(), RegistrationIssue::RestrictedServiceType);
        assert!(err.to_string().contains("restricted marker types"));
        assert!(!err.is_not_registered());
    }
}
