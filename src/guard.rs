//! Re-entrancy tracking for resolutions
//!
//! A guard records which execution contexts are currently inside a
//! resolution step. Entering again from the same context before the scope is
//! released is a circular dependency; entering from a different context is
//! just concurrency.

use crate::{DiError, Result};
use ahash::RandomState;
use dashmap::DashSet;
use std::thread::{self, ThreadId};

#[cfg(feature = "logging")]
use tracing::debug;

/// Identifier of a logical execution context.
///
/// All container operations are synchronous, so the current thread is the
/// execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(ThreadId);

impl ContextId {
    /// The context of the caller
    #[inline]
    pub fn current() -> Self {
        Self(thread::current().id())
    }
}

/// Per-registration (or per-type), per-context recursion tracker.
pub struct CircularDependencyGuard {
    active: DashSet<ContextId, RandomState>,
}

impl CircularDependencyGuard {
    pub fn new() -> Self {
        Self {
            active: DashSet::with_hasher(RandomState::new()),
        }
    }

    /// Enter the guarded section for the current context.
    ///
    /// The returned scope releases the context when dropped, including while
    /// unwinding.
    pub fn enter(&self, type_name: &'static str) -> Result<GuardScope<'_>> {
        let context = ContextId::current();

        if !self.active.insert(context) {
            #[cfg(feature = "logging")]
            debug!(
                target: "activator",
                service = type_name,
                ?context,
                "Re-entrant resolution detected"
            );

            return Err(DiError::circular(type_name));
        }

        Ok(GuardScope {
            guard: self,
            context,
        })
    }

    /// Whether the current context is inside the guarded section
    pub fn is_entered(&self) -> bool {
        self.active.contains(&ContextId::current())
    }

    /// Number of contexts currently inside the guarded section
    pub fn active_contexts(&self) -> usize {
        self.active.len()
    }
}

impl Default for CircularDependencyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CircularDependencyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircularDependencyGuard")
            .field("active_contexts", &self.active_contexts())
            .finish()
    }
}

/// Releases a context from its guard on drop.
#[derive(Debug)]
#[must_use = "the guard is released as soon as the scope is dropped"]
pub struct GuardScope<'a> {
    guard: &'a CircularDependencyGuard,
    context: ContextId,
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        self.guard.active.remove(&self.context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_reentry_is_circular() {
        let guard = CircularDependencyGuard::new();

        let _outer = guard.enter("A").unwrap();
        assert!(guard.is_entered());

        let err = guard.enter("A").unwrap_err();
        assert!(matches!(err, DiError::CircularDependency { type_name: "A" }));
    }

    #[test]
    fn test_scope_releases_on_drop() {
        let guard = CircularDependencyGuard::new();

        {
            let _scope = guard.enter("A").unwrap();
        }

        assert!(!guard.is_entered());
        assert!(guard.enter("A").is_ok());
    }

    #[test]
    fn test_scope_releases_on_unwind() {
        let guard = CircularDependencyGuard::new();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = guard.enter("A").unwrap();
            panic!("constructor blew up");
        }));

        assert!(result.is_err());
        assert_eq!(guard.active_contexts(), 0);
    }

    #[test]
    fn test_other_contexts_are_not_cycles() {
        let guard = CircularDependencyGuard::new();
        let barrier = Barrier::new(2);

        std::thread::scope(|s| {
            for _ in 0..2 {
                s.spawn(|| {
                    let _scope = guard.enter("A").unwrap();
                    // Both threads hold the guard at the same time
                    barrier.wait();
                    assert_eq!(guard.active_contexts(), 2);
                    barrier.wait();
                });
            }
        });

        assert_eq!(guard.active_contexts(), 0);
    }
}
