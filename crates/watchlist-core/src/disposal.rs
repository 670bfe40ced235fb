//! Disposal capability.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A shared disposal flag held by composition.
///
/// Components that own lifecycle resources (timers, sockets, cached
/// credentials) each hold one of these. Disposal is permanent: every
/// operation checks the flag first and fails once it is set.
///
/// Clones share the same flag, so an owner can hand the guard to background
/// tasks and have them observe disposal.
#[derive(Debug, Clone, Default)]
pub struct DisposalGuard {
    disposed: Arc<AtomicBool>,
}

impl DisposalGuard {
    /// Create a new, live guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the owner as disposed.
    ///
    /// Returns `true` on the first call, `false` on every later call.
    pub fn dispose(&self) -> bool {
        !self.disposed.swap(true, Ordering::SeqCst)
    }

    /// Check whether the owner has been disposed.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_live() {
        let guard = DisposalGuard::new();
        assert!(!guard.is_disposed());
    }

    #[test]
    fn dispose_is_permanent() {
        let guard = DisposalGuard::new();
        assert!(guard.dispose());
        assert!(guard.is_disposed());
        assert!(guard.is_disposed());
    }

    #[test]
    fn dispose_reports_first_call_only() {
        let guard = DisposalGuard::new();
        assert!(guard.dispose());
        assert!(!guard.dispose());
    }

    #[test]
    fn clones_share_the_flag() {
        let guard = DisposalGuard::new();
        let clone = guard.clone();
        guard.dispose();
        assert!(clone.is_disposed());
    }
}
