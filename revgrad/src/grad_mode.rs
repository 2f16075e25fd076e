//! Grad mode: whether operations currently record a graph.
//!
//! The flag is thread-local, so independent computations on different threads
//! never observe each other's scopes. Guards restore the state they found on
//! drop, which makes scopes nest and survive early returns and panics.

use std::cell::Cell;

thread_local! {
    static GRAD_ENABLED: Cell<bool> = const { Cell::new(true) };
}

/// Returns `true` if operations on this thread currently record a graph.
pub fn is_grad_enabled() -> bool {
    GRAD_ENABLED.with(|enabled| enabled.get())
}

/// Sets grad mode for this thread, returning the previous state.
pub fn set_grad_enabled(enabled: bool) -> bool {
    GRAD_ENABLED.with(|flag| flag.replace(enabled))
}

/// RAII guard disabling graph recording until dropped.
#[derive(Debug)]
#[must_use = "grad mode is restored as soon as the guard is dropped"]
pub struct NoGradGuard {
    previous_state: bool,
}

impl Default for NoGradGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl NoGradGuard {
    pub fn new() -> Self {
        NoGradGuard {
            previous_state: set_grad_enabled(false),
        }
    }
}

impl Drop for NoGradGuard {
    fn drop(&mut self) {
        set_grad_enabled(self.previous_state);
    }
}

/// RAII guard re-enabling graph recording inside a no-grad scope.
#[derive(Debug)]
#[must_use = "grad mode is restored as soon as the guard is dropped"]
pub struct EnableGradGuard {
    previous_state: bool,
}

impl Default for EnableGradGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl EnableGradGuard {
    pub fn new() -> Self {
        EnableGradGuard {
            previous_state: set_grad_enabled(true),
        }
    }
}

impl Drop for EnableGradGuard {
    fn drop(&mut self) {
        set_grad_enabled(self.previous_state);
    }
}

/// Runs `f` with graph recording disabled.
pub fn no_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = NoGradGuard::new();
    f()
}

/// Runs `f` with graph recording enabled, even inside a no-grad scope.
pub fn enable_grad<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = EnableGradGuard::new();
    f()
}
