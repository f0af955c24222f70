//! Ownership scopes.
//!
//! A scope owns computations without running anything itself. Disposing it
//! disposes everything created inside it, including nested scopes. The keyed
//! list gives every row its own scope so a row's bindings live exactly as
//! long as the row.

use std::fmt;

use super::runtime::WeakRuntime;
use super::subscriber::ComputationId;

/// Handle to an ownership scope.
#[derive(Clone)]
pub struct Scope {
    id: ComputationId,
    runtime: WeakRuntime,
}

impl Scope {
    pub(crate) fn new(id: ComputationId, runtime: WeakRuntime) -> Self {
        Self { id, runtime }
    }

    /// The registry id of this scope.
    pub fn id(&self) -> ComputationId {
        self.id
    }

    /// Run `f` with this scope as the owner of anything it creates.
    ///
    /// Reads inside `f` are not tracked.
    pub fn run_in<R>(&self, f: impl FnOnce() -> R) -> R {
        match self.runtime.upgrade() {
            Some(runtime) if runtime.is_alive(self.id) => runtime.with_owner(self.id, f),
            Some(runtime) => runtime.untrack(f),
            None => f(),
        }
    }

    /// Dispose the scope and everything it owns.
    pub fn dispose(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.dispose_computation(self.id);
        }
    }

    /// Check if the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.runtime
            .upgrade()
            .map_or(true, |runtime| !runtime.is_alive(self.id))
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::reactive::Runtime;

    #[test]
    fn scope_cleanup_runs_on_dispose() {
        let runtime = Runtime::new();
        let cleaned = Rc::new(Cell::new(0));

        let ((), scope) = runtime.create_root(|| {
            let cleaned = cleaned.clone();
            runtime.on_cleanup(move || cleaned.set(cleaned.get() + 1));
        });

        assert_eq!(cleaned.get(), 0);
        scope.dispose();
        assert_eq!(cleaned.get(), 1);
        assert!(scope.is_disposed());

        // Disposing twice is harmless.
        scope.dispose();
        assert_eq!(cleaned.get(), 1);
    }

    #[test]
    fn nested_scopes_are_disposed_with_parent() {
        let runtime = Runtime::new();

        let (inner, outer) = runtime.create_root(|| runtime.create_scope(|| ()).1);
        assert!(!inner.is_disposed());

        outer.dispose();
        assert!(inner.is_disposed());
    }

    #[test]
    fn run_in_attaches_new_work_to_scope() {
        let runtime = Runtime::new();
        let ((), scope) = runtime.create_root(|| ());

        let effect = scope.run_in(|| runtime.create_effect(|| {}));
        assert!(!effect.is_disposed());

        scope.dispose();
        assert!(effect.is_disposed());
    }
}
