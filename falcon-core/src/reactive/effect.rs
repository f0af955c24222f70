//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect is queued as a microtask. It first runs at the
//!    next checkpoint (see [`Runtime::checkpoint`]), so DOM structure built in
//!    the same pass is in place before the effect looks at it.
//!
//! 2. When any dependency changes, the effect re-runs synchronously inside
//!    the write.
//!
//! 3. Before re-running, the effect disposes what it created last time, runs
//!    its cleanups and drops its old subscriptions. The new run records a
//!    fresh dependency set.
//!
//! # Failures
//!
//! A panic in the body, or an `Err` returned from it, is caught and reported
//! through the runtime's error handler. The effect stays subscribed to what
//! it read before failing and runs again on the next change.
//!
//! # Cleanup
//!
//! Effects register cleanups with [`Runtime::on_cleanup`]. They run in
//! registration order before the next run and when the effect is disposed.

use std::fmt;
use std::rc::Rc;

use super::runtime::{Body, Runtime, WeakRuntime};
use super::subscriber::ComputationId;

/// Values an effect body may return.
///
/// `()` always succeeds. A `Result` reports its error to the runtime.
pub trait EffectOutput {
    /// Convert into the runtime's outcome.
    fn into_outcome(self) -> Result<(), String>;
}

impl EffectOutput for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display> EffectOutput for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|err| err.to_string())
    }
}

/// Handle to a side-effecting computation.
///
/// Dropping the handle does not stop the effect; it lives until its owner
/// is disposed or [`Effect::dispose`] is called.
///
/// # Example
///
/// ```rust
/// use falcon_core::reactive::Runtime;
///
/// let runtime = Runtime::new();
/// let (count, set_count) = runtime.create_signal(0);
///
/// runtime.create_effect(move || {
///     println!("Count is: {}", count.get());
/// });
/// runtime.flush(); // Prints: "Count is: 0"
///
/// set_count.set(5); // Prints: "Count is: 5"
/// ```
#[derive(Clone)]
pub struct Effect {
    id: ComputationId,
    runtime: WeakRuntime,
}

impl Effect {
    /// Get the effect's unique ID.
    pub fn id(&self) -> ComputationId {
        self.id
    }

    /// Run the effect now, as if a dependency had changed.
    pub fn execute(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.run_computation(self.id);
            runtime.checkpoint();
        }
    }

    /// Dispose of the effect.
    ///
    /// Its cleanups run one last time and it will not run again.
    pub fn dispose(&self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.dispose_computation(self.id);
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.runtime
            .upgrade()
            .map_or(true, |runtime| !runtime.is_alive(self.id))
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.runtime
            .upgrade()
            .map_or(0, |runtime| runtime.run_count(self.id))
    }

    /// Get the number of signals the latest run read.
    pub fn dependency_count(&self) -> usize {
        self.runtime
            .upgrade()
            .map_or(0, |runtime| runtime.dependencies(self.id).len())
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Runtime {
    /// Create an effect owned by the current owner.
    ///
    /// The first run is deferred to the next checkpoint or
    /// [`flush`](Runtime::flush).
    pub fn create_effect<F, R>(&self, run: F) -> Effect
    where
        F: Fn() -> R + 'static,
        R: EffectOutput,
    {
        let body: Body = Rc::new(move || run().into_outcome());
        let id = self.create_computation(body);
        Effect {
            id,
            runtime: self.downgrade(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReactiveError;
    use std::cell::{Cell, RefCell};

    #[test]
    fn effect_waits_for_first_flush() {
        let runtime = Runtime::new();
        let run_count = Rc::new(Cell::new(0));

        let effect = {
            let run_count = run_count.clone();
            runtime.create_effect(move || run_count.set(run_count.get() + 1))
        };

        // Not run at the call site
        assert_eq!(run_count.get(), 0);
        assert_eq!(effect.run_count(), 0);

        runtime.flush();
        assert_eq!(run_count.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effects_created_by_a_rerun_run_before_the_write_returns() {
        let runtime = Runtime::new();
        let (count, set_count) = runtime.create_signal(0);
        let inner_runs = Rc::new(Cell::new(0));
        {
            let handle = runtime.downgrade();
            let inner_runs = inner_runs.clone();
            runtime.create_effect(move || {
                count.get();
                let Some(runtime) = handle.upgrade() else {
                    return;
                };
                let inner_runs = inner_runs.clone();
                runtime.create_effect(move || inner_runs.set(inner_runs.get() + 1));
            });
        }
        runtime.flush();
        assert_eq!(inner_runs.get(), 1);

        set_count.set(1);
        assert_eq!(inner_runs.get(), 2);
        assert_eq!(runtime.pending_microtasks(), 0);
    }

    #[test]
    fn effect_runs_on_execute() {
        let runtime = Runtime::new();
        let effect = runtime.create_effect(|| {});
        runtime.flush();
        assert_eq!(effect.run_count(), 1);

        effect.execute();
        assert_eq!(effect.run_count(), 2);

        effect.execute();
        assert_eq!(effect.run_count(), 3);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let runtime = Runtime::new();
        let (count, set_count) = runtime.create_signal(0);
        let run_count = Rc::new(Cell::new(0));

        let effect = {
            let run_count = run_count.clone();
            runtime.create_effect(move || {
                count.get();
                run_count.set(run_count.get() + 1);
            })
        };
        runtime.flush();
        assert_eq!(run_count.get(), 1);

        effect.dispose();
        assert!(effect.is_disposed());

        set_count.set(1);
        effect.execute();
        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn disposal_runs_final_cleanup() {
        let runtime = Runtime::new();
        let cleaned = Rc::new(Cell::new(0));

        let effect = {
            let runtime_handle = runtime.downgrade();
            let cleaned = cleaned.clone();
            runtime.create_effect(move || {
                let cleaned = cleaned.clone();
                if let Some(runtime) = runtime_handle.upgrade() {
                    runtime.on_cleanup(move || cleaned.set(cleaned.get() + 1));
                }
            })
        };
        runtime.flush();
        assert_eq!(cleaned.get(), 0);

        effect.dispose();
        assert_eq!(cleaned.get(), 1);
    }

    #[test]
    fn failing_result_is_reported() {
        let runtime = Runtime::new();
        let errors = Rc::new(RefCell::new(Vec::new()));
        {
            let errors = errors.clone();
            runtime.set_error_handler(move |err| errors.borrow_mut().push(err.clone()));
        }

        let effect = runtime.create_effect(|| -> Result<(), String> { Err("no data".to_string()) });
        runtime.flush();

        assert_eq!(
            errors.borrow().as_slice(),
            &[ReactiveError::ComputationFailed {
                id: effect.id(),
                message: "no data".to_string()
            }]
        );
    }

    #[test]
    fn dependency_count_follows_latest_run() {
        let runtime = Runtime::new();
        let (flag, set_flag) = runtime.create_signal(true);
        let (a, _set_a) = runtime.create_signal(1);
        let (b, _set_b) = runtime.create_signal(2);

        let effect = runtime.create_effect(move || {
            if flag.get() {
                a.get();
                b.get();
            }
        });
        runtime.flush();
        assert_eq!(effect.dependency_count(), 3);

        set_flag.set(false);
        assert_eq!(effect.dependency_count(), 1);
    }
}
