//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. A memo is a computation paired with a private trigger signal. Its body
//!    evaluates the user function and stores the result.
//!
//! 2. Reading the memo reads the trigger, so the reader subscribes to the
//!    memo rather than to the memo's own sources.
//!
//! 3. When a source changes, the body runs again. The trigger fires only if
//!    the new value differs from the cached one, so readers downstream of an
//!    unchanged memo do not run.
//!
//! 4. Like effects, the first run is queued. Reading the memo before that run
//!    happens forces it. If the function panics there is no value to hand
//!    out: the panic is reported once and [`Memo::try_get`] returns `None`
//!    until a later run succeeds.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::warn;

use super::runtime::{panic_message, Body, Runtime, WeakRuntime};
use super::signal::Signal;
use super::subscriber::ComputationId;
use crate::error::ReactiveError;

struct MemoInner<T: 'static> {
    id: ComputationId,
    value: Rc<RefCell<Option<T>>>,
    trigger: Signal<()>,
    compute: Rc<dyn Fn() -> T>,
    recomputes: Rc<Cell<usize>>,
    runtime: WeakRuntime,
}

/// A cached derived value that recomputes only when dependencies change.
///
/// # Example
///
/// ```rust
/// use falcon_core::reactive::Runtime;
///
/// let runtime = Runtime::new();
/// let (count, set_count) = runtime.create_signal(2);
/// let doubled = runtime.create_memo(move || count.get() * 2);
///
/// assert_eq!(doubled.get(), 4);
/// set_count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T: 'static> {
    inner: Rc<MemoInner<T>>,
}

impl<T: 'static> Memo<T> {
    /// The id of the memo's computation.
    pub fn id(&self) -> ComputationId {
        self.inner.id
    }

    /// Make sure the cached value exists, if it can.
    ///
    /// A memo whose last run failed stays empty until a later run succeeds;
    /// reading it does not evaluate the function again.
    fn ensure_value(&self) {
        if self.inner.value.borrow().is_some() {
            return;
        }

        let runtime = self.inner.runtime.upgrade();
        match &runtime {
            Some(rt) if rt.is_alive(self.inner.id) => {
                if rt.run_count(self.inner.id) == 0 {
                    rt.run_computation(self.inner.id);
                }
            }
            // Disposed before its first run: compute once without
            // subscribing anything.
            _ if self.inner.recomputes.get() == 0 => self.compute_detached(runtime.as_ref()),
            _ => {}
        }
    }

    fn compute_detached(&self, runtime: Option<&Runtime>) {
        self.inner.recomputes.set(self.inner.recomputes.get() + 1);
        let compute = &self.inner.compute;
        let result = panic::catch_unwind(AssertUnwindSafe(|| match runtime {
            Some(runtime) => runtime.untrack(|| compute()),
            None => compute(),
        }));

        match result {
            Ok(value) => *self.inner.value.borrow_mut() = Some(value),
            Err(payload) => {
                let err = ReactiveError::ComputationPanicked {
                    id: self.inner.id,
                    message: panic_message(payload.as_ref()),
                };
                match runtime {
                    Some(runtime) => runtime.report(err),
                    None => warn!(%err, "memo evaluated after its runtime was dropped"),
                }
            }
        }
    }

    /// Borrow the cached value, tracking the read. Returns `None` while the
    /// memo has no value because its function failed.
    pub fn try_with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.ensure_value();
        self.inner.trigger.with(|_| ());
        self.inner.value.borrow().as_ref().map(f)
    }

    /// Like [`try_with`](Memo::try_with), without tracking the read.
    pub fn try_with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.ensure_value();
        self.inner.value.borrow().as_ref().map(f)
    }

    /// Borrow the cached value, tracking the read.
    ///
    /// # Panics
    ///
    /// Panics if the memo function failed and no value was ever produced.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.try_with(f).expect("memo has no value; its function failed")
    }

    /// Borrow the cached value without tracking dependencies.
    ///
    /// # Panics
    ///
    /// Panics if the memo function failed and no value was ever produced.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.try_with_untracked(f)
            .expect("memo has no value; its function failed")
    }

    /// Number of times the memo function has been evaluated.
    pub fn recompute_count(&self) -> usize {
        self.inner.recomputes.get()
    }

    /// Number of computations currently reading this memo.
    pub fn subscriber_count(&self) -> usize {
        self.inner.trigger.subscriber_count()
    }

    /// Stop recomputing. The last value stays readable.
    pub fn dispose(&self) {
        if let Some(runtime) = self.inner.runtime.upgrade() {
            runtime.dispose_computation(self.inner.id);
        }
    }

    /// Check if the memo has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner
            .runtime
            .upgrade()
            .map_or(true, |runtime| !runtime.is_alive(self.inner.id))
    }
}

impl<T: Clone + 'static> Memo<T> {
    /// Get the cached value, tracking the read.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Get the cached value, or `None` if the memo function failed.
    pub fn try_get(&self) -> Option<T> {
        self.try_with(T::clone)
    }

    /// Get the cached value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.with_untracked(T::clone)
    }
}

impl<T: 'static> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Debug + 'static> Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("recompute_count", &self.recompute_count())
            .finish()
    }
}

impl Runtime {
    /// Create a memo owned by the current owner.
    pub fn create_memo<T, F>(&self, compute: F) -> Memo<T>
    where
        T: PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        let compute: Rc<dyn Fn() -> T> = Rc::new(compute);
        let value = Rc::new(RefCell::new(None));
        let trigger = Signal::always(self, ());
        let recomputes = Rc::new(Cell::new(0));

        let body: Body = {
            let compute = compute.clone();
            let value = value.clone();
            let trigger = trigger.clone();
            let recomputes = recomputes.clone();
            Rc::new(move || {
                recomputes.set(recomputes.get() + 1);
                let next = compute();

                let changed = value.borrow().as_ref() != Some(&next);
                if changed {
                    *value.borrow_mut() = Some(next);
                    trigger.set(());
                }
                Ok(())
            })
        };

        let id = self.create_computation(body);
        Memo {
            inner: Rc::new(MemoInner {
                id,
                value,
                trigger,
                compute,
                recomputes,
                runtime: self.downgrade(),
            }),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memo_caches_value() {
        let runtime = Runtime::new();
        let (count, _set_count) = runtime.create_signal(1);
        let doubled = runtime.create_memo(move || count.get() * 2);
        runtime.flush();

        assert_eq!(doubled.get(), 2);
        assert_eq!(doubled.get(), 2);
        assert_eq!(doubled.recompute_count(), 1);
    }

    #[test]
    fn memo_recomputes_when_source_changes() {
        let runtime = Runtime::new();
        let (count, set_count) = runtime.create_signal(1);
        let doubled = runtime.create_memo(move || count.get() * 2);
        runtime.flush();

        set_count.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(doubled.recompute_count(), 2);
    }

    #[test]
    fn read_before_first_flush_forces_a_run() {
        let runtime = Runtime::new();
        let (count, _set_count) = runtime.create_signal(3);
        let tripled = runtime.create_memo(move || count.get() * 3);

        assert_eq!(tripled.get(), 9);
        assert_eq!(tripled.recompute_count(), 1);

        // The queued first run sees the memo already ran.
        runtime.flush();
        assert_eq!(tripled.recompute_count(), 1);
    }

    #[test]
    fn unchanged_result_does_not_notify_readers() {
        let runtime = Runtime::new();
        let (count, set_count) = runtime.create_signal(2);
        let is_even = runtime.create_memo(move || count.get() % 2 == 0);
        let runs = Rc::new(Cell::new(0));

        {
            let is_even = is_even.clone();
            let runs = runs.clone();
            runtime.create_effect(move || {
                is_even.get();
                runs.set(runs.get() + 1);
            });
        }
        runtime.flush();
        assert_eq!(runs.get(), 1);

        set_count.set(4);
        assert_eq!(is_even.recompute_count(), 2);
        assert_eq!(runs.get(), 1);

        set_count.set(5);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn memo_chain() {
        let runtime = Runtime::new();
        let (base, set_base) = runtime.create_signal(1);
        let plus_one = runtime.create_memo(move || base.get() + 1);
        let times_ten = {
            let plus_one = plus_one.clone();
            runtime.create_memo(move || plus_one.get() * 10)
        };
        runtime.flush();

        assert_eq!(times_ten.get(), 20);
        set_base.set(4);
        assert_eq!(times_ten.get(), 50);
    }

    #[test]
    fn disposed_memo_keeps_last_value() {
        let runtime = Runtime::new();
        let (count, set_count) = runtime.create_signal(1);
        let memo = runtime.create_memo(move || count.get());
        runtime.flush();

        memo.dispose();
        assert!(memo.is_disposed());

        set_count.set(2);
        assert_eq!(memo.get(), 1);
    }

    #[test]
    fn failed_first_run_is_reported_once() {
        let runtime = Runtime::new();
        let errors = Rc::new(RefCell::new(Vec::new()));
        {
            let errors = errors.clone();
            runtime.set_error_handler(move |err| errors.borrow_mut().push(err.clone()));
        }
        let (ready, set_ready) = runtime.create_signal(false);
        let memo = runtime.create_memo(move || {
            if !ready.get() {
                panic!("not ready");
            }
            7
        });

        assert_eq!(memo.try_get(), None);
        assert_eq!(memo.try_get(), None);
        assert_eq!(memo.recompute_count(), 1);
        assert_eq!(errors.borrow().len(), 1);
        assert!(matches!(
            errors.borrow()[0],
            ReactiveError::ComputationPanicked { ref message, .. } if message == "not ready"
        ));

        // The failed run still subscribed to what it read.
        set_ready.set(true);
        assert_eq!(memo.try_get(), Some(7));
        assert_eq!(memo.recompute_count(), 2);
    }

    #[test]
    fn memo_disposed_before_first_run_still_yields_a_value() {
        let runtime = Runtime::new();
        let memo = runtime.create_memo(|| "ready".to_string());
        memo.dispose();

        assert_eq!(memo.get(), "ready");
    }
}
