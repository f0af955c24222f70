//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a running computation, the runtime
//!    registers that computation as an observer.
//!
//! 2. When a signal is written with a value its equality policy considers
//!    different, every observer runs again, synchronously, before `set`
//!    returns.
//!
//! 3. Reads and writes outside any computation are always legal: a read just
//!    returns the value and a write notifies as usual.
//!
//! # Equality Policy
//!
//! [`Signal::new`] skips writes that compare equal with `PartialEq`.
//! [`Signal::always`] notifies on every write and places no bound on `T`.
//!
//! # Memory Layout
//!
//! Each signal consists of:
//! - A unique ID, also the key of its observer set in the runtime
//! - The value, behind `Rc<RefCell<_>>` and shared by all clones
//! - A weak handle to the runtime

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use tracing::{debug, trace};

use super::runtime::{Runtime, WeakRuntime};
use super::subscriber::SignalId;

type EqualityFn<T> = fn(&T, &T) -> bool;

struct SignalCell<T> {
    id: SignalId,
    value: RefCell<T>,
    /// `None` means "always different".
    equals: Option<EqualityFn<T>>,
    runtime: WeakRuntime,
}

impl<T> Drop for SignalCell<T> {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.upgrade() {
            runtime.unregister_signal(self.id);
        }
    }
}

/// A reactive signal holding a value of type T.
///
/// # Example
///
/// ```rust
/// use falcon_core::reactive::{Runtime, Signal};
///
/// let runtime = Runtime::new();
/// let count = Signal::new(&runtime, 0);
///
/// // Read the value
/// assert_eq!(count.get(), 0);
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T: 'static> {
    cell: Rc<SignalCell<T>>,
}

impl<T: 'static> Signal<T> {
    /// Create a signal that only notifies when the value actually changes.
    pub fn new(runtime: &Runtime, value: T) -> Self
    where
        T: PartialEq,
    {
        Self::with_policy(runtime, value, Some(<T as PartialEq>::eq))
    }

    /// Create a signal that notifies on every write.
    pub fn always(runtime: &Runtime, value: T) -> Self {
        Self::with_policy(runtime, value, None)
    }

    fn with_policy(runtime: &Runtime, value: T, equals: Option<EqualityFn<T>>) -> Self {
        let id = SignalId::new();
        runtime.register_signal(id);
        Self {
            cell: Rc::new(SignalCell {
                id,
                value: RefCell::new(value),
                equals,
                runtime: runtime.downgrade(),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SignalId {
        self.cell.id
    }

    fn track(&self) {
        if let Some(runtime) = self.cell.runtime.upgrade() {
            runtime.track(self.cell.id);
        }
    }

    /// Get the current value.
    ///
    /// If called within a running computation, this also registers the
    /// computation as an observer.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.cell.value.borrow().clone()
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.cell.value.borrow())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.cell.value.borrow().clone()
    }

    /// Borrow the current value without tracking dependencies.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.value.borrow())
    }

    /// Set a new value and notify observers.
    ///
    /// A value equal to the current one (per the signal's policy) is
    /// ignored. Otherwise every observer has re-run by the time this returns.
    pub fn set(&self, value: T) {
        {
            let mut current = self.cell.value.borrow_mut();
            if let Some(equals) = self.cell.equals {
                if equals(&current, &value) {
                    trace!(signal = ?self.cell.id, "value unchanged; skipping notification");
                    return;
                }
            }
            *current = value;
        }

        debug!(signal = ?self.cell.id, "value set");
        if let Some(runtime) = self.cell.runtime.upgrade() {
            runtime.notify(self.cell.id);
        }
    }

    /// Update the value using a function.
    ///
    /// This is useful for updates that depend on the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = {
            let current = self.cell.value.borrow();
            f(&current)
        };
        self.set(next);
    }

    /// Get the number of computations currently observing this signal.
    pub fn subscriber_count(&self) -> usize {
        self.cell
            .runtime
            .upgrade()
            .map_or(0, |runtime| runtime.observer_count(self.cell.id))
    }

    /// Split into a read half and a write half sharing this signal.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (ReadSignal(self.clone()), WriteSignal(self))
    }

    /// A read-only handle to this signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal(self.clone())
    }
}

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: Debug + 'static> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.cell.id)
            .field("value", &*self.cell.value.borrow())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// The read half of a signal.
pub struct ReadSignal<T: 'static>(Signal<T>);

impl<T: 'static> ReadSignal<T> {
    /// Get the current value, tracking the read.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.get()
    }

    /// Borrow the current value, tracking the read.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.with(f)
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.0.get_untracked()
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SignalId {
        self.0.id()
    }

    /// Get the number of computations currently observing this signal.
    pub fn subscriber_count(&self) -> usize {
        self.0.subscriber_count()
    }
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Debug + 'static> Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.0).finish()
    }
}

/// The write half of a signal.
pub struct WriteSignal<T: 'static>(Signal<T>);

impl<T: 'static> WriteSignal<T> {
    /// Set a new value and notify observers.
    pub fn set(&self, value: T) {
        self.0.set(value);
    }

    /// Update the value using a function.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.0.update(f);
    }
}

impl<T: 'static> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: 'static> Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal").field("id", &self.0.id()).finish()
    }
}

impl Runtime {
    /// Create a signal and return its read and write halves.
    pub fn create_signal<T>(&self, value: T) -> (ReadSignal<T>, WriteSignal<T>)
    where
        T: PartialEq + 'static,
    {
        Signal::new(self, value).split()
    }

    /// Create a signal whose writes always notify.
    pub fn create_always_signal<T: 'static>(&self, value: T) -> (ReadSignal<T>, WriteSignal<T>) {
        Signal::always(self, value).split()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn signal_get_and_set() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_notifies_subscribers() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 0);
        let call_count = Rc::new(Cell::new(0));

        let _effect = {
            let signal = signal.clone();
            let call_count = call_count.clone();
            runtime.create_effect(move || {
                signal.get();
                call_count.set(call_count.get() + 1);
            })
        };
        runtime.flush();
        assert_eq!(call_count.get(), 1);

        signal.set(1);
        assert_eq!(call_count.get(), 2);

        signal.set(2);
        assert_eq!(call_count.get(), 3);
    }

    #[test]
    fn equal_writes_are_skipped() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 7);
        let call_count = Rc::new(Cell::new(0));

        {
            let signal = signal.clone();
            let call_count = call_count.clone();
            runtime.create_effect(move || {
                signal.get();
                call_count.set(call_count.get() + 1);
            });
        }
        runtime.flush();

        signal.set(7);
        signal.update(|v| *v);
        assert_eq!(call_count.get(), 1);
    }

    #[test]
    fn always_signal_notifies_on_equal_writes() {
        let runtime = Runtime::new();
        let (read, write) = runtime.create_always_signal(());
        let call_count = Rc::new(Cell::new(0));

        {
            let call_count = call_count.clone();
            runtime.create_effect(move || {
                read.with(|_| ());
                call_count.set(call_count.get() + 1);
            });
        }
        runtime.flush();

        write.set(());
        write.set(());
        assert_eq!(call_count.get(), 3);
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);

        {
            let signal = signal.clone();
            runtime.create_effect(move || {
                signal.get_untracked();
            });
        }
        runtime.flush();

        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn reads_outside_computations_have_no_side_effect() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, "idle".to_string());

        assert_eq!(signal.get(), "idle");
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn signal_clone_shares_state() {
        let runtime = Runtime::new();
        let signal1 = Signal::new(&runtime, 0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
    }

    #[test]
    fn signal_ids_are_unique() {
        let runtime = Runtime::new();
        let s1 = Signal::new(&runtime, 0);
        let s2 = Signal::new(&runtime, 0);
        let s3 = Signal::new(&runtime, 0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
    }

    #[test]
    fn signal_outlives_runtime() {
        let runtime = Runtime::new();
        let signal = Signal::new(&runtime, 1);
        drop(runtime);

        signal.set(2);
        assert_eq!(signal.get(), 2);
        assert_eq!(signal.subscriber_count(), 0);
    }
}
