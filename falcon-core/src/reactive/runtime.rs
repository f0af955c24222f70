//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects signals, memos, and
//! effects. It owns the dependency graph and runs computations when signals
//! change.
//!
//! # How It Works
//!
//! 1. Signals and computations register with the runtime and receive stable
//!    ids. The graph is two lookup tables keyed by those ids: the observers of
//!    each signal and the dependencies of each computation.
//!
//! 2. When a computation reads a signal, the runtime records the edge on both
//!    sides.
//!
//! 3. When a signal's value changes, the runtime:
//!    a. Takes a snapshot of the signal's observers
//!    b. Skips (and unlinks) observers that were disposed
//!    c. Runs every remaining observer synchronously, in subscription order
//!
//! 4. Before a computation runs, its owned computations are disposed, its
//!    cleanups run and every edge from its previous run is removed. The new
//!    run records a fresh dependency set.
//!
//! # Threading
//!
//! The runtime is single-threaded: handles are `Rc`-based and `!Send`. The
//! only deferred work is the first run of a new computation, which waits in
//! the microtask queue until the next checkpoint. A checkpoint is reached when
//! the outermost signal write returns, when a bound event listener returns,
//! when [`render`](crate::view::render) finishes mounting, or on an explicit
//! [`Runtime::flush`].

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, error, trace, warn};

use super::context::{Frame, ReactiveContext};
use super::scope::Scope;
use super::subscriber::{ComputationId, SignalId};
use crate::error::ReactiveError;

/// How many times in a row a computation may re-trigger itself from its own
/// body before the runtime stops re-running it.
pub const MAX_SELF_RERUNS: usize = 100;

/// A computation body as stored by the runtime.
pub(crate) type Body = Rc<dyn Fn() -> Result<(), String>>;

type Cleanup = Box<dyn FnOnce()>;
type Microtask = Box<dyn FnOnce()>;
type ErrorHandler = Rc<dyn Fn(&ReactiveError)>;

/// Registry entry for one computation.
struct ComputationSlot {
    /// `None` for scopes, which own things but never run.
    body: Option<Body>,
    dependencies: IndexSet<SignalId>,
    cleanups: SmallVec<[Cleanup; 2]>,
    owner: Option<ComputationId>,
    owned: Vec<ComputationId>,
    run_count: usize,
    /// Clock value at the start of the latest run.
    last_run: u64,
    running: bool,
    rerun_requested: bool,
}

impl ComputationSlot {
    fn new(body: Option<Body>, owner: Option<ComputationId>) -> Self {
        Self {
            body,
            dependencies: IndexSet::new(),
            cleanups: SmallVec::new(),
            owner,
            owned: Vec::new(),
            run_count: 0,
            last_run: 0,
            running: false,
            rerun_requested: false,
        }
    }
}

pub(crate) struct RuntimeInner {
    context: ReactiveContext,
    observers: RefCell<HashMap<SignalId, IndexSet<ComputationId>>>,
    computations: RefCell<HashMap<ComputationId, ComputationSlot>>,
    microtasks: RefCell<VecDeque<Microtask>>,
    clock: Cell<u64>,
    flushing: Cell<bool>,
    error_handler: RefCell<Option<ErrorHandler>>,
}

/// Handle to a reactive runtime.
///
/// Cloning the handle is cheap and every clone addresses the same graph.
/// Closures stored inside the graph should capture a [`WeakRuntime`] instead,
/// so the runtime can be dropped.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Non-owning handle to a [`Runtime`].
#[derive(Clone, Default)]
pub struct WeakRuntime {
    inner: Weak<RuntimeInner>,
}

impl WeakRuntime {
    /// Get a strong handle if the runtime is still alive.
    pub fn upgrade(&self) -> Option<Runtime> {
        self.inner.upgrade().map(|inner| Runtime { inner })
    }
}

impl fmt::Debug for WeakRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakRuntime")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                context: ReactiveContext::new(),
                observers: RefCell::new(HashMap::new()),
                computations: RefCell::new(HashMap::new()),
                microtasks: RefCell::new(VecDeque::new()),
                clock: Cell::new(0),
                flushing: Cell::new(false),
                error_handler: RefCell::new(None),
            }),
        }
    }

    /// Get a non-owning handle to this runtime.
    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// The context stack of this runtime.
    pub fn context(&self) -> &ReactiveContext {
        &self.inner.context
    }

    /// Check whether two handles address the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Replace the handler that receives computation and cleanup failures.
    ///
    /// The default handler logs them with `tracing::error!`.
    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(&ReactiveError) + 'static,
    {
        *self.inner.error_handler.borrow_mut() = Some(Rc::new(handler));
    }

    pub(crate) fn report(&self, err: ReactiveError) {
        let handler = self.inner.error_handler.borrow().clone();
        match handler {
            Some(handler) => handler(&err),
            None => error!(computation = ?err.computation(), "{err}"),
        }
    }

    // ------------------------------------------------------------------------
    // Signals
    // ------------------------------------------------------------------------

    pub(crate) fn register_signal(&self, id: SignalId) {
        self.inner
            .observers
            .borrow_mut()
            .insert(id, IndexSet::new());
    }

    /// Remove a signal and unlink it from every computation that read it.
    pub(crate) fn unregister_signal(&self, id: SignalId) {
        let observers = self.inner.observers.borrow_mut().remove(&id);
        let Some(observers) = observers else {
            return;
        };

        let mut computations = self.inner.computations.borrow_mut();
        for observer in observers {
            if let Some(slot) = computations.get_mut(&observer) {
                slot.dependencies.shift_remove(&id);
            }
        }
    }

    /// Subscribe the current observer, if any, to the signal.
    pub(crate) fn track(&self, signal: SignalId) {
        let Some(observer) = self.inner.context.current_observer() else {
            return;
        };

        let mut computations = self.inner.computations.borrow_mut();
        let Some(slot) = computations.get_mut(&observer) else {
            return;
        };

        if slot.dependencies.insert(signal) {
            self.inner
                .observers
                .borrow_mut()
                .entry(signal)
                .or_default()
                .insert(observer);
            trace!(?signal, ?observer, "subscribed");
        }
    }

    /// Run every computation subscribed to the signal.
    ///
    /// Iterates a frozen snapshot, so subscriptions added or removed by the
    /// observers themselves do not affect this pass.
    pub(crate) fn notify(&self, signal: SignalId) {
        let pass_started = self.inner.clock.get();
        let snapshot: Vec<ComputationId> = match self.inner.observers.borrow().get(&signal) {
            Some(observers) => observers.iter().copied().collect(),
            None => Vec::new(),
        };

        debug!(?signal, observers = snapshot.len(), "notifying observers");

        for observer in snapshot {
            let fresh = {
                let computations = self.inner.computations.borrow();
                computations.get(&observer).map(|slot| slot.last_run > pass_started)
            };

            match fresh {
                None => {
                    debug!(?signal, ?observer, "dropping disposed observer");
                    if let Some(observers) = self.inner.observers.borrow_mut().get_mut(&signal) {
                        observers.shift_remove(&observer);
                    }
                }
                // Already re-ran after this write through a nested write.
                Some(true) => trace!(?observer, "observer already up to date"),
                Some(false) => self.run_computation(observer),
            }
        }

        self.checkpoint();
    }

    /// Number of computations currently subscribed to the signal.
    pub(crate) fn observer_count(&self, signal: SignalId) -> usize {
        self.inner
            .observers
            .borrow()
            .get(&signal)
            .map_or(0, IndexSet::len)
    }

    // ------------------------------------------------------------------------
    // Computations
    // ------------------------------------------------------------------------

    /// Register a computation and queue its first run.
    pub(crate) fn create_computation(&self, body: Body) -> ComputationId {
        let id = self.insert_slot(Some(body), self.inner.context.current_owner());

        let runtime = self.downgrade();
        self.queue_microtask(move || {
            let Some(runtime) = runtime.upgrade() else {
                return;
            };
            if runtime.is_alive(id) && runtime.run_count(id) == 0 {
                runtime.run_computation(id);
            }
        });

        trace!(?id, "computation created; first run queued");
        id
    }

    /// Register a scope owned by `owner`.
    pub(crate) fn create_scope_slot(&self, owner: Option<ComputationId>) -> ComputationId {
        self.insert_slot(None, owner)
    }

    fn insert_slot(&self, body: Option<Body>, owner: Option<ComputationId>) -> ComputationId {
        let id = ComputationId::new();
        let mut computations = self.inner.computations.borrow_mut();

        // A disposed owner cannot adopt anything.
        let owner = owner.filter(|owner| computations.contains_key(owner));
        if let Some(owner_slot) = owner.and_then(|owner| computations.get_mut(&owner)) {
            owner_slot.owned.push(id);
        }

        computations.insert(id, ComputationSlot::new(body, owner));
        id
    }

    /// Run a computation now.
    ///
    /// If the computation is already running (it wrote a signal it depends
    /// on), a single follow-up run is scheduled after the current one.
    pub(crate) fn run_computation(&self, id: ComputationId) {
        let body = {
            let mut computations = self.inner.computations.borrow_mut();
            let Some(slot) = computations.get_mut(&id) else {
                return;
            };
            let Some(body) = slot.body.clone() else {
                return;
            };
            if slot.running {
                trace!(?id, "re-triggered while running; queueing a follow-up run");
                slot.rerun_requested = true;
                return;
            }
            slot.running = true;
            body
        };

        let mut reruns = 0;
        loop {
            self.cleanup_computation(id);

            let clock = self.inner.clock.get() + 1;
            self.inner.clock.set(clock);
            if let Some(slot) = self.inner.computations.borrow_mut().get_mut(&id) {
                slot.run_count += 1;
                slot.last_run = clock;
            }

            let outcome = {
                let _guard = self.inner.context.enter(Frame::computation(id));
                panic::catch_unwind(AssertUnwindSafe(|| body()))
            };

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(message)) => self.report(ReactiveError::ComputationFailed { id, message }),
                Err(payload) => self.report(ReactiveError::ComputationPanicked {
                    id,
                    message: panic_message(payload.as_ref()),
                }),
            }

            let (again, gave_up) = {
                let mut computations = self.inner.computations.borrow_mut();
                match computations.get_mut(&id) {
                    Some(slot) => {
                        let requested = std::mem::take(&mut slot.rerun_requested);
                        let again = requested && reruns < MAX_SELF_RERUNS;
                        if !again {
                            slot.running = false;
                        }
                        (again, requested && !again)
                    }
                    // Disposed by its own body.
                    None => (false, false),
                }
            };

            if gave_up {
                self.report(ReactiveError::RerunLimit {
                    id,
                    limit: MAX_SELF_RERUNS,
                });
            }
            if !again {
                break;
            }
            reruns += 1;
        }
    }

    /// Tear down everything the previous run of a computation left behind.
    fn cleanup_computation(&self, id: ComputationId) {
        let (owned, cleanups, dependencies) = {
            let mut computations = self.inner.computations.borrow_mut();
            let Some(slot) = computations.get_mut(&id) else {
                return;
            };
            (
                std::mem::take(&mut slot.owned),
                std::mem::take(&mut slot.cleanups),
                std::mem::take(&mut slot.dependencies),
            )
        };

        for child in owned {
            self.dispose_computation(child);
        }

        if !cleanups.is_empty() {
            let _guard = self.inner.context.enter(Frame::untracked(None));
            for cleanup in cleanups {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                    self.report(ReactiveError::CleanupPanicked {
                        id,
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
        }

        let mut observers = self.inner.observers.borrow_mut();
        for signal in dependencies {
            if let Some(set) = observers.get_mut(&signal) {
                set.shift_remove(&id);
            }
        }
    }

    /// Dispose a computation or scope and everything it owns.
    pub(crate) fn dispose_computation(&self, id: ComputationId) {
        if !self.is_alive(id) {
            return;
        }

        self.cleanup_computation(id);

        let slot = {
            let mut computations = self.inner.computations.borrow_mut();
            let slot = computations.remove(&id);
            if let Some(owner) = slot
                .as_ref()
                .and_then(|slot| slot.owner)
                .and_then(|owner| computations.get_mut(&owner))
            {
                owner.owned.retain(|child| *child != id);
            }
            slot
        };

        // Dropping the body may drop signals it captured, and those unregister
        // themselves through the registry.
        drop(slot);
        trace!(?id, "computation disposed");
    }

    pub(crate) fn is_alive(&self, id: ComputationId) -> bool {
        self.inner.computations.borrow().contains_key(&id)
    }

    pub(crate) fn run_count(&self, id: ComputationId) -> usize {
        self.inner
            .computations
            .borrow()
            .get(&id)
            .map_or(0, |slot| slot.run_count)
    }

    pub(crate) fn dependencies(&self, id: ComputationId) -> Vec<SignalId> {
        self.inner
            .computations
            .borrow()
            .get(&id)
            .map(|slot| slot.dependencies.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn owned_count(&self, id: ComputationId) -> usize {
        self.inner
            .computations
            .borrow()
            .get(&id)
            .map_or(0, |slot| slot.owned.len())
    }

    /// Number of live computations and scopes.
    pub fn computation_count(&self) -> usize {
        self.inner.computations.borrow().len()
    }

    /// Register a callback to run before the current owner's next run, or
    /// when it is disposed.
    ///
    /// Outside any computation or scope the callback is dropped with a
    /// warning.
    pub fn on_cleanup<F>(&self, cleanup: F)
    where
        F: FnOnce() + 'static,
    {
        let owner = self.inner.context.current_owner();
        let mut computations = self.inner.computations.borrow_mut();
        match owner.and_then(|owner| computations.get_mut(&owner)) {
            Some(slot) => slot.cleanups.push(Box::new(cleanup)),
            None => warn!("on_cleanup called outside of a reactive computation; ignoring"),
        }
    }

    /// Run `f` without subscribing the current observer to anything it reads.
    pub fn untrack<R>(&self, f: impl FnOnce() -> R) -> R {
        let owner = self.inner.context.current_owner();
        let _guard = self.inner.context.enter(Frame::untracked(owner));
        f()
    }

    pub(crate) fn with_owner<R>(&self, owner: ComputationId, f: impl FnOnce() -> R) -> R {
        let _guard = self.inner.context.enter(Frame::untracked(Some(owner)));
        f()
    }

    /// Run `f` inside a new scope owned by the current owner.
    ///
    /// Disposing the returned scope disposes every computation created by
    /// `f`. The scope is also disposed when its owner re-runs.
    pub fn create_scope<R>(&self, f: impl FnOnce() -> R) -> (R, Scope) {
        let owner = self.inner.context.current_owner();
        self.scope_with_owner(owner, f)
    }

    /// Run `f` inside a new scope that no computation owns.
    ///
    /// The scope lives until it is disposed explicitly.
    pub fn create_root<R>(&self, f: impl FnOnce() -> R) -> (R, Scope) {
        self.scope_with_owner(None, f)
    }

    fn scope_with_owner<R>(&self, owner: Option<ComputationId>, f: impl FnOnce() -> R) -> (R, Scope) {
        let id = self.create_scope_slot(owner);
        let scope = Scope::new(id, self.downgrade());
        let value = self.with_owner(id, f);
        (value, scope)
    }

    // ------------------------------------------------------------------------
    // Microtasks
    // ------------------------------------------------------------------------

    /// Queue work for the next [`flush`](Runtime::flush).
    pub fn queue_microtask<F>(&self, task: F)
    where
        F: FnOnce() + 'static,
    {
        self.inner.microtasks.borrow_mut().push_back(Box::new(task));
    }

    /// Number of queued microtasks.
    pub fn pending_microtasks(&self) -> usize {
        self.inner.microtasks.borrow().len()
    }

    /// Drain the microtask queue, including tasks queued while draining.
    ///
    /// Returns how many tasks ran. Called while a drain is already in
    /// progress, it returns 0 and leaves the queue to that drain.
    pub fn flush(&self) -> usize {
        if self.inner.flushing.replace(true) {
            return 0;
        }
        let _draining = DrainGuard(&self.inner.flushing);

        let mut ran = 0;
        loop {
            let task = self.inner.microtasks.borrow_mut().pop_front();
            let Some(task) = task else {
                break;
            };
            task();
            ran += 1;
        }

        if ran > 0 {
            trace!(ran, "microtasks flushed");
        }
        ran
    }

    /// Drain the microtask queue if no computation, scope or drain is
    /// active, i.e. the current synchronous pass has fully unwound.
    pub fn checkpoint(&self) {
        if self.inner.context.depth() == 0
            && !self.inner.flushing.get()
            && self.pending_microtasks() > 0
        {
            self.flush();
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("signals", &self.inner.observers.borrow().len())
            .field("computations", &self.inner.computations.borrow().len())
            .field("pending_microtasks", &self.pending_microtasks())
            .finish()
    }
}

/// Clears the draining flag, even if a microtask panics.
struct DrainGuard<'a>(&'a Cell<bool>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_body(counter: &Rc<Cell<usize>>) -> Body {
        let counter = counter.clone();
        Rc::new(move || {
            counter.set(counter.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn first_run_waits_for_flush() {
        let runtime = Runtime::new();
        let runs = Rc::new(Cell::new(0));

        let id = runtime.create_computation(counting_body(&runs));
        assert_eq!(runs.get(), 0);
        assert_eq!(runtime.pending_microtasks(), 1);

        assert_eq!(runtime.flush(), 1);
        assert_eq!(runs.get(), 1);
        assert_eq!(runtime.run_count(id), 1);
    }

    #[test]
    fn notify_runs_subscribers_and_clears_stale_edges() {
        let runtime = Runtime::new();
        let signal = SignalId::new();
        runtime.register_signal(signal);

        let runs = Rc::new(Cell::new(0));
        let id = runtime.create_computation(counting_body(&runs));

        // Subscribe by hand, as a signal read during a run would.
        {
            let _guard = runtime.context().enter(Frame::computation(id));
            runtime.track(signal);
            runtime.track(signal);
        }
        assert_eq!(runtime.observer_count(signal), 1);

        runtime.notify(signal);
        assert_eq!(runs.get(), 1);

        // The run did not read the signal again, so the edge is gone.
        assert_eq!(runtime.observer_count(signal), 0);
        assert!(runtime.dependencies(id).is_empty());
    }

    #[test]
    fn disposed_observers_are_dropped_from_snapshot() {
        let runtime = Runtime::new();
        let signal = SignalId::new();
        runtime.register_signal(signal);

        let runs = Rc::new(Cell::new(0));
        let id = runtime.create_computation(counting_body(&runs));
        {
            let _guard = runtime.context().enter(Frame::computation(id));
            runtime.track(signal);
        }

        // Remove the slot but leave the observer edge dangling.
        let slot = runtime.inner.computations.borrow_mut().remove(&id);
        drop(slot);
        runtime.notify(signal);

        assert_eq!(runs.get(), 0);
        assert_eq!(runtime.observer_count(signal), 0);
    }

    #[test]
    fn panicking_body_is_reported_and_stack_restored() {
        let runtime = Runtime::new();
        let reported = Rc::new(RefCell::new(Vec::new()));
        {
            let reported = reported.clone();
            runtime.set_error_handler(move |err| reported.borrow_mut().push(err.clone()));
        }

        let id = runtime.create_computation(Rc::new(|| -> Result<(), String> { panic!("boom") }));
        runtime.flush();

        assert_eq!(runtime.context().depth(), 0);
        assert_eq!(
            reported.borrow().as_slice(),
            &[ReactiveError::ComputationPanicked {
                id,
                message: "boom".to_string()
            }]
        );
    }

    #[test]
    fn unregistering_a_signal_unlinks_dependencies() {
        let runtime = Runtime::new();
        let signal = SignalId::new();
        runtime.register_signal(signal);

        let id = runtime.create_computation(Rc::new(|| Ok::<(), String>(())));
        {
            let _guard = runtime.context().enter(Frame::computation(id));
            runtime.track(signal);
        }
        assert_eq!(runtime.dependencies(id), vec![signal]);

        runtime.unregister_signal(signal);
        assert!(runtime.dependencies(id).is_empty());
    }

    #[test]
    fn on_cleanup_outside_owner_is_ignored() {
        let runtime = Runtime::new();
        let ran = Rc::new(Cell::new(false));
        {
            let ran = ran.clone();
            runtime.on_cleanup(move || ran.set(true));
        }
        assert!(!ran.get());
    }

    #[test]
    fn disposing_owner_disposes_children() {
        let runtime = Runtime::new();
        let ((), scope) = runtime.create_root(|| {
            runtime.create_computation(Rc::new(|| Ok::<(), String>(())));
            runtime.create_computation(Rc::new(|| Ok::<(), String>(())));
        });

        assert_eq!(runtime.owned_count(scope.id()), 2);
        assert_eq!(runtime.computation_count(), 3);

        scope.dispose();
        assert_eq!(runtime.computation_count(), 0);

        // Queued first runs of disposed computations are skipped.
        assert_eq!(runtime.flush(), 2);
    }

    #[test]
    fn flush_inside_a_drain_leaves_the_queue_to_it() {
        let runtime = Runtime::new();
        let nested = Rc::new(Cell::new(usize::MAX));
        {
            let handle = runtime.downgrade();
            let nested = nested.clone();
            runtime.queue_microtask(move || {
                if let Some(runtime) = handle.upgrade() {
                    runtime.queue_microtask(|| {});
                    nested.set(runtime.flush());
                }
            });
        }

        assert_eq!(runtime.flush(), 2);
        assert_eq!(nested.get(), 0);
        assert_eq!(runtime.pending_microtasks(), 0);
    }

    #[test]
    fn checkpoint_waits_for_the_outermost_frame() {
        let runtime = Runtime::new();
        let runs = Rc::new(Cell::new(0));

        let ((), _scope) = runtime.create_root(|| {
            runtime.create_computation(counting_body(&runs));
            runtime.checkpoint();
            assert_eq!(runs.get(), 0);
        });

        runtime.checkpoint();
        assert_eq!(runs.get(), 1);
        assert_eq!(runtime.pending_microtasks(), 0);
    }
}
