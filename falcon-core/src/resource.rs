//! Async Resources
//!
//! A resource runs an async fetch inside an effect and exposes its progress
//! as three reactive values: the latest data, a loading flag and the latest
//! error.
//!
//! # How Resources Work
//!
//! 1. The effect calls the fetcher. Signals read while the fetcher builds its
//!    future are tracked, so changing them fetches again.
//!
//! 2. Each fetch gets a request number. Only the latest request may write
//!    its outcome or clear the loading flag; older completions are ignored.
//!
//! 3. The future is spawned on the current [`tokio::task::LocalSet`] behind
//!    an abort handle. The effect's cleanup aborts it, so re-running or
//!    disposing the resource cancels the request in flight.
//!
//! 4. A guard owned by the task clears `loading` when the task ends, whether
//!    it succeeded, failed or was aborted.
//!
//! Resources must be created (and refetched) from inside a `LocalSet`.

use std::cell::Cell;
use std::fmt::{self, Display};
use std::future::Future;
use std::rc::Rc;

use futures_util::future::{AbortHandle, Abortable};
use tracing::{debug, error};

use crate::reactive::{Effect, ReadSignal, Runtime, WriteSignal};

/// Clears the loading flag when the latest request's task ends.
struct LoadingReset {
    latest: Rc<Cell<u64>>,
    request: u64,
    loading: WriteSignal<bool>,
}

impl Drop for LoadingReset {
    fn drop(&mut self) {
        if self.latest.get() == self.request {
            self.loading.set(false);
        }
    }
}

/// Reactive view of an async fetch.
pub struct Resource<T: 'static, E: 'static> {
    data: ReadSignal<Option<T>>,
    loading: ReadSignal<bool>,
    error: ReadSignal<Option<E>>,
    effect: Effect,
}

impl<T: 'static, E: 'static> Resource<T, E> {
    /// The latest successful result; `None` until the first success.
    pub fn data(&self) -> Option<T>
    where
        T: Clone,
    {
        self.data.get()
    }

    /// Borrow the latest successful result, tracking the read.
    pub fn with_data<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        self.data.with(|data| f(data.as_ref()))
    }

    /// Whether a request is in flight.
    pub fn loading(&self) -> bool {
        self.loading.get()
    }

    /// The error of the latest request, if it failed.
    pub fn error(&self) -> Option<E>
    where
        E: Clone,
    {
        self.error.get()
    }

    /// Fetch again, cancelling the request in flight.
    pub fn refetch(&self) {
        self.effect.execute();
    }

    /// Stop fetching and cancel the request in flight.
    pub fn dispose(&self) {
        self.effect.dispose();
    }
}

impl<T: 'static, E: 'static> Clone for Resource<T, E> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            loading: self.loading.clone(),
            error: self.error.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T: 'static, E: 'static> fmt::Debug for Resource<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("loading", &self.loading.get_untracked())
            .field("effect", &self.effect)
            .finish()
    }
}

impl Runtime {
    /// Create a resource that fetches with `fetcher`.
    ///
    /// The first fetch starts when the microtask queue next drains, at the
    /// next checkpoint or [`flush`](Runtime::flush).
    pub fn create_resource<F, Fut, T, E>(&self, fetcher: F) -> Resource<T, E>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        T: 'static,
        E: Display + 'static,
    {
        let (data, set_data) = self.create_always_signal(None);
        let (loading, set_loading) = self.create_signal(false);
        let (error, set_error) = self.create_always_signal(None);
        let latest = Rc::new(Cell::new(0u64));
        let handle = self.downgrade();

        let effect = self.create_effect(move || {
            let future = fetcher();

            let request = latest.get() + 1;
            latest.set(request);
            debug!(request, "resource fetch started");

            set_loading.set(true);
            set_error.set(None);

            let (abort, registration) = AbortHandle::new_pair();
            if let Some(runtime) = handle.upgrade() {
                runtime.on_cleanup(move || abort.abort());
            }

            let reset = LoadingReset {
                latest: latest.clone(),
                request,
                loading: set_loading.clone(),
            };
            let latest = latest.clone();
            let set_data = set_data.clone();
            let set_error = set_error.clone();

            tokio::task::spawn_local(async move {
                let _reset = reset;
                let outcome = Abortable::new(future, registration).await;
                let current = latest.get() == request;

                match outcome {
                    Ok(Ok(value)) if current => set_data.set(Some(value)),
                    Ok(Err(err)) => {
                        error!(request, %err, "resource fetch failed");
                        if current {
                            set_error.set(Some(err));
                        }
                    }
                    Ok(Ok(_)) => debug!(request, "stale resource result ignored"),
                    Err(_) => debug!(request, "resource fetch aborted"),
                }
            });
        });

        Resource {
            data,
            loading,
            error,
            effect,
        }
    }
}
