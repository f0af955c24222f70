//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, memos, effects
//! and the ownership scopes that tie their lifetimes together.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while a computation is running, the signal registers that computation as
//! an observer. When the value changes, every observer runs again.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. It re-evaluates only when
//! one of its dependencies changes, and only notifies its own readers when the
//! result is different.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. The DOM bindings, the keyed list and the conditional
//! region are all effects.
//!
//! ## Ownership
//!
//! Every computation created while another computation or a [`Scope`] is
//! running is owned by it. Re-running or disposing an owner disposes what it
//! owns, so nested bindings never outlive the region that created them.
//!
//! # Implementation Notes
//!
//! All state lives in an explicit [`Runtime`]. The runtime keeps a stack of
//! frames naming the current observer and owner; reading a signal asks the
//! stack who is listening. Nothing here is `Send`: a runtime and everything
//! created from it belong to one thread.

mod context;
mod effect;
mod memo;
mod runtime;
mod scope;
mod signal;
mod subscriber;

pub use context::{ContextGuard, Frame, ReactiveContext};
pub use effect::{Effect, EffectOutput};
pub use memo::Memo;
pub use runtime::{Runtime, WeakRuntime, MAX_SELF_RERUNS};
pub use scope::Scope;
pub use signal::{ReadSignal, Signal, WriteSignal};
pub use subscriber::{ComputationId, SignalId};
