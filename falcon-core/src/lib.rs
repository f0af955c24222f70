//! Falcon Core
//!
//! This crate provides the core runtime for the Falcon reactive UI framework.
//! It implements:
//!
//! - Reactive primitives (signals, memos, effects, ownership scopes)
//! - An in-memory live DOM
//! - Element construction with tagged property bindings
//! - A keyed list reconciler and a conditional region
//! - Router, store and async resource helpers built on the primitives
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Core reactive primitives and dependency tracking
//! - `dom`: The node tree the view layer mutates
//! - `view`: Element construction, child normalization and mounting
//! - `flow`: Keyed lists and conditional regions
//! - `router`, `store`, `resource`: Application-level helpers
//!
//! Everything is single-threaded. All reactive state hangs off an explicit
//! [`Runtime`](reactive::Runtime); nothing is global.
//!
//! # Example
//!
//! ```rust
//! use falcon_core::prelude::*;
//!
//! let runtime = Runtime::new();
//! let (count, set_count) = runtime.create_signal(0);
//! let doubled = runtime.create_memo(move || count.get() * 2);
//!
//! let container = Node::element("div");
//! render(&runtime, |rt| {
//!     Child::from(element(
//!         rt,
//!         "button",
//!         Props::new().on("onClick", move |_| set_count.update(|n| n + 1)),
//!         vec![Child::from(doubled)],
//!     ))
//! }, &container);
//!
//! let button = container.first_child().unwrap();
//! button.dispatch_event(&Event::new("click"));
//! assert_eq!(container.text_content(), "2");
//! ```

pub mod dom;
pub mod error;
pub mod flow;
pub mod reactive;
pub mod resource;
pub mod router;
pub mod store;
pub mod view;

/// The types most applications need.
pub mod prelude {
    pub use crate::dom::{Event, Node};
    pub use crate::error::{DomError, ReactiveError};
    pub use crate::flow::{create_for, create_show, Keyed};
    pub use crate::reactive::{Effect, Memo, ReadSignal, Runtime, Scope, Signal, WriteSignal};
    pub use crate::resource::Resource;
    pub use crate::router::{History, MemoryHistory, Router};
    pub use crate::store;
    pub use crate::view::{create_element, element, render, Child, Component, Props, Tag};
}
