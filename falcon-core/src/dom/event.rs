//! DOM events.

use std::cell::Cell;

/// An event dispatched to a node's listeners.
#[derive(Debug)]
pub struct Event {
    kind: String,
    default_prevented: Cell<bool>,
}

impl Event {
    /// Create an event of the given kind, e.g. `"click"`.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            default_prevented: Cell::new(false),
        }
    }

    /// The event kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Ask the dispatcher to skip the default action.
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// Check whether a listener called [`prevent_default`](Event::prevent_default).
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}
