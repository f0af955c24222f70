//! Client-side routing.
//!
//! The router keeps the current path in a signal. Routes are conditional
//! regions that mount while the path matches; links are anchors whose click
//! handler pushes a history entry instead of following the href.
//!
//! History is abstracted behind [`History`] so the router runs without a
//! browser. [`MemoryHistory`] keeps the entries in memory.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::dom::Node;
use crate::flow::create_show;
use crate::reactive::{ReadSignal, Runtime, Signal};
use crate::view::{element, Child, Props};

type PopListener = Rc<dyn Fn(&str)>;

/// Session history the router reads from and writes to.
pub trait History {
    /// The path of the current entry.
    fn current_path(&self) -> String;

    /// Push a new entry. Listeners are not called.
    fn push_state(&self, path: &str);

    /// Call `listener` with the new path whenever the current entry changes
    /// through back/forward navigation.
    fn subscribe(&self, listener: Box<dyn Fn(&str)>);
}

struct HistoryState {
    entries: Vec<String>,
    index: usize,
    listeners: Vec<PopListener>,
}

/// In-memory session history.
#[derive(Clone)]
pub struct MemoryHistory {
    state: Rc<RefCell<HistoryState>>,
}

impl MemoryHistory {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            state: Rc::new(RefCell::new(HistoryState {
                entries: vec![initial.into()],
                index: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Go back one entry. Returns `false` at the first entry.
    pub fn back(&self) -> bool {
        self.go(-1)
    }

    /// Go forward one entry. Returns `false` at the last entry.
    pub fn forward(&self) -> bool {
        self.go(1)
    }

    fn go(&self, delta: isize) -> bool {
        let (path, listeners) = {
            let mut state = self.state.borrow_mut();
            let Some(index) = state.index.checked_add_signed(delta) else {
                return false;
            };
            if index >= state.entries.len() {
                return false;
            }
            state.index = index;
            (state.entries[index].clone(), state.listeners.clone())
        };

        for listener in listeners {
            listener(&path);
        }
        true
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<String> {
        self.state.borrow().entries.clone()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new("/")
    }
}

impl History for MemoryHistory {
    fn current_path(&self) -> String {
        let state = self.state.borrow();
        state.entries[state.index].clone()
    }

    fn push_state(&self, path: &str) {
        let mut state = self.state.borrow_mut();
        let next = state.index + 1;
        state.entries.truncate(next);
        state.entries.push(path.to_string());
        state.index = next;
    }

    fn subscribe(&self, listener: Box<dyn Fn(&str)>) {
        self.state.borrow_mut().listeners.push(Rc::from(listener));
    }
}

impl fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("MemoryHistory")
            .field("entries", &state.entries)
            .field("index", &state.index)
            .finish()
    }
}

/// A reactive location plus the history it mirrors.
///
/// # Example
///
/// ```rust
/// use falcon_core::reactive::Runtime;
/// use falcon_core::router::{MemoryHistory, Router};
///
/// let runtime = Runtime::new();
/// let router = Router::new(&runtime, MemoryHistory::new("/"));
///
/// router.navigate("/about");
/// assert_eq!(router.path(), "/about");
/// ```
#[derive(Clone)]
pub struct Router {
    location: Signal<String>,
    history: Rc<dyn History>,
}

impl Router {
    pub fn new(runtime: &Runtime, history: impl History + 'static) -> Self {
        let history: Rc<dyn History> = Rc::new(history);
        let location = Signal::new(runtime, history.current_path());

        let on_pop = location.clone();
        history.subscribe(Box::new(move |path: &str| {
            debug!(path, "history navigation");
            on_pop.set(path.to_string());
        }));

        Self { location, history }
    }

    /// The current path, tracking the read.
    pub fn path(&self) -> String {
        self.location.get()
    }

    /// A read-only handle to the current path.
    pub fn location(&self) -> ReadSignal<String> {
        self.location.read_only()
    }

    /// Push a history entry and update the location.
    pub fn navigate(&self, path: &str) {
        debug!(path, "navigate");
        self.history.push_state(path);
        self.location.set(path.to_string());
    }

    /// Check whether `path` is the current path, tracking the read.
    pub fn is_active(&self, path: &str) -> bool {
        self.location.with(|current| current == path)
    }

    /// A region that mounts `children` while the location equals `path`.
    pub fn route(&self, runtime: &Runtime, path: impl Into<String>, children: impl Into<Child>) -> Node {
        let path = path.into();
        let location = self.location.clone();
        create_show(runtime, move || location.with(|current| *current == path), children, None)
    }

    /// An anchor that navigates to `to` without following the href.
    pub fn link(&self, runtime: &Runtime, to: impl Into<String>, children: impl Into<Child>) -> Node {
        let to = to.into();
        let router = self.clone();
        let target = to.clone();

        element(
            runtime,
            "a",
            Props::new().attr("href", &to).on("onClick", move |event| {
                event.prevent_default();
                router.navigate(&target);
            }),
            vec![children.into()],
        )
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("location", &self.location.get_untracked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Event;

    #[test]
    fn push_truncates_forward_entries() {
        let history = MemoryHistory::new("/");
        history.push_state("/a");
        history.push_state("/b");
        assert!(history.back());
        history.push_state("/c");

        assert_eq!(history.entries(), vec!["/", "/a", "/c"]);
        assert!(!history.forward());
    }

    #[test]
    fn back_updates_location() {
        let runtime = Runtime::new();
        let history = MemoryHistory::new("/");
        let router = Router::new(&runtime, history.clone());

        router.navigate("/settings");
        assert_eq!(router.path(), "/settings");

        assert!(history.back());
        assert_eq!(router.path(), "/");
        assert!(!history.back());
    }

    #[test]
    fn link_prevents_default_and_navigates() {
        let runtime = Runtime::new();
        let history = MemoryHistory::new("/");
        let router = Router::new(&runtime, history.clone());

        let link = router.link(&runtime, "/about", "About");
        assert_eq!(link.to_html(), r#"<a href="/about">About</a>"#);

        let followed = link.dispatch_event(&Event::new("click"));
        assert!(!followed);
        assert_eq!(router.path(), "/about");
        assert_eq!(history.entries(), vec!["/", "/about"]);
    }

    #[test]
    fn route_mounts_on_match() {
        let runtime = Runtime::new();
        let router = Router::new(&runtime, MemoryHistory::default());
        let outlet = Node::element("main");

        outlet
            .append_child(&router.route(&runtime, "/", Child::lazy(|| "home")))
            .unwrap();
        outlet
            .append_child(&router.route(&runtime, "/about", Child::lazy(|| "about")))
            .unwrap();
        runtime.flush();
        assert_eq!(outlet.text_content(), "home");

        router.navigate("/about");
        assert_eq!(outlet.text_content(), "about");
        assert!(router.is_active("/about"));
    }
}
