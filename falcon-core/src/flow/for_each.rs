//! Keyed List Reconciler
//!
//! Renders an array into a region bounded by two comment markers and keeps
//! that region in sync with the array, preserving node identity per key.
//!
//! # How Reconciliation Works
//!
//! One effect reads the source array. On every run it:
//!
//! 1. Looks up each item's key in the previous pass's rows. A known key keeps
//!    its row. A new key gets a row built by the map function inside its own
//!    scope.
//!
//! 2. Walks the region left to right alongside the new order. Where the node
//!    at the cursor is the expected one the cursor advances; otherwise the
//!    expected node is inserted (or moved) before the cursor.
//!
//! 3. Removes the rows whose key disappeared and disposes their scopes.
//!
//! 4. Keeps the new rows for the next pass.
//!
//! # Complexity
//!
//! The walk is a single O(n) pass. It is correct for any reordering but not
//! move-optimal: moving the last item to the front costs one move, moving the
//! first item to the back costs n - 1.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, trace, warn};

use crate::dom::Node;
use crate::reactive::{Runtime, Scope};
use crate::view::{append_all, flatten, Child};

/// Marker comment opening a list region.
pub const FOR_START_MARKER: &str = "falcon-for-start";
/// Marker comment closing a list region.
pub const FOR_END_MARKER: &str = "falcon-for-end";
/// Placeholder for a row whose map function rendered nothing.
pub const EMPTY_ROW_MARKER: &str = "falcon-empty-content";

/// Items rendered by a keyed list.
pub trait Keyed {
    /// The identity of an item across passes.
    type Key: Eq + Hash + Clone + Debug;

    fn key(&self) -> Self::Key;
}

struct Row {
    node: Node,
    scope: Scope,
}

/// Render `each` as a keyed list.
///
/// Returns a fragment holding the region markers; insert it once and leave
/// the region to the list. `map` runs untracked, once per new key.
///
/// # Example
///
/// ```rust
/// use falcon_core::dom::Node;
/// use falcon_core::flow::{create_for, Keyed};
/// use falcon_core::reactive::Runtime;
///
/// #[derive(Clone)]
/// struct Todo { id: u32, title: &'static str }
///
/// impl Keyed for Todo {
///     type Key = u32;
///     fn key(&self) -> u32 { self.id }
/// }
///
/// let runtime = Runtime::new();
/// let (todos, set_todos) = runtime.create_always_signal(vec![Todo { id: 1, title: "write" }]);
///
/// let list = Node::element("ul");
/// list.append_child(&create_for(&runtime, move || todos.get(), |todo: &Todo, _| {
///     let item = Node::element("li");
///     item.set_text_content(todo.title);
///     item
/// })).unwrap();
/// runtime.flush();
/// assert_eq!(list.find_all("li").len(), 1);
///
/// set_todos.update(|todos| {
///     let mut todos = todos.clone();
///     todos.push(Todo { id: 2, title: "test" });
///     todos
/// });
/// assert_eq!(list.find_all("li").len(), 2);
/// ```
pub fn create_for<T, E, M, C>(runtime: &Runtime, each: E, map: M) -> Node
where
    T: Keyed + 'static,
    E: Fn() -> Vec<T> + 'static,
    M: Fn(&T, usize) -> C + 'static,
    C: Into<Child>,
{
    let start = Node::comment(FOR_START_MARKER);
    let end = Node::comment(FOR_END_MARKER);
    let region = Node::fragment();
    append_all(&region, vec![start.clone(), end.clone()]);

    // Rows belong to this scope, not to the list effect, so a pass does not
    // dispose the rows it keeps.
    let ((), rows_scope) = runtime.create_scope(|| ());
    let rows: RefCell<HashMap<T::Key, Row>> = RefCell::new(HashMap::new());
    let handle = runtime.downgrade();

    runtime.create_effect(move || {
        let Some(runtime) = handle.upgrade() else {
            return;
        };
        let items = each();

        let Some(parent) = end.parent() else {
            warn!("list region markers are detached; skipping reconciliation");
            return;
        };

        let mut previous = std::mem::take(&mut *rows.borrow_mut());
        let mut next: HashMap<T::Key, Row> = HashMap::with_capacity(items.len());
        let mut order: Vec<Node> = Vec::with_capacity(items.len());
        let mut created = 0;

        for (index, item) in items.iter().enumerate() {
            let key = item.key();
            if next.contains_key(&key) {
                warn!(?key, "duplicate key in list; keeping the first occurrence");
                continue;
            }

            let row = match previous.remove(&key) {
                Some(row) => row,
                None => {
                    created += 1;
                    build_row(&runtime, &rows_scope, &map, item, index)
                }
            };
            order.push(row.node.clone());
            next.insert(key, row);
        }

        let mut cursor = start.next_sibling();
        for node in &order {
            if cursor.as_ref() == Some(node) {
                cursor = cursor.and_then(|current| current.next_sibling());
                continue;
            }
            let reference = cursor.as_ref().unwrap_or(&end);
            if let Err(err) = parent.insert_before(node, Some(reference)) {
                warn!(%err, "failed to place list row");
            }
        }

        let removed = previous.len();
        for (key, row) in previous {
            trace!(?key, "removing list row");
            row.node.remove();
            row.scope.dispose();
        }

        debug!(rows = next.len(), created, removed, "list reconciled");
        *rows.borrow_mut() = next;
    });

    region
}

fn build_row<T, M, C>(runtime: &Runtime, rows_scope: &Scope, map: &M, item: &T, index: usize) -> Row
where
    M: Fn(&T, usize) -> C,
    C: Into<Child>,
{
    let (nodes, scope) = rows_scope.run_in(|| runtime.create_scope(|| flatten(runtime, map(item, index).into())));
    Row {
        node: single_node(nodes),
        scope,
    }
}

/// Reduce a row's rendering to exactly one node.
fn single_node(mut nodes: Vec<Node>) -> Node {
    match nodes.len() {
        0 => Node::comment(EMPTY_ROW_MARKER),
        1 => nodes.swap_remove(0),
        count => {
            warn!(count, "list row rendered several nodes; keeping the first");
            nodes.swap_remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    impl Keyed for u32 {
        type Key = u32;

        fn key(&self) -> u32 {
            *self
        }
    }

    fn mounted(runtime: &Runtime, region: Node) -> Node {
        let parent = Node::element("ul");
        parent.append_child(&region).unwrap();
        runtime.flush();
        parent
    }

    #[test]
    fn empty_rows_get_a_placeholder() {
        let runtime = Runtime::new();
        let region = create_for(&runtime, || vec![1u32, 2], |_: &u32, _| Child::Empty);
        let parent = mounted(&runtime, region);

        assert_eq!(
            parent.inner_html(),
            "<!--falcon-for-start--><!--falcon-empty-content--><!--falcon-empty-content--><!--falcon-for-end-->"
        );
    }

    #[test]
    fn several_nodes_keep_the_first() {
        let runtime = Runtime::new();
        let region = create_for(&runtime, || vec![7u32], |n: &u32, _| vec![n.to_string(), "extra".to_string()]);
        let parent = mounted(&runtime, region);

        assert_eq!(parent.text_content(), "7");
    }

    #[test]
    fn duplicate_keys_keep_first_occurrence() {
        let runtime = Runtime::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let region = {
            let calls = calls.clone();
            create_for(&runtime, || vec![1u32, 2, 1], move |n: &u32, index| {
                calls.borrow_mut().push((*n, index));
                n.to_string()
            })
        };
        let parent = mounted(&runtime, region);

        assert_eq!(parent.text_content(), "12");
        assert_eq!(*calls.borrow(), vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn reconciles_before_mount() {
        let runtime = Runtime::new();
        let region = create_for(&runtime, || vec![1u32, 2], |n: &u32, _| n.to_string());

        // Runs while the markers still sit in the fragment.
        runtime.flush();
        let parent = Node::element("ol");
        parent.append_child(&region).unwrap();

        assert_eq!(parent.text_content(), "12");
        assert_eq!(parent.child_count(), 4);
    }

    #[test]
    fn rows_added_after_mount_are_live() {
        let runtime = Runtime::new();
        let (items, set_items) = runtime.create_signal(vec![1u32]);
        let (suffix, set_suffix) = runtime.create_signal("a");
        let watched = suffix.clone();

        let region = create_for(&runtime, move || items.get(), move |n: &u32, _| {
            let n = *n;
            let suffix = suffix.clone();
            Child::reactive(move || format!("{n}{}", suffix.get()))
        });
        let parent = mounted(&runtime, region);
        assert_eq!(parent.text_content(), "1a");

        set_items.set(vec![1, 2]);
        assert_eq!(parent.text_content(), "1a2a");
        assert_eq!(watched.subscriber_count(), 2);

        set_suffix.set("b");
        assert_eq!(parent.text_content(), "1b2b");
    }
}
