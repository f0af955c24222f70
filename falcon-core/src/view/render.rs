//! Mount boundary.

use tracing::debug;

use super::child::{append_all, normalize, Child};
use crate::dom::Node;
use crate::reactive::{Runtime, Scope};

/// Mount a root component into a container.
///
/// The container's existing content is removed, the root is built inside a
/// new root scope and its nodes are appended. The microtask queue is then
/// drained, so every effect created while building has run once when this
/// returns.
///
/// Disposing the returned scope stops every binding of the mounted tree.
///
/// # Example
///
/// ```rust
/// use falcon_core::dom::Node;
/// use falcon_core::reactive::Runtime;
/// use falcon_core::view::{element, render, Child, Props};
///
/// let runtime = Runtime::new();
/// let (count, set_count) = runtime.create_signal(0);
/// let container = Node::element("main");
///
/// render(&runtime, move |rt| {
///     Child::from(element(rt, "span", Props::new(), vec![Child::from(count)]))
/// }, &container);
///
/// set_count.set(3);
/// assert_eq!(container.inner_html(), "<span>3</span>");
/// ```
pub fn render<F>(runtime: &Runtime, root: F, container: &Node) -> Scope
where
    F: FnOnce(&Runtime) -> Child,
{
    container.clear_children();

    let (nodes, scope) = runtime.create_root(|| {
        let mut nodes = Vec::new();
        normalize(runtime, root(runtime), &mut nodes);
        nodes
    });
    append_all(container, nodes);

    let ran = runtime.flush();
    debug!(container = ?container.id(), effects = ran, "mounted");
    scope
}
