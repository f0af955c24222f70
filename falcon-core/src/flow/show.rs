//! Conditional Region
//!
//! Mounts one of two branches after a comment marker depending on a
//! condition. The condition is wrapped in a memo, so the region only does
//! work when the boolean actually flips.
//!
//! On every flip the nodes inserted for the previous branch are removed and
//! the new branch is built from scratch. Effects created while building a
//! branch are owned by the region's effect, so the next flip disposes them.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{trace, warn};

use crate::dom::Node;
use crate::reactive::Runtime;
use crate::view::{flatten, Child};

/// Marker comment of a conditional region.
pub const SHOW_MARKER: &str = "falcon-show";

/// Render `children` while `when` is true, `fallback` otherwise.
///
/// Returns the marker node; the branch is inserted right after it once the
/// marker is mounted and the next checkpoint has run.
pub fn create_show<W, C>(runtime: &Runtime, when: W, children: C, fallback: Option<Child>) -> Node
where
    W: Fn() -> bool + 'static,
    C: Into<Child>,
{
    let marker = Node::comment(SHOW_MARKER);
    let condition = runtime.create_memo(when);
    let children: Child = children.into();
    let mounted: Rc<RefCell<Vec<Node>>> = Rc::default();
    let handle = runtime.downgrade();

    let anchor = marker.clone();
    runtime.create_effect(move || {
        let Some(runtime) = handle.upgrade() else {
            return;
        };
        let show = condition.try_get().unwrap_or(false);

        let Some(parent) = anchor.parent() else {
            warn!("conditional region marker is detached; skipping");
            return;
        };

        for node in mounted.borrow_mut().drain(..) {
            if node.parent().as_ref() == Some(&parent) {
                node.remove();
            }
        }

        let branch = if show {
            children.clone()
        } else {
            fallback.clone().unwrap_or_default()
        };
        let nodes = flatten(&runtime, branch);

        let next = anchor.next_sibling();
        for node in &nodes {
            if let Err(err) = parent.insert_before(node, next.as_ref()) {
                warn!(%err, "failed to insert conditional branch node");
            }
        }

        trace!(show, inserted = nodes.len(), "conditional region updated");
        *mounted.borrow_mut() = nodes;
    });

    marker
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn switches_between_branches() {
        let runtime = Runtime::new();
        let (logged_in, set_logged_in) = runtime.create_signal(false);
        let parent = Node::element("div");

        let marker = create_show(
            &runtime,
            move || logged_in.get(),
            Child::lazy(|| "Welcome back"),
            Some(Child::from("Please sign in")),
        );
        parent.append_child(&marker).unwrap();
        parent.append_child(&Node::text("|tail")).unwrap();
        runtime.flush();
        assert_eq!(parent.text_content(), "Please sign in|tail");

        set_logged_in.set(true);
        assert_eq!(parent.text_content(), "Welcome back|tail");
        assert_eq!(parent.child_count(), 3);
    }

    #[test]
    fn branch_bindings_are_disposed_on_flip() {
        let runtime = Runtime::new();
        let (visible, set_visible) = runtime.create_signal(true);
        let (label, set_label) = runtime.create_signal("a".to_string());
        let parent = Node::element("div");

        let body = {
            let label = label.clone();
            move || Child::from(label.clone())
        };
        parent
            .append_child(&create_show(&runtime, move || visible.get(), Child::lazy(body), None))
            .unwrap();
        runtime.flush();
        assert_eq!(label.subscriber_count(), 1);

        set_visible.set(false);
        assert_eq!(label.subscriber_count(), 0);
        assert_eq!(parent.child_count(), 1);

        set_label.set("b".to_string());
        set_visible.set(true);
        assert_eq!(parent.text_content(), "b");
        // The rebuilt binding has subscribed by the time the write returns.
        assert_eq!(label.subscriber_count(), 1);

        set_label.set("c".to_string());
        assert_eq!(parent.text_content(), "c");
    }

    #[test]
    fn fragments_in_a_branch_are_flattened() {
        let runtime = Runtime::new();
        let parent = Node::element("section");
        let content = Child::lazy(|| Node::fragment_with([Node::text("x"), Node::text("y")]).unwrap());

        parent
            .append_child(&create_show(&runtime, || true, content, None))
            .unwrap();
        runtime.flush();

        assert_eq!(parent.child_count(), 3);
        assert_eq!(parent.text_content(), "xy");
    }

    #[test]
    fn condition_only_rebuilds_on_transitions() {
        let runtime = Runtime::new();
        let (count, set_count) = runtime.create_signal(1);
        let builds = Rc::new(Cell::new(0));
        let parent = Node::element("div");

        let content = {
            let builds = builds.clone();
            Child::lazy(move || {
                builds.set(builds.get() + 1);
                Node::element("i")
            })
        };
        parent
            .append_child(&create_show(&runtime, move || count.get() > 0, content, None))
            .unwrap();
        runtime.flush();
        assert_eq!(builds.get(), 1);

        set_count.set(2);
        set_count.set(3);
        assert_eq!(builds.get(), 1);

        set_count.set(0);
        assert_eq!(parent.child_count(), 1);
        set_count.set(5);
        assert_eq!(builds.get(), 2);
    }
}
