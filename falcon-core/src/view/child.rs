//! Child values and normalization.
//!
//! Everything that can appear as the content of an element is a [`Child`].
//! Normalizing a child turns it into zero or more live nodes; reactive text
//! children also get an effect that keeps their text node current.

use std::fmt::{self, Display};
use std::rc::Rc;

use tracing::{trace, warn};

use crate::dom::Node;
use crate::reactive::{Memo, ReadSignal, Runtime, Signal};

/// Content of an element or component.
#[derive(Clone, Default)]
pub enum Child {
    /// Renders nothing. Unit, `None` and booleans become this.
    #[default]
    Empty,
    /// An already constructed node, appended as is.
    Node(Node),
    /// Static text.
    Text(String),
    /// Text kept in sync with a reactive function.
    Reactive(Rc<dyn Fn() -> String>),
    /// Content built when it is mounted. Each mount builds fresh nodes.
    Lazy(Rc<dyn Fn() -> Child>),
    /// An ordered sequence, flattened on mount.
    Many(Vec<Child>),
}

impl Child {
    /// A text child that follows `f`.
    pub fn reactive<F, T>(f: F) -> Self
    where
        F: Fn() -> T + 'static,
        T: Display,
    {
        Child::Reactive(Rc::new(move || f().to_string()))
    }

    /// A child built on every mount.
    pub fn lazy<F, C>(f: F) -> Self
    where
        F: Fn() -> C + 'static,
        C: Into<Child>,
    {
        Child::Lazy(Rc::new(move || f().into()))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Child::Empty)
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Empty => f.write_str("Empty"),
            Child::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Child::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Child::Reactive(_) => f.write_str("Reactive(..)"),
            Child::Lazy(_) => f.write_str("Lazy(..)"),
            Child::Many(children) => f.debug_tuple("Many").field(children).finish(),
        }
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<&Node> for Child {
    fn from(node: &Node) -> Self {
        Child::Node(node.clone())
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<&String> for Child {
    fn from(text: &String) -> Self {
        Child::Text(text.clone())
    }
}

impl From<char> for Child {
    fn from(c: char) -> Self {
        Child::Text(c.to_string())
    }
}

macro_rules! impl_child_from_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Child {
                fn from(value: $ty) -> Self {
                    Child::Text(value.to_string())
                }
            }
        )*
    };
}

impl_child_from_number!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Child::Empty
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Empty
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Empty, Into::into)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(children: Vec<T>) -> Self {
        Child::Many(children.into_iter().map(Into::into).collect())
    }
}

impl<T: Display + 'static> From<ReadSignal<T>> for Child {
    fn from(signal: ReadSignal<T>) -> Self {
        Child::Reactive(Rc::new(move || signal.with(ToString::to_string)))
    }
}

impl<T: Display + 'static> From<Signal<T>> for Child {
    fn from(signal: Signal<T>) -> Self {
        Child::Reactive(Rc::new(move || signal.with(ToString::to_string)))
    }
}

impl<T: Display + 'static> From<Memo<T>> for Child {
    fn from(memo: Memo<T>) -> Self {
        Child::Reactive(Rc::new(move || {
            memo.try_with(ToString::to_string).unwrap_or_default()
        }))
    }
}

/// Turn a child into live nodes, appending them to `out`.
pub(crate) fn normalize(runtime: &Runtime, child: Child, out: &mut Vec<Node>) {
    match child {
        Child::Empty => {}
        Child::Node(node) => out.push(node),
        Child::Text(text) => out.push(Node::text(text)),
        Child::Reactive(f) => out.push(reactive_text(runtime, f)),
        Child::Lazy(build) => {
            let child = runtime.untrack(|| build());
            normalize(runtime, child, out);
        }
        Child::Many(children) => {
            for child in children {
                normalize(runtime, child, out);
            }
        }
    }
}

/// Normalize a child and flatten any fragments it produced.
///
/// The returned nodes are parented to a private staging fragment until the
/// caller inserts them somewhere.
pub(crate) fn flatten(runtime: &Runtime, child: Child) -> Vec<Node> {
    let mut nodes = Vec::new();
    normalize(runtime, child, &mut nodes);

    let staging = Node::fragment();
    append_all(&staging, nodes);
    staging.children()
}

/// Append nodes in order, dropping the ones the parent refuses.
pub(crate) fn append_all(parent: &Node, nodes: Vec<Node>) {
    for node in nodes {
        if let Err(err) = parent.append_child(&node) {
            warn!(%err, "dropping child that cannot be inserted");
        }
    }
}

fn reactive_text(runtime: &Runtime, f: Rc<dyn Fn() -> String>) -> Node {
    let node = Node::text(runtime.untrack(|| f()));
    let target = node.clone();
    runtime.create_effect(move || {
        let text = f();
        trace!(node = ?target.id(), "reactive text updated");
        target.set_text_content(text);
    });
    node
}
