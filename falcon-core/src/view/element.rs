//! Element construction.
//!
//! # How Construction Works
//!
//! 1. A component tag hands the props, with the children appended, to the
//!    component and returns whatever it builds.
//!
//! 2. An element tag creates the node and applies each binding:
//!    - `Static` sets the attribute once (a static `children` key is ignored)
//!    - `Event` registers a listener for the derived event kind; effects
//!      queued by the listener run when it returns
//!    - `Reactive` creates an effect that reflects the value on every run
//!
//! 3. The children are normalized and appended in order. A node the element
//!    refuses is logged and dropped; construction never fails.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::child::{append_all, normalize, Child};
use super::props::{event_kind, AttrValue, Binding, Props, PRESENCE_ATTRIBUTES};
use crate::dom::Node;
use crate::reactive::Runtime;

/// A composable unit: a function from props to content.
#[derive(Clone)]
pub struct Component(Rc<dyn Fn(&Runtime, Props) -> Child>);

impl Component {
    pub fn new<F, C>(render: F) -> Self
    where
        F: Fn(&Runtime, Props) -> C + 'static,
        C: Into<Child>,
    {
        Component(Rc::new(move |runtime, props| render(runtime, props).into()))
    }

    /// Build the component's content.
    pub fn render(&self, runtime: &Runtime, props: Props) -> Child {
        (self.0)(runtime, props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Component(..)")
    }
}

/// What [`create_element`] builds.
#[derive(Debug, Clone)]
pub enum Tag {
    /// A primitive element, by tag name.
    Element(String),
    /// A component.
    Component(Component),
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::Element(name.to_string())
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::Element(name)
    }
}

impl From<Component> for Tag {
    fn from(component: Component) -> Self {
        Tag::Component(component)
    }
}

/// Build content from a tag, its props and its children.
///
/// # Example
///
/// ```rust
/// use falcon_core::reactive::Runtime;
/// use falcon_core::view::{create_element, Child, Component, Props};
///
/// let runtime = Runtime::new();
/// let greeting = Component::new(|rt, props: Props| {
///     create_element(rt, "p", Props::new(), vec![Child::from("Hello, "), props.children()])
/// });
///
/// let content = create_element(&runtime, greeting, Props::new(), vec![Child::from("world")]);
/// match content {
///     Child::Node(node) => assert_eq!(node.to_html(), "<p>Hello, world</p>"),
///     _ => unreachable!(),
/// }
/// ```
pub fn create_element(runtime: &Runtime, tag: impl Into<Tag>, props: Props, children: Vec<Child>) -> Child {
    match tag.into() {
        Tag::Component(component) => component.render(runtime, props.with_children(children)),
        Tag::Element(name) => Child::Node(element(runtime, &name, props, children)),
    }
}

/// Build a primitive element.
pub fn element(runtime: &Runtime, tag: &str, props: Props, children: Vec<Child>) -> Node {
    let node = Node::element(tag);
    let (bindings, prop_children) = props.into_parts();

    for (key, binding) in bindings {
        apply_binding(runtime, &node, key, binding);
    }

    let mut nodes = Vec::new();
    for child in prop_children.into_iter().chain(children) {
        normalize(runtime, child, &mut nodes);
    }
    append_all(&node, nodes);

    node
}

fn apply_binding(runtime: &Runtime, node: &Node, key: String, binding: Binding) {
    match binding {
        Binding::Static(value) => {
            if key != "children" {
                node.set_attribute(key, value);
            }
        }
        Binding::Event(handler) => {
            let kind = event_kind(&key);
            trace!(node = ?node.id(), %kind, "event listener bound");
            let handle = runtime.downgrade();
            node.add_event_listener(kind, move |event| {
                handler(event);
                if let Some(runtime) = handle.upgrade() {
                    runtime.checkpoint();
                }
            });
        }
        Binding::Reactive(value) => {
            reflect(node, &key, runtime.untrack(|| value()));

            let target = node.clone();
            runtime.create_effect(move || reflect(&target, &key, value()));
        }
    }
}

fn reflect(node: &Node, name: &str, value: AttrValue) {
    match value {
        AttrValue::Bool(present) if PRESENCE_ATTRIBUTES.contains(&name) => {
            if present {
                node.set_attribute(name, "");
            } else {
                node.remove_attribute(name);
            }
        }
        other => node.set_attribute(name, other.to_string()),
    }
}
