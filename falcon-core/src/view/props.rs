//! Property bindings.
//!
//! The caller states what each property is: a static attribute, an event
//! listener or a reactive attribute. Nothing is inferred from the key or the
//! value.

use std::fmt::{self, Display};
use std::rc::Rc;

use indexmap::IndexMap;

use super::child::Child;
use crate::dom::Event;

/// Attributes that are present or absent rather than carrying a value.
pub const PRESENCE_ATTRIBUTES: &[&str] = &["checked", "disabled", "selected"];

/// The value of a reactive attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Bool(bool),
    Text(String),
}

impl Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(value) => write!(f, "{value}"),
            AttrValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

macro_rules! impl_attr_from_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for AttrValue {
                fn from(value: $ty) -> Self {
                    AttrValue::Text(value.to_string())
                }
            }
        )*
    };
}

impl_attr_from_number!(i32, i64, u32, u64, usize, f32, f64);

/// How one property is applied to an element.
#[derive(Clone)]
pub enum Binding {
    /// Set once.
    Static(String),
    /// Registered as a listener. The key names the event.
    Event(Rc<dyn Fn(&Event)>),
    /// Re-evaluated by an effect and reflected onto the element.
    Reactive(Rc<dyn Fn() -> AttrValue>),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Binding::Event(_) => f.write_str("Event(..)"),
            Binding::Reactive(_) => f.write_str("Reactive(..)"),
        }
    }
}

/// Properties passed to an element or component.
///
/// # Example
///
/// ```rust
/// use falcon_core::view::Props;
///
/// let props = Props::new()
///     .attr("class", "counter")
///     .on("onClick", |_| println!("clicked"))
///     .bind("disabled", || false);
///
/// assert_eq!(props.static_value("class"), Some("counter"));
/// ```
#[derive(Clone, Default)]
pub struct Props {
    bindings: IndexMap<String, Binding>,
    children: Vec<Child>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a static attribute.
    pub fn attr(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.bindings
            .insert(name.into(), Binding::Static(value.to_string()));
        self
    }

    /// Add an event listener. `onClick`, `onclick` and `click` all bind the
    /// `click` event.
    pub fn on<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Event) + 'static,
    {
        self.bindings
            .insert(name.into(), Binding::Event(Rc::new(handler)));
        self
    }

    /// Add an attribute that follows a reactive function.
    pub fn bind<F, V>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> V + 'static,
        V: Into<AttrValue>,
    {
        self.bindings
            .insert(name.into(), Binding::Reactive(Rc::new(move || f().into())));
        self
    }

    /// Add a child.
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// The value of a static attribute.
    pub fn static_value(&self, name: &str) -> Option<&str> {
        match self.bindings.get(name) {
            Some(Binding::Static(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Bindings in insertion order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bindings.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    /// The children passed to a component.
    pub fn children(&self) -> Child {
        Child::Many(self.children.clone())
    }

    pub(crate) fn with_children(mut self, children: Vec<Child>) -> Self {
        self.children.extend(children);
        self
    }

    pub(crate) fn into_parts(self) -> (IndexMap<String, Binding>, Vec<Child>) {
        (self.bindings, self.children)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("bindings", &self.bindings)
            .field("children", &self.children)
            .finish()
    }
}

/// The event kind bound by an event property key.
pub(crate) fn event_kind(key: &str) -> String {
    let kind = match key.strip_prefix("on") {
        Some(rest) if !rest.is_empty() => rest,
        _ => key,
    };
    kind.to_ascii_lowercase()
}
