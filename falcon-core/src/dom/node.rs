//! Node Implementation
//!
//! A node is a shared handle (`Rc`) to one entry of a live tree. Parents own
//! their children; children point back at their parent weakly, so dropping
//! the last handle to a detached subtree frees it.
//!
//! # Identity
//!
//! Two handles are equal only when they address the same node. The keyed
//! list relies on this to tell a moved node from a freshly built one.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::event::Event;
use crate::error::{DomError, DomResult};

/// Unique identifier for a node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node#{}", self.0)
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with a tag name, e.g. `div`.
    Element(String),
    /// A text node.
    Text,
    /// A comment, used for region markers.
    Comment,
    /// A container whose children move out when it is inserted.
    Fragment,
}

type Listener = (String, Rc<dyn Fn(&Event)>);

struct NodeData {
    parent: Weak<NodeInner>,
    children: Vec<Node>,
    attributes: IndexMap<String, String>,
    /// Content of text and comment nodes.
    text: String,
    listeners: SmallVec<[Listener; 2]>,
}

struct NodeInner {
    id: NodeId,
    kind: NodeKind,
    data: RefCell<NodeData>,
}

/// Handle to a node in a live tree.
///
/// # Example
///
/// ```rust
/// use falcon_core::dom::Node;
///
/// let list = Node::element("ul");
/// let item = Node::element("li");
/// item.append_child(&Node::text("first")).unwrap();
/// list.append_child(&item).unwrap();
///
/// assert_eq!(list.to_html(), "<ul><li>first</li></ul>");
/// ```
#[derive(Clone)]
pub struct Node(Rc<NodeInner>);

impl Node {
    fn new(kind: NodeKind, text: String) -> Self {
        Self(Rc::new(NodeInner {
            id: NodeId::new(),
            kind,
            data: RefCell::new(NodeData {
                parent: Weak::new(),
                children: Vec::new(),
                attributes: IndexMap::new(),
                text,
                listeners: SmallVec::new(),
            }),
        }))
    }

    /// Create an element.
    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(NodeKind::Element(tag.into()), String::new())
    }

    /// Create a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text, content.into())
    }

    /// Create a comment node.
    pub fn comment(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Comment, content.into())
    }

    /// Create an empty fragment.
    pub fn fragment() -> Self {
        Self::new(NodeKind::Fragment, String::new())
    }

    /// Create a fragment holding the given nodes.
    pub fn fragment_with(children: impl IntoIterator<Item = Node>) -> DomResult<Self> {
        let fragment = Self::fragment();
        for child in children {
            fragment.append_child(&child)?;
        }
        Ok(fragment)
    }

    /// Get the node's unique ID.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// What kind of node this is.
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// The tag name, for elements.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element(tag) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.kind, NodeKind::Element(_))
    }

    pub fn is_text(&self) -> bool {
        self.0.kind == NodeKind::Text
    }

    pub fn is_comment(&self) -> bool {
        self.0.kind == NodeKind::Comment
    }

    pub fn is_fragment(&self) -> bool {
        self.0.kind == NodeKind::Fragment
    }

    fn can_have_children(&self) -> bool {
        matches!(self.0.kind, NodeKind::Element(_) | NodeKind::Fragment)
    }

    // ------------------------------------------------------------------------
    // Tree structure
    // ------------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.0.data.borrow().parent.upgrade().map(Node)
    }

    /// A snapshot of the children, in order.
    pub fn children(&self) -> Vec<Node> {
        self.0.data.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.data.borrow().children.len()
    }

    pub fn first_child(&self) -> Option<Node> {
        self.0.data.borrow().children.first().cloned()
    }

    pub fn last_child(&self) -> Option<Node> {
        self.0.data.borrow().children.last().cloned()
    }

    pub fn next_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let data = parent.0.data.borrow();
        let index = data.children.iter().position(|child| child == self)?;
        let sibling = data.children.get(index + 1).cloned();
        sibling
    }

    pub fn previous_sibling(&self) -> Option<Node> {
        let parent = self.parent()?;
        let data = parent.0.data.borrow();
        let index = data.children.iter().position(|child| child == self)?;
        let sibling = index.checked_sub(1).and_then(|i| data.children.get(i).cloned());
        sibling
    }

    /// Check whether `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Append a node as the last child.
    ///
    /// Appending a fragment moves the fragment's children instead.
    pub fn append_child(&self, child: &Node) -> DomResult<()> {
        self.insert_before(child, None)
    }

    /// Insert a node before `reference`, or at the end when it is `None`.
    ///
    /// A node that already has a parent is moved, not copied. Inserting a
    /// fragment moves its children, in order, and leaves it empty.
    pub fn insert_before(&self, child: &Node, reference: Option<&Node>) -> DomResult<()> {
        if !self.can_have_children() {
            return Err(DomError::HierarchyRequest {
                parent: self.id(),
                child: child.id(),
                reason: "parent cannot have children",
            });
        }
        if child.contains(self) {
            return Err(DomError::HierarchyRequest {
                parent: self.id(),
                child: child.id(),
                reason: "node would become its own descendant",
            });
        }
        if let Some(reference) = reference {
            if reference.parent().as_ref() != Some(self) {
                return Err(DomError::NotAChild {
                    parent: self.id(),
                    child: reference.id(),
                });
            }
            if reference == child {
                return Ok(());
            }
        }

        if child.is_fragment() {
            for node in child.take_children() {
                self.insert_before(&node, reference)?;
            }
            return Ok(());
        }

        child.detach();
        {
            let mut data = self.0.data.borrow_mut();
            let index = reference
                .and_then(|reference| data.children.iter().position(|c| c == reference))
                .unwrap_or(data.children.len());
            data.children.insert(index, child.clone());
        }
        child.0.data.borrow_mut().parent = Rc::downgrade(&self.0);
        Ok(())
    }

    /// Remove a child of this node.
    pub fn remove_child(&self, child: &Node) -> DomResult<()> {
        if child.parent().as_ref() != Some(self) {
            return Err(DomError::NotAChild {
                parent: self.id(),
                child: child.id(),
            });
        }
        child.detach();
        Ok(())
    }

    /// Remove this node from its parent, if it has one.
    pub fn remove(&self) {
        self.detach();
    }

    /// Remove every child.
    pub fn clear_children(&self) {
        drop(self.take_children());
    }

    fn take_children(&self) -> Vec<Node> {
        let children = std::mem::take(&mut self.0.data.borrow_mut().children);
        for child in &children {
            child.0.data.borrow_mut().parent = Weak::new();
        }
        children
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.0.data.borrow_mut().children.retain(|c| c != self);
        }
        self.0.data.borrow_mut().parent = Weak::new();
    }

    /// Every descendant element with the given tag, in document order.
    pub fn find_all(&self, tag: &str) -> Vec<Node> {
        let mut found = Vec::new();
        self.collect_tagged(tag, &mut found);
        found
    }

    fn collect_tagged(&self, tag: &str, found: &mut Vec<Node>) {
        for child in self.children() {
            if child.tag_name() == Some(tag) {
                found.push(child.clone());
            }
            child.collect_tagged(tag, found);
        }
    }

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.0
            .data
            .borrow_mut()
            .attributes
            .insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0.data.borrow().attributes.get(name).cloned()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.0.data.borrow().attributes.contains_key(name)
    }

    pub fn remove_attribute(&self, name: &str) -> Option<String> {
        self.0.data.borrow_mut().attributes.shift_remove(name)
    }

    /// The text of a text or comment node, or the concatenated text of all
    /// descendant text nodes otherwise.
    pub fn text_content(&self) -> String {
        match self.0.kind {
            NodeKind::Text | NodeKind::Comment => self.0.data.borrow().text.clone(),
            _ => {
                let mut text = String::new();
                for child in self.children() {
                    if !child.is_comment() {
                        text.push_str(&child.text_content());
                    }
                }
                text
            }
        }
    }

    /// Replace the text of a text or comment node, or every child of an
    /// element with a single text node.
    pub fn set_text_content(&self, content: impl Into<String>) {
        let content = content.into();
        match self.0.kind {
            NodeKind::Text | NodeKind::Comment => self.0.data.borrow_mut().text = content,
            _ => {
                self.clear_children();
                if !content.is_empty() {
                    let text = Node::text(content);
                    text.0.data.borrow_mut().parent = Rc::downgrade(&self.0);
                    self.0.data.borrow_mut().children.push(text);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    pub fn add_event_listener<F>(&self, kind: impl Into<String>, listener: F)
    where
        F: Fn(&Event) + 'static,
    {
        self.0
            .data
            .borrow_mut()
            .listeners
            .push((kind.into(), Rc::new(listener)));
    }

    pub fn listener_count(&self, kind: &str) -> usize {
        self.0
            .data
            .borrow()
            .listeners
            .iter()
            .filter(|(k, _)| k == kind)
            .count()
    }

    /// Call every listener registered for the event's kind on this node.
    ///
    /// Returns `false` if a listener prevented the default action.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        let listeners: Vec<Rc<dyn Fn(&Event)>> = self
            .0
            .data
            .borrow()
            .listeners
            .iter()
            .filter(|(kind, _)| kind == event.kind())
            .map(|(_, listener)| Rc::clone(listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
        !event.is_default_prevented()
    }

    // ------------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------------

    /// Serialize the node and its subtree.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Serialize the children only.
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            child.write_html(&mut out);
        }
        out
    }

    fn write_html(&self, out: &mut String) {
        match &self.0.kind {
            NodeKind::Text => out.push_str(&escape(&self.0.data.borrow().text)),
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(&self.0.data.borrow().text);
                out.push_str("-->");
            }
            NodeKind::Fragment => out.push_str(&self.inner_html()),
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &self.0.data.borrow().attributes {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape(value));
                        out.push('"');
                    }
                }
                out.push('>');
                if is_void(tag) {
                    return;
                }
                out.push_str(&self.inner_html());
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.kind {
            NodeKind::Element(tag) => write!(f, "<{tag}> {:?}", self.0.id),
            NodeKind::Text => write!(f, "#text({:?}) {:?}", self.0.data.borrow().text, self.0.id),
            NodeKind::Comment => write!(f, "#comment({:?}) {:?}", self.0.data.borrow().text, self.0.id),
            NodeKind::Fragment => write!(f, "#fragment {:?}", self.0.id),
        }
    }
}

fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "track" | "wbr"
    )
}

fn escape(s: &str) -> Cow<'_, str> {
    if !s.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(s);
    }
    let mut escaped = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
