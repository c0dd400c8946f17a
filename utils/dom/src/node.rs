use core::cell::RefCell;
use core::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::{DomError, markup};

/// Elements that never have children or an end tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Debug)]
enum NodeKind {
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        styles: IndexMap<String, String>,
    },
    Text(String),
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    children: Vec<Node>,
    parent: Weak<RefCell<NodeData>>,
}

/// Shared handle to a node in the host document.
///
/// Handles compare by identity: two handles are equal when they point at the same node.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind,
            children: Vec::new(),
            parent: Weak::new(),
        })))
    }

    /// Creates a detached element. The tag name is stored lowercase.
    #[must_use]
    pub fn element(tag: &str) -> Self {
        Self::new(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            styles: IndexMap::new(),
        })
    }

    /// Creates a detached text node.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(NodeKind::Text(content.into()))
    }

    /// Returns whether this node is an element.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Element { .. })
    }

    /// Returns the lowercase tag name, or `None` for text nodes.
    #[must_use]
    pub fn tag_name(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    // ------------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------------

    /// Returns the value of `name`.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    /// Returns whether the attribute `name` is present.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => attributes.contains_key(name),
            NodeKind::Text(_) => false,
        }
    }

    /// Sets `name` to `value`. Ignored on text nodes.
    pub fn set_attribute(&self, name: &str, value: impl Into<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.0.borrow_mut().kind {
            attributes.insert(name.to_ascii_lowercase(), value.into());
        }
    }

    /// Removes `name`, keeping the order of the remaining attributes.
    pub fn remove_attribute(&self, name: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.0.borrow_mut().kind {
            attributes.shift_remove(name);
        }
    }

    /// Returns the `id` attribute.
    #[must_use]
    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    /// Sets the `id` attribute.
    pub fn set_id(&self, id: impl Into<String>) {
        self.set_attribute("id", id);
    }

    // ------------------------------------------------------------------------
    // Classes and styles
    // ------------------------------------------------------------------------

    /// Returns the raw `class` attribute, empty when absent.
    #[must_use]
    pub fn class_name(&self) -> String {
        self.attribute("class").unwrap_or_default()
    }

    /// Replaces the whole `class` attribute.
    pub fn set_class_name(&self, class_name: impl Into<String>) {
        self.set_attribute("class", class_name);
    }

    /// Returns whether `class` is in the class list.
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.class_name().split_whitespace().any(|c| c == class)
    }

    /// Adds `class` to the class list unless already present.
    pub fn add_class(&self, class: &str) {
        if class.is_empty() || self.has_class(class) {
            return;
        }
        let mut classes: Vec<String> = self
            .class_name()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        classes.push(class.to_string());
        self.set_class_name(classes.join(" "));
    }

    /// Removes every occurrence of `class`; drops the attribute when the list becomes empty.
    pub fn remove_class(&self, class: &str) {
        let current = self.class_name();
        let remaining: Vec<&str> = current.split_whitespace().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attribute("class");
        } else {
            self.set_class_name(remaining.join(" "));
        }
    }

    /// Returns the inline style property `property`.
    #[must_use]
    pub fn style(&self, property: &str) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { styles, .. } => styles.get(property).cloned(),
            NodeKind::Text(_) => None,
        }
    }

    /// Sets the inline style property `property`.
    pub fn set_style(&self, property: &str, value: impl Into<String>) {
        if let NodeKind::Element { styles, .. } = &mut self.0.borrow_mut().kind {
            styles.insert(property.to_string(), value.into());
        }
    }

    // ------------------------------------------------------------------------
    // Tree
    // ------------------------------------------------------------------------

    /// Returns the parent node, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.borrow().parent.upgrade().map(Self)
    }

    /// Returns all child nodes, text nodes included.
    #[must_use]
    pub fn child_nodes(&self) -> Vec<Self> {
        self.0.borrow().children.clone()
    }

    /// Returns the element children only.
    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        self.child_nodes()
            .into_iter()
            .filter(Self::is_element)
            .collect()
    }

    /// Returns whether `self` contains `other`, or is `other`.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Appends `child`, moving it away from its current parent first.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::HierarchyRequest`] if `self` is a text node or if `child` is an ancestor of
    /// (or the same node as) `self`.
    pub fn append_child(&self, child: &Self) -> Result<(), DomError> {
        if !self.is_element() || child.contains(self) {
            return Err(DomError::HierarchyRequest);
        }
        child.remove();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.push(child.clone());
        Ok(())
    }

    /// Removes `child` from this node.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::NotAChild`] if `child` is not a direct child.
    pub fn remove_child(&self, child: &Self) -> Result<(), DomError> {
        if child.parent().as_ref() != Some(self) {
            return Err(DomError::NotAChild);
        }
        child.remove();
        Ok(())
    }

    /// Detaches this node from its parent. Does nothing when already detached.
    pub fn remove(&self) {
        let parent = self.0.borrow().parent.upgrade();
        if let Some(parent) = parent {
            parent
                .borrow_mut()
                .children
                .retain(|c| !Rc::ptr_eq(&c.0, &self.0));
        }
        self.0.borrow_mut().parent = Weak::new();
    }

    /// Removes all children.
    pub fn clear(&self) {
        let children = core::mem::take(&mut self.0.borrow_mut().children);
        for child in children {
            child.0.borrow_mut().parent = Weak::new();
        }
    }

    /// Returns every descendant in document order, excluding `self`.
    #[must_use]
    pub fn descendants(&self) -> Vec<Self> {
        let mut found = Vec::new();
        let mut stack: Vec<Self> = self.child_nodes().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.child_nodes().into_iter().rev());
            found.push(node);
        }
        found
    }

    // ------------------------------------------------------------------------
    // Markup
    // ------------------------------------------------------------------------

    /// Replaces all children with the nodes parsed from `markup`.
    ///
    /// # Errors
    ///
    /// Returns [`DomError::NotAnElement`] on text nodes, or the parse error for malformed markup. On error
    /// the existing children are kept.
    pub fn set_inner_html(&self, markup: &str) -> Result<(), DomError> {
        if !self.is_element() {
            return Err(DomError::NotAnElement);
        }
        let nodes = markup::parse_fragment(markup)?;
        self.clear();
        for node in &nodes {
            self.append_child(node)?;
        }
        Ok(())
    }

    /// Serializes the children of this node.
    #[must_use]
    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in self.child_nodes() {
            child.write_html(&mut out);
        }
        out
    }

    /// Serializes this node and its children.
    #[must_use]
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    /// Returns the concatenated text of this node and its descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        if let NodeKind::Text(text) = &self.0.borrow().kind {
            return text.clone();
        }
        self.descendants()
            .iter()
            .filter_map(|node| match &node.0.borrow().kind {
                NodeKind::Text(text) => Some(text.clone()),
                NodeKind::Element { .. } => None,
            })
            .collect()
    }

    fn write_html(&self, out: &mut String) {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element {
                tag,
                attributes,
                styles,
            } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attributes {
                    write_attribute(out, name, value);
                }
                if !styles.is_empty() {
                    let style = styles
                        .iter()
                        .map(|(property, value)| format!("{property}: {value}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    write_attribute(out, "style", &style);
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in &data.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn write_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&value.replace('"', "&quot;"));
    out.push('"');
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.borrow().kind {
            NodeKind::Text(text) => f.debug_tuple("Text").field(text).finish(),
            NodeKind::Element {
                tag, attributes, ..
            } => f
                .debug_struct("Element")
                .field("tag", tag)
                .field("attributes", attributes)
                .field("children", &self.0.borrow().children.len())
                .finish(),
        }
    }
}
