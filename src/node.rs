//! The MathML-like output tree.
//!
//! [`MmlNode`] is a cheap handle (reference-counted) onto a tree node with a
//! kind tag, properties, attributes, ordered children and a weak parent
//! back-reference. Parent pointers are maintained by [`MmlNode::append_child`],
//! [`MmlNode::replace_child`] and [`MmlNode::remove_child`] and always point
//! at the current structural owner; a node has at most one owner at a time,
//! so the structure is a tree, never a DAG.
//!
//! Token-level MathML elements (`mi`, `mo`, `mn`, `mtext`) carry their text
//! content in the `text` property.

use core::fmt;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::types::{KeyMap, Value};

struct NodeData {
    kind: String,
    properties: KeyMap<String, Value>,
    attributes: KeyMap<String, Value>,
    children: Vec<MmlNode>,
    parent: Option<Weak<RefCell<NodeData>>>,
    /// Reverse index of the node lists this node belongs to, stamped by
    /// `ParseOptions::add_node` so tree copies can re-join the lists.
    lists: Vec<String>,
}

/// Handle to one node of the output tree. Cloning the handle does not copy
/// the node; use [`MmlNode::deep_copy`] for that.
#[derive(Clone)]
pub struct MmlNode(Rc<RefCell<NodeData>>);

impl MmlNode {
    /// Create a detached node of the given kind.
    #[must_use]
    pub fn new(kind: &str) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind: kind.to_owned(),
            properties: KeyMap::default(),
            attributes: KeyMap::default(),
            children: Vec::new(),
            parent: None,
            lists: Vec::new(),
        })))
    }

    /// The node's kind tag.
    #[must_use]
    pub fn kind(&self) -> String {
        self.0.borrow().kind.clone()
    }

    /// Whether the node is of the given kind.
    #[must_use]
    pub fn is_kind(&self, kind: &str) -> bool {
        self.0.borrow().kind == kind
    }

    /// Identity comparison: do the two handles refer to the same node?
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Set an internal property.
    pub fn set_property(&self, name: &str, value: Value) {
        self.0
            .borrow_mut()
            .properties
            .insert(name.to_owned(), value);
    }

    /// Read an internal property.
    #[must_use]
    pub fn get_property(&self, name: &str) -> Option<Value> {
        self.0.borrow().properties.get(name).cloned()
    }

    /// Set an output attribute.
    pub fn set_attribute(&self, name: &str, value: Value) {
        self.0
            .borrow_mut()
            .attributes
            .insert(name.to_owned(), value);
    }

    /// Read an output attribute.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<Value> {
        self.0.borrow().attributes.get(name).cloned()
    }

    /// All attributes, sorted by name for deterministic output.
    #[must_use]
    pub fn attributes(&self) -> Vec<(String, Value)> {
        let mut attrs: Vec<_> = self
            .0
            .borrow()
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        attrs.sort_by(|a, b| a.0.cmp(&b.0));
        attrs
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().children.len()
    }

    /// Whether the node has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().children.is_empty()
    }

    /// Handle to the i-th child.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<Self> {
        self.0.borrow().children.get(index).cloned()
    }

    /// Handles to all children, in order.
    #[must_use]
    pub fn children(&self) -> Vec<Self> {
        self.0.borrow().children.clone()
    }

    /// Handle to the structural owner, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let parent = self.0.borrow().parent.clone()?;
        parent.upgrade().map(MmlNode)
    }

    /// Append `child`, detaching it from any previous owner first.
    pub fn append_child(&self, child: &Self) {
        child.detach();
        child.0.borrow_mut().parent = Some(Rc::downgrade(&self.0));
        self.0.borrow_mut().children.push(child.clone());
    }

    /// Replace `old` with `new` in place. Returns `false` when `old` is not
    /// a child of this node.
    pub fn replace_child(&self, old: &Self, new: &Self) -> bool {
        let index = {
            let data = self.0.borrow();
            data.children.iter().position(|c| c.ptr_eq(old))
        };
        let Some(index) = index else {
            return false;
        };
        new.detach();
        old.0.borrow_mut().parent = None;
        new.0.borrow_mut().parent = Some(Rc::downgrade(&self.0));
        self.0.borrow_mut().children[index] = new.clone();
        true
    }

    /// Remove `child`. Returns `false` when `child` is not a child of this
    /// node.
    pub fn remove_child(&self, child: &Self) -> bool {
        let index = {
            let data = self.0.borrow();
            data.children.iter().position(|c| c.ptr_eq(child))
        };
        let Some(index) = index else {
            return false;
        };
        child.0.borrow_mut().parent = None;
        self.0.borrow_mut().children.remove(index);
        true
    }

    /// Stamp this node as a member of the named node list.
    pub fn add_list(&self, property: &str) {
        let mut data = self.0.borrow_mut();
        if !data.lists.iter().any(|l| l == property) {
            data.lists.push(property.to_owned());
        }
    }

    /// The node lists this node was stamped into.
    #[must_use]
    pub fn lists(&self) -> Vec<String> {
        self.0.borrow().lists.clone()
    }

    /// Structural copy of this node and its descendants. The copy is
    /// detached; list stamps are carried over so the copy can be re-joined
    /// to the lists by the caller.
    #[must_use]
    pub fn deep_copy(&self) -> Self {
        let data = self.0.borrow();
        let copy = Self::new(&data.kind);
        {
            let mut cd = copy.0.borrow_mut();
            cd.properties = data.properties.clone();
            cd.attributes = data.attributes.clone();
            cd.lists = data.lists.clone();
        }
        for child in &data.children {
            let child_copy = child.deep_copy();
            copy.append_child(&child_copy);
        }
        copy
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }
}

impl fmt::Display for MmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        write!(f, "<{kind}")?;
        for (name, value) in self.attributes() {
            write!(f, " {name}=\"{value}\"")?;
        }
        let text = self.get_property("text");
        let children = self.children();
        if children.is_empty() && text.is_none() {
            return write!(f, "/>");
        }
        write!(f, ">")?;
        if let Some(text) = text {
            write!(f, "{text}")?;
        }
        for child in children {
            write!(f, "{child}")?;
        }
        write!(f, "</{kind}>")
    }
}

impl fmt::Debug for MmlNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
