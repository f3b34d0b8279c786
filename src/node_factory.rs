//! Node construction by kind name.
//!
//! Output nodes are created through a per-run [`NodeFactory`] rather than
//! directly, so a package can shadow the constructor for a kind and
//! specialize how that kind is built (extra default attributes, different
//! child layout). Constructors are registered at configuration-merge time;
//! the last registration for a kind wins.

use crate::error::TexError;
use crate::node::MmlNode;
use crate::types::{KeyMap, Value};

/// Constructor signature: kind tag, initial properties, children in order.
pub type NodeConstructor = fn(&str, &[(&str, Value)], &[MmlNode]) -> MmlNode;

/// The standard constructor: a bare node of the kind with the given
/// properties and children.
pub fn default_node(kind: &str, properties: &[(&str, Value)], children: &[MmlNode]) -> MmlNode {
    let node = MmlNode::new(kind);
    for (name, value) in properties {
        node.set_property(name, value.clone());
    }
    for child in children {
        node.append_child(child);
    }
    node
}

/// Kind-to-constructor registry for output nodes.
#[derive(Default)]
pub struct NodeFactory {
    constructors: KeyMap<String, NodeConstructor>,
}

impl NodeFactory {
    /// Register a constructor for `kind`, shadowing any earlier one.
    pub fn register(&mut self, kind: &str, constructor: NodeConstructor) {
        self.constructors.insert(kind.to_owned(), constructor);
    }

    /// Whether a constructor is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Build a node of the given kind.
    ///
    /// # Errors
    ///
    /// `UnknownNodeKind` when no constructor is registered for `kind`.
    pub fn create(
        &self,
        kind: &str,
        properties: &[(&str, Value)],
        children: &[MmlNode],
    ) -> Result<MmlNode, TexError> {
        let constructor = self.constructors.get(kind).ok_or_else(|| {
            TexError::new("UnknownNodeKind", "Unknown node kind '%1'", &[kind])
        })?;
        Ok(constructor(kind, properties, children))
    }

    /// Build a token-level node (`mi`, `mo`, `mn`, `mtext`) carrying `text`
    /// as its content.
    ///
    /// # Errors
    ///
    /// `UnknownNodeKind` when no constructor is registered for `kind`.
    pub fn create_token(
        &self,
        kind: &str,
        text: &str,
        attributes: &[(&str, Value)],
    ) -> Result<MmlNode, TexError> {
        let node = self.create(kind, &[("text", Value::from(text))], &[])?;
        for (name, value) in attributes {
            node.set_attribute(name, value.clone());
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged_mo(kind: &str, properties: &[(&str, Value)], children: &[MmlNode]) -> MmlNode {
        let node = default_node(kind, properties, children);
        node.set_attribute("stretchy", Value::Bool(false));
        node
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let factory = NodeFactory::default();
        let err = factory.create("mrow", &[], &[]).unwrap_err();
        assert_eq!(err.id, "UnknownNodeKind");
    }

    #[test]
    fn test_last_registration_wins() {
        let mut factory = NodeFactory::default();
        factory.register("mo", default_node);
        factory.register("mo", tagged_mo);

        let node = factory.create("mo", &[], &[]).unwrap();
        assert_eq!(node.get_attribute("stretchy"), Some(Value::Bool(false)));
    }

    #[test]
    fn test_create_token_sets_text_and_attributes() {
        let mut factory = NodeFactory::default();
        factory.register("mi", default_node);
        let node = factory
            .create_token("mi", "x", &[("mathvariant", Value::from("italic"))])
            .unwrap();
        assert_eq!(node.get_property("text"), Some(Value::from("x")));
        assert_eq!(node.get_attribute("mathvariant"), Some(Value::from("italic")));
    }
}
