//! Immutable token and macro descriptors.
//!
//! A [`Token`] maps a recognized literal (a character or a control-sequence
//! name) to its output text plus attributes; a [`Macro`] binds a command name
//! to a parse method and an argument template. Both are immutable once
//! registered in a token map.

use crate::token_map::MacroParser;
use crate::types::{KeyMap, Value};

/// Literal symbol descriptor: a recognized name mapped to output text and
/// attributes (e.g. `alpha` to `α` with a `mathvariant` of `italic`).
#[derive(Debug, Clone)]
pub struct Token {
    name: String,
    text: String,
    attributes: KeyMap<String, Value>,
}

impl Token {
    /// Create a token with no attributes.
    #[must_use]
    pub fn new(name: &str, text: &str) -> Self {
        Self {
            name: name.to_owned(),
            text: text.to_owned(),
            attributes: KeyMap::default(),
        }
    }

    /// Create a token carrying the given attributes.
    #[must_use]
    pub fn with_attributes(name: &str, text: &str, attributes: &[(&str, Value)]) -> Self {
        let mut token = Self::new(name, text);
        for (key, value) in attributes {
            token.attributes.insert((*key).to_owned(), value.clone());
        }
        token
    }

    /// The name under which the token is registered.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The output text the token produces.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Attribute lookup.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// All attributes, for transfer onto a created node.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Command descriptor: a name bound to a parse method plus the argument
/// template stored at registration time (handed back to the method verbatim
/// on every use).
#[derive(Debug, Clone)]
pub struct Macro {
    name: String,
    method: MacroParser,
    args: Vec<Value>,
}

impl Macro {
    /// Create a macro with an empty argument template.
    #[must_use]
    pub fn new(name: &str, method: MacroParser) -> Self {
        Self {
            name: name.to_owned(),
            method,
            args: Vec::new(),
        }
    }

    /// Create a macro with a stored argument template.
    #[must_use]
    pub fn with_args(name: &str, method: MacroParser, args: Vec<Value>) -> Self {
        Self {
            name: name.to_owned(),
            method,
            args,
        }
    }

    /// The canonical name the macro was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound parse method.
    #[must_use]
    pub fn method(&self) -> MacroParser {
        self.method
    }

    /// The stored argument template.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }
}
