//! Named token maps: the lookup tables tokens are dispatched through.
//!
//! Each map owns a unique name, answers membership queries, and knows how to
//! parse the tokens it recognizes. The variants differ only in their
//! `contains`/`lookup` strategy: a regex test ([`RegExpMap`]), an exact-match
//! table of symbols ([`CharacterMap`], [`DelimiterMap`]), or a table of
//! commands with a per-entry parse method ([`MacroMap`], [`CommandMap`],
//! [`EnvironmentMap`]).

use regex::Regex;

use crate::error::{ParseResult, TexError};
use crate::parser::TexParser;
use crate::stack::StackItem;
use crate::token::{Macro, Token};
use crate::types::{KeyMap, Value};

/// Outcome of handing a token to one map in a priority scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryParse {
    /// The map consumed the token.
    Parsed,
    /// The map does not recognize the token; the scan continues.
    NotApplicable,
    /// Distinguished sentinel: stop scanning and invoke the handler-type
    /// fallback instead of trying later maps.
    Fallback,
}

/// The raw registered object behind a token, for callers that need the data
/// rather than parse side effects.
#[derive(Debug, Clone)]
pub enum Found {
    /// A literal symbol.
    Symbol(Token),
    /// A command.
    Command(Macro),
}

/// Parse method for symbol-like tokens (characters, delimiters).
pub type CharacterParser = fn(&mut TexParser<'_>, &Token) -> ParseResult<TryParse>;

/// Parse method for commands; receives the command name and the argument
/// template stored at registration time.
pub type MacroParser = fn(&mut TexParser<'_>, &str, &[Value]) -> ParseResult<TryParse>;

/// Parse method for environments; receives the freshly created `begin` item
/// (with the environment name in its `name` property), the environment name,
/// and the stored argument template.
pub type EnvironmentParser =
    fn(&mut TexParser<'_>, Box<dyn StackItem>, &str, &[Value]) -> ParseResult<()>;

/// Common contract of all token maps.
pub trait TokenMap {
    /// The registry name of this map.
    fn name(&self) -> &str;

    /// Whether this map recognizes `token`.
    fn contains(&self, token: &str) -> bool;

    /// The registered object behind `token`, when the map stores one.
    fn lookup(&self, token: &str) -> Option<Found>;

    /// Try to parse `token`. Returns `NotApplicable` without side effects
    /// when the token is not recognized.
    fn parse(&self, parser: &mut TexParser<'_>, token: &str) -> ParseResult<TryParse>;
}

/// Membership by regular-expression test; one shared parse method.
#[derive(Debug)]
pub struct RegExpMap {
    name: String,
    pattern: Regex,
    parser: CharacterParser,
}

impl RegExpMap {
    /// Compile `pattern` (anchored to the whole token) into a map.
    ///
    /// # Errors
    ///
    /// `InvalidOption` when the pattern does not compile.
    pub fn new(name: &str, pattern: &str, parser: CharacterParser) -> Result<Self, TexError> {
        let pattern = Regex::new(&format!("^(?:{pattern})$")).map_err(|_| {
            TexError::new("InvalidOption", "Invalid pattern '%1' for map '%2'", &[pattern, name])
        })?;
        Ok(Self {
            name: name.to_owned(),
            pattern,
            parser,
        })
    }
}

impl TokenMap for RegExpMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, token: &str) -> bool {
        self.pattern.is_match(token)
    }

    fn lookup(&self, _token: &str) -> Option<Found> {
        None
    }

    fn parse(&self, parser: &mut TexParser<'_>, token: &str) -> ParseResult<TryParse> {
        if !self.contains(token) {
            return Ok(TryParse::NotApplicable);
        }
        (self.parser)(parser, &Token::new(token, token))
    }
}

/// Exact-match table of [`Token`]s with one shared parse method.
pub struct CharacterMap {
    name: String,
    parser: CharacterParser,
    table: KeyMap<String, Token>,
}

impl CharacterMap {
    /// Create an empty map.
    #[must_use]
    pub fn new(name: &str, parser: CharacterParser) -> Self {
        Self {
            name: name.to_owned(),
            parser,
            table: KeyMap::default(),
        }
    }

    /// Register a token under its own name. Re-registering overwrites.
    pub fn add(&mut self, token: Token) {
        self.table.insert(token.name().to_owned(), token);
    }

    /// Register every token of an iterator.
    pub fn add_all(&mut self, tokens: impl IntoIterator<Item = Token>) {
        for token in tokens {
            self.add(token);
        }
    }
}

impl TokenMap for CharacterMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, token: &str) -> bool {
        self.table.contains_key(token)
    }

    fn lookup(&self, token: &str) -> Option<Found> {
        self.table.get(token).cloned().map(Found::Symbol)
    }

    fn parse(&self, parser: &mut TexParser<'_>, token: &str) -> ParseResult<TryParse> {
        match self.table.get(token) {
            Some(entry) => (self.parser)(parser, &entry.clone()),
            None => Ok(TryParse::NotApplicable),
        }
    }
}

/// A [`CharacterMap`] keyed by full control-sequence names (`\langle`) as
/// well as single characters, registered under the delimiter handler type.
pub struct DelimiterMap(CharacterMap);

impl DelimiterMap {
    /// Create an empty map.
    #[must_use]
    pub fn new(name: &str, parser: CharacterParser) -> Self {
        Self(CharacterMap::new(name, parser))
    }

    /// Register a delimiter token. Re-registering overwrites.
    pub fn add(&mut self, token: Token) {
        self.0.add(token);
    }

    /// Register every token of an iterator.
    pub fn add_all(&mut self, tokens: impl IntoIterator<Item = Token>) {
        self.0.add_all(tokens);
    }
}

impl TokenMap for DelimiterMap {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    fn lookup(&self, token: &str) -> Option<Found> {
        self.0.lookup(token)
    }

    fn parse(&self, parser: &mut TexParser<'_>, token: &str) -> ParseResult<TryParse> {
        self.0.parse(parser, token)
    }
}

/// Table of [`Macro`]s with a per-entry parse method; the method receives
/// the name the macro was registered under.
pub struct MacroMap {
    name: String,
    table: KeyMap<String, Macro>,
}

impl MacroMap {
    /// Create an empty map.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            table: KeyMap::default(),
        }
    }

    /// Register a command with an empty argument template.
    pub fn add(&mut self, name: &str, method: MacroParser) {
        self.table.insert(name.to_owned(), Macro::new(name, method));
    }

    /// Register a command with a stored argument template.
    pub fn add_with_args(&mut self, name: &str, method: MacroParser, args: Vec<Value>) {
        self.table
            .insert(name.to_owned(), Macro::with_args(name, method, args));
    }

    /// Register an alias for an existing entry under a second name.
    pub fn alias(&mut self, alias: &str, name: &str) {
        if let Some(entry) = self.table.get(name).cloned() {
            self.table.insert(alias.to_owned(), entry);
        }
    }

    fn entry(&self, token: &str) -> Option<&Macro> {
        self.table.get(token)
    }
}

impl TokenMap for MacroMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, token: &str) -> bool {
        self.table.contains_key(token)
    }

    fn lookup(&self, token: &str) -> Option<Found> {
        self.table.get(token).cloned().map(Found::Command)
    }

    fn parse(&self, parser: &mut TexParser<'_>, token: &str) -> ParseResult<TryParse> {
        match self.entry(token) {
            Some(entry) => {
                let entry = entry.clone();
                (entry.method())(parser, entry.name(), entry.args())
            }
            None => Ok(TryParse::NotApplicable),
        }
    }
}

/// A [`MacroMap`] whose parse methods receive the name the command was
/// *invoked* under, so aliases can tell how they were called.
pub struct CommandMap(MacroMap);

impl CommandMap {
    /// Create an empty map.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(MacroMap::new(name))
    }

    /// Register a command with an empty argument template.
    pub fn add(&mut self, name: &str, method: MacroParser) {
        self.0.add(name, method);
    }

    /// Register a command with a stored argument template.
    pub fn add_with_args(&mut self, name: &str, method: MacroParser, args: Vec<Value>) {
        self.0.add_with_args(name, method, args);
    }

    /// Register an alias for an existing entry under a second name.
    pub fn alias(&mut self, alias: &str, name: &str) {
        self.0.alias(alias, name);
    }
}

impl TokenMap for CommandMap {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    fn lookup(&self, token: &str) -> Option<Found> {
        self.0.lookup(token)
    }

    fn parse(&self, parser: &mut TexParser<'_>, token: &str) -> ParseResult<TryParse> {
        match self.0.entry(token) {
            Some(entry) => {
                let entry = entry.clone();
                (entry.method())(parser, token, entry.args())
            }
            None => Ok(TryParse::NotApplicable),
        }
    }
}

/// Environment table, dispatched under the environment handler type. The
/// parse method receives a freshly created `begin` stack item carrying the
/// environment name and is responsible for pushing it (or a substitute).
pub struct EnvironmentMap {
    name: String,
    table: KeyMap<String, (EnvironmentParser, Vec<Value>)>,
}

impl EnvironmentMap {
    /// Create an empty map.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            table: KeyMap::default(),
        }
    }

    /// Register an environment. Re-registering overwrites.
    pub fn add(&mut self, name: &str, method: EnvironmentParser, args: Vec<Value>) {
        self.table.insert(name.to_owned(), (method, args));
    }
}

impl TokenMap for EnvironmentMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn contains(&self, token: &str) -> bool {
        self.table.contains_key(token)
    }

    fn lookup(&self, _token: &str) -> Option<Found> {
        None
    }

    fn parse(&self, parser: &mut TexParser<'_>, token: &str) -> ParseResult<TryParse> {
        let Some((method, args)) = self.table.get(token) else {
            return Ok(TryParse::NotApplicable);
        };
        let (method, args) = (*method, args.clone());
        let mut begin = parser.options.item_factory.create("begin")?;
        begin.set_property("name", Value::from(token));
        method(parser, begin, token, &args)?;
        Ok(TryParse::Parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut TexParser<'_>, _: &Token) -> ParseResult<TryParse> {
        Ok(TryParse::Parsed)
    }

    #[test]
    fn test_regexp_membership() {
        let map = RegExpMap::new("letter", "[a-zA-Z]", noop).unwrap();
        assert!(map.contains("x"));
        assert!(!map.contains("3"));
        assert!(!map.contains("xy"), "pattern is anchored to the whole token");
        assert!(format!("{map:?}").contains("letter"));
    }

    #[test]
    fn test_regexp_bad_pattern_is_invalid_option() {
        let err = RegExpMap::new("letter", "[", noop).unwrap_err();
        assert_eq!(err.id, "InvalidOption");
    }

    #[test]
    fn test_character_map_lookup() {
        let mut map = CharacterMap::new("mathchar0mi", noop);
        map.add(Token::with_attributes(
            "alpha",
            "\u{03b1}",
            &[("mathvariant", Value::from("italic"))],
        ));

        assert!(map.contains("alpha"));
        assert!(!map.contains("beta"));
        let Some(Found::Symbol(token)) = map.lookup("alpha") else {
            panic!("expected a symbol");
        };
        assert_eq!(token.text(), "\u{03b1}");
    }
}
