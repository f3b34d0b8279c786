//! Token-map registry and prioritized dispatch.
//!
//! [`MapHandler`] is the registry of named token maps. It is an explicit
//! object constructed per parser setup (and per test), never process-global,
//! so unrelated tests cannot leak maps into each other.
//!
//! [`SubHandler`] is one handler type's priority-ordered scan list over those
//! maps; [`SubHandlers`] bundles one per [`HandlerType`]. Configurations
//! contribute map *names* which are resolved against the registry when
//! merged.

use std::rc::Rc;

use strum::{AsRefStr, Display, EnumString};

use crate::error::ParseResult;
use crate::parser::TexParser;
use crate::token_map::{Found, TokenMap};

/// The categories a token map can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum HandlerType {
    /// Ordinary input characters.
    Character,
    /// Delimiters eligible for `\left`/`\right` sizing.
    Delimiter,
    /// Control sequences.
    Macro,
    /// Environment names used by `\begin`/`\end`.
    Environment,
}

impl HandlerType {
    /// All handler types, in dispatch-table order.
    pub const ALL: [Self; 4] = [
        Self::Character,
        Self::Delimiter,
        Self::Macro,
        Self::Environment,
    ];

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Character => 0,
            Self::Delimiter => 1,
            Self::Macro => 2,
            Self::Environment => 3,
        }
    }
}

/// Handler-type fallback, invoked when no map consumed a token (or a map
/// signalled [`crate::token_map::TryParse::Fallback`]).
pub type FallbackMethod = fn(&mut TexParser<'_>, &str) -> ParseResult<()>;

/// Registry of named token maps. Re-registering a name overwrites.
#[derive(Default)]
pub struct MapHandler {
    maps: crate::types::KeyMap<String, Rc<dyn TokenMap>>,
}

impl MapHandler {
    /// Register a map under its own name.
    pub fn register(&mut self, map: Rc<dyn TokenMap>) {
        self.maps.insert(map.name().to_owned(), map);
    }

    /// Look up a map by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<dyn TokenMap>> {
        self.maps.get(name).cloned()
    }

    /// Whether a map of this name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }
}

/// Priority-ordered scan list for one handler type.
///
/// Lower priority numbers are scanned first; entries with equal priority
/// keep their insertion order. The first map that recognizes a token wins.
#[derive(Default)]
pub struct SubHandler {
    entries: Vec<Entry>,
    fallback: Option<FallbackMethod>,
    seq: usize,
}

struct Entry {
    priority: i32,
    seq: usize,
    map: Rc<dyn TokenMap>,
}

impl SubHandler {
    /// Resolve `names` against `registry` and insert them at `priority`.
    /// An unknown name is reported and skipped.
    pub fn add(&mut self, names: &[&str], registry: &MapHandler, priority: i32) {
        for name in names {
            let Some(map) = registry.get(name) else {
                log::warn!("token map '{name}' is not registered, skipped");
                continue;
            };
            self.seq += 1;
            self.entries.push(Entry {
                priority,
                seq: self.seq,
                map,
            });
        }
        self.entries.sort_by_key(|e| (e.priority, e.seq));
    }

    /// Install the fallback unless one is already set (the first
    /// configuration to define a fallback for a handler type wins).
    pub fn set_fallback(&mut self, fallback: FallbackMethod) {
        if self.fallback.is_none() {
            self.fallback = Some(fallback);
        }
    }

    /// Whether any map in the list recognizes `token`.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.entries.iter().any(|e| e.map.contains(token))
    }

    /// The first map in scan order that recognizes `token`.
    #[must_use]
    pub fn applicable(&self, token: &str) -> Option<Rc<dyn TokenMap>> {
        self.entries
            .iter()
            .find(|e| e.map.contains(token))
            .map(|e| Rc::clone(&e.map))
    }

    /// The registered object behind `token` from the first map that stores
    /// one, without parse side effects.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<Found> {
        self.entries.iter().find_map(|e| e.map.lookup(token))
    }

    /// The scan list and fallback, cloned out so dispatch can run while the
    /// handler table itself is being borrowed through the parser state.
    #[must_use]
    pub fn snapshot(&self) -> (Vec<Rc<dyn TokenMap>>, Option<FallbackMethod>) {
        (
            self.entries.iter().map(|e| Rc::clone(&e.map)).collect(),
            self.fallback,
        )
    }

    /// Names of the maps in scan order, for diagnostics and tests.
    #[must_use]
    pub fn map_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.map.name().to_owned()).collect()
    }
}

/// One [`SubHandler`] per [`HandlerType`].
#[derive(Default)]
pub struct SubHandlers {
    handlers: [SubHandler; 4],
}

impl SubHandlers {
    /// The scan list for a handler type.
    #[must_use]
    pub fn get(&self, kind: HandlerType) -> &SubHandler {
        &self.handlers[kind.index()]
    }

    /// The mutable scan list for a handler type.
    pub fn get_mut(&mut self, kind: HandlerType) -> &mut SubHandler {
        &mut self.handlers[kind.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;
    use crate::token_map::{CharacterMap, CharacterParser, TryParse};

    fn noop_parser() -> CharacterParser {
        |_, _| Ok(TryParse::Parsed)
    }

    fn map_with(name: &str, tokens: &[&str]) -> Rc<dyn TokenMap> {
        let mut map = CharacterMap::new(name, noop_parser());
        for t in tokens {
            map.add(Token::new(t, t));
        }
        Rc::new(map)
    }

    #[test]
    fn test_priority_orders_scan() {
        let mut registry = MapHandler::default();
        registry.register(map_with("late", &["x"]));
        registry.register(map_with("early", &["x"]));

        let mut handler = SubHandler::default();
        handler.add(&["late"], &registry, 10);
        handler.add(&["early"], &registry, 1);

        assert_eq!(handler.applicable("x").unwrap().name(), "early");
        assert_eq!(handler.map_names(), vec!["early", "late"]);
    }

    #[test]
    fn test_equal_priority_preserves_insertion_order() {
        let mut registry = MapHandler::default();
        registry.register(map_with("first", &["x"]));
        registry.register(map_with("second", &["x"]));

        let mut handler = SubHandler::default();
        handler.add(&["first", "second"], &registry, 5);

        assert_eq!(handler.applicable("x").unwrap().name(), "first");
    }

    #[test]
    fn test_unknown_map_name_is_skipped() {
        let registry = MapHandler::default();
        let mut handler = SubHandler::default();
        handler.add(&["missing"], &registry, 0);
        assert!(handler.map_names().is_empty());
    }

    #[test]
    fn test_first_fallback_wins() {
        fn a(_: &mut TexParser<'_>, _: &str) -> ParseResult<()> {
            Ok(())
        }
        fn b(_: &mut TexParser<'_>, _: &str) -> ParseResult<()> {
            Ok(())
        }

        let mut handler = SubHandler::default();
        handler.set_fallback(a);
        handler.set_fallback(b);
        let (_, fallback) = handler.snapshot();
        assert_eq!(fallback, Some(a as FallbackMethod));
    }

    #[test]
    fn test_reregistering_overwrites() {
        let mut registry = MapHandler::default();
        registry.register(map_with("m", &["x"]));
        registry.register(map_with("m", &["y"]));
        let map = registry.get("m").unwrap();
        assert!(map.contains("y"));
        assert!(!map.contains("x"));
    }
}
