//! Equation numbering and labeling.
//!
//! Macros that produce numbered equations consult the active [`Tags`] object
//! for the next number, to record an explicit `\tag`, and to register
//! `\label` names. The numbering scheme is selected at configuration-merge
//! time from the `tags` option; `base` provides the `none` and `all` schemes.

use strum::{AsRefStr, Display, EnumString};

use crate::types::KeyMap;

/// Automatic numbering policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TagScheme {
    /// Only explicit `\tag`s produce a tag.
    #[default]
    None,
    /// Every top-level expression is numbered.
    All,
}

/// Numbering state for one parse run.
#[derive(Debug, Default)]
pub struct Tags {
    scheme: TagScheme,
    counter: u32,
    explicit: Option<String>,
    labels: KeyMap<String, String>,
}

impl Tags {
    /// Select the numbering scheme. Called at configuration-merge time.
    pub fn set_scheme(&mut self, scheme: TagScheme) {
        self.scheme = scheme;
    }

    /// The active numbering scheme.
    #[must_use]
    pub const fn scheme(&self) -> TagScheme {
        self.scheme
    }

    /// Record an explicit `\tag` for the current expression. A second
    /// explicit tag overwrites the first.
    pub fn tag(&mut self, text: &str) {
        self.explicit = Some(text.to_owned());
    }

    /// The tag of the current expression without consuming it: the explicit
    /// tag if one was recorded, the next number under the `all` scheme,
    /// nothing otherwise.
    #[must_use]
    pub fn current_tag(&self) -> Option<String> {
        if let Some(tag) = &self.explicit {
            return Some(tag.clone());
        }
        match self.scheme {
            TagScheme::All => Some((self.counter + 1).to_string()),
            TagScheme::None => None,
        }
    }

    /// Finish the current expression: return its tag (if any) and advance
    /// the counter when a number was consumed.
    pub fn make_tag(&mut self) -> Option<String> {
        if let Some(tag) = self.explicit.take() {
            return Some(tag);
        }
        match self.scheme {
            TagScheme::All => {
                self.counter += 1;
                Some(self.counter.to_string())
            }
            TagScheme::None => None,
        }
    }

    /// Register `\label{name}` against the current expression's tag.
    ///
    /// A duplicate label is reported and ignored; the first registration
    /// stands and the parse continues.
    pub fn label(&mut self, name: &str) {
        if self.labels.contains_key(name) {
            log::warn!("duplicate label '{name}' ignored");
            return;
        }
        let tag = self.current_tag().unwrap_or_default();
        self.labels.insert(name.to_owned(), tag);
    }

    /// The tag registered for a label.
    #[must_use]
    pub fn lookup_label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    /// Reset all numbering state. Invoked between independent top-level
    /// parses; the scheme selection survives.
    pub fn reset(&mut self) {
        self.counter = 0;
        self.explicit = None;
        self.labels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_scheme_only_tags_explicitly() {
        let mut tags = Tags::default();
        assert_eq!(tags.make_tag(), None);
        tags.tag("*");
        assert_eq!(tags.make_tag(), Some("*".to_owned()));
        assert_eq!(tags.make_tag(), None, "explicit tag is consumed");
    }

    #[test]
    fn test_all_scheme_numbers_sequentially() {
        let mut tags = Tags::default();
        tags.set_scheme(TagScheme::All);
        assert_eq!(tags.make_tag(), Some("1".to_owned()));
        assert_eq!(tags.make_tag(), Some("2".to_owned()));
        tags.tag("3'");
        assert_eq!(tags.make_tag(), Some("3'".to_owned()));
        assert_eq!(tags.make_tag(), Some("3".to_owned()), "explicit tag does not advance the counter");
    }

    #[test]
    fn test_duplicate_label_keeps_first() {
        let mut tags = Tags::default();
        tags.set_scheme(TagScheme::All);
        tags.label("eq:a");
        tags.make_tag();
        tags.label("eq:a");
        assert_eq!(tags.lookup_label("eq:a"), Some("1"));
    }

    #[test]
    fn test_reset_preserves_scheme() {
        let mut tags = Tags::default();
        tags.set_scheme(TagScheme::All);
        tags.make_tag();
        tags.label("eq:a");
        tags.reset();
        assert_eq!(tags.scheme(), TagScheme::All);
        assert_eq!(tags.lookup_label("eq:a"), None);
        assert_eq!(tags.make_tag(), Some("1".to_owned()));
    }
}
