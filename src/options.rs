//! Nested option trees and the non-destructive default merge.
//!
//! Every configuration carries a tree of default options. Merging follows
//! `default_options` semantics: a default never overwrites a value that an
//! earlier merge already set, so the first configuration to default an option
//! wins. List-valued options are the exception; a configuration can extend or
//! prune an existing list with the [`OptionValue::Append`] and
//! [`OptionValue::Remove`] directives instead of replacing it wholesale.

use crate::types::{KeyMap, Value};

/// String-keyed option tree.
pub type OptionList = KeyMap<String, OptionValue>;

/// One option value: a scalar, a list, a nested tree, or a list-merge
/// directive. Directives only make sense inside a configuration's defaults;
/// a merged tree never contains them.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// Scalar payload.
    Scalar(Value),
    /// Ordered list of values.
    List(Vec<OptionValue>),
    /// Nested option tree, merged key by key.
    Map(OptionList),
    /// Directive: append these values to the target list (no deduplication).
    Append(Vec<OptionValue>),
    /// Directive: remove matching values from the target list.
    Remove(Vec<OptionValue>),
}

impl OptionValue {
    /// The string payload, if this is a string scalar.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Scalar(v) => v.as_str(),
            _ => None,
        }
    }

    /// The boolean payload, if this is a boolean scalar.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Scalar(v) => v.as_bool(),
            _ => None,
        }
    }

    /// The list payload, if this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[OptionValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The nested tree, if this is a map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&OptionList> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl<T: Into<Value>> From<T> for OptionValue {
    fn from(value: T) -> Self {
        Self::Scalar(value.into())
    }
}

/// Merge `defaults` into `target` without overwriting values already set.
///
/// `Append`/`Remove` directives edit an existing list in place (an `Append`
/// against a missing key creates the list). A nested `Map` default recurses;
/// everything else is inserted only when the key is absent.
pub fn default_options(target: &mut OptionList, defaults: &OptionList) {
    for (key, default) in defaults {
        match default {
            OptionValue::Append(items) => match target.get_mut(key) {
                Some(OptionValue::List(list)) => list.extend(items.iter().cloned()),
                Some(_) => {
                    log::warn!("option '{key}': APPEND directive against a non-list, ignored");
                }
                None => {
                    target.insert(key.clone(), OptionValue::List(items.clone()));
                }
            },
            OptionValue::Remove(items) => match target.get_mut(key) {
                Some(OptionValue::List(list)) => list.retain(|v| !items.contains(v)),
                Some(_) => {
                    log::warn!("option '{key}': REMOVE directive against a non-list, ignored");
                }
                None => {}
            },
            OptionValue::Map(nested_defaults) => match target.get_mut(key) {
                Some(OptionValue::Map(nested)) => default_options(nested, nested_defaults),
                Some(_) => {}
                None => {
                    target.insert(key.clone(), OptionValue::Map(nested_defaults.clone()));
                }
            },
            other => {
                if !target.contains_key(key) {
                    target.insert(key.clone(), other.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_of(values: &[&str]) -> OptionValue {
        OptionValue::List(values.iter().map(|v| OptionValue::from(*v)).collect())
    }

    #[test]
    fn test_defaults_do_not_overwrite() {
        let mut target = OptionList::default();
        target.insert("tags".to_owned(), OptionValue::from("all"));

        let mut defaults = OptionList::default();
        defaults.insert("tags".to_owned(), OptionValue::from("none"));
        defaults.insert("digits".to_owned(), OptionValue::from("[0-9.,]"));

        default_options(&mut target, &defaults);
        assert_eq!(target["tags"].as_str(), Some("all"));
        assert_eq!(target["digits"].as_str(), Some("[0-9.,]"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut target = OptionList::default();
        let mut defaults = OptionList::default();
        defaults.insert("tags".to_owned(), OptionValue::from("none"));

        default_options(&mut target, &defaults);
        let first = target.clone();
        default_options(&mut target, &defaults);
        assert_eq!(target, first);
    }

    #[test]
    fn test_append_grows_without_deduplication() {
        let mut target = OptionList::default();
        target.insert("packages".to_owned(), list_of(&["base"]));

        let mut defaults = OptionList::default();
        defaults.insert(
            "packages".to_owned(),
            OptionValue::Append(vec![OptionValue::from("cancel"), OptionValue::from("base")]),
        );

        default_options(&mut target, &defaults);
        assert_eq!(
            target["packages"],
            list_of(&["base", "cancel", "base"]),
            "append keeps duplicates"
        );
    }

    #[test]
    fn test_remove_prunes_matches() {
        let mut target = OptionList::default();
        target.insert("packages".to_owned(), list_of(&["base", "cancel"]));

        let mut defaults = OptionList::default();
        defaults.insert(
            "packages".to_owned(),
            OptionValue::Remove(vec![OptionValue::from("cancel")]),
        );

        default_options(&mut target, &defaults);
        assert_eq!(target["packages"], list_of(&["base"]));
    }

    #[test]
    fn test_nested_maps_merge_key_by_key() {
        let mut target = OptionList::default();
        let mut inner = OptionList::default();
        inner.insert("open".to_owned(), OptionValue::from("("));
        target.insert("fences".to_owned(), OptionValue::Map(inner));

        let mut defaults = OptionList::default();
        let mut inner_defaults = OptionList::default();
        inner_defaults.insert("open".to_owned(), OptionValue::from("["));
        inner_defaults.insert("close".to_owned(), OptionValue::from(")"));
        defaults.insert("fences".to_owned(), OptionValue::Map(inner_defaults));

        default_options(&mut target, &defaults);
        let fences = target["fences"].as_map().unwrap();
        assert_eq!(fences["open"].as_str(), Some("("));
        assert_eq!(fences["close"].as_str(), Some(")"));
    }
}
