//! Packages and the configuration merge engine.
//!
//! A [`Configuration`] is an immutable, named bundle of grammar extensions:
//! token maps, handler entries, stack-item and node constructors, default
//! options, tag schemes, processors, and an optional init callback. A
//! running parser is the result of merging an ordered list of configurations
//! ascending by priority (ties broken by registration order) into a
//! [`ParseOptions`] instance.
//!
//! Packages can also be merged dynamically mid-parse (`\require`). When a
//! dynamically loaded package carries processors or an init callback, the
//! load reports that the current top-level parse must be abandoned and
//! retried from scratch, since those must apply to input that has already
//! been consumed.

use std::rc::Rc;

use bon::Builder;

use crate::error::{ParseResult, TexError};
use crate::map_handler::{FallbackMethod, HandlerType, MapHandler};
use crate::node_factory::NodeConstructor;
use crate::options::{default_options, OptionList, OptionValue};
use crate::parse_options::{ParseOptions, ProcessorFn};
use crate::stack::ItemConstructor;
use crate::tags::TagScheme;
use crate::types::{KeyMap, KeySet};

/// Registers a configuration's token maps into the map registry when the
/// configuration is merged.
pub type MapInit = fn(&mut MapHandler);

/// Init callback run as the final merge step, with the whole assembled
/// state. Used to validate options and register maps built from them.
pub type ConfigInit = fn(&mut ParseOptions) -> ParseResult<()>;

/// An immutable, named bundle of grammar and behavior extensions.
#[derive(Builder)]
pub struct Configuration {
    /// Unique package name.
    #[builder(into)]
    name: String,
    /// Merge priority; lower merges first.
    #[builder(default = 10)]
    priority: i32,
    /// Packages that must be merged before this one.
    #[builder(default)]
    dependencies: Vec<String>,
    /// Token-map registration hook.
    maps: Option<MapInit>,
    /// Handler entries: map names contributed per handler type.
    #[builder(default)]
    handlers: Vec<(HandlerType, Vec<&'static str>)>,
    /// Per-type fallbacks. Only the first-merged fallback for a type wins.
    #[builder(default)]
    fallbacks: Vec<(HandlerType, FallbackMethod)>,
    /// Stack-item constructors: `(kind, constructor, declared override)`.
    #[builder(default)]
    items: Vec<(&'static str, ItemConstructor, bool)>,
    /// Node constructors; the last registration for a kind wins.
    #[builder(default)]
    nodes: Vec<(&'static str, NodeConstructor)>,
    /// Default options, merged non-destructively.
    #[builder(default)]
    options: OptionList,
    /// Tag schemes this package provides, installed when the running `tags`
    /// option names them.
    #[builder(default)]
    tag_schemes: Vec<(&'static str, TagScheme)>,
    /// Preprocessors as `(priority, function)`.
    #[builder(default)]
    preprocessors: Vec<(i32, ProcessorFn)>,
    /// Postprocessors as `(priority, function)`.
    #[builder(default)]
    postprocessors: Vec<(i32, ProcessorFn)>,
    /// Setup callback run after everything else is merged.
    init: Option<ConfigInit>,
}

impl Configuration {
    /// The package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The merge priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Packages that must be merged before this one.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Whether merging this package requires a retry of an in-progress
    /// parse: true when it carries processors or an init callback that must
    /// apply to already-consumed input.
    #[must_use]
    pub fn needs_retry(&self) -> bool {
        !self.preprocessors.is_empty() || !self.postprocessors.is_empty() || self.init.is_some()
    }
}

/// Registry of known configurations. Names are unique; re-registering
/// overwrites the configuration but keeps its original position for
/// priority tie-breaking.
#[derive(Default)]
pub struct ConfigurationRegistry {
    configs: KeyMap<String, (usize, Rc<Configuration>)>,
    seq: usize,
}

impl ConfigurationRegistry {
    /// Register a configuration under its name.
    pub fn register(&mut self, config: Configuration) {
        let seq = match self.configs.get(config.name()) {
            Some((seq, _)) => *seq,
            None => {
                self.seq += 1;
                self.seq
            }
        };
        self.configs
            .insert(config.name().to_owned(), (seq, Rc::new(config)));
    }

    /// Look up a configuration by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Rc<Configuration>> {
        self.configs.get(name).map(|(_, c)| Rc::clone(c))
    }

    /// The registration position of a configuration, for tie-breaking.
    #[must_use]
    pub fn order(&self, name: &str) -> Option<usize> {
        self.configs.get(name).map(|(seq, _)| *seq)
    }
}

/// The merge engine: tracks which configurations have been merged into the
/// owning [`ParseOptions`] and resolves dynamic load requests.
#[derive(Default)]
pub struct ParserConfiguration {
    /// The configurations available for static and dynamic loading.
    pub registry: ConfigurationRegistry,
    /// The token-map registry populated by merged configurations.
    pub map_handler: MapHandler,
    merged: Vec<String>,
    known_tag_schemes: KeySet<String>,
}

impl ParserConfiguration {
    /// Create a merge engine over the given registry.
    #[must_use]
    pub fn new(registry: ConfigurationRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    /// Whether a package has been merged.
    #[must_use]
    pub fn is_merged(&self, name: &str) -> bool {
        self.merged.iter().any(|n| n == name)
    }

    /// The merged package names, in merge order.
    #[must_use]
    pub fn merged(&self) -> &[String] {
        &self.merged
    }

    /// Resolve `names` plus their transitive dependencies into merge order:
    /// ascending priority, ties broken by registration order. Already
    /// merged packages are skipped.
    fn plan(&self, names: &[&str]) -> ParseResult<Vec<Rc<Configuration>>> {
        let mut plan: Vec<Rc<Configuration>> = Vec::new();
        let mut seen: KeySet<String> = self.merged.iter().cloned().collect();
        let mut work: Vec<String> = names.iter().map(|n| (*n).to_owned()).collect();
        while let Some(name) = work.pop() {
            if seen.contains(&name) {
                continue;
            }
            let config = self.registry.get(&name).ok_or_else(|| {
                TexError::new("UnknownPackage", "Unknown package '%1'", &[&name])
            })?;
            seen.insert(name);
            for dep in config.dependencies() {
                work.push(dep.clone());
            }
            plan.push(config);
        }
        plan.sort_by_key(|c| (c.priority(), self.registry.order(c.name())));
        Ok(plan)
    }
}

/// Outcome of a dynamic package load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResult {
    /// The package was already merged; nothing changed.
    AlreadyLoaded,
    /// The named packages were merged and parsing may continue in place.
    Loaded(Vec<String>),
    /// The named packages were merged, but the current top-level parse must
    /// be abandoned and retried.
    Retry(Vec<String>),
}

/// Merge the named configurations (and their dependencies) into `options`.
///
/// # Errors
///
/// `UnknownPackage` for an unregistered name, `StackItemCollision` for a
/// conflicting item registration, `InvalidTagOption` when the running
/// `tags` option names a scheme no merged package provides, plus whatever
/// an init callback raises.
pub fn configure(options: &mut ParseOptions, names: &[&str]) -> ParseResult<()> {
    let plan = options.configuration.plan(names)?;
    for config in plan {
        merge(options, &config)?;
    }
    let selected = options
        .options
        .get("tags")
        .and_then(OptionValue::as_str)
        .map(ToOwned::to_owned);
    if let Some(selected) = selected {
        if !options.configuration.known_tag_schemes.contains(&selected) {
            return Err(TexError::new(
                "InvalidTagOption",
                "No package provides the tag scheme '%1'",
                &[&selected],
            )
            .into());
        }
    }
    Ok(())
}

/// Merge a package (and its unmet dependencies) mid-parse.
///
/// # Errors
///
/// Same conditions as [`configure`], minus the tag-scheme check (a dynamic
/// load does not change the `tags` option).
pub fn load_package(options: &mut ParseOptions, name: &str) -> ParseResult<LoadResult> {
    if options.configuration.is_merged(name) {
        return Ok(LoadResult::AlreadyLoaded);
    }
    let plan = options.configuration.plan(&[name])?;
    let mut needs_retry = false;
    let mut loaded = Vec::with_capacity(plan.len());
    for config in plan {
        needs_retry |= config.needs_retry();
        loaded.push(config.name().to_owned());
        merge(options, &config)?;
    }
    Ok(if needs_retry {
        LoadResult::Retry(loaded)
    } else {
        LoadResult::Loaded(loaded)
    })
}

fn merge(options: &mut ParseOptions, config: &Configuration) -> ParseResult<()> {
    log::debug!("merging configuration '{}'", config.name());
    if let Some(maps) = config.maps {
        maps(&mut options.configuration.map_handler);
    }
    for (handler_type, names) in &config.handlers {
        options.handlers.get_mut(*handler_type).add(
            names,
            &options.configuration.map_handler,
            config.priority,
        );
    }
    for (handler_type, fallback) in &config.fallbacks {
        options.handlers.get_mut(*handler_type).set_fallback(*fallback);
    }
    for (kind, constructor, overrides) in &config.items {
        options.item_factory.register(kind, *constructor, *overrides)?;
    }
    for (kind, constructor) in &config.nodes {
        options.node_factory.register(kind, *constructor);
    }
    default_options(&mut options.options, &config.options);
    let selected = options
        .options
        .get("tags")
        .and_then(OptionValue::as_str)
        .map(ToOwned::to_owned);
    for (name, scheme) in &config.tag_schemes {
        options
            .configuration
            .known_tag_schemes
            .insert((*name).to_owned());
        if selected.as_deref() == Some(*name) {
            options.tags.set_scheme(*scheme);
        }
    }
    for (priority, run) in &config.preprocessors {
        options.add_preprocessor(*priority, *run);
    }
    for (priority, run) in &config.postprocessors {
        options.add_postprocessor(*priority, *run);
    }
    options.configuration.merged.push(config.name().to_owned());
    if let Some(init) = config.init {
        init(options)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(configs: Vec<Configuration>) -> ConfigurationRegistry {
        let mut registry = ConfigurationRegistry::default();
        for config in configs {
            registry.register(config);
        }
        registry
    }

    fn options_with(configs: Vec<Configuration>) -> ParseOptions {
        let mut options = ParseOptions::default();
        options.configuration = ParserConfiguration::new(registry_with(configs));
        options
    }

    #[test]
    fn test_unknown_package() {
        let mut options = options_with(vec![]);
        let err = configure(&mut options, &["mystery"]).unwrap_err();
        assert_eq!(err.error_id(), Some("UnknownPackage"));
    }

    #[test]
    fn test_merge_order_follows_priority_then_registration() {
        let a = Configuration::builder()
            .name("a")
            .priority(20)
            .build();
        let b = Configuration::builder().name("b").priority(5).build();
        let c = Configuration::builder().name("c").priority(5).build();

        let mut options = options_with(vec![a, b, c]);
        configure(&mut options, &["a", "c", "b"]).unwrap();
        assert_eq!(options.configuration.merged(), ["b", "c", "a"]);
    }

    #[test]
    fn test_dependencies_are_merged() {
        let base = Configuration::builder().name("base").priority(0).build();
        let ext = Configuration::builder()
            .name("ext")
            .dependencies(vec!["base".to_owned()])
            .build();

        let mut options = options_with(vec![ext, base]);
        configure(&mut options, &["ext"]).unwrap();
        assert_eq!(options.configuration.merged(), ["base", "ext"]);
    }

    #[test]
    fn test_earlier_merge_wins_option_defaults() {
        let mut first_options = OptionList::default();
        first_options.insert("digits".to_owned(), OptionValue::from("[0-9]"));
        let mut second_options = OptionList::default();
        second_options.insert("digits".to_owned(), OptionValue::from("[0-9.,]"));

        let first = Configuration::builder()
            .name("first")
            .priority(1)
            .options(first_options)
            .build();
        let second = Configuration::builder()
            .name("second")
            .priority(2)
            .options(second_options)
            .build();

        let mut options = options_with(vec![first, second]);
        configure(&mut options, &["second", "first"]).unwrap();
        assert_eq!(options.options["digits"].as_str(), Some("[0-9]"));
    }

    #[test]
    fn test_unselected_tag_scheme_is_invalid() {
        let mut defaults = OptionList::default();
        defaults.insert("tags".to_owned(), OptionValue::from("ams"));
        let base = Configuration::builder()
            .name("base")
            .options(defaults)
            .tag_schemes(vec![("none", TagScheme::None), ("all", TagScheme::All)])
            .build();

        let mut options = options_with(vec![base]);
        let err = configure(&mut options, &["base"]).unwrap_err();
        assert_eq!(err.error_id(), Some("InvalidTagOption"));
    }

    #[test]
    fn test_dynamic_load_reports_retry_for_processors() {
        fn strip(_: &mut ParseOptions) -> ParseResult<()> {
            Ok(())
        }
        let plain = Configuration::builder().name("plain").build();
        let with_post = Configuration::builder()
            .name("deco")
            .postprocessors(vec![(10, strip as ProcessorFn)])
            .build();

        let mut options = options_with(vec![plain, with_post]);
        assert_eq!(
            load_package(&mut options, "plain").unwrap(),
            LoadResult::Loaded(vec!["plain".to_owned()])
        );
        assert_eq!(
            load_package(&mut options, "plain").unwrap(),
            LoadResult::AlreadyLoaded
        );
        assert_eq!(
            load_package(&mut options, "deco").unwrap(),
            LoadResult::Retry(vec!["deco".to_owned()])
        );
    }
}
