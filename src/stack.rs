//! The parsing state machine: stack items, the stack, and the item factory.
//!
//! Every open scope (group, script accumulator, environment, ...) is a
//! [`StackItem`] on the [`Stack`]. Pushing a new item runs the top item's
//! `check_item` transition, which can accept the push, absorb the incoming
//! item, or replace itself with new items that are re-processed in turn.
//! The bottom of the stack is always a `start` item; a successful parse ends
//! with exactly that item holding one finished node.

use core::fmt;
use std::collections::VecDeque;

use crate::error::{ParseResult, TexError};
use crate::node::MmlNode;
use crate::node_factory::NodeFactory;
use crate::parse_options::ParseOptions;
use crate::types::{KeyMap, Value};

/// Common storage shared by all stack items: the property map, the node
/// accumulator, named node slots, the scoped environment (open items only)
/// and the registered close-kind errors.
pub struct ItemCore {
    properties: KeyMap<String, Value>,
    nodes: Vec<MmlNode>,
    node_slots: KeyMap<String, MmlNode>,
    env: Option<KeyMap<String, Value>>,
    errors: KeyMap<String, TexError>,
}

impl ItemCore {
    fn with_env(env: Option<KeyMap<String, Value>>) -> Self {
        let mut errors = KeyMap::default();
        errors.insert(
            "end".to_owned(),
            TexError::new("ExtraOpenMissingClose", "Extra open brace or missing close brace", &[]),
        );
        errors.insert(
            "close".to_owned(),
            TexError::new("ExtraCloseMissingOpen", "Extra close brace or missing open brace", &[]),
        );
        errors.insert(
            "right".to_owned(),
            TexError::new("MissingLeftExtraRight", "Missing \\left or extra \\right", &[]),
        );
        Self {
            properties: KeyMap::default(),
            nodes: Vec::new(),
            node_slots: KeyMap::default(),
            env,
            errors,
        }
    }

    /// Storage for an open item, with a scoped environment.
    #[must_use]
    pub fn open() -> Self {
        Self::with_env(Some(KeyMap::default()))
    }

    /// Storage for a non-open item.
    #[must_use]
    pub fn closed() -> Self {
        Self::with_env(None)
    }

    /// Register (or override) the error raised when an item of the given
    /// close kind reaches this item unmatched.
    pub fn set_error(&mut self, close_kind: &str, error: TexError) {
        self.errors.insert(close_kind.to_owned(), error);
    }
}

/// Transition outcome of [`StackItem::check_item`].
pub enum CheckResult {
    /// Push this item (normally the incoming one) above the current top.
    Push(Box<dyn StackItem>),
    /// Pop the current top and re-process these items in order.
    Replace(Vec<Box<dyn StackItem>>),
    /// The incoming item was consumed; the stack is unchanged.
    Absorbed,
}

/// One parsing scope on the stack.
///
/// Implementations provide `kind`, the role flags, the shared [`ItemCore`]
/// storage, and a `check_item` transition; the transition normally defers to
/// [`check_base`] after its kind-specific rules.
pub trait StackItem {
    /// The item's kind tag.
    fn kind(&self) -> &'static str;

    /// Shared storage.
    fn core(&self) -> &ItemCore;

    /// Shared storage, mutably.
    fn core_mut(&mut self) -> &mut ItemCore;

    /// Whether this item opens a scope awaiting a matching close.
    fn is_open(&self) -> bool {
        false
    }

    /// Whether this item closes a scope.
    fn is_close(&self) -> bool {
        false
    }

    /// Whether this item is a completed subexpression carrying its node.
    fn is_final(&self) -> bool {
        false
    }

    /// Transition run when `incoming` is about to be pushed while `self` is
    /// the top of the stack.
    fn check_item(
        &mut self,
        options: &mut ParseOptions,
        incoming: Box<dyn StackItem>,
    ) -> ParseResult<CheckResult>;

    /// Property lookup.
    fn get_property(&self, name: &str) -> Option<Value> {
        self.core().properties.get(name).cloned()
    }

    /// Set a property.
    fn set_property(&mut self, name: &str, value: Value) {
        self.core_mut().properties.insert(name.to_owned(), value);
    }

    /// Append a node to the accumulator.
    fn push_node(&mut self, node: MmlNode) {
        self.core_mut().nodes.push(node);
    }

    /// Remove and return the most recently accumulated node.
    fn pop_node(&mut self) -> Option<MmlNode> {
        self.core_mut().nodes.pop()
    }

    /// The accumulated nodes, in order.
    fn nodes(&self) -> &[MmlNode] {
        &self.core().nodes
    }

    /// Drain the accumulator.
    fn take_nodes(&mut self) -> Vec<MmlNode> {
        core::mem::take(&mut self.core_mut().nodes)
    }

    /// Store a node in a named slot (e.g. a fraction numerator held until
    /// the scope closes).
    fn set_node(&mut self, name: &str, node: MmlNode) {
        self.core_mut().node_slots.insert(name.to_owned(), node);
    }

    /// Take a node out of a named slot.
    fn take_node(&mut self, name: &str) -> Option<MmlNode> {
        self.core_mut().node_slots.remove(name)
    }

    /// Scoped-variable lookup. Present only on open items.
    fn env_get(&self, name: &str) -> Option<Value> {
        self.core().env.as_ref()?.get(name).cloned()
    }

    /// Set a scoped variable. Ignored on non-open items.
    fn env_set(&mut self, name: &str, value: Value) {
        if let Some(env) = self.core_mut().env.as_mut() {
            env.insert(name.to_owned(), value);
        }
    }

    /// The registered error for an unmatched close kind, if any.
    fn close_error(&self, close_kind: &str) -> Option<TexError> {
        self.core().errors.get(close_kind).cloned()
    }

    /// Collapse the accumulator into one node (the node itself when there
    /// is exactly one, an `mrow` otherwise).
    fn to_mml(&mut self, options: &mut ParseOptions) -> ParseResult<MmlNode> {
        let nodes = self.take_nodes();
        Ok(nodes_to_mml(&options.node_factory, nodes)?)
    }
}

impl fmt::Debug for dyn StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StackItem({})", self.kind())
    }
}

impl fmt::Debug for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push(item) => write!(f, "Push({})", item.kind()),
            Self::Replace(items) => {
                write!(f, "Replace(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.kind())?;
                }
                write!(f, ")")
            }
            Self::Absorbed => write!(f, "Absorbed"),
        }
    }
}

/// Collapse a node sequence into a single node.
pub fn nodes_to_mml(factory: &NodeFactory, mut nodes: Vec<MmlNode>) -> Result<MmlNode, TexError> {
    if nodes.len() == 1 {
        return Ok(nodes.remove(0));
    }
    factory.create("mrow", &[], &nodes)
}

/// The generic transition rules, shared by every item kind. Specific items
/// run their own pre-checks and then defer here.
///
/// 1. An incoming `over` against an open scope captures everything the scope
///    accumulated as the numerator-in-progress and clears the accumulator.
/// 2. An incoming `cell` against an open scope is absorbed silently when it
///    carries a line-break marker, and is a `Misplaced` alignment tab
///    otherwise.
/// 3. An incoming close kind this item has a registered error for fails
///    with that error.
/// 4. Any other non-final item is pushed.
/// 5. A final item's nodes are absorbed into this item's accumulator.
pub fn check_base(
    this: &mut dyn StackItem,
    options: &mut ParseOptions,
    mut incoming: Box<dyn StackItem>,
) -> ParseResult<CheckResult> {
    if incoming.kind() == "over" && this.is_open() {
        let num = nodes_to_mml(&options.node_factory, this.take_nodes())?;
        incoming.set_node("num", num);
        return Ok(CheckResult::Push(incoming));
    }
    if incoming.kind() == "cell" && this.is_open() {
        if incoming.get_property("linebreak").is_some() {
            return Ok(CheckResult::Absorbed);
        }
        let text = incoming
            .get_property("text")
            .map_or_else(|| "&".to_owned(), |v| v.to_string());
        return Err(TexError::new("Misplaced", "Misplaced '%1' in %2", &[&text, this.kind()]).into());
    }
    if incoming.is_close() {
        if let Some(error) = this.close_error(incoming.kind()) {
            return Err(error.into());
        }
    }
    if !incoming.is_final() {
        return Ok(CheckResult::Push(incoming));
    }
    for node in incoming.take_nodes() {
        this.push_node(node);
    }
    Ok(CheckResult::Absorbed)
}

/// Kind-to-constructor registry for stack items.
pub type ItemConstructor = fn() -> Box<dyn StackItem>;

#[derive(Default)]
pub struct StackItemFactory {
    constructors: KeyMap<String, ItemConstructor>,
}

impl StackItemFactory {
    /// Register a constructor for `kind`.
    ///
    /// # Errors
    ///
    /// `StackItemCollision` when `kind` is already registered and the
    /// registration is not a declared override.
    pub fn register(
        &mut self,
        kind: &str,
        constructor: ItemConstructor,
        allow_override: bool,
    ) -> Result<(), TexError> {
        if self.constructors.contains_key(kind) && !allow_override {
            return Err(TexError::new(
                "StackItemCollision",
                "Stack item kind '%1' is already registered",
                &[kind],
            ));
        }
        self.constructors.insert(kind.to_owned(), constructor);
        Ok(())
    }

    /// Whether a constructor is registered for `kind`.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Build a fresh item of the given kind.
    ///
    /// # Errors
    ///
    /// `BadStackItem` when no constructor is registered for `kind`.
    pub fn create(&self, kind: &str) -> Result<Box<dyn StackItem>, TexError> {
        let constructor = self.constructors.get(kind).ok_or_else(|| {
            TexError::new("BadStackItem", "Unknown stack item kind '%1'", &[kind])
        })?;
        Ok(constructor())
    }
}

/// The item stack. The bottom item is always `start`.
pub struct Stack {
    items: Vec<Box<dyn StackItem>>,
}

impl Stack {
    /// Create a stack seeded with a `start` item from the factory.
    ///
    /// # Errors
    ///
    /// `BadStackItem` when no `start` constructor is registered.
    pub fn new(options: &mut ParseOptions) -> ParseResult<Self> {
        let start = options.item_factory.create("start")?;
        Ok(Self { items: vec![start] })
    }

    /// Push an item, running `check_item` transitions until the stack
    /// settles. Items returned by a `Replace` transition are re-processed
    /// in order.
    pub fn push(&mut self, options: &mut ParseOptions, item: Box<dyn StackItem>) -> ParseResult<()> {
        let mut pending: VecDeque<Box<dyn StackItem>> = VecDeque::new();
        pending.push_back(item);
        while let Some(incoming) = pending.pop_front() {
            let Some(top) = self.items.last_mut() else {
                self.items.push(incoming);
                continue;
            };
            match top.check_item(options, incoming)? {
                CheckResult::Push(item) => self.items.push(item),
                CheckResult::Absorbed => {}
                CheckResult::Replace(items) => {
                    self.items.pop();
                    for item in items.into_iter().rev() {
                        pending.push_front(item);
                    }
                }
            }
        }
        Ok(())
    }

    /// Read-only peek at the top item.
    #[must_use]
    pub fn top(&self) -> Option<&dyn StackItem> {
        self.items.last().map(AsRef::as_ref)
    }

    /// Mutable access to the top item.
    pub fn top_mut(&mut self) -> Option<&mut Box<dyn StackItem>> {
        self.items.last_mut()
    }

    /// Read-only peek `n` items down from the top (`1` is the top itself),
    /// used for lookahead decisions without disturbing the stack.
    #[must_use]
    pub fn top_n(&self, n: usize) -> Option<&dyn StackItem> {
        if n == 0 || n > self.items.len() {
            return None;
        }
        self.items
            .get(self.items.len() - n)
            .map(AsRef::as_ref)
    }

    /// Number of items on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the stack is empty (only transiently true mid-transition).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Collapse a finished stack into the root node.
    ///
    /// # Errors
    ///
    /// `ExtraOpenMissingClose` naming the offending kind when anything but
    /// the finished `start` item remains.
    pub fn finalize(&mut self) -> ParseResult<MmlNode> {
        if self.items.len() == 1 {
            let top = &mut self.items[0];
            if top.kind() == "start" && top.get_property("stopped").is_some() {
                if let Some(node) = top.pop_node() {
                    return Ok(node);
                }
            }
        }
        let kind = self.top().map_or("start", StackItem::kind);
        Err(TexError::new(
            "ExtraOpenMissingClose",
            "Unterminated '%1' at end of input",
            &[kind],
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_factory::default_node;

    struct PlainItem {
        core: ItemCore,
        open: bool,
        final_: bool,
    }

    impl PlainItem {
        fn open() -> Box<dyn StackItem> {
            Box::new(Self {
                core: ItemCore::open(),
                open: true,
                final_: false,
            })
        }

        fn final_node(node: MmlNode) -> Box<dyn StackItem> {
            let mut item = Self {
                core: ItemCore::closed(),
                open: false,
                final_: true,
            };
            item.push_node(node);
            Box::new(item)
        }
    }

    impl StackItem for PlainItem {
        fn kind(&self) -> &'static str {
            "plain"
        }

        fn core(&self) -> &ItemCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut ItemCore {
            &mut self.core
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn is_final(&self) -> bool {
            self.final_
        }

        fn check_item(
            &mut self,
            options: &mut ParseOptions,
            incoming: Box<dyn StackItem>,
        ) -> ParseResult<CheckResult> {
            check_base(self, options, incoming)
        }
    }

    fn test_options() -> ParseOptions {
        let mut options = ParseOptions::default();
        options.node_factory.register("mrow", default_node);
        options.node_factory.register("mi", default_node);
        options
    }

    #[test]
    fn test_final_item_is_absorbed() {
        let mut options = test_options();
        let mut open = PlainItem::open();
        let node = MmlNode::new("mi");
        let result = open
            .check_item(&mut options, PlainItem::final_node(node.clone()))
            .unwrap();
        assert!(matches!(result, CheckResult::Absorbed));
        assert_eq!(open.nodes().len(), 1);
        assert!(open.nodes()[0].ptr_eq(&node));
    }

    #[test]
    fn test_unmatched_close_uses_registered_error() {
        struct CloseItem(ItemCore);
        impl StackItem for CloseItem {
            fn kind(&self) -> &'static str {
                "close"
            }
            fn core(&self) -> &ItemCore {
                &self.0
            }
            fn core_mut(&mut self) -> &mut ItemCore {
                &mut self.0
            }
            fn is_close(&self) -> bool {
                true
            }
            fn check_item(
                &mut self,
                options: &mut ParseOptions,
                incoming: Box<dyn StackItem>,
            ) -> ParseResult<CheckResult> {
                check_base(self, options, incoming)
            }
        }

        let mut options = test_options();
        let mut open = PlainItem::open();
        let err = open
            .check_item(&mut options, Box::new(CloseItem(ItemCore::closed())))
            .unwrap_err();
        assert_eq!(err.error_id(), Some("ExtraCloseMissingOpen"));
    }

    #[test]
    fn test_factory_collision_requires_override() {
        let mut factory = StackItemFactory::default();
        factory.register("plain", PlainItem::open, false).unwrap();
        let err = factory.register("plain", PlainItem::open, false).unwrap_err();
        assert_eq!(err.id, "StackItemCollision");
        factory.register("plain", PlainItem::open, true).unwrap();
    }

    #[test]
    fn test_unknown_item_kind() {
        let factory = StackItemFactory::default();
        assert_eq!(factory.create("mystery").unwrap_err().id, "BadStackItem");
    }

    #[test]
    fn test_debug_output_names_item_kinds() {
        let item: Box<dyn StackItem> = PlainItem::open();
        assert_eq!(format!("{item:?}"), "StackItem(plain)");
        assert_eq!(format!("{:?}", CheckResult::Absorbed), "Absorbed");
        assert_eq!(
            format!("{:?}", CheckResult::Push(PlainItem::open())),
            "Push(plain)"
        );
        assert_eq!(
            format!(
                "{:?}",
                CheckResult::Replace(vec![PlainItem::open(), PlainItem::open()])
            ),
            "Replace(plain, plain)"
        );
    }

    #[test]
    fn test_top_n_peeks_without_popping() {
        let mut options = test_options();
        options
            .item_factory
            .register("start", PlainItem::open, false)
            .unwrap();
        let mut stack = Stack::new(&mut options).unwrap();
        stack.push(&mut options, PlainItem::open()).unwrap();
        stack.push(&mut options, PlainItem::open()).unwrap();

        assert_eq!(stack.len(), 3);
        assert!(stack.top_n(1).unwrap().is_open());
        assert_eq!(stack.top_n(3).unwrap().kind(), "plain");
        assert!(stack.top_n(0).is_none());
        assert!(stack.top_n(4).is_none());
        assert_eq!(stack.len(), 3, "peeks do not disturb the stack");
    }
}
