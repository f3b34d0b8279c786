//! The stack items of the base grammar.

use crate::error::{ParseResult, TexError};
use crate::node::MmlNode;
use crate::parse_options::ParseOptions;
use crate::stack::{check_base, nodes_to_mml, CheckResult, ItemCore, StackItem};
use crate::types::Value;

/// Bottom-of-stack item; absorbs the final `stop` and holds the root node.
pub struct StartItem(ItemCore);

impl StartItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::open()))
    }
}

impl StackItem for StartItem {
    fn kind(&self) -> &'static str {
        "start"
    }

    fn core(&self) -> &ItemCore {
        &self.0
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.0
    }

    fn is_open(&self) -> bool {
        true
    }

    fn check_item(
        &mut self,
        options: &mut ParseOptions,
        incoming: Box<dyn StackItem>,
    ) -> ParseResult<CheckResult> {
        if incoming.kind() == "stop" {
            let node = self.to_mml(options)?;
            self.push_node(node);
            self.set_property("stopped", Value::Bool(true));
            return Ok(CheckResult::Absorbed);
        }
        check_base(self, options, incoming)
    }
}

/// End-of-input marker.
pub struct StopItem(ItemCore);

impl StopItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::closed()))
    }
}

impl StackItem for StopItem {
    fn kind(&self) -> &'static str {
        "stop"
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

/// A completed subexpression carrying its produced node.
pub struct MmlItem(ItemCore);

impl MmlItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::closed()))
    }

    /// Convenience: an `mml` item already holding `node`.
    pub fn with_node(node: MmlNode) -> Box<dyn StackItem> {
        let mut item = Self(ItemCore::closed());
        item.push_node(node);
        Box::new(item)
    }
}

impl StackItem for MmlItem {
    fn kind(&self) -> &'static str {
        "mml"
    }

    fn core(&self) -> &ItemCore {
        &self.0
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.0
    }

    fn is_final(&self) -> bool {
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

/// Brace group opened by `{`.
pub struct OpenItem(ItemCore);

impl OpenItem {
    pub fn create() -> Box<dyn StackItem> {
        let mut core = ItemCore::open();
        core.set_error(
            "stop",
            TexError::new("ExtraOpenMissingClose", "Extra open brace or missing close brace", &[]),
        );
        Box::new(Self(core))
    }
}

impl StackItem for OpenItem {
    fn kind(&self) -> &'static str {
        "open"
    }

    fn core(&self) -> &ItemCore {
        &self.0
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.0
    }

    fn is_open(&self) -> bool {
        true
    }

    fn check_item(
        &mut self,
        options: &mut ParseOptions,
        incoming: Box<dyn StackItem>,
    ) -> ParseResult<CheckResult> {
        if incoming.kind() == "close" {
            let node = self.to_mml(options)?;
            return Ok(CheckResult::Replace(vec![MmlItem::with_node(node)]));
        }
        check_base(self, options, incoming)
    }
}

/// Brace group closed by `}`.
pub struct CloseItem(ItemCore);

impl CloseItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::closed()))
    }
}

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

/// Script accumulator created by `^` or `_`. Holds the base node in the
/// `base` slot and the script position (1 = subscript, 2 = superscript) in
/// the `position` property; the next completed subexpression becomes the
/// script.
pub struct SubsupItem(ItemCore);

impl SubsupItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::closed()))
    }

    fn position(&self) -> usize {
        self.get_property("position")
            .and_then(|v| v.as_int())
            .map_or(2, |i| i.unsigned_abs() as usize)
    }
}

impl StackItem for SubsupItem {
    fn kind(&self) -> &'static str {
        "subsup"
    }

    fn core(&self) -> &ItemCore {
        &self.0
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.0
    }

    fn check_item(
        &mut self,
        options: &mut ParseOptions,
        mut incoming: Box<dyn StackItem>,
    ) -> ParseResult<CheckResult> {
        if incoming.is_final() {
            let script = nodes_to_mml(&options.node_factory, incoming.take_nodes())?;
            let position = self.position();
            let base = match self.take_node("base") {
                Some(base) => base,
                None => options.node_factory.create("mrow", &[], &[])?,
            };
            let node = if base.is_kind("msubsup") {
                let slot = base.child(position).ok_or_else(missing_script)?;
                if !slot.is_kind("none") {
                    return Err(if position == 1 {
                        TexError::new(
                            "DoubleSubscript",
                            "Double subscript: use braces to clarify",
                            &[],
                        )
                        .into()
                    } else {
                        TexError::new(
                            "DoubleExponent",
                            "Double exponent: use braces to clarify",
                            &[],
                        )
                        .into()
                    });
                }
                base.replace_child(&slot, &script);
                base
            } else {
                let none_sub = options.node_factory.create("none", &[], &[])?;
                let none_sup = options.node_factory.create("none", &[], &[])?;
                let children = if position == 1 {
                    [base, script, none_sup]
                } else {
                    [base, none_sub, script]
                };
                let node = options.node_factory.create("msubsup", &[], &children)?;
                options.add_node("msubsup", &node);
                node
            };
            return Ok(CheckResult::Replace(vec![MmlItem::with_node(node)]));
        }
        if incoming.is_close() {
            return Err(missing_script().into());
        }
        check_base(self, options, incoming)
    }
}

fn missing_script() -> TexError {
    TexError::new("MissingScript", "Missing superscript or subscript argument", &[])
}

/// Fraction-in-progress created by `\over`. The numerator (everything the
/// enclosing scope had accumulated) is stored in the `num` slot by the
/// generic transition; the denominator accumulates here until the scope
/// closes.
pub struct OverItem(ItemCore);

impl OverItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::closed()))
    }
}

impl StackItem for OverItem {
    fn kind(&self) -> &'static str {
        "over"
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
        if incoming.kind() == "over" {
            return Err(
                TexError::new("AmbiguousUseOf", "Ambiguous use of \\over", &[]).into(),
            );
        }
        if incoming.is_close() {
            let num = match self.take_node("num") {
                Some(num) => num,
                None => options.node_factory.create("mrow", &[], &[])?,
            };
            let den = self.to_mml(options)?;
            let frac = options.node_factory.create("mfrac", &[], &[num, den])?;
            return Ok(CheckResult::Replace(vec![MmlItem::with_node(frac), incoming]));
        }
        check_base(self, options, incoming)
    }
}

/// Sized-fence group opened by `\left`; the delimiter is in the `delim`
/// property.
pub struct LeftItem(ItemCore);

impl LeftItem {
    pub fn create() -> Box<dyn StackItem> {
        let mut core = ItemCore::open();
        core.set_error(
            "stop",
            TexError::new("ExtraLeftMissingRight", "Extra \\left or missing \\right", &[]),
        );
        Box::new(Self(core))
    }
}

impl StackItem for LeftItem {
    fn kind(&self) -> &'static str {
        "left"
    }

    fn core(&self) -> &ItemCore {
        &self.0
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.0
    }

    fn is_open(&self) -> bool {
        true
    }

    fn check_item(
        &mut self,
        options: &mut ParseOptions,
        incoming: Box<dyn StackItem>,
    ) -> ParseResult<CheckResult> {
        if incoming.kind() == "right" {
            let inner = self.to_mml(options)?;
            let mut children = Vec::with_capacity(3);
            if let Some(fence) = fence_node(options, self.get_property("delim"))? {
                children.push(fence);
            }
            children.push(inner);
            if let Some(fence) = fence_node(options, incoming.get_property("delim"))? {
                children.push(fence);
            }
            let row = options.node_factory.create("mrow", &[], &children)?;
            return Ok(CheckResult::Replace(vec![MmlItem::with_node(row)]));
        }
        check_base(self, options, incoming)
    }
}

fn fence_node(options: &mut ParseOptions, delim: Option<Value>) -> ParseResult<Option<MmlNode>> {
    let Some(delim) = delim else {
        return Ok(None);
    };
    let text = delim.to_string();
    if text.is_empty() {
        return Ok(None);
    }
    let node = options.node_factory.create_token(
        "mo",
        &text,
        &[("fence", Value::Bool(true)), ("stretchy", Value::Bool(true))],
    )?;
    Ok(Some(node))
}

/// Fence closer produced by `\right`; the delimiter is in the `delim`
/// property.
pub struct RightItem(ItemCore);

impl RightItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::closed()))
    }
}

impl StackItem for RightItem {
    fn kind(&self) -> &'static str {
        "right"
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

/// Environment scope opened by `\begin{name}` for environments without
/// their own item; closed by the matching `\end`.
pub struct BeginItem(ItemCore);

impl BeginItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::open()))
    }

    fn name(&self) -> String {
        self.get_property("name").map(|v| v.to_string()).unwrap_or_default()
    }
}

impl StackItem for BeginItem {
    fn kind(&self) -> &'static str {
        "begin"
    }

    fn core(&self) -> &ItemCore {
        &self.0
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.0
    }

    fn is_open(&self) -> bool {
        true
    }

    fn check_item(
        &mut self,
        options: &mut ParseOptions,
        incoming: Box<dyn StackItem>,
    ) -> ParseResult<CheckResult> {
        if incoming.kind() == "end" {
            let end_name = incoming.get_property("name").map(|v| v.to_string()).unwrap_or_default();
            let name = self.name();
            if end_name != name {
                return Err(TexError::new(
                    "EnvBadEnd",
                    "\\begin{%1} ended with \\end{%2}",
                    &[&name, &end_name],
                )
                .into());
            }
            let node = self.to_mml(options)?;
            return Ok(CheckResult::Replace(vec![MmlItem::with_node(node)]));
        }
        if incoming.kind() == "stop" {
            return Err(TexError::new(
                "ExtraOpenMissingClose",
                "Missing \\end{%1}",
                &[&self.name()],
            )
            .into());
        }
        check_base(self, options, incoming)
    }
}

/// Environment closer produced by `\end{name}`.
pub struct EndItem(ItemCore);

impl EndItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::closed()))
    }
}

impl StackItem for EndItem {
    fn kind(&self) -> &'static str {
        "end"
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

/// Alignment marker produced by `&` (plain) or `\\` (with the `linebreak`
/// property). Outside an array a line break is absorbed silently and a
/// plain alignment tab is a `Misplaced` error; inside an array the array
/// item consumes it.
pub struct CellItem(ItemCore);

impl CellItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self(ItemCore::closed()))
    }
}

impl StackItem for CellItem {
    fn kind(&self) -> &'static str {
        "cell"
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

/// Table scope for alignment environments (`matrix`, `pmatrix`). Collects
/// cells into rows and rows into an `mtable`, optionally wrapped in fences
/// taken from the `open`/`close` properties.
pub struct ArrayItem {
    core: ItemCore,
    rows: Vec<MmlNode>,
    cells: Vec<MmlNode>,
}

impl ArrayItem {
    pub fn create() -> Box<dyn StackItem> {
        Box::new(Self {
            core: ItemCore::open(),
            rows: Vec::new(),
            cells: Vec::new(),
        })
    }

    fn name(&self) -> String {
        self.get_property("name").map(|v| v.to_string()).unwrap_or_default()
    }

    fn end_cell(&mut self, options: &mut ParseOptions) -> ParseResult<()> {
        let content = nodes_to_mml(&options.node_factory, self.take_nodes())?;
        let cell = options.node_factory.create("mtd", &[], &[content])?;
        self.cells.push(cell);
        Ok(())
    }

    fn end_row(&mut self, options: &mut ParseOptions) -> ParseResult<()> {
        let cells = core::mem::take(&mut self.cells);
        let row = options.node_factory.create("mtr", &[], &cells)?;
        self.rows.push(row);
        Ok(())
    }

    fn table(&mut self, options: &mut ParseOptions) -> ParseResult<MmlNode> {
        if !self.nodes().is_empty() || !self.cells.is_empty() {
            self.end_cell(options)?;
            self.end_row(options)?;
        }
        let rows = core::mem::take(&mut self.rows);
        let table = options.node_factory.create("mtable", &[], &rows)?;
        let mut children = Vec::with_capacity(3);
        if let Some(fence) = fence_node(options, self.get_property("open"))? {
            children.push(fence);
        }
        children.push(table);
        if let Some(fence) = fence_node(options, self.get_property("close"))? {
            children.push(fence);
        }
        if children.len() == 1 {
            return Ok(children.remove(0));
        }
        Ok(options.node_factory.create("mrow", &[], &children)?)
    }
}

impl StackItem for ArrayItem {
    fn kind(&self) -> &'static str {
        "array"
    }

    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }

    fn is_open(&self) -> bool {
        true
    }

    fn check_item(
        &mut self,
        options: &mut ParseOptions,
        incoming: Box<dyn StackItem>,
    ) -> ParseResult<CheckResult> {
        if incoming.kind() == "cell" {
            self.end_cell(options)?;
            if incoming.get_property("linebreak").is_some() {
                self.end_row(options)?;
            }
            return Ok(CheckResult::Absorbed);
        }
        if incoming.kind() == "end" {
            let end_name = incoming.get_property("name").map(|v| v.to_string()).unwrap_or_default();
            let name = self.name();
            if end_name != name {
                return Err(TexError::new(
                    "EnvBadEnd",
                    "\\begin{%1} ended with \\end{%2}",
                    &[&name, &end_name],
                )
                .into());
            }
            let node = self.table(options)?;
            return Ok(CheckResult::Replace(vec![MmlItem::with_node(node)]));
        }
        if incoming.kind() == "stop" {
            return Err(TexError::new(
                "ExtraOpenMissingClose",
                "Missing \\end{%1}",
                &[&self.name()],
            )
            .into());
        }
        check_base(self, options, incoming)
    }
}
