//! The `cancel` extension package: strike-through notations.
//!
//! Exercises the whole declarative extension surface: its own command map,
//! a node-constructor shadow for `menclose`, appended default options, a
//! postprocessor, and a priority above `base`. Because it carries a
//! postprocessor, loading it dynamically via `\require{cancel}` suspends
//! the in-progress parse for a retry.

use std::rc::Rc;

use crate::configuration::Configuration;
use crate::error::ParseResult;
use crate::map_handler::{HandlerType, MapHandler};
use crate::node::MmlNode;
use crate::node_factory::{default_node, NodeConstructor};
use crate::options::{OptionList, OptionValue};
use crate::parse_options::{ParseOptions, ProcessorFn};
use crate::parser::TexParser;
use crate::token_map::{CommandMap, TryParse};
use crate::types::Value;

fn cancel_enclose(parser: &mut TexParser<'_>, name: &str, args: &[Value]) -> ParseResult<TryParse> {
    let notation = args.first().map_or_else(|| "updiagonalstrike".to_owned(), Value::to_string);
    let inner = parser.parse_arg(name)?;
    let node = parser.options.node_factory.create("menclose", &[], &[inner])?;
    node.set_attribute("notation", Value::from(notation));
    parser.options.add_node("menclose", &node);
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

fn register_maps(registry: &mut MapHandler) {
    let mut macros = CommandMap::new("cancel-macros");
    macros.add_with_args(
        "cancel",
        cancel_enclose,
        vec![Value::from("updiagonalstrike")],
    );
    macros.add_with_args(
        "bcancel",
        cancel_enclose,
        vec![Value::from("downdiagonalstrike")],
    );
    macros.add_with_args(
        "xcancel",
        cancel_enclose,
        vec![Value::from("updiagonalstrike downdiagonalstrike")],
    );
    registry.register(Rc::new(macros));
}

/// `menclose` with the stroke width the package defaults to.
fn menclose_node(kind: &str, properties: &[(&str, Value)], children: &[MmlNode]) -> MmlNode {
    let node = default_node(kind, properties, children);
    node.set_attribute("data-thickness", Value::from("0.05em"));
    node
}

/// Merge directly nested enclosures into one node carrying the union of
/// their notations, so `\xcancel` and stacked `\cancel`/`\bcancel` render
/// identically.
fn combine_notations(options: &mut ParseOptions) -> ParseResult<()> {
    for node in options.get_list("menclose") {
        if node.len() != 1 {
            continue;
        }
        let Some(child) = node.child(0) else {
            continue;
        };
        if !child.is_kind("menclose") {
            continue;
        }
        let mut notations: Vec<String> = Vec::new();
        for value in [node.get_attribute("notation"), child.get_attribute("notation")] {
            for notation in value.map(|v| v.to_string()).unwrap_or_default().split_whitespace() {
                if !notations.iter().any(|n| n == notation) {
                    notations.push(notation.to_owned());
                }
            }
        }
        node.set_attribute("notation", Value::from(notations.join(" ")));
        node.remove_child(&child);
        for grandchild in child.children() {
            node.append_child(&grandchild);
        }
        options.remove_from_list("menclose", &[child]);
    }
    Ok(())
}

fn cancel_options() -> OptionList {
    let mut options = OptionList::default();
    options.insert(
        "packages".to_owned(),
        OptionValue::Append(vec![OptionValue::from("cancel")]),
    );
    options
}

/// The `cancel` configuration.
#[must_use]
pub fn config() -> Configuration {
    Configuration::builder()
        .name("cancel")
        .priority(20)
        .dependencies(vec!["base".to_owned()])
        .maps(register_maps)
        .handlers(vec![(HandlerType::Macro, vec!["cancel-macros"])])
        .nodes(vec![("menclose", menclose_node as NodeConstructor)])
        .options(cancel_options())
        .postprocessors(vec![(20, combine_notations as ProcessorFn)])
        .build()
}
