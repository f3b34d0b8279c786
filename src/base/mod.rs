//! The `base` package: the working TeX math grammar.
//!
//! Everything here goes through the declarative package surface: token
//! maps, handler entries, item and node constructors, default options, tag
//! schemes and a postprocessor, exactly the way an external package would
//! extend the parser.

pub mod items;
pub mod methods;

use std::rc::Rc;

use phf::phf_map;

use crate::configuration::Configuration;
use crate::error::ParseResult;
use crate::map_handler::{FallbackMethod, HandlerType, MapHandler};
use crate::node_factory::{default_node, NodeConstructor};
use crate::options::{OptionList, OptionValue};
use crate::parse_options::{ParseOptions, ProcessorFn};
use crate::tags::TagScheme;
use crate::token::Token;
use crate::token_map::{CharacterMap, CommandMap, DelimiterMap, EnvironmentMap, RegExpMap};
use crate::types::Value;

/// Named identifier symbols, rendered as `mi`.
static IDENTIFIERS: phf::Map<&'static str, &'static str> = phf_map! {
    "alpha" => "\u{03b1}", "beta" => "\u{03b2}", "gamma" => "\u{03b3}",
    "delta" => "\u{03b4}", "epsilon" => "\u{03b5}", "zeta" => "\u{03b6}",
    "eta" => "\u{03b7}", "theta" => "\u{03b8}", "iota" => "\u{03b9}",
    "kappa" => "\u{03ba}", "lambda" => "\u{03bb}", "mu" => "\u{03bc}",
    "nu" => "\u{03bd}", "xi" => "\u{03be}", "pi" => "\u{03c0}",
    "rho" => "\u{03c1}", "sigma" => "\u{03c3}", "tau" => "\u{03c4}",
    "upsilon" => "\u{03c5}", "phi" => "\u{03c6}", "chi" => "\u{03c7}",
    "psi" => "\u{03c8}", "omega" => "\u{03c9}",
    "infty" => "\u{221e}", "partial" => "\u{2202}", "ell" => "\u{2113}",
};

/// Named operator symbols, rendered as `mo`.
static OPERATORS: phf::Map<&'static str, &'static str> = phf_map! {
    "pm" => "\u{00b1}", "mp" => "\u{2213}", "times" => "\u{00d7}",
    "div" => "\u{00f7}", "cdot" => "\u{22c5}", "ast" => "\u{2217}",
    "cap" => "\u{2229}", "cup" => "\u{222a}", "leq" => "\u{2264}",
    "geq" => "\u{2265}", "neq" => "\u{2260}", "equiv" => "\u{2261}",
    "approx" => "\u{2248}", "to" => "\u{2192}", "gets" => "\u{2190}",
    "in" => "\u{2208}", "subset" => "\u{2282}",
    "sum" => "\u{2211}", "prod" => "\u{220f}", "int" => "\u{222b}",
    "langle" => "\u{27e8}", "rangle" => "\u{27e9}",
    "vert" => "|", "Vert" => "\u{2016}",
    "lbrace" => "{", "rbrace" => "}",
};

/// Delimiters usable with `\left`/`\right`, keyed the way the scanner
/// produces them (single characters, or full control sequences with the
/// leading backslash).
static DELIMITERS: phf::Map<&'static str, &'static str> = phf_map! {
    "(" => "(", ")" => ")", "[" => "[", "]" => "]", "|" => "|",
    "\\{" => "{", "\\}" => "}",
    "\\langle" => "\u{27e8}", "\\rangle" => "\u{27e9}",
    "\\vert" => "|", "\\Vert" => "\u{2016}",
    "\\lbrace" => "{", "\\rbrace" => "}",
};

fn register_maps(registry: &mut MapHandler) {
    let mut special = CharacterMap::new("special", methods::special);
    special.add_all(["{", "}", "^", "_", "&", "~"].map(|c| Token::new(c, c)));
    registry.register(Rc::new(special));

    // The "letter" map is built from the identifierPattern option in the
    // init callback instead.
    registry.register(Rc::new(
        RegExpMap::new("digit", "[0-9.,]", methods::digit).expect("static pattern"),
    ));

    let mut identifiers = CharacterMap::new("mathchar0mi", methods::math_identifier);
    identifiers.add_all(
        IDENTIFIERS
            .entries()
            .map(|(name, text)| Token::new(name, text)),
    );
    registry.register(Rc::new(identifiers));

    let mut operators = CharacterMap::new("mathchar0mo", methods::math_operator);
    operators.add_all(OPERATORS.entries().map(|(name, text)| {
        if matches!(*name, "sum" | "prod" | "int") {
            Token::with_attributes(name, text, &[("largeop", Value::Bool(true))])
        } else {
            Token::new(name, text)
        }
    }));
    registry.register(Rc::new(operators));

    let mut delimiter = DelimiterMap::new("delimiter", methods::math_operator);
    delimiter.add_all(
        DELIMITERS
            .entries()
            .map(|(name, text)| Token::new(name, text)),
    );
    registry.register(Rc::new(delimiter));

    let mut macros = CommandMap::new("macros");
    macros.add("frac", methods::frac);
    macros.add("over", methods::over);
    macros.add("sqrt", methods::sqrt);
    macros.add("left", methods::left);
    macros.add("right", methods::right);
    macros.add("begin", methods::begin);
    macros.add("end", methods::end);
    macros.add("\\", methods::cr);
    macros.add("text", methods::text);
    macros.add("tag", methods::tag);
    macros.add("label", methods::label);
    macros.add("require", methods::require);
    macros.add_with_args(",", methods::spacer, vec![Value::from("0.167em")]);
    macros.add_with_args(";", methods::spacer, vec![Value::from("0.278em")]);
    macros.add_with_args("!", methods::spacer, vec![Value::from("-0.167em")]);
    macros.add_with_args("quad", methods::spacer, vec![Value::from("1em")]);
    macros.add_with_args("qquad", methods::spacer, vec![Value::from("2em")]);
    macros.add_with_args("mathrm", methods::math_style, vec![Value::from("normal")]);
    macros.add_with_args("mathbf", methods::math_style, vec![Value::from("bold")]);
    macros.add_with_args("mathit", methods::math_style, vec![Value::from("italic")]);
    registry.register(Rc::new(macros));

    let mut environments = EnvironmentMap::new("environment");
    environments.add("matrix", methods::matrix, vec![]);
    environments.add(
        "pmatrix",
        methods::matrix,
        vec![Value::from("("), Value::from(")")],
    );
    environments.add(
        "bmatrix",
        methods::matrix,
        vec![Value::from("["), Value::from("]")],
    );
    environments.add(
        "vmatrix",
        methods::matrix,
        vec![Value::from("|"), Value::from("|")],
    );
    registry.register(Rc::new(environments));
}

fn base_options() -> OptionList {
    let mut options = OptionList::default();
    options.insert("tags".to_owned(), OptionValue::from("none"));
    options.insert("identifierPattern".to_owned(), OptionValue::from("[a-zA-Z]"));
    options.insert(
        "packages".to_owned(),
        OptionValue::List(vec![OptionValue::from("base")]),
    );
    options
}

/// Build the `letter` map from the merged `identifierPattern` option and
/// put it into the character scan after the structural maps. Registering it
/// here, rather than statically, lets a caller widen the identifier
/// alphabet by option.
fn base_init(options: &mut ParseOptions) -> ParseResult<()> {
    let pattern = options
        .options
        .get("identifierPattern")
        .and_then(OptionValue::as_str)
        .unwrap_or("[a-zA-Z]")
        .to_owned();
    let letter = RegExpMap::new("letter", &pattern, methods::variable)?;
    options.configuration.map_handler.register(Rc::new(letter));
    options
        .handlers
        .get_mut(HandlerType::Character)
        .add(&["letter"], &options.configuration.map_handler, 5);
    Ok(())
}

/// Collapse `msubsup` nodes with an empty script slot into `msub`/`msup`.
/// Runs over the deferred `msubsup` node list once the tree is complete.
fn clean_sub_sup(options: &mut ParseOptions) -> ParseResult<()> {
    let nodes = options.get_list("msubsup");
    for node in nodes {
        let Some(parent) = node.parent() else {
            continue;
        };
        let (Some(base), Some(sub), Some(sup)) = (node.child(0), node.child(1), node.child(2))
        else {
            continue;
        };
        let replacement = match (sub.is_kind("none"), sup.is_kind("none")) {
            (false, false) => continue,
            (true, false) => options.node_factory.create("msup", &[], &[base, sup])?,
            (false, true) => options.node_factory.create("msub", &[], &[base, sub])?,
            (true, true) => base,
        };
        parent.replace_child(&node, &replacement);
        options.remove_from_list("msubsup", &[node]);
    }
    Ok(())
}

/// The node kinds the base grammar produces.
const NODE_KINDS: [&str; 18] = [
    "math", "mrow", "mi", "mn", "mo", "mtext", "mspace", "mfrac", "msqrt", "mroot", "msub",
    "msup", "msubsup", "none", "mtable", "mtr", "mtd", "mstyle",
];

/// The `base` configuration.
#[must_use]
pub fn config() -> Configuration {
    Configuration::builder()
        .name("base")
        .priority(0)
        .maps(register_maps)
        .handlers(vec![
            (HandlerType::Character, vec!["special", "digit"]),
            (HandlerType::Delimiter, vec!["delimiter"]),
            (HandlerType::Macro, vec!["macros", "mathchar0mi", "mathchar0mo"]),
            (HandlerType::Environment, vec!["environment"]),
        ])
        .fallbacks(vec![(HandlerType::Character, methods::other as FallbackMethod)])
        .items(vec![
            ("start", items::StartItem::create, false),
            ("stop", items::StopItem::create, false),
            ("mml", items::MmlItem::create, false),
            ("open", items::OpenItem::create, false),
            ("close", items::CloseItem::create, false),
            ("subsup", items::SubsupItem::create, false),
            ("over", items::OverItem::create, false),
            ("left", items::LeftItem::create, false),
            ("right", items::RightItem::create, false),
            ("begin", items::BeginItem::create, false),
            ("end", items::EndItem::create, false),
            ("cell", items::CellItem::create, false),
            ("array", items::ArrayItem::create, false),
        ])
        .nodes(
            NODE_KINDS
                .iter()
                .map(|kind| (*kind, default_node as NodeConstructor))
                .collect(),
        )
        .options(base_options())
        .tag_schemes(vec![("none", TagScheme::None), ("all", TagScheme::All)])
        .postprocessors(vec![(10, clean_sub_sup as ProcessorFn)])
        .init(base_init)
        .build()
}
