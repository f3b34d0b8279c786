//! Parse methods of the base grammar: the functions token maps dispatch to.

use crate::error::{Interrupt, ParseResult, Retry, TexError};
use crate::configuration::{load_package, LoadResult};
use crate::parser::TexParser;
use crate::stack::StackItem;
use crate::token::Token;
use crate::token_map::TryParse;
use crate::types::Value;

fn token_attributes(token: &Token) -> Vec<(&str, Value)> {
    token.attributes().map(|(k, v)| (k, v.clone())).collect()
}

// ----- character methods --------------------------------------------------

/// A letter: an italic identifier.
pub fn variable(parser: &mut TexParser<'_>, token: &Token) -> ParseResult<TryParse> {
    let node = parser
        .options
        .node_factory
        .create_token("mi", token.text(), &token_attributes(token))?;
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

/// A digit (or decimal separator): greedily scans the whole number run. A
/// lone separator with no digit following defers to the character fallback,
/// which renders it as an operator.
pub fn digit(parser: &mut TexParser<'_>, token: &Token) -> ParseResult<TryParse> {
    let first = token.text().chars().next().unwrap_or('0');
    if matches!(first, '.' | ',')
        && !matches!(parser.peek_char(), Some(c) if c.is_ascii_digit())
    {
        return Ok(TryParse::Fallback);
    }
    let mut text = token.text().to_owned();
    loop {
        match parser.peek_char() {
            Some(c) if c.is_ascii_digit() => {
                text.push(c);
                parser.advance();
            }
            Some(c @ ('.' | ','))
                if matches!(parser.peek_at(1), Some(d) if d.is_ascii_digit()) =>
            {
                text.push(c);
                parser.advance();
            }
            _ => break,
        }
    }
    let node = parser.options.node_factory.create_token("mn", &text, &[])?;
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

/// Structural characters: groups, scripts, alignment, ties.
pub fn special(parser: &mut TexParser<'_>, token: &Token) -> ParseResult<TryParse> {
    match token.text() {
        "{" => {
            let item = parser.options.item_factory.create("open")?;
            parser.push_item(item)?;
        }
        "}" => {
            let item = parser.options.item_factory.create("close")?;
            parser.push_item(item)?;
        }
        "^" => push_script(parser, 2)?,
        "_" => push_script(parser, 1)?,
        "&" => {
            let mut item = parser.options.item_factory.create("cell")?;
            item.set_property("text", Value::from("&"));
            parser.push_item(item)?;
        }
        "~" => {
            let node = parser
                .options
                .node_factory
                .create_token("mtext", "\u{a0}", &[])?;
            parser.push_node(node)?;
        }
        _ => return Ok(TryParse::NotApplicable),
    }
    Ok(TryParse::Parsed)
}

fn push_script(parser: &mut TexParser<'_>, position: i64) -> ParseResult<()> {
    let base = parser.pop_prev_node();
    let mut item = parser.options.item_factory.create("subsup")?;
    item.set_property("position", Value::Int(position));
    if let Some(base) = base {
        item.set_node("base", base);
    }
    parser.push_item(item)
}

/// A named identifier symbol (`\alpha`, `\infty`).
pub fn math_identifier(parser: &mut TexParser<'_>, token: &Token) -> ParseResult<TryParse> {
    let node = parser
        .options
        .node_factory
        .create_token("mi", token.text(), &token_attributes(token))?;
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

/// A named operator symbol (`\pm`, `\times`).
pub fn math_operator(parser: &mut TexParser<'_>, token: &Token) -> ParseResult<TryParse> {
    let node = parser
        .options
        .node_factory
        .create_token("mo", token.text(), &token_attributes(token))?;
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

/// Character fallback: classify anything no map claimed. Whitespace is
/// dropped; letters and digits become identifiers and numbers; everything
/// else is an operator.
pub fn other(parser: &mut TexParser<'_>, token: &str) -> ParseResult<()> {
    let Some(c) = token.chars().next() else {
        return Ok(());
    };
    if c.is_whitespace() {
        return Ok(());
    }
    let kind = if c.is_alphabetic() {
        "mi"
    } else if c.is_ascii_digit() {
        "mn"
    } else {
        "mo"
    };
    let node = parser.options.node_factory.create_token(kind, token, &[])?;
    parser.push_node(node)?;
    Ok(())
}

// ----- macro methods ------------------------------------------------------

/// `\frac{num}{den}`.
pub fn frac(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let num = parser.parse_arg(name)?;
    let den = parser.parse_arg(name)?;
    let node = parser.options.node_factory.create("mfrac", &[], &[num, den])?;
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

/// `\over`: everything before it becomes the numerator, everything up to
/// the enclosing close becomes the denominator.
pub fn over(parser: &mut TexParser<'_>, _name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let item = parser.options.item_factory.create("over")?;
    parser.push_item(item)?;
    Ok(TryParse::Parsed)
}

/// `\sqrt[index]{radicand}`.
pub fn sqrt(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let index = parser.get_brackets(name)?;
    let radicand = parser.parse_arg(name)?;
    let node = match index {
        Some(index) => {
            let index = parser.sub_parse(&index)?;
            parser
                .options
                .node_factory
                .create("mroot", &[], &[radicand, index])?
        }
        None => parser.options.node_factory.create("msqrt", &[], &[radicand])?,
    };
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

/// `\left<delim>`.
pub fn left(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let delim = parser.get_delimiter(name)?;
    let mut item = parser.options.item_factory.create("left")?;
    item.set_property("delim", Value::from(delim));
    parser.push_item(item)?;
    Ok(TryParse::Parsed)
}

/// `\right<delim>`.
pub fn right(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let delim = parser.get_delimiter(name)?;
    let mut item = parser.options.item_factory.create("right")?;
    item.set_property("delim", Value::from(delim));
    parser.push_item(item)?;
    Ok(TryParse::Parsed)
}

/// `\begin{env}`: dispatch under the environment handler.
pub fn begin(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let env = parser.get_argument(name)?;
    parser.dispatch(crate::map_handler::HandlerType::Environment, &env)?;
    Ok(TryParse::Parsed)
}

/// `\end{env}`.
pub fn end(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let env = parser.get_argument(name)?;
    let mut item = parser.options.item_factory.create("end")?;
    item.set_property("name", Value::from(env));
    parser.push_item(item)?;
    Ok(TryParse::Parsed)
}

/// `\\`: a row break.
pub fn cr(parser: &mut TexParser<'_>, _name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let mut item = parser.options.item_factory.create("cell")?;
    item.set_property("linebreak", Value::Bool(true));
    item.set_property("text", Value::from("\\\\"));
    parser.push_item(item)?;
    Ok(TryParse::Parsed)
}

/// Fixed-width spacing macros; the width is the stored argument.
pub fn spacer(parser: &mut TexParser<'_>, _name: &str, args: &[Value]) -> ParseResult<TryParse> {
    let width = args.first().map_or_else(|| "0.2em".to_owned(), Value::to_string);
    let node = parser.options.node_factory.create("mspace", &[], &[])?;
    node.set_attribute("width", Value::from(width));
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

/// `\text{...}`: literal text content.
pub fn text(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let content = parser.get_argument(name)?;
    let node = parser.options.node_factory.create_token("mtext", &content, &[])?;
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

/// Style switches (`\mathrm`, `\mathbf`, ...); the math variant is the
/// stored argument.
pub fn math_style(parser: &mut TexParser<'_>, name: &str, args: &[Value]) -> ParseResult<TryParse> {
    let variant = args.first().map_or_else(|| "normal".to_owned(), Value::to_string);
    let inner = parser.parse_arg(name)?;
    let node = parser.options.node_factory.create("mstyle", &[], &[inner])?;
    node.set_attribute("mathvariant", Value::from(variant));
    parser.push_node(node)?;
    Ok(TryParse::Parsed)
}

/// `\tag{...}`: an explicit tag for the current expression.
pub fn tag(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let text = parser.get_argument(name)?;
    parser.options.tags.tag(&text);
    Ok(TryParse::Parsed)
}

/// `\label{...}`.
pub fn label(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let text = parser.get_argument(name)?;
    parser.options.tags.label(&text);
    Ok(TryParse::Parsed)
}

/// `\require{package}`: merge a package mid-parse. When the package carries
/// content that must retroactively apply, the parse is suspended and the
/// caller re-parses the identical input.
pub fn require(parser: &mut TexParser<'_>, name: &str, _args: &[Value]) -> ParseResult<TryParse> {
    let package = parser.get_argument(name)?;
    if package.is_empty() || !package.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(TexError::new("BadPackageName", "Invalid package name '%1'", &[&package]).into());
    }
    match load_package(parser.options, &package)? {
        LoadResult::AlreadyLoaded | LoadResult::Loaded(_) => Ok(TryParse::Parsed),
        LoadResult::Retry(packages) => Err(Interrupt::Retry(Retry { packages })),
    }
}

// ----- environment methods ------------------------------------------------

/// Alignment environments of the `matrix` family. The stored arguments are
/// the fence delimiters, when the variant has any.
pub fn matrix(
    parser: &mut TexParser<'_>,
    begin: Box<dyn StackItem>,
    _name: &str,
    args: &[Value],
) -> ParseResult<()> {
    let mut item = parser.options.item_factory.create("array")?;
    if let Some(name) = begin.get_property("name") {
        item.set_property("name", name);
    }
    if let Some(open) = args.first() {
        item.set_property("open", open.clone());
    }
    if let Some(close) = args.get(1) {
        item.set_property("close", close.clone());
    }
    parser.push_item(item)
}
