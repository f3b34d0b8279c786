//! The driver: consumes the input string left to right, dispatches tokens
//! through the handlers, and reduces the stack to one root node.
//!
//! A control sequence (backslash followed by letters, or by one non-letter
//! character) dispatches under the macro handler type; any other character
//! dispatches under the character handler type. There is no backtracking:
//! every token is consumed exactly once, and argument-scanning utilities
//! ([`TexParser::get_argument`] and friends) work directly on the remaining
//! input.

use crate::error::{ParseResult, TexError};
use crate::map_handler::HandlerType;
use crate::node::MmlNode;
use crate::parse_options::ParseOptions;
use crate::stack::{Stack, StackItem};
use crate::token_map::TryParse;
use crate::types::Value;

/// One parse of one input string. Nested sub-parses (macro arguments) create
/// a fresh `TexParser` over the same [`ParseOptions`] and unwind strictly
/// LIFO before the outer parse resumes.
pub struct TexParser<'a> {
    /// The shared per-run state.
    pub options: &'a mut ParseOptions,
    input: Vec<char>,
    position: usize,
    stack: Stack,
}

impl<'a> TexParser<'a> {
    /// Set up a parser over `input`.
    ///
    /// # Errors
    ///
    /// `BadStackItem` when the active configuration registered no `start`
    /// item.
    pub fn new(input: &str, options: &'a mut ParseOptions) -> ParseResult<Self> {
        let stack = Stack::new(options)?;
        Ok(Self {
            options,
            input: input.chars().collect(),
            position: 0,
            stack,
        })
    }

    /// Run the parse to completion and return the produced node.
    pub fn parse(&mut self) -> ParseResult<MmlNode> {
        let text: String = self.input.iter().collect();
        self.options.push_parser(&text);
        while let Some(c) = self.next_char() {
            if c == '\\' {
                let name = self.get_cs()?;
                self.dispatch(HandlerType::Macro, &name)?;
            } else {
                self.dispatch(HandlerType::Character, &c.to_string())?;
            }
        }
        let stop = self.options.item_factory.create("stop")?;
        self.push_item(stop)?;
        let node = self.stack.finalize()?;
        self.options.pop_parser();
        Ok(node)
    }

    /// Dispatch one token through the handler of the given type: first
    /// applicable map wins; a [`TryParse::Fallback`] sentinel short-circuits
    /// to the type's fallback.
    pub fn dispatch(&mut self, kind: HandlerType, token: &str) -> ParseResult<()> {
        let (maps, fallback) = self.options.handlers.get(kind).snapshot();
        for map in maps {
            match map.parse(self, token)? {
                TryParse::Parsed => return Ok(()),
                TryParse::NotApplicable => {}
                TryParse::Fallback => break,
            }
        }
        if let Some(fallback) = fallback {
            return fallback(self, token);
        }
        Err(match kind {
            HandlerType::Macro => TexError::new(
                "UndefinedControlSequence",
                "Undefined control sequence \\%1",
                &[token],
            ),
            HandlerType::Character => {
                TexError::new("UnexpectedCharacter", "Unexpected character '%1'", &[token])
            }
            HandlerType::Environment => {
                TexError::new("UnknownEnvironment", "Unknown environment '%1'", &[token])
            }
            HandlerType::Delimiter => TexError::new(
                "MissingOrUnrecognizedDelim",
                "Missing or unrecognized delimiter '%1'",
                &[token],
            ),
        }
        .into())
    }

    /// Push a stack item, running the usual transitions.
    pub fn push_item(&mut self, item: Box<dyn StackItem>) -> ParseResult<()> {
        self.stack.push(&mut *self.options, item)
    }

    /// Wrap a completed node in an `mml` item and push it.
    pub fn push_node(&mut self, node: MmlNode) -> ParseResult<()> {
        let mut item = self.options.item_factory.create("mml")?;
        item.push_node(node);
        self.push_item(item)
    }

    /// Remove and return the node most recently accumulated by the current
    /// top item (the script base for `^`/`_`).
    pub fn pop_prev_node(&mut self) -> Option<MmlNode> {
        self.stack.top_mut()?.pop_node()
    }

    /// Read-only view of the stack, for lookahead decisions.
    #[must_use]
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Mutable access to the current top item.
    pub fn top_item_mut(&mut self) -> Option<&mut Box<dyn StackItem>> {
        self.stack.top_mut()
    }

    /// Parse `text` as an independent sub-expression over the same state.
    pub fn sub_parse(&mut self, text: &str) -> ParseResult<MmlNode> {
        let mut parser = TexParser::new(text, &mut *self.options)?;
        parser.parse()
    }

    /// Scan a brace-delimited (or single-token) argument and parse it.
    pub fn parse_arg(&mut self, name: &str) -> ParseResult<MmlNode> {
        let text = self.get_argument(name)?;
        self.sub_parse(&text)
    }

    // ----- input scanning -------------------------------------------------

    fn next_char(&mut self) -> Option<char> {
        let c = self.input.get(self.position).copied()?;
        self.position += 1;
        Some(c)
    }

    /// The next character, without consuming it.
    #[must_use]
    pub fn peek_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// The character `offset` positions past the next one, without
    /// consuming anything.
    #[must_use]
    pub fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    /// Consume one character.
    pub fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    /// Consume characters while `pred` holds, returning the consumed run.
    pub fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.position += 1;
        }
        out
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.position += 1;
        }
    }

    /// Skip spaces and peek at the next meaningful character.
    pub fn get_next(&mut self) -> Option<char> {
        self.skip_spaces();
        self.peek_char()
    }

    /// Scan a control-sequence name (the backslash is already consumed):
    /// a maximal run of letters, or one non-letter character. Spaces after
    /// a multi-letter name are skipped.
    pub fn get_cs(&mut self) -> ParseResult<String> {
        match self.peek_char() {
            None => Err(TexError::new(
                "UnexpectedCharacter",
                "Unexpected end of input after '\\'",
                &[],
            )
            .into()),
            Some(c) if c.is_ascii_alphabetic() => {
                let name = self.take_while(|c| c.is_ascii_alphabetic());
                self.skip_spaces();
                Ok(name)
            }
            Some(c) => {
                self.position += 1;
                Ok(c.to_string())
            }
        }
    }

    /// Scan one required argument for the command `name`: a brace-balanced
    /// group, a control sequence, or a single character.
    pub fn get_argument(&mut self, name: &str) -> ParseResult<String> {
        match self.get_next() {
            None => Err(TexError::new(
                "MissingArgFor",
                "Missing argument for \\%1",
                &[name],
            )
            .into()),
            Some('{') => {
                self.position += 1;
                self.scan_group(name)
            }
            Some('\\') => {
                self.position += 1;
                Ok(format!("\\{}", self.get_cs()?))
            }
            Some(c) => {
                self.position += 1;
                Ok(c.to_string())
            }
        }
    }

    /// Scan an optional bracketed argument for the command `name`.
    pub fn get_brackets(&mut self, name: &str) -> ParseResult<Option<String>> {
        if self.get_next() != Some('[') {
            return Ok(None);
        }
        self.position += 1;
        let mut depth = 0usize;
        let mut out = String::new();
        while let Some(c) = self.next_char() {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(next) = self.next_char() {
                        out.push(next);
                    }
                }
                '{' => {
                    depth += 1;
                    out.push(c);
                }
                '}' => {
                    depth = depth.saturating_sub(1);
                    out.push(c);
                }
                ']' if depth == 0 => return Ok(Some(out)),
                _ => out.push(c),
            }
        }
        Err(TexError::new(
            "MissingCloseBracket",
            "Could not find closing ']' for argument to \\%1",
            &[name],
        )
        .into())
    }

    /// Scan a delimiter token for `\left`/`\right` and resolve it through
    /// the delimiter handler. A lone `.` is the empty delimiter.
    pub fn get_delimiter(&mut self, name: &str) -> ParseResult<String> {
        let token = match self.get_next() {
            None => String::new(),
            Some('\\') => {
                self.position += 1;
                format!("\\{}", self.get_cs()?)
            }
            Some(c) => {
                self.position += 1;
                c.to_string()
            }
        };
        if token == "." {
            return Ok(String::new());
        }
        if let Some(crate::token_map::Found::Symbol(symbol)) =
            self.options.handlers.get(HandlerType::Delimiter).lookup(&token)
        {
            return Ok(symbol.text().to_owned());
        }
        Err(TexError::new(
            "MissingOrUnrecognizedDelim",
            "Missing or unrecognized delimiter for \\%1",
            &[name],
        )
        .into())
    }

    fn scan_group(&mut self, name: &str) -> ParseResult<String> {
        let mut depth = 0usize;
        let mut out = String::new();
        while let Some(c) = self.next_char() {
            match c {
                '\\' => {
                    out.push(c);
                    if let Some(next) = self.next_char() {
                        out.push(next);
                    }
                }
                '{' => {
                    depth += 1;
                    out.push(c);
                }
                '}' => {
                    if depth == 0 {
                        return Ok(out);
                    }
                    depth -= 1;
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
        Err(TexError::new(
            "MissingCloseBrace",
            "Missing close brace in argument to \\%1",
            &[name],
        )
        .into())
    }
}

/// Parse one top-level expression into a `math` root node.
///
/// Clears the ephemeral per-parse state first, runs the registered
/// preprocessors, parses, wraps the result in a `math` node (tagged when the
/// tags object produces a tag), sets `options.root`, and runs the
/// postprocessors.
///
/// An `Interrupt::Retry` outcome means a package was merged mid-parse: the
/// caller should re-invoke with the identical input.
pub fn parse(input: &str, options: &mut ParseOptions) -> ParseResult<MmlNode> {
    options.clear();
    match parse_unit(input, options) {
        Ok(node) => Ok(node),
        Err(interrupt) => {
            if !interrupt.is_retry() {
                options.error = true;
            }
            Err(interrupt)
        }
    }
}

fn parse_unit(input: &str, options: &mut ParseOptions) -> ParseResult<MmlNode> {
    options.run_preprocessors()?;
    let node = {
        let mut parser = TexParser::new(input, options)?;
        parser.parse()?
    };
    let math = options.node_factory.create("math", &[], &[node])?;
    if let Some(tag) = options.tags.make_tag() {
        math.set_attribute("data-tag", Value::from(tag));
    }
    options.root = Some(math.clone());
    options.run_postprocessors()?;
    Ok(math)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_factory::default_node;
    use crate::stack::{check_base, CheckResult, ItemCore, StackItemFactory};

    struct StartItem(ItemCore);
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
            check_base(self, options, incoming)
        }
    }

    fn scan_options() -> ParseOptions {
        let mut options = ParseOptions::default();
        let mut factory = StackItemFactory::default();
        factory
            .register("start", || Box::new(StartItem(ItemCore::open())), false)
            .unwrap();
        options.item_factory = factory;
        options.node_factory.register("mrow", default_node);
        options
    }

    #[test]
    fn test_get_argument_forms() {
        let mut options = scan_options();
        let mut parser = TexParser::new("{a+b} x \\alpha", &mut options).unwrap();
        assert_eq!(parser.get_argument("frac").unwrap(), "a+b");
        assert_eq!(parser.get_argument("frac").unwrap(), "x");
        assert_eq!(parser.get_argument("frac").unwrap(), "\\alpha");
        let err = parser.get_argument("frac").unwrap_err();
        assert_eq!(err.error_id(), Some("MissingArgFor"));
    }

    #[test]
    fn test_get_argument_nested_groups() {
        let mut options = scan_options();
        let mut parser = TexParser::new("{a{b}\\}c}", &mut options).unwrap();
        assert_eq!(parser.get_argument("x").unwrap(), "a{b}\\}c");
    }

    #[test]
    fn test_unterminated_group_argument() {
        let mut options = scan_options();
        let mut parser = TexParser::new("{a+b", &mut options).unwrap();
        let err = parser.get_argument("x").unwrap_err();
        assert_eq!(err.error_id(), Some("MissingCloseBrace"));
    }

    #[test]
    fn test_get_brackets() {
        let mut options = scan_options();
        let mut parser = TexParser::new("[3]{x} {y}", &mut options).unwrap();
        assert_eq!(parser.get_brackets("sqrt").unwrap(), Some("3".to_owned()));
        assert_eq!(parser.get_argument("sqrt").unwrap(), "x");
        assert_eq!(parser.get_brackets("sqrt").unwrap(), None);
        assert_eq!(parser.get_argument("sqrt").unwrap(), "y");
    }

    #[test]
    fn test_get_cs_scans_letter_runs() {
        let mut options = scan_options();
        let mut parser = TexParser::new("alpha 2", &mut options).unwrap();
        assert_eq!(parser.get_cs().unwrap(), "alpha");
        // trailing spaces after a multi-letter name are consumed
        assert_eq!(parser.peek_char(), Some('2'));

        let mut parser = TexParser::new(",x", &mut options).unwrap();
        assert_eq!(parser.get_cs().unwrap(), ",");
        assert_eq!(parser.peek_char(), Some('x'));
    }
}
