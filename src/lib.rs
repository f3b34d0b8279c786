//! A TeX math parser producing a MathML-like node tree.
//!
//! The engine is a single-pass, backtracking-free interpreter for TeX math
//! notation. Input characters and control sequences are dispatched through
//! prioritized token maps; macros push stack items and nodes; the stack
//! reduces matched scopes as it goes and collapses to one root node at end
//! of input. Grammar is supplied entirely by *packages*: named, composable
//! [`Configuration`]s merged by priority, with dependency resolution and
//! dynamic loading (`\require`) that suspends and retries the current parse
//! when needed.
//!
//! ```text
//! let mut mathtex = MathTex::new(&["base"])?;
//! let math = mathtex.convert("\\frac{x+1}{2}")?;
//! println!("{math}");
//! ```

use core::fmt;

pub mod base;
pub mod configuration;
pub mod error;
pub mod map_handler;
pub mod node;
pub mod node_factory;
pub mod options;
pub mod packages;
pub mod parse_options;
pub mod parser;
pub mod stack;
pub mod tags;
pub mod token;
pub mod token_map;
pub mod types;

pub use configuration::{
    configure, load_package, Configuration, ConfigurationRegistry, LoadResult, ParserConfiguration,
};
pub use error::{Interrupt, ParseResult, Retry, TexError};
pub use map_handler::{FallbackMethod, HandlerType, MapHandler, SubHandler, SubHandlers};
pub use node::MmlNode;
pub use node_factory::{default_node, NodeConstructor, NodeFactory};
pub use options::{default_options, OptionList, OptionValue};
pub use parse_options::{ParseOptions, ProcessorFn};
pub use parser::{parse, TexParser};
pub use stack::{Stack, StackItem, StackItemFactory};
pub use tags::{TagScheme, Tags};
pub use token::{Macro, Token};
pub use token_map::{
    CharacterMap, CommandMap, DelimiterMap, EnvironmentMap, Found, MacroMap, RegExpMap, TokenMap,
    TryParse,
};
pub use types::{KeyMap, KeySet, Value};

/// A configured parser instance over the bundled package registry.
///
/// Wraps one [`ParseOptions`] and drives the suspend-and-retry protocol for
/// dynamic package loads, so most callers never see [`Interrupt::Retry`].
pub struct MathTex {
    options: ParseOptions,
}

impl MathTex {
    /// Configure an instance with the named packages from the bundled
    /// registry.
    ///
    /// # Errors
    ///
    /// Whatever [`configure`] raises: unknown packages, item collisions,
    /// invalid options.
    pub fn new(packages: &[&str]) -> ParseResult<Self> {
        Self::with_registry(crate::packages::default_registry(), packages)
    }

    /// Configure an instance over a caller-supplied registry.
    ///
    /// # Errors
    ///
    /// Same conditions as [`MathTex::new`].
    pub fn with_registry(registry: ConfigurationRegistry, packages: &[&str]) -> ParseResult<Self> {
        let mut options = ParseOptions::default();
        options.configuration = ParserConfiguration::new(registry);
        configure(&mut options, packages)?;
        Ok(Self { options })
    }

    /// Parse one expression. A [`Interrupt::Retry`] outcome means a package
    /// was merged mid-parse and the same input should be parsed again;
    /// [`MathTex::convert`] handles that loop.
    pub fn parse(&mut self, input: &str) -> ParseResult<MmlNode> {
        parser::parse(input, &mut self.options)
    }

    /// Parse one expression, re-parsing as often as dynamic package loads
    /// demand. Terminates because a retry is only signalled when packages
    /// were newly merged.
    pub fn convert(&mut self, input: &str) -> Result<MmlNode, TexError> {
        loop {
            match self.parse(input) {
                Ok(node) => return Ok(node),
                Err(Interrupt::Retry(retry)) => {
                    log::debug!("re-parsing after loading {}", retry.packages.join(", "));
                }
                Err(Interrupt::Error(error)) => return Err(error),
            }
        }
    }

    /// The underlying per-run state.
    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// The underlying per-run state, mutably.
    pub fn options_mut(&mut self) -> &mut ParseOptions {
        &mut self.options
    }
}

impl fmt::Debug for MathTex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MathTex")
            .field("packages", &self.options.configuration.merged())
            .field("error", &self.options.error)
            .finish_non_exhaustive()
    }
}
