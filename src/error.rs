//! Parse error handling.
//!
//! Every failure carries a stable error-kind identifier plus a templated
//! message with positional substitutions (`%1`, `%2`, ...). Callers are
//! expected to match on the identifier, never on the message text.
//!
//! A second, non-error signal lives here as well: [`Retry`]. Requesting a
//! package that has not been merged yet abandons the current top-level parse
//! and asks the host to run the identical input again once the package (and
//! its transitive dependencies) are in place. [`Interrupt`] keeps the two
//! outcomes distinct so a suspension is never shown to the user as a failure.

use core::fmt;

use thiserror::Error;

/// Error raised when the input cannot be parsed.
///
/// The `id` is stable across releases; the message template is not part of
/// the compatibility contract and may be reworded.
#[derive(Debug, Clone, Error)]
#[error("TeX parse error: {}", self.message())]
pub struct TexError {
    /// Stable error-kind identifier (e.g. `"ExtraCloseMissingOpen"`).
    pub id: &'static str,
    /// Message template with `%1`, `%2`, ... placeholders.
    pub template: &'static str,
    /// Positional substitution arguments.
    pub args: Vec<String>,
}

impl TexError {
    /// Create a new error from an identifier, a message template and its
    /// positional arguments.
    #[must_use]
    pub fn new(id: &'static str, template: &'static str, args: &[&str]) -> Self {
        Self {
            id,
            template,
            args: args.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Render the message template, substituting `%1`, `%2`, ... with the
    /// stored arguments. A placeholder with no matching argument renders as
    /// an empty string; `%%` renders a literal percent sign.
    #[must_use]
    pub fn message(&self) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut chars = self.template.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.peek() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some(d) if d.is_ascii_digit() => {
                    let mut n = 0usize;
                    while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                        chars.next();
                        n = n * 10 + (d as usize - '0' as usize);
                    }
                    if n >= 1 {
                        if let Some(arg) = self.args.get(n - 1) {
                            out.push_str(arg);
                        }
                    }
                }
                _ => out.push('%'),
            }
        }
        out
    }
}

/// Request that the current top-level parse be retried after the named
/// packages have been merged into the parser configuration.
#[derive(Debug, Clone, Default)]
pub struct Retry {
    /// Packages merged while handling the request, in merge order.
    pub packages: Vec<String>,
}

impl fmt::Display for Retry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "retry after loading {}", self.packages.join(", "))
    }
}

/// Outcome of an aborted parse: a genuine failure, or a suspension that the
/// host should answer by re-running the same input from scratch.
#[derive(Debug, Error)]
pub enum Interrupt {
    /// The input is malformed or the configuration rejected it.
    #[error(transparent)]
    Error(#[from] TexError),
    /// Not an error: re-parse the current unit once loading completes.
    #[error("parse suspended: {0}")]
    Retry(Retry),
}

impl Interrupt {
    /// The stable error identifier, if this interrupt is a failure.
    #[must_use]
    pub fn error_id(&self) -> Option<&'static str> {
        match self {
            Self::Error(e) => Some(e.id),
            Self::Retry(_) => None,
        }
    }

    /// Whether this interrupt is a suspend-for-retry request.
    #[must_use]
    pub const fn is_retry(&self) -> bool {
        matches!(self, Self::Retry(_))
    }
}

/// Result alias used by all parsing operations.
pub type ParseResult<T> = Result<T, Interrupt>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_substitution() {
        let err = TexError::new(
            "EnvBadEnd",
            "\\begin{%1} ended with \\end{%2}",
            &["matrix", "cases"],
        );
        assert_eq!(err.message(), "\\begin{matrix} ended with \\end{cases}");
        assert!(err.to_string().starts_with("TeX parse error:"));
    }

    #[test]
    fn test_message_missing_argument_renders_empty() {
        let err = TexError::new("Misplaced", "%1 misplaced here %2", &["&"]);
        assert_eq!(err.message(), "& misplaced here ");
    }

    #[test]
    fn test_percent_escape() {
        let err = TexError::new("X", "100%% done", &[]);
        assert_eq!(err.message(), "100% done");
    }

    #[test]
    fn test_interrupt_distinguishes_retry() {
        let retry = Interrupt::Retry(Retry {
            packages: vec!["cancel".to_owned()],
        });
        assert!(retry.is_retry());
        assert_eq!(retry.error_id(), None);

        let fail = Interrupt::from(TexError::new("Misplaced", "%1 misplaced", &["&"]));
        assert!(!fail.is_retry());
        assert_eq!(fail.error_id(), Some("Misplaced"));
    }
}
