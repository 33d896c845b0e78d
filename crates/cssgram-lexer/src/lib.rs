//! cssgram Lexer
//!
//! Tokenizes CSS, SCSS and LESS source into a flat stream of positioned tokens.
//! Scanning is total: every character belongs to exactly one token, unknown
//! characters become `Invalid` tokens, and the stream always ends with `Eof`.
//! Dialect-only forms (`$var`, `@var`, `#{`, `@{name}`) are recognized only
//! when their dialect is selected.
//!
//! # Example
//!
//! ```
//! use cssgram_lexer::{Dialect, Scanner, TokenKind};
//!
//! let tokens = Scanner::tokenize("", Dialect::Css);
//! assert_eq!(tokens.len(), 1); // Just EOF
//! assert_eq!(tokens[0].kind, TokenKind::Eof);
//! ```

pub mod cursor;
pub mod dialect;
pub mod scanner;
pub mod token;

pub use cursor::{Mark, TokenCursor};
pub use dialect::Dialect;
pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};

/// Returned when a dialect name is not one of `css`, `scss` or `less`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown dialect '{name}', expected css, scss or less")]
pub struct UnknownDialect {
    pub name: String,
}
