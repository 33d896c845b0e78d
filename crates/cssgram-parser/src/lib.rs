//! cssgram parser
//!
//! Error-tolerant parser for CSS, SCSS and LESS. Every input produces a
//! concrete parse tree whose leaves cover the source, together with the
//! diagnostics collected while recovering from errors.
//!
//! ```
//! use cssgram_lexer::Dialect;
//! use cssgram_parser::Parser;
//!
//! let result = Parser::parse("a { color: red }", Dialect::Css);
//! assert!(result.diagnostics().is_empty());
//! let value = result.query("propertyDeclaration/propertyValue").unwrap();
//! assert_eq!(value.image(), "red");
//! ```

mod builder;
pub mod diagnostics;
pub mod node_type;
pub mod parser;
pub mod query;
pub mod result;
pub mod tree;

pub use diagnostics::{Diagnostic, Severity};
pub use node_type::NodeType;
pub use parser::Parser;
pub use query::{query, QueryPath};
pub use result::ParseResult;
pub use tree::{ErrorNode, Node, NodeRef, RuleNode, TokenNode};

/// Malformed query path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("empty query path")]
    EmptyPath,
    #[error("empty step name in '{step}'")]
    EmptyStep { step: String },
    #[error("invalid index in step '{step}'")]
    InvalidIndex { step: String },
}
