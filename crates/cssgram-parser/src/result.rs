use cssgram_lexer::{Dialect, Token};

use crate::diagnostics::{Diagnostic, Severity};
use crate::tree::{Node, NodeRef};
use crate::QueryError;

/// Everything one parse produces: the tree, the diagnostics and the token
/// stream the tree's token leaves index into.
#[derive(Debug, Clone)]
pub struct ParseResult {
    source: String,
    dialect: Dialect,
    tokens: Vec<Token>,
    root: Node,
    diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub(crate) fn new(
        source: String,
        dialect: Dialect,
        tokens: Vec<Token>,
        root: Node,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            source,
            dialect,
            tokens,
            root,
            diagnostics,
        }
    }

    pub fn root(&self) -> NodeRef<'_> {
        NodeRef::new(&self.root, &self.source)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Diagnostics with `Severity::Error`.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// First node matching `path`, see [`crate::query`]. Invalid paths match nothing.
    pub fn query(&self, path: &str) -> Option<NodeRef<'_>> {
        self.root().query(path)
    }

    pub fn try_query(&self, path: &str) -> Result<Option<NodeRef<'_>>, QueryError> {
        crate::query::query(self.root(), path)
    }

    /// 1-based line and column (in characters) of a byte offset. Offsets past
    /// the end map to the end of the source.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let mut line = 1;
        let mut column = 1;
        let mut chars = self
            .source
            .char_indices()
            .take_while(|(i, _)| *i < offset)
            .peekable();
        while let Some((_, c)) = chars.next() {
            let line_break = c == '\n'
                || c == '\x0c'
                || (c == '\r' && chars.peek().map(|(_, n)| *n) != Some('\n'));
            if line_break {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        (line, column)
    }
}
