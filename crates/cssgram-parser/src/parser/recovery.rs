//! Resynchronization after syntax errors.
//!
//! Skipped tokens are kept in `recovery` nodes so every consumed token stays
//! in the tree. Every skip either consumes at least one token or stops at a
//! token the caller handles.

use cssgram_lexer::TokenKind;

use super::Parser;
use crate::builder::NodeBuilder;
use crate::node_type::NodeType;

impl Parser<'_> {
    /// Skip tokens into a `recovery` node until `stop` holds at brace depth
    /// zero or the input ends. `#{` opens a brace level like `{`.
    fn recover_until(
        &mut self,
        b: &mut NodeBuilder,
        recovery: &'static str,
        stop: impl Fn(&Self) -> bool,
    ) {
        let mut skipped = NodeBuilder::new(NodeType::Recovery);
        let mut depth = 0usize;
        loop {
            let kind = self.kind();
            if kind == TokenKind::Eof || (depth == 0 && stop(self)) {
                break;
            }
            match kind {
                TokenKind::LBrace | TokenKind::ScssInterpStart => depth += 1,
                TokenKind::RBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump(&mut skipped);
        }

        if let Some(node) = self.finish(skipped) {
            tracing::debug!(from = node.from(), to = node.to(), recovery, "skipped tokens");
            b.push(node);
        }
    }

    /// Declaration-level resync: up to the next `;` or `}`.
    pub(super) fn skip_to_declaration_end(&mut self, b: &mut NodeBuilder) {
        self.recover_until(b, "declaration", |p| {
            matches!(p.kind(), TokenKind::Semi | TokenKind::RBrace)
        });
    }

    /// Up to the `{` of a block, or the end of the statement.
    pub(super) fn skip_to_block_start(&mut self, b: &mut NodeBuilder) {
        self.recover_until(b, "block", |p| {
            matches!(
                p.kind(),
                TokenKind::LBrace | TokenKind::Semi | TokenKind::RBrace
            )
        });
    }

    /// Up to `closer` (`)` or `]`), without consuming it. Stops early at
    /// block and statement boundaries.
    pub(super) fn skip_to_close(&mut self, b: &mut NodeBuilder, closer: TokenKind) {
        self.recover_until(b, "group", move |p| {
            let kind = p.kind();
            kind == closer
                || matches!(
                    kind,
                    TokenKind::Semi | TokenKind::LBrace | TokenKind::RBrace
                )
        });
    }

    /// Consume the `closer` of a parenthesized or bracketed group, reporting
    /// and skipping whatever stands in front of it.
    pub(super) fn expect_close(&mut self, b: &mut NodeBuilder, closer: TokenKind, expected: &str) {
        self.ws(b);
        if self.eat(b, closer) {
            return;
        }
        self.error_here(b, expected);
        self.skip_to_close(b, closer);
        self.ws(b);
        self.eat(b, closer);
    }

    /// Garbage in front of a declaration: report it, then skip to the next
    /// property name, `;` or `}`.
    pub(super) fn sync_to_ident(&mut self, b: &mut NodeBuilder) {
        self.error_here(b, "identifier");
        self.recover_until(b, "ident", |p| {
            matches!(p.kind(), TokenKind::Semi | TokenKind::RBrace) || p.at_property_start()
        });
    }

    /// A top-level token that starts no statement. A `{` takes its whole
    /// block with it, anything else skips to the next statement start.
    pub(super) fn body_garbage(&mut self, b: &mut NodeBuilder) {
        let opens_block = self.at(TokenKind::LBrace);
        self.error_skip(b, "rule");
        if opens_block {
            self.skip_block_rest(b);
        } else {
            self.recover_until(b, "statement", |p| {
                matches!(
                    p.kind(),
                    TokenKind::Semi | TokenKind::LBrace | TokenKind::RBrace
                ) || p.at_body_item_start()
            });
        }
    }

    /// Skip the remainder of a block whose `{` was just consumed, up to and
    /// including its matching `}`.
    pub(super) fn skip_block_rest(&mut self, b: &mut NodeBuilder) {
        let mut skipped = NodeBuilder::new(NodeType::Recovery);
        let mut depth = 1usize;
        while !self.cursor.is_at_end() {
            match self.kind() {
                TokenKind::LBrace | TokenKind::ScssInterpStart => depth += 1,
                TokenKind::RBrace => depth -= 1,
                _ => {}
            }
            self.bump(&mut skipped);
            if depth == 0 {
                break;
            }
        }
        if let Some(node) = self.finish(skipped) {
            tracing::debug!(from = node.from(), to = node.to(), recovery = "block", "skipped tokens");
            b.push(node);
        }
    }

    fn at_body_item_start(&self) -> bool {
        self.at_variable_declaration() || self.at_at_rule() || self.at_selector_start()
    }
}

#[cfg(test)]
mod tests {
    use crate::{NodeType, Parser};
    use cssgram_lexer::Dialect;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_recovery_node_keeps_skipped_tokens() {
        let result = Parser::parse("a { color: red blue: 1px 2px; top: 0 }", Dialect::Css);
        assert_eq!(result.diagnostics().len(), 1);
        let recovery = result.root().find_all(NodeType::Recovery);
        assert_eq!(recovery.len(), 1);
        assert_eq!(recovery[0].image(), "1px 2px");
        assert!(result.query("declaration|1/propertyDeclaration/property/top").is_some());
    }

    #[test]
    fn test_body_garbage_skips_to_next_rule() {
        let result = Parser::parse("^ ? b { }", Dialect::Css);
        assert_eq!(result.diagnostics().len(), 1);
        assert_eq!(result.diagnostics()[0].from, 0);
        assert!(result.query("bodyItem/rule/selectorsGroup/selector/simpleSelectorSequence/typeSelector/elementName/b").is_some());
    }

    #[test]
    fn test_garbage_block_is_skipped_whole() {
        let result = Parser::parse("{ a { b: c } d: e } f { }", Dialect::Css);
        assert_eq!(result.diagnostics().len(), 1);
        assert_eq!(result.root().find_all(NodeType::Rule).len(), 1);
    }

    #[test]
    fn test_sync_to_ident_skips_garbage_run() {
        let result = Parser::parse("a { ) ] color: red }", Dialect::Css);
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result.query("declaration/propertyDeclaration/property/color").is_some());
    }

    #[test]
    fn test_recovery_stops_at_closing_brace() {
        let result = Parser::parse("a { color: red ^ } b { top: 0 }", Dialect::Css);
        assert!(result.has_errors());
        assert!(result.query("bodyItem|1/rule").is_some());
    }
}
