//! Tolerant stylesheet parser for CSS, SCSS and LESS.
//!
//! Parses the token stream from `cssgram-lexer` into a concrete parse tree
//! using recursive descent. Grammar rules build nodes through `NodeBuilder`,
//! report problems as diagnostics and resynchronize instead of failing, so
//! every input produces a tree.
//!
//! Ambiguous constructs (nested rule or declaration, LESS mixin call or
//! rule) are resolved with bounded speculation: the alternative is parsed on
//! a snapshot of the cursor and rewound unless it matched cleanly.

mod at_rules;
mod declarations;
mod less;
mod recovery;
mod scss;
mod selectors;
mod values;

use cssgram_lexer::{Dialect, Mark, Scanner, Token, TokenCursor, TokenKind};

use crate::builder::NodeBuilder;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::node_type::NodeType;
use crate::result::ParseResult;
use crate::tree::{ErrorNode, Node, RuleNode, TokenNode};

/// Where the items of a `{ ... }` block are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockContext {
    /// Rule bodies: items are wrapped in `declaration`.
    Rule,
    /// At-rule bodies: items are wrapped in `mediaBodyItem`.
    Media,
    /// `@page` bodies: declarations and margin boxes sit directly in `page`.
    Page,
}

impl BlockContext {
    fn item_type(self) -> Option<NodeType> {
        match self {
            BlockContext::Rule => Some(NodeType::Declaration),
            BlockContext::Media => Some(NodeType::MediaBodyItem),
            BlockContext::Page => None,
        }
    }
}

/// Open blocks and groups allowed before the rest of a group is skipped
/// without descending into it.
const MAX_NESTING: usize = 256;

/// Parser state saved before a speculative parse.
struct Snapshot {
    mark: Mark,
    diagnostics: usize,
    failures: usize,
    reported_at: Option<usize>,
    eof_reported: bool,
    nesting_reported: bool,
    paren_depth: usize,
    depth: usize,
}

/// CSS/SCSS/LESS parser over a materialized token stream.
pub struct Parser<'t> {
    source: &'t str,
    tokens: &'t [Token],
    cursor: TokenCursor<'t>,
    dialect: Dialect,
    diagnostics: Diagnostics,
    /// Errors raised so far, including ones suppressed as duplicates.
    failures: usize,
    /// Token index of the last error reported at the cursor.
    reported_at: Option<usize>,
    eof_reported: bool,
    nesting_reported: bool,
    paren_depth: usize,
    /// Open blocks and groups.
    depth: usize,
}

impl Parser<'_> {
    /// Tokenize and parse `source` under `dialect`.
    #[tracing::instrument(skip_all, fields(dialect = %dialect, len = source.len()))]
    pub fn parse(source: &str, dialect: Dialect) -> ParseResult {
        let tokens = Scanner::tokenize(source, dialect);
        Self::parse_tokens(source, tokens, dialect)
    }

    /// Parse a token stream produced elsewhere. The tokens must cover
    /// `source`; a missing final `Eof` is added.
    pub fn parse_tokens(source: &str, mut tokens: Vec<Token>, dialect: Dialect) -> ParseResult {
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map_or(0, |t| t.span.end);
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.span.line, t.span.column));
            tokens.push(Token::new(
                TokenKind::Eof,
                cssgram_lexer::Span::new(end, end, line, column),
            ));
        }

        let (root, diagnostics) = {
            let mut parser = Parser::new(source, &tokens, dialect);
            let root = parser.parse_root();
            (root, parser.diagnostics.into_vec())
        };
        tracing::debug!(
            tokens = tokens.len(),
            diagnostics = diagnostics.len(),
            "parsed"
        );
        ParseResult::new(source.to_string(), dialect, tokens, root, diagnostics)
    }
}

impl<'t> Parser<'t> {
    fn new(source: &'t str, tokens: &'t [Token], dialect: Dialect) -> Self {
        Self {
            source,
            tokens,
            cursor: TokenCursor::new(tokens),
            dialect,
            diagnostics: Diagnostics::default(),
            failures: 0,
            reported_at: None,
            eof_reported: false,
            nesting_reported: false,
            paren_depth: 0,
            depth: 0,
        }
    }

    // =========================================================================
    // Stylesheet
    // =========================================================================

    /// The root spans the whole source. Trivia given back by the stylesheet
    /// is attached here.
    fn parse_root(&mut self) -> Node {
        let mut b = NodeBuilder::new(NodeType::Root);
        let sheet = self.style_sheet();
        b.push_opt(sheet);
        while !self.cursor.is_at_end() {
            if self.is_trivia(self.kind()) {
                self.bump(&mut b);
            } else {
                self.body_garbage(&mut b);
            }
        }

        let children = match b.build() {
            Some(Node::Rule(rule)) => rule.children,
            _ => Vec::new(),
        };
        Node::Root(RuleNode {
            node_type: NodeType::Root,
            from: 0,
            to: self.source.len(),
            children,
        })
    }

    /// styleSheet := [charSet] (imports | namespaces)* body
    fn style_sheet(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::StyleSheet);
        self.ws(&mut b);
        if self.at(TokenKind::Charset) {
            let charset = self.charset(false);
            b.push_opt(charset);
        }

        loop {
            self.ws(&mut b);
            match self.kind() {
                TokenKind::Import => {
                    let imports = self.statement_group(NodeType::Imports, TokenKind::Import);
                    b.push_opt(imports);
                }
                TokenKind::Namespace => {
                    let namespaces =
                        self.statement_group(NodeType::Namespaces, TokenKind::Namespace);
                    b.push_opt(namespaces);
                }
                _ => break,
            }
        }

        let body = self.body();
        b.push_opt(body);
        self.finish(b)
    }

    /// A run of `@import` or `@namespace` statements.
    fn statement_group(&mut self, node_type: NodeType, kind: TokenKind) -> Option<Node> {
        let mut b = NodeBuilder::new(node_type);
        while self.at(kind) {
            let item = match kind {
                TokenKind::Import => self.import_item(),
                _ => self.namespace(),
            };
            b.push_opt(item);
            self.ws(&mut b);
        }
        self.finish(b)
    }

    /// body := bodyItem*
    fn body(&mut self) -> Option<Node> {
        let mut b = NodeBuilder::new(NodeType::Body);
        loop {
            self.ws(&mut b);
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::RBrace => {
                    self.error_skip(&mut b, "rule");
                    continue;
                }
                TokenKind::Semi => {
                    if self.dialect.is_preprocessor() {
                        self.bump(&mut b);
                    } else {
                        self.error_skip(&mut b, "rule");
                    }
                    continue;
                }
                _ => {}
            }

            let before = self.cursor.position();
            let item = self.body_item();
            if self.cursor.position() == before {
                self.body_garbage(&mut b);
                continue;
            }
            let item = crate::builder::wrap(NodeType::BodyItem, item);
            b.push_opt(item);
            self.item_end(&mut b);
        }
        self.finish(b)
    }

    fn body_item(&mut self) -> Option<Node> {
        if self.at_variable_declaration() {
            return self.variable_declaration();
        }
        if self.at_at_rule() {
            return self.at_rule();
        }
        if self.is_less() {
            if let Some(node) = self.less_statement() {
                return Some(node);
            }
        }
        if self.at_selector_start() {
            return self.rule();
        }
        None
    }

    /// After a statement: accept `;`, or a following `}` / end of input.
    /// Anything else is reported and skipped up to the next statement end,
    /// unless a property declaration follows right after it.
    fn item_end(&mut self, b: &mut NodeBuilder) {
        if matches!(
            self.prev_significant(),
            Some(TokenKind::Semi | TokenKind::RBrace)
        ) {
            return;
        }
        match self.significant_kind(0) {
            TokenKind::RBrace | TokenKind::Eof => {}
            TokenKind::Semi => {
                self.ws(b);
                self.bump(b);
            }
            _ => {
                self.ws(b);
                self.error_here(b, "';'");
                self.ws(b);
                if self.at_property_start() {
                    return;
                }
                self.skip_to_declaration_end(b);
                if self.at(TokenKind::Semi) {
                    self.bump(b);
                }
            }
        }
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// `{ items }`. Items go into a `container` node when one is given,
    /// otherwise straight into `b`.
    fn block(&mut self, b: &mut NodeBuilder, container: Option<NodeType>, ctx: BlockContext) {
        if !self.open_block(b) {
            return;
        }

        match container {
            Some(node_type) => {
                let mut body = NodeBuilder::new(node_type);
                self.block_items(&mut body, ctx);
                let body = self.finish(body);
                b.push_opt(body);
            }
            None => self.block_items(b, ctx),
        }

        self.close_block(b);
    }

    /// Consume the `{` of a block and enter it. False when there is no
    /// block, or when it nests too deep and was skipped whole.
    fn open_block(&mut self, b: &mut NodeBuilder) -> bool {
        if !self.at(TokenKind::LBrace) {
            self.error_here(b, "'{'");
            self.skip_to_block_start(b);
            if !self.at(TokenKind::LBrace) {
                return false;
            }
        }
        if !self.enter_nesting() {
            self.bump(b);
            self.skip_block_rest(b);
            return false;
        }
        self.bump(b);
        true
    }

    /// Leave a block entered with `open_block`, consuming its `}`.
    fn close_block(&mut self, b: &mut NodeBuilder) {
        self.leave_nesting();
        self.ws(b);
        if !self.eat(b, TokenKind::RBrace) {
            self.error_here(b, "'}'");
        }
    }

    fn block_items(&mut self, b: &mut NodeBuilder, ctx: BlockContext) {
        loop {
            self.ws(b);
            match self.kind() {
                TokenKind::RBrace | TokenKind::Eof => break,
                // `@@@` placeholders stand in for generated declarations.
                TokenKind::Semi | TokenKind::TemplateMark => {
                    self.bump(b);
                    continue;
                }
                _ => {}
            }

            let before = self.cursor.position();
            match ctx.item_type() {
                Some(item_type) => {
                    let mut item = NodeBuilder::new(item_type);
                    self.block_construct(&mut item, ctx);
                    let item = self.finish(item);
                    b.push_opt(item);
                }
                None => self.block_construct(b, ctx),
            }

            if self.cursor.position() == before {
                self.error_skip(b, "declaration");
                continue;
            }
            self.item_end(b);
        }
    }

    /// One item of a block, tried in order: variable declaration, at-rule,
    /// LESS mixin, nested rule, property declaration.
    fn block_construct(&mut self, b: &mut NodeBuilder, ctx: BlockContext) {
        if ctx == BlockContext::Page && self.at(TokenKind::MarginSym) {
            let margin = self.margin();
            b.push_opt(margin);
            return;
        }
        if self.at_variable_declaration() {
            let declaration = self.variable_declaration();
            b.push_opt(declaration);
            return;
        }
        if self.at_at_rule() {
            let at_rule = self.at_rule();
            b.push_opt(at_rule);
            return;
        }
        if self.is_less() {
            if let Some(node) = self.less_statement() {
                b.push(node);
                return;
            }
        }
        if self.at_selector_start() && self.looks_like_rule() {
            let rule = self.rule();
            b.push_opt(rule);
            return;
        }
        if self.at_property_start() {
            let declaration = self.property_declaration();
            b.push_opt(declaration);
            return;
        }
        if self.at_selector_start() {
            // Committed: reports the token that stops the rule, usually `:`.
            let rule = self.rule();
            b.push_opt(rule);
            return;
        }

        self.sync_to_ident(b);
        self.ws(b);
        if self.at_property_start() {
            let declaration = self.property_declaration();
            b.push_opt(declaration);
        }
    }

    // =========================================================================
    // Token access
    // =========================================================================

    fn kind(&self) -> TokenKind {
        self.cursor.peek().kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    /// Kind of the token `k` positions ahead, trivia included.
    fn nth_kind(&self, k: usize) -> TokenKind {
        self.cursor.peek_nth(k).kind
    }

    fn text(&self) -> &'t str {
        self.cursor.peek().text(self.source)
    }

    fn token_text(&self, token: &Token) -> &'t str {
        token.text(self.source)
    }

    /// Whether the current token is the identifier `word`, ignoring case.
    fn at_word(&self, word: &str) -> bool {
        self.at(TokenKind::Ident) && self.text().eq_ignore_ascii_case(word)
    }

    fn is_scss(&self) -> bool {
        self.dialect == Dialect::Scss
    }

    fn is_less(&self) -> bool {
        self.dialect == Dialect::Less
    }

    fn is_preprocessor(&self) -> bool {
        self.dialect.is_preprocessor()
    }

    /// Whitespace and comments. `//` comments are trivia only in SCSS and
    /// LESS; plain CSS sees them as unexpected tokens.
    fn is_trivia(&self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Ws | TokenKind::Comment | TokenKind::Cdo | TokenKind::Cdc => true,
            TokenKind::LineComment => self.is_preprocessor(),
            _ => false,
        }
    }

    /// The `k`-th non-trivia token from the cursor.
    fn significant(&self, k: usize) -> &'t Token {
        self.significant_from(self.cursor.position(), k)
    }

    /// The `k`-th non-trivia token at or after token index `start`.
    fn significant_from(&self, start: usize, k: usize) -> &'t Token {
        let tokens: &'t [Token] = self.tokens;
        let mut remaining = k;
        for token in &tokens[start.min(tokens.len())..] {
            if self.is_trivia(token.kind) {
                continue;
            }
            if remaining == 0 || token.kind == TokenKind::Eof {
                return token;
            }
            remaining -= 1;
        }
        self.cursor.peek_nth(tokens.len())
    }

    fn significant_kind(&self, k: usize) -> TokenKind {
        self.significant(k).kind
    }

    /// Whether the `k`-th significant token is the identifier `word`.
    fn significant_word(&self, k: usize, word: &str) -> bool {
        let token = self.significant(k);
        token.kind == TokenKind::Ident && self.token_text(token).eq_ignore_ascii_case(word)
    }

    /// Evaluate `check` at the next non-trivia token without consuming
    /// anything.
    fn after_trivia<R>(&mut self, check: impl FnOnce(&Self) -> R) -> R {
        let mark = self.cursor.mark();
        while self.is_trivia(self.kind()) {
            self.cursor.advance();
        }
        let result = check(self);
        self.cursor.rewind(mark);
        result
    }

    /// Kind of the last non-trivia token before the cursor.
    fn prev_significant(&self) -> Option<TokenKind> {
        self.tokens[..self.cursor.position().min(self.tokens.len())]
            .iter()
            .rev()
            .map(|t| t.kind)
            .find(|kind| !self.is_trivia(*kind))
    }

    // =========================================================================
    // Building
    // =========================================================================

    /// Consume the current token as a leaf. Callers check for `Eof` first.
    fn take(&mut self) -> Node {
        let index = self.cursor.position();
        let token = self.cursor.advance();
        Node::Token(TokenNode {
            index,
            kind: token.kind,
            from: token.span.start,
            to: token.span.end,
        })
    }

    /// Consume the current token into `b`. A no-op at `Eof`.
    fn bump(&mut self, b: &mut NodeBuilder) {
        if !self.cursor.is_at_end() {
            let leaf = self.take();
            b.push(leaf);
        }
    }

    fn eat(&mut self, b: &mut NodeBuilder, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump(b);
            true
        } else {
            false
        }
    }

    /// A node of `node_type` holding just the current token.
    fn single(&mut self, node_type: NodeType) -> Option<Node> {
        let mut b = NodeBuilder::new(node_type);
        self.bump(&mut b);
        b.build()
    }

    /// Consume trivia into `b`.
    fn ws(&mut self, b: &mut NodeBuilder) {
        while self.is_trivia(self.kind()) {
            self.bump(b);
        }
    }

    /// Build `b`, giving trailing trivia back to the cursor so it lands in
    /// the enclosing node.
    fn finish(&mut self, mut b: NodeBuilder) -> Option<Node> {
        let first_popped = b.pop_trailing(|leaf| self.is_trivia(leaf.kind));
        if let Some(index) = first_popped {
            self.cursor.seek(index);
        }
        b.build()
    }

    // =========================================================================
    // Speculation
    // =========================================================================

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            mark: self.cursor.mark(),
            diagnostics: self.diagnostics.len(),
            failures: self.failures,
            reported_at: self.reported_at,
            eof_reported: self.eof_reported,
            nesting_reported: self.nesting_reported,
            paren_depth: self.paren_depth,
            depth: self.depth,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.cursor.rewind(snapshot.mark);
        self.diagnostics.truncate(snapshot.diagnostics);
        self.failures = snapshot.failures;
        self.reported_at = snapshot.reported_at;
        self.eof_reported = snapshot.eof_reported;
        self.nesting_reported = snapshot.nesting_reported;
        self.paren_depth = snapshot.paren_depth;
        self.depth = snapshot.depth;
    }

    /// Run `predicate` speculatively and always rewind. True only when it
    /// returned true without raising an error.
    fn lookahead(&mut self, predicate: impl FnOnce(&mut Self) -> bool) -> bool {
        let snapshot = self.snapshot();
        let failures = snapshot.failures;
        let matched = predicate(self) && self.failures == failures;
        self.restore(snapshot);
        matched
    }

    /// Keep the result of `rule` only when it matched without raising an
    /// error, otherwise rewind.
    fn attempt(&mut self, rule: impl FnOnce(&mut Self) -> Option<Node>) -> Option<Node> {
        let snapshot = self.snapshot();
        let failures = snapshot.failures;
        match rule(self) {
            Some(node) if self.failures == failures => Some(node),
            _ => {
                self.restore(snapshot);
                None
            }
        }
    }

    /// Ordered alternatives: the first one that `attempt` keeps wins.
    fn choice(&mut self, alternatives: &[fn(&mut Self) -> Option<Node>]) -> Option<Node> {
        alternatives.iter().find_map(|rule| self.attempt(*rule))
    }

    // =========================================================================
    // Nesting
    // =========================================================================

    /// Enter a block or group whose opener is at the cursor. Past
    /// `MAX_NESTING` open levels the opener is reported, once per parse,
    /// and false is returned: the caller skips the group without recursing.
    fn enter_nesting(&mut self) -> bool {
        if self.depth < MAX_NESTING {
            self.depth += 1;
            return true;
        }
        if !self.nesting_reported {
            self.nesting_reported = true;
            let token = *self.cursor.peek();
            tracing::warn!(offset = token.span.start, "nesting limit reached");
            self.report(Diagnostic::error(
                token.span.start,
                token.span.end,
                format!("Nesting deeper than {MAX_NESTING} levels"),
            ));
        }
        false
    }

    fn leave_nesting(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// A group too deep to parse: its opener, balanced contents and closer
    /// are kept as plain tokens.
    fn skip_group(&mut self, b: &mut NodeBuilder, closer: TokenKind, expected: &str) {
        self.bump(b);
        self.raw_balanced(b);
        self.expect_close(b, closer, expected);
    }

    // =========================================================================
    // Errors
    // =========================================================================

    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.is_error() {
            self.failures += 1;
        }
        tracing::debug!(
            from = diagnostic.from,
            to = diagnostic.to,
            message = %diagnostic.message,
            "diagnostic"
        );
        self.diagnostics.push(diagnostic);
    }

    fn unexpected(&mut self, expected: &str) {
        let token = *self.cursor.peek();
        let mut shown: String = self.token_text(&token).chars().take(40).collect();
        if shown.trim().is_empty() {
            shown = format!("{:?}", token.kind);
        }
        self.report_at_cursor(format!("Unexpected token {shown} found, expected {expected}"));
    }

    /// Report the current token. Once a token has been reported, later
    /// errors raised while the parser still stands on it are dropped.
    fn report_at_cursor(&mut self, message: String) {
        let position = self.cursor.position();
        if self.reported_at == Some(position) {
            self.failures += 1;
            return;
        }
        self.reported_at = Some(position);
        let token = *self.cursor.peek();
        self.report(Diagnostic::error(token.span.start, token.span.end, message));
    }

    /// Report the current token as unexpected. Structural tokens (`{ } ; ) ]`)
    /// are left for the enclosing rule behind a zero-width error node, any
    /// other token is swallowed by the error node.
    fn error_here(&mut self, b: &mut NodeBuilder, expected: &str) {
        let token = *self.cursor.peek();
        if token.kind == TokenKind::Eof {
            self.premature_eof(b);
            return;
        }
        self.unexpected(expected);
        if token.kind.is_structural() {
            b.push(Node::Error(ErrorNode::marker(token.span.start)));
        } else {
            self.error_node(b, &token);
        }
    }

    /// Report the current token and always consume it.
    fn error_skip(&mut self, b: &mut NodeBuilder, expected: &str) {
        let token = *self.cursor.peek();
        if token.kind == TokenKind::Eof {
            self.premature_eof(b);
            return;
        }
        self.unexpected(expected);
        self.error_node(b, &token);
    }

    /// Report the current token with a custom message and consume it.
    fn error_with(&mut self, b: &mut NodeBuilder, message: String) {
        let token = *self.cursor.peek();
        if token.kind == TokenKind::Eof {
            self.premature_eof(b);
            return;
        }
        self.report_at_cursor(message);
        self.error_node(b, &token);
    }

    fn error_node(&mut self, b: &mut NodeBuilder, token: &Token) {
        let leaf = self.take();
        b.push(Node::Error(ErrorNode {
            node_type: NodeType::Error,
            from: token.span.start,
            to: token.span.end,
            children: vec![leaf],
        }));
    }

    /// End of input inside an unfinished construct: one diagnostic and one
    /// zero-width error node per parse.
    fn premature_eof(&mut self, b: &mut NodeBuilder) {
        if self.eof_reported {
            return;
        }
        self.eof_reported = true;
        let end = self.source.len();
        self.report(Diagnostic::error(end, end, "Premature end of file"));
        b.push(Node::Error(ErrorNode::marker(end)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeRef;
    use pretty_assertions::assert_eq;

    fn parse_css(source: &str) -> ParseResult {
        Parser::parse(source, Dialect::Css)
    }

    fn messages(result: &ParseResult) -> Vec<String> {
        result
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect()
    }

    /// Concatenated images of all token leaves, in document order.
    fn leaf_text(result: &ParseResult) -> String {
        result
            .root()
            .descendants()
            .filter(|n| n.node_type() == NodeType::Token)
            .map(|n| n.image())
            .collect()
    }

    /// Every node lies inside its parent and its children are ordered and
    /// disjoint.
    fn assert_well_formed(node: NodeRef<'_>) {
        assert!(node.from() <= node.to(), "inverted span in {}", node.node_type());
        let mut last_end = node.from();
        for child in node.children() {
            assert!(
                child.from() >= last_end,
                "{} overlaps a sibling in {}",
                child.node_type(),
                node.node_type()
            );
            assert!(child.to() <= node.to(), "{} escapes {}", child.node_type(), node.node_type());
            last_end = child.to();
            assert_well_formed(child);
        }
    }

    // =========================================================================
    // Basic structure
    // =========================================================================

    #[test]
    fn test_empty_source() {
        let result = parse_css("");
        let root = result.root();
        assert_eq!(root.node_type(), NodeType::Root);
        assert_eq!((root.from(), root.to()), (0, 0));
        assert_eq!(root.children().count(), 0);
        assert!(result.diagnostics().is_empty());
    }

    #[test]
    fn test_whitespace_only_source() {
        let result = parse_css("  \n ");
        assert!(result.diagnostics().is_empty());
        assert_eq!(leaf_text(&result), "  \n ");
        assert_eq!(result.root().to(), 4);
    }

    #[test]
    fn test_simple_rule_tree() {
        let result = parse_css("a { color : black; }");
        assert!(result.diagnostics().is_empty());
        assert!(result
            .query("styleSheet/body/bodyItem/rule/selectorsGroup/selector/simpleSelectorSequence/typeSelector/elementName/a")
            .is_some());
        let property = result
            .query("rule/declarations/declaration/propertyDeclaration/property/color")
            .unwrap();
        assert_eq!(property.node_type(), NodeType::Token);
        assert_eq!(property.image(), "color");
    }

    #[test]
    fn test_root_spans_source_with_trailing_whitespace() {
        let source = "a{}\n\n";
        let result = parse_css(source);
        let root = result.root();
        assert_eq!((root.from(), root.to()), (0, source.len()));
        let sheet = root.children().next().unwrap();
        assert_eq!(sheet.node_type(), NodeType::StyleSheet);
        assert_eq!(sheet.to(), 3);
    }

    #[test]
    fn test_empty_rule_bodies() {
        let result = parse_css("a { }   m { }");
        assert!(result.diagnostics().is_empty());
        assert!(result.query("body/bodyItem|1/rule").is_some());
        assert!(result.query("rule/declarations").is_none());
    }

    #[test]
    fn test_last_declaration_without_semicolon() {
        let result = parse_css("a { color: red; background: blue }");
        assert!(result.diagnostics().is_empty());
        let property = result
            .query("rule/declarations/declaration|1/propertyDeclaration/property/background")
            .unwrap();
        assert_eq!(property.image(), "background");
    }

    #[test]
    fn test_duplicate_semicolons() {
        let result = parse_css("a { ;; color: red;; ; top: 0;; }");
        assert!(result.diagnostics().is_empty());
        assert_eq!(result.root().find_all(NodeType::Declaration).len(), 2);
    }

    #[test]
    fn test_prelude() {
        let source = "@charset \"UTF-8\";\n@import url(a.css);\n@import 'b.css' screen;\n@namespace svg url(http://www.w3.org/2000/svg);\na {}";
        let result = parse_css(source);
        assert!(result.diagnostics().is_empty(), "{:?}", messages(&result));
        assert_eq!(
            result.query("styleSheet/charSet/charSetValue").unwrap().image(),
            "\"UTF-8\""
        );
        assert_eq!(
            result.query("styleSheet/imports/importItem|1/resourceIdentifier").unwrap().image(),
            "'b.css'"
        );
        assert_eq!(
            result.query("namespaces/namespace/namespacePrefixName").unwrap().image(),
            "svg"
        );
        assert!(result.query("styleSheet/body/bodyItem/rule").is_some());
    }

    #[test]
    fn test_misplaced_charset_is_a_warning() {
        let result = parse_css("a {}\n@charset \"UTF-8\";");
        assert_eq!(result.diagnostics().len(), 1);
        assert!(!result.has_errors());
        assert_eq!(messages(&result), vec!["@charset must be the first rule"]);
        assert!(result.query("bodyItem/charSet").is_some());
    }

    #[test]
    fn test_bare_charset_at_end_of_input() {
        let result = parse_css("@charset");
        assert_eq!(messages(&result), vec!["Premature end of file"]);
        assert_eq!(result.diagnostics()[0].from, 8);
    }

    // =========================================================================
    // Scenarios
    // =========================================================================

    #[test]
    fn test_missing_value() {
        let result = parse_css("h1 { color:  }");
        assert!(!result.diagnostics().is_empty());
        assert!(result.query("propertyDeclaration/property/color").is_some());
    }

    #[test]
    fn test_media_query_with_ratio() {
        let result = parse_css("@media screen and (device-aspect-ratio: 2560/1440) { p { } }");
        assert!(result.diagnostics().is_empty(), "{:?}", messages(&result));
        assert_eq!(result.query("mediaQuery/mediaType").unwrap().image(), "screen");
        assert!(result.query("media/mediaBody/mediaBodyItem/rule").is_some());
    }

    #[test]
    fn test_guarded_mixin_is_less_only() {
        let source = ".mixin (@a) when (lightness(@a) >= 50%) { background-color: black; }";
        let less = Parser::parse(source, Dialect::Less);
        assert!(less.diagnostics().is_empty(), "{:?}", messages(&less));
        assert!(less.query("cp_mixin_declaration/less_when/less_condition").is_some());

        let css = parse_css(source);
        assert!(!css.diagnostics().is_empty());
    }

    #[test]
    fn test_error_node_in_attribute_selector() {
        let result = parse_css("h1[ $@# ]{ }");
        let errors = result.root().find_all(NodeType::Error);
        let first = errors.first().unwrap();
        assert_eq!((first.from(), first.to()), (4, 5));
        assert_eq!(first.image(), "$");
        assert_eq!(result.diagnostics().len(), 1);
    }

    #[test]
    fn test_stray_top_level_semicolon() {
        let result = parse_css("a { color: red } ; h2 { color: blue }");
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result
            .query("bodyItem/rule/declarations/declaration/propertyDeclaration/property/blue")
            .is_none());
        assert!(result.query("propertyValue/expression/term/blue").is_some());
    }

    #[test]
    fn test_stray_semicolon_tolerated_in_preprocessors() {
        for dialect in [Dialect::Scss, Dialect::Less] {
            let result = Parser::parse("a { color: red } ; h2 { }", dialect);
            assert!(result.diagnostics().is_empty());
        }
    }

    // =========================================================================
    // Error recovery
    // =========================================================================

    #[test]
    fn test_selector_like_declaration_reports_colon() {
        let source = ".header {\n    position: relative;\n    #z-index: 200;\n    color: red;\n}\n#main { }";
        for dialect in [Dialect::Css, Dialect::Scss, Dialect::Less] {
            let result = Parser::parse(source, dialect);
            assert_eq!(result.diagnostics().len(), 1, "{dialect}");
            let colon = source.find(": 200").unwrap();
            assert_eq!(result.diagnostics()[0].from, colon);
            assert_eq!(
                result
                    .query("declarations/declaration|2/propertyDeclaration/property")
                    .unwrap()
                    .image(),
                "color"
            );
            assert!(result
                .query("bodyItem|1/rule/selectorsGroup/selector/simpleSelectorSequence/elementSubsequent/cssId")
                .is_some());
        }
    }

    #[test]
    fn test_garbage_before_property() {
        let result = parse_css(".a {\n    % color: red;\n    background: blue;\n}");
        assert_eq!(result.diagnostics().len(), 1);
        assert_eq!(
            result.query("declaration|0/propertyDeclaration/property").unwrap().image(),
            "color"
        );
        assert_eq!(
            result.query("declaration|1/propertyDeclaration/property").unwrap().image(),
            "background"
        );
    }

    #[test]
    fn test_line_comment_in_css() {
        let result = parse_css(".div {\n    color: red\n    // hello\n    font-family: Ariel\n}");
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result.diagnostics()[0].message.contains("// hello"));
    }

    #[test]
    fn test_line_comment_in_preprocessors() {
        let source = ".div {\n    color: red; // hello\n    font-family: Ariel\n}";
        for dialect in [Dialect::Scss, Dialect::Less] {
            let result = Parser::parse(source, dialect);
            assert!(result.diagnostics().is_empty());
        }
    }

    #[test]
    fn test_missing_semicolon_between_declarations() {
        let result = parse_css("a { color: red background: blue; top: 0 }");
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result.query("declaration|1/propertyDeclaration/property/top").is_some());
    }

    #[test]
    fn test_unclosed_function() {
        let result = parse_css("p { color: hsl(10, }");
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result.query("term/function/error").is_some());
    }

    #[test]
    fn test_stray_closing_brace() {
        let result = parse_css("} a { }");
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result.query("bodyItem/rule").is_some());
    }

    #[test]
    fn test_premature_end_reported_once() {
        let result = parse_css("a { b { c { color: red");
        assert_eq!(messages(&result), vec!["Premature end of file"]);
        let markers = result.root().find_all(NodeType::Error);
        assert_eq!(markers.len(), 1);
        assert_eq!((markers[0].from(), markers[0].to()), (22, 22));
    }

    #[test]
    fn test_garbage_block_at_top_level() {
        let result = parse_css("{ color: red } a { }");
        assert_eq!(result.diagnostics().len(), 1);
        assert!(result.query("bodyItem/rule/selectorsGroup/selector/simpleSelectorSequence/typeSelector/elementName/a").is_some());
    }

    #[test]
    fn test_invalid_characters_are_attached() {
        let source = "a { color: red; } ^ ? b { }";
        let result = parse_css(source);
        assert!(result.has_errors());
        assert_eq!(leaf_text(&result), source);
    }

    #[test]
    fn test_unterminated_string() {
        let source = "a { content: \"abc\n}";
        let result = parse_css(source);
        assert!(result.has_errors());
        assert_eq!(leaf_text(&result), source);
    }

    // =========================================================================
    // Properties
    // =========================================================================

    const SAMPLES: &[(&str, Dialect)] = &[
        ("a { color : black; }", Dialect::Css),
        ("@import url(x.css) screen; a > b + c ~ d { margin: 0 auto !important }", Dialect::Css),
        ("@media (min-width: 100px) and (max-width: 200px) { .a:hover::before { content: '' } }", Dialect::Css),
        ("@supports (display: grid) and (not (display: inline-grid)) { a { b: c } }", Dialect::Css),
        ("@font-face { font-family: x; src: url(a.woff) format('woff') }", Dialect::Css),
        (".a { filter: progid:DXImageTransform.Microsoft.Alpha(Opacity=80); }", Dialect::Css),
        ("$a: 1px !default; .b { width: $a * 2; &:hover { color: red } }", Dialect::Scss),
        ("@mixin m($x: 1) { a: $x } .c { @include m(2); }", Dialect::Scss),
        ("@r: 1; .m(@a) when (@a > 0) { w: @a } .b { .m(1); }", Dialect::Less),
        ("a { b: c", Dialect::Css),
        ("}}}{{{", Dialect::Css),
        ("@media { @supports", Dialect::Scss),
        ("h1[ $@# ]{ }", Dialect::Css),
        ("a { color: red } ; h2 { color: blue }", Dialect::Css),
    ];

    #[test]
    fn test_coverage_of_clean_parses() {
        for (source, dialect) in SAMPLES {
            let result = Parser::parse(source, *dialect);
            if result.diagnostics().is_empty() {
                assert_eq!(&leaf_text(&result), source, "{source}");
            }
        }
    }

    #[test]
    fn test_erroneous_parses_keep_every_token() {
        for (source, dialect) in SAMPLES {
            let result = Parser::parse(source, *dialect);
            assert_eq!(&leaf_text(&result), source, "{source}");
        }
    }

    #[test]
    fn test_trees_are_well_formed() {
        for (source, dialect) in SAMPLES {
            let result = Parser::parse(source, *dialect);
            assert_well_formed(result.root());
        }
    }

    #[test]
    fn test_image_round_trip() {
        for (source, dialect) in SAMPLES {
            let result = Parser::parse(source, *dialect);
            for node in result.root().descendants() {
                assert_eq!(node.image(), &source[node.from()..node.to()]);
            }
        }
    }

    #[test]
    fn test_no_empty_rule_nodes() {
        for (source, dialect) in SAMPLES {
            let result = Parser::parse(source, *dialect);
            for node in result.root().descendants() {
                if let Node::Rule(rule) = node.node() {
                    assert!(!rule.children.is_empty(), "empty {}", rule.node_type);
                }
            }
        }
    }

    #[test]
    fn test_parse_is_idempotent() {
        for (source, dialect) in SAMPLES {
            let first = Parser::parse(source, *dialect);
            let second = Parser::parse(source, *dialect);
            assert_eq!(first.root().node(), second.root().node());
            assert_eq!(first.diagnostics(), second.diagnostics());
        }
    }

    #[test]
    fn test_parallel_parses_with_different_dialects() {
        let source = "$a: 1; .m(@b) { c: d } a { e: f }";
        let handles: Vec<_> = [Dialect::Css, Dialect::Scss, Dialect::Less]
            .into_iter()
            .cycle()
            .take(9)
            .map(|dialect| {
                std::thread::spawn(move || {
                    let result = Parser::parse(source, dialect);
                    (dialect, result.diagnostics().to_vec())
                })
            })
            .collect();
        for handle in handles {
            let (dialect, diagnostics) = handle.join().unwrap();
            assert_eq!(diagnostics, Parser::parse(source, dialect).diagnostics());
        }
    }

    #[test]
    fn test_large_stylesheet_terminates() {
        let mut source = String::new();
        for i in 0..250 {
            source.push_str(&format!(
                ".sel-{i}, #id-{i} > a:hover, ul li[data-x=\"{i}\"] {{ color: #{:03x}; margin: {i}px auto; }}\n",
                i % 4096
            ));
        }
        let result = parse_css(&source);
        assert!(result.diagnostics().is_empty(), "{:?}", messages(&result));
        assert_eq!(result.root().find_all(NodeType::Rule).len(), 250);
    }

    #[test]
    fn test_garbage_terminates() {
        let garbage = "{{(([[;;}}))]]@@##$$%%^^&&**!!::,,..//\\\\\"'`~~<>=+-|";
        let source = garbage.repeat(200);
        for dialect in [Dialect::Css, Dialect::Scss, Dialect::Less] {
            let result = Parser::parse(&source, dialect);
            assert!(result.has_errors());
            assert_eq!(leaf_text(&result), source);
        }
    }

    #[test]
    fn test_deep_nesting_terminates() {
        let source = "a { ".repeat(60);
        let result = Parser::parse(&source, Dialect::Scss);
        assert_eq!(messages(&result), vec!["Premature end of file"]);
    }

    #[test]
    fn test_repeated_garbage_declarations() {
        let source = "a { ^ }".repeat(80_000);
        let result = parse_css(&source);
        assert_eq!(result.diagnostics().len(), 80_000);
        assert_eq!(result.root().find_all(NodeType::Rule).len(), 80_000);
        assert_eq!(leaf_text(&result), source);
    }

    #[test]
    fn test_nesting_limit() {
        let cases = [
            ("a{".repeat(100_000), Dialect::Css),
            ("a{".repeat(100_000), Dialect::Scss),
            ("a{".repeat(100_000), Dialect::Less),
            (":not(".repeat(10_000), Dialect::Css),
            (":not(".repeat(10_000), Dialect::Scss),
            (format!("a {{ b: {}", "f(".repeat(10_000)), Dialect::Css),
            (format!("a {{ b: {}", "(".repeat(10_000)), Dialect::Scss),
            (format!("a {{ b: {}", "#{".repeat(10_000)), Dialect::Scss),
            (format!("@media {}", "(".repeat(10_000)), Dialect::Css),
            (format!("@supports {}", "(".repeat(10_000)), Dialect::Css),
            (format!("@container {}", "(".repeat(10_000)), Dialect::Css),
            ("@keyframes k {".repeat(10_000), Dialect::Css),
        ];
        for (source, dialect) in &cases {
            let result = Parser::parse(source, *dialect);
            assert_eq!(
                messages(&result),
                vec!["Nesting deeper than 256 levels", "Premature end of file"],
                "{dialect} {}",
                &source[..12]
            );
            assert_eq!(&leaf_text(&result), source);
        }
    }

    #[test]
    fn test_nesting_below_limit_is_parsed() {
        let source = format!("{}{}", "a{".repeat(200), "}".repeat(200));
        let result = Parser::parse(&source, Dialect::Scss);
        assert!(result.diagnostics().is_empty(), "{:?}", messages(&result));
        assert_eq!(result.root().find_all(NodeType::Rule).len(), 200);
    }

    #[test]
    fn test_nesting_limit_recovers_after_skipped_block() {
        let source = format!("{}{} b {{ c: d }}", "a{".repeat(300), "}".repeat(300));
        let result = parse_css(&source);
        assert_eq!(messages(&result), vec!["Nesting deeper than 256 levels"]);
        assert!(result.query("bodyItem|1/rule/declarations/declaration/propertyDeclaration/property/c").is_some());
        assert_eq!(leaf_text(&result), source);
    }

    #[test]
    fn test_templating_marks_in_declarations() {
        let sources = [
            ".clz { @@@ }",
            ".clz { @@@ @@@; @@@ @@@ @@@; @@@}",
            ".clz { @@@; @@@; @@@; }",
            ".clz { @@@; color: red; @@@ }",
            ".clz { color: red; @@@ @@@ }",
        ];
        for source in sources {
            let result = parse_css(source);
            assert!(result.diagnostics().is_empty(), "{source}: {:?}", messages(&result));
            assert_eq!(leaf_text(&result), source);
        }
        let result = parse_css(".clz { @@@; color: red; @@@ }");
        assert!(result.query("declarations/declaration/propertyDeclaration/property/color").is_some());
    }

    #[test]
    fn test_parse_tokens_adds_eof() {
        let source = "a{}";
        let mut tokens = Scanner::tokenize(source, Dialect::Css);
        tokens.pop();
        let result = Parser::parse_tokens(source, tokens, Dialect::Css);
        assert!(result.diagnostics().is_empty());
        assert_eq!(result.tokens().last().map(|t| t.kind), Some(TokenKind::Eof));
    }
}
